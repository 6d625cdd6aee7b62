use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
    time::Duration,
};
use tokio::time::Instant;
use tracing::debug;

/// Cache entry con TTL propio
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
    /// Momento lógico del último acceso
    tick: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Bounded LRU map with per-entry TTL.
///
/// Not synchronized: the owner wraps it in a lock. Expired entries are only
/// dropped when they are looked up (or pushed out by capacity), there is no
/// sweep.
#[derive(Debug)]
pub struct LRUCache<K: Clone + Eq + Hash, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, K>,
    capacity: usize,
    next_tick: u64,
}

impl<K, V> LRUCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            capacity: capacity.max(1),
            next_tick: 0,
        }
    }

    /// Returns a fresh value and marks it most recently used.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.remove(key);
            debug!("⏰ Entrada expirada removida del cache");
            return None;
        }

        let tick = self.bump_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, key.clone());
        Some(entry.value.clone())
    }

    /// Inserts or replaces `key`, evicting the least recently used entry if
    /// the cache is full. Returns the evicted key, if any.
    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Duration, now: Instant) -> Option<K> {
        let mut evicted = None;

        if let Some(old) = self.entries.remove(&key) {
            self.recency.remove(&old.tick);
        } else if self.entries.len() >= self.capacity {
            evicted = self.evict_lru();
        }

        let tick = self.bump_tick();
        self.recency.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                ttl,
                tick,
            },
        );

        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_lru(&mut self) -> Option<K> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn bump_tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }
}
