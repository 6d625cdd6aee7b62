use parking_lot::Mutex;
use std::{collections::HashMap, fmt::Debug, future::Future, hash::Hash, sync::Arc, time::Duration};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, warn};

use super::lru_cache::LRUCache;
use crate::error::{ErrorLabel, LookupError};
use crate::metrics::MetricsRecorder;

type Outcome<V> = Result<V, LookupError>;

/// Resident cache + single-flight loads, with metrics on every request.
///
/// - A fresh resident entry is a hit.
/// - Otherwise the first caller for a key becomes the leader: its loader is
///   spawned on its own task and the key is marked in flight. Every later
///   caller for the same key waits on that load's completion signal instead
///   of loading again.
/// - Successful values are stored with the caller-supplied TTL. `NotFound`
///   may be remembered for the configured negative TTL; any other error is
///   handed to all waiters and forgotten, so the next request retries.
///
/// The map lock is a plain mutex that is never held across an `.await`.
/// Dropping a waiting caller only abandons that caller: the spawned load
/// keeps running for the others.
pub struct CoalescingCache<K, V>
where
    K: Clone + Eq + Hash,
{
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for CoalescingCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<K, V>
where
    K: Clone + Eq + Hash,
{
    state: Mutex<State<K, V>>,
    metrics: Arc<MetricsRecorder>,
    negative_ttl: Option<Duration>,
}

struct State<K, V>
where
    K: Clone + Eq + Hash,
{
    resident: LRUCache<K, Outcome<V>>,
    in_flight: HashMap<K, InFlight<V>>,
    next_generation: u64,
}

/// Carga en curso para una clave
struct InFlight<V> {
    generation: u64,
    done: watch::Receiver<Option<Outcome<V>>>,
}

/// Identifica una carga: su generación en la tabla y la época de métricas
/// en la que se contó su miss.
#[derive(Debug, Clone, Copy)]
struct Flight {
    generation: u64,
    epoch: u64,
}

enum Plan<V> {
    Hit(V),
    NegativeHit(LookupError),
    Wait(watch::Receiver<Option<Outcome<V>>>),
    Lead {
        generation: u64,
        done: watch::Sender<Option<Outcome<V>>>,
        rx: watch::Receiver<Option<Outcome<V>>>,
    },
}

impl<K, V> CoalescingCache<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, negative_ttl: Option<Duration>, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    resident: LRUCache::new(capacity),
                    in_flight: HashMap::new(),
                    next_generation: 0,
                }),
                metrics,
                negative_ttl,
            }),
        }
    }

    /// Returns the cached value for `key`, or runs `loader` (at most once
    /// concurrently per key) and caches its result for `ttl`.
    pub async fn get_or_load<F, Fut>(&self, key: K, ttl: Duration, loader: F) -> Outcome<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        let started = Instant::now();
        let metrics = &self.inner.metrics;

        let rx = match self.plan(&key, started) {
            Plan::Hit(value) => {
                metrics.record_hit();
                metrics.record_latency(started.elapsed());
                debug!("✅ Cache hit: {:?}", key);
                return Ok(value);
            }
            Plan::NegativeHit(err) => {
                metrics.record_negative_hit();
                metrics.record_latency(started.elapsed());
                debug!("🚫 Cache hit negativo: {:?}", key);
                return Err(err);
            }
            Plan::Wait(rx) => {
                metrics.record_coalesced();
                debug!("⏳ Esperando carga en curso: {:?}", key);
                rx
            }
            Plan::Lead { generation, done, rx } => {
                let epoch = metrics.record_miss();
                debug!("❌ Cache miss, cargando: {:?}", key);
                self.spawn_load(key, Flight { generation, epoch }, ttl, done, loader);
                rx
            }
        };

        let outcome = wait_for_outcome(rx).await;
        metrics.record_latency(started.elapsed());
        outcome
    }

    /// Number of resident entries (fresh or not yet noticed as expired).
    pub fn len(&self) -> usize {
        self.inner.state.lock().resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys with a load in progress.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Drops a resident entry so the next request reloads it.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.state.lock().resident.remove(key).is_some()
    }

    fn plan(&self, key: &K, now: Instant) -> Plan<V> {
        let mut state = self.inner.state.lock();

        match state.resident.get(key, now) {
            Some(Ok(value)) => return Plan::Hit(value),
            Some(Err(err)) => return Plan::NegativeHit(err),
            None => {}
        }

        if let Some(flight) = state.in_flight.get(key) {
            return Plan::Wait(flight.done.clone());
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let (done, rx) = watch::channel(None);
        state.in_flight.insert(
            key.clone(),
            InFlight {
                generation,
                done: rx.clone(),
            },
        );

        Plan::Lead { generation, done, rx }
    }

    fn spawn_load<F, Fut>(
        &self,
        key: K,
        flight: Flight,
        ttl: Duration,
        done: watch::Sender<Option<Outcome<V>>>,
        loader: F,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let mut guard = AbortGuard {
                inner: inner.clone(),
                key: key.clone(),
                flight,
                armed: true,
            };

            let outcome = loader().await;
            inner.complete(&key, flight, ttl, &outcome);
            guard.armed = false;

            // Los que esperan pueden haberse ido todos; no es un error
            let _ = done.send(Some(outcome));
        });
    }
}

impl<K, V> Inner<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    /// Publishes a finished load: clears the in-flight marker and stores the
    /// outcome under the same lock, then updates metrics.
    fn complete(&self, key: &K, flight: Flight, ttl: Duration, outcome: &Outcome<V>) {
        let now = Instant::now();
        let mut evicted = None;

        {
            let mut state = self.state.lock();

            if state.in_flight.get(key).is_some_and(|f| f.generation == flight.generation) {
                debug!("📬 Carga completada para {:?}", key);
                state.in_flight.remove(key);
            }

            match outcome {
                Ok(value) => {
                    evicted = state.resident.insert_with_ttl(key.clone(), Ok(value.clone()), ttl, now);
                }
                Err(err) if err.is_negative_cacheable() => {
                    if let Some(negative_ttl) = self.negative_ttl {
                        evicted = state
                            .resident
                            .insert_with_ttl(key.clone(), Err(err.clone()), negative_ttl, now);
                    }
                }
                Err(_) => {}
            }
        }

        if let Some(evicted) = evicted {
            self.metrics.record_eviction();
            debug!("🗑️ Evictado por capacidad: {:?}", evicted);
        }

        if let Err(err) = outcome {
            if err.counts_as_error() {
                self.metrics.record_error(flight.epoch);
                warn!("❌ Carga fallida para {:?}: {}", key, ErrorLabel(err));
            }
        }
    }

    fn abandon(&self, key: &K, generation: u64) {
        let mut state = self.state.lock();
        if state.in_flight.get(key).is_some_and(|f| f.generation == generation) {
            state.in_flight.remove(key);
        }
    }
}

/// Limpia el marcador en curso si la tarea de carga muere sin publicar.
struct AbortGuard<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    inner: Arc<Inner<K, V>>,
    key: K,
    flight: Flight,
    armed: bool,
}

impl<K, V> Drop for AbortGuard<K, V>
where
    K: Clone + Eq + Hash + Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if self.armed {
            warn!("💥 Carga abortada para {:?}", self.key);
            self.inner.abandon(&self.key, self.flight.generation);
            self.inner.metrics.record_error(self.flight.epoch);
        }
    }
}

async fn wait_for_outcome<V: Clone>(mut rx: watch::Receiver<Option<Outcome<V>>>) -> Outcome<V> {
    let published = match rx.wait_for(Option::is_some).await {
        Ok(value) => value.clone(),
        Err(_) => None,
    };

    published.unwrap_or_else(|| Err(LookupError::TransportFailure("in-flight lookup aborted".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(capacity: usize) -> (CoalescingCache<String, u32>, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new());
        (
            CoalescingCache::new(capacity, Some(Duration::from_secs(5)), metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let (cache, metrics) = cache(8);
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.get_or_load("k".into(), ttl, || async { Ok(7) }).await, Ok(7));
        assert_eq!(
            cache.get_or_load("k".into(), ttl, || async { Ok(99) }).await,
            Ok(7)
        );

        let snap = metrics.snapshot();
        assert_eq!((snap.cache_misses, snap.cache_hits, snap.total_requests), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_cached() {
        let (cache, metrics) = cache(8);
        let ttl = Duration::from_secs(60);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = cache
                .get_or_load("k".into(), ttl, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(LookupError::TransportFailure("down".into()))
                })
                .await;
            assert_eq!(result, Err(LookupError::TransportFailure("down".into())));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.in_flight(), 0);
        assert!(cache.is_empty());
        assert_eq!(metrics.snapshot().errors, 2);
    }

    #[tokio::test]
    async fn test_not_found_is_cached_negatively() {
        let (cache, metrics) = cache(8);
        let ttl = Duration::from_secs(60);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let result = cache
                .get_or_load("ghost".into(), ttl, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(LookupError::NotFound("ghost".into()))
                })
                .await;
            assert_eq!(result, Err(LookupError::NotFound("ghost".into())));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let snap = metrics.snapshot();
        assert_eq!(snap.errors, 0);
        assert_eq!(snap.negative_hits, 2);
        assert_eq!(snap.cache_hits, 2);
        assert_eq!(snap.cache_misses, 1);
    }

    async fn exploding_loader() -> Outcome<u32> {
        panic!("loader exploded")
    }

    #[tokio::test]
    async fn test_panicking_loader_releases_slot() {
        let (cache, _metrics) = cache(8);
        let ttl = Duration::from_secs(60);

        let result = cache.get_or_load("k".into(), ttl, exploding_loader).await;
        assert_eq!(
            result,
            Err(LookupError::TransportFailure("in-flight lookup aborted".into()))
        );
        assert_eq!(cache.in_flight(), 0);

        assert_eq!(cache.get_or_load("k".into(), ttl, || async { Ok(1) }).await, Ok(1));
    }

    #[tokio::test]
    async fn test_failure_after_reset_is_not_counted() {
        let (cache, metrics) = cache(8);
        let ttl = Duration::from_secs(60);
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_load("k".into(), ttl, move || async move {
                        let _ = gate.await;
                        Err(LookupError::TransportFailure("down".into()))
                    })
                    .await
            })
        };

        // Esperar a que la carga esté en curso
        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        metrics.reset();
        release.send(()).unwrap();

        let result = pending.await.unwrap();
        assert_eq!(result, Err(LookupError::TransportFailure("down".into())));
        assert_eq!(metrics.snapshot().errors, 0);

        // Un fallo en la época actual sí cuenta
        let again = cache
            .get_or_load("k".into(), ttl, || async {
                Err(LookupError::TransportFailure("down".into()))
            })
            .await;
        assert!(again.is_err());
        let snap = metrics.snapshot();
        assert_eq!((snap.errors, snap.total_requests), (1, 1));
    }

    #[tokio::test]
    async fn test_capacity_eviction_is_counted() {
        let (cache, metrics) = cache(2);
        let ttl = Duration::from_secs(60);

        for key in ["a", "b", "c"] {
            cache.get_or_load(key.into(), ttl, || async { Ok(1) }).await.unwrap();
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(metrics.snapshot().evictions, 1);
    }
}
