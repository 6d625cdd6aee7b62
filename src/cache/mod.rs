//! # Cache Module
//!
//! Request-scoped caching for albumoftheyear.org lookups.
//!
//! Every lookup is identified by a normalized [`QueryKey`]. The
//! [`CoalescingCache`] maps keys to assembled records and guarantees that,
//! for a given key, at most one upstream load runs at a time: concurrent
//! callers for the same key share the result of that one load.
//!
//! ## Features
//!
//! - **LRU Eviction**: bounded number of resident entries (`CACHE_CAPACITY`)
//! - **TTL per kind**: albums, similar-album lists and user profiles expire
//!   independently (`ALBUM_TTL`, `SIMILAR_TTL`, `USER_TTL`)
//! - **Single flight**: one in-flight load per key, shared by all waiters
//! - **Negative caching**: "not found" answers are remembered for
//!   `NEGATIVE_TTL` seconds (0 disables it)
//!
//! ## Configuration
//!
//! ```env
//! CACHE_CAPACITY=5000   # Maximum number of resident entries
//! ALBUM_TTL=604800      # 7 days
//! SIMILAR_TTL=86400     # 1 day
//! USER_TTL=3600         # 1 hour
//! NEGATIVE_TTL=60
//! ```

pub mod coalescing;
pub mod lru_cache;

pub use coalescing::CoalescingCache;

use std::{fmt, sync::Arc, time::Duration};

use crate::config::Config;
use crate::error::LookupError;
use crate::models::{Album, UserProfile};

/// What a [`QueryKey`] looks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Album,
    User,
    Similar,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::User => "user",
            Self::Similar => "similar",
        }
    }

    /// TTL configured for records of this kind.
    pub fn ttl(self, config: &Config) -> Duration {
        match self {
            Self::Album => config.album_ttl(),
            Self::User => config.user_ttl(),
            Self::Similar => config.similar_ttl(),
        }
    }
}

/// Normalized cache key.
///
/// Two queries that differ only in case, percent-encoding or whitespace
/// produce equal keys. Construct through [`QueryKey::album`],
/// [`QueryKey::user`] or [`QueryKey::similar`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: QueryKind,
    identifiers: Vec<String>,
}

impl QueryKey {
    pub fn album(artist: &str, album: &str) -> Result<Self, LookupError> {
        Self::new(QueryKind::Album, &[("artist", artist), ("album", album)])
    }

    pub fn user(username: &str) -> Result<Self, LookupError> {
        Self::new(QueryKind::User, &[("username", username)])
    }

    pub fn similar(artist: &str, album: &str) -> Result<Self, LookupError> {
        Self::new(QueryKind::Similar, &[("artist", artist), ("album", album)])
    }

    fn new(kind: QueryKind, raw: &[(&str, &str)]) -> Result<Self, LookupError> {
        let identifiers = raw
            .iter()
            .map(|(field, value)| {
                normalize_identifier(value).ok_or_else(|| {
                    LookupError::InvalidQuery(format!("{field} must not be empty: {value:?}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { kind, identifiers })
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        for id in &self.identifiers {
            write!(f, ":{id}")?;
        }
        Ok(())
    }
}

/// Percent-decodes, lowercases, trims and collapses whitespace runs.
///
/// Returns `None` when nothing is left. Input that does not decode to valid
/// UTF-8 is taken literally.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let normalized = decoded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    (!normalized.is_empty()).then_some(normalized)
}

/// Record stored in the shared cache; one variant per [`QueryKind`].
#[derive(Debug, Clone)]
pub enum CachedRecord {
    Album(Arc<Album>),
    User(Arc<UserProfile>),
    Similar(Arc<Vec<Album>>),
}

impl CachedRecord {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Album(_) => QueryKind::Album,
            Self::User(_) => QueryKind::User,
            Self::Similar(_) => QueryKind::Similar,
        }
    }
}

/// Cache shared by every lookup kind.
pub type RecordCache = CoalescingCache<QueryKey, CachedRecord>;
