use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Upstream
    pub base_url: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,

    // Reintentos
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,

    // Caché
    pub cache_capacity: usize,
    pub album_ttl: u64,    // En segundos
    pub similar_ttl: u64,  // En segundos
    pub user_ttl: u64,     // En segundos
    pub negative_ttl: u64, // En segundos, 0 desactiva

    // Límites
    pub recent_reviews_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Upstream
            base_url: std::env::var("AOTY_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: std::env::var("AOTY_USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,

            // Reintentos
            fetch_retries: std::env::var("FETCH_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            retry_backoff_ms: std::env::var("RETRY_BACKOFF_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()?,

            // Caché
            cache_capacity: std::env::var("CACHE_CAPACITY")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            album_ttl: std::env::var("ALBUM_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // 7 días
                .parse()?,
            similar_ttl: std::env::var("SIMILAR_TTL")
                .unwrap_or_else(|_| "86400".to_string()) // 1 día
                .parse()?,
            user_ttl: std::env::var("USER_TTL")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hora
                .parse()?,
            negative_ttl: std::env::var("NEGATIVE_TTL")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,

            // Límites
            recent_reviews_limit: std::env::var("RECENT_REVIEWS_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - `base_url` must be an absolute http(s) URL
    /// - Cache capacity must be greater than 0
    /// - Positive TTLs must be greater than 0 (negative TTL may be 0)
    /// - HTTP timeout must be greater than 0
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("Base URL must be http or https, got: {}", self.base_url);
        }

        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        if self.cache_capacity == 0 {
            anyhow::bail!("Cache capacity must be greater than 0");
        }

        if self.album_ttl == 0 || self.similar_ttl == 0 || self.user_ttl == 0 {
            anyhow::bail!(
                "Cache TTLs must be greater than 0, got album={} similar={} user={}",
                self.album_ttl,
                self.similar_ttl,
                self.user_ttl
            );
        }

        if self.recent_reviews_limit == 0 {
            anyhow::bail!("Recent reviews limit must be greater than 0");
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base URL: {}", self.base_url))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn album_ttl(&self) -> Duration {
        Duration::from_secs(self.album_ttl)
    }

    pub fn similar_ttl(&self) -> Duration {
        Duration::from_secs(self.similar_ttl)
    }

    pub fn user_ttl(&self) -> Duration {
        Duration::from_secs(self.user_ttl)
    }

    /// `None` when negative caching is disabled.
    pub fn negative_ttl(&self) -> Option<Duration> {
        (self.negative_ttl > 0).then(|| Duration::from_secs(self.negative_ttl))
    }

    /// Returns a summary of the current configuration for logging.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Upstream: {} (timeout {}, {} retries, backoff {})\n  \
            Cache: {} entries, TTL album={} similar={} user={} negative={}\n  \
            Limits: {} recent reviews",
            self.base_url,
            humantime::format_duration(self.http_timeout()),
            self.fetch_retries,
            humantime::format_duration(self.retry_backoff()),
            self.cache_capacity,
            humantime::format_duration(self.album_ttl()),
            humantime::format_duration(self.similar_ttl()),
            humantime::format_duration(self.user_ttl()),
            self.negative_ttl()
                .map_or("off".to_string(), |ttl| humantime::format_duration(ttl).to_string()),
            self.recent_reviews_limit,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.albumoftheyear.org".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".into(),
            http_timeout_secs: 15,

            fetch_retries: 2,
            retry_backoff_ms: 250,

            cache_capacity: 5000,
            album_ttl: 604_800,
            similar_ttl: 86_400,
            user_ttl: 3_600,
            negative_ttl: 60,

            recent_reviews_limit: 5,
        }
    }
}
