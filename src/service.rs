//! # Lookup Service
//!
//! Public entry point of the pipeline. A lookup goes
//! query → cache → (on miss) fetch → assemble → store → metrics → record.
//!
//! The service owns the shared [`RecordCache`] and the [`MetricsRecorder`];
//! everything it hands out is an `Arc` to an immutable record, so callers
//! can hold on to results without copying and without seeing later updates.

use futures::stream::{self, StreamExt};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::assembler::RecordAssembler;
use crate::cache::{CachedRecord, QueryKey, QueryKind, RecordCache};
use crate::config::Config;
use crate::error::{ErrorLabel, ExtractionError, LookupError, TransportError};
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::models::{Album, SearchHit, UserProfile};
use crate::sources::{DocumentFetcher, Locators, RawDocument};

/// Album pages fetched at the same time while building a similar-albums list.
const SIMILAR_FETCH_CONCURRENCY: usize = 4;

/// Retries for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.fetch_retries,
            base_delay: config.retry_backoff(),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Delay exponencial con jitter para el intento `attempt` (desde 1)
    fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)));
        let jitter_ms = fastrand::u64(0..=self.base_delay.as_millis() as u64 / 2);
        (exp + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

/// albumoftheyear.org lookups with caching, single-flight loads and metrics.
#[derive(Clone)]
pub struct AotyService {
    pipeline: Arc<Pipeline>,
    cache: RecordCache,
    metrics: Arc<MetricsRecorder>,
    album_ttl: Duration,
    user_ttl: Duration,
    similar_ttl: Duration,
}

/// Lo que necesita una carga; vive en su propia tarea
struct Pipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    assembler: RecordAssembler,
    locators: Locators,
    retry: RetryConfig,
    metrics: Arc<MetricsRecorder>,
}

impl AotyService {
    pub fn new(config: &Config, fetcher: Arc<dyn DocumentFetcher>) -> anyhow::Result<Self> {
        config.validate()?;
        let base = config.base_url()?;
        let metrics = Arc::new(MetricsRecorder::new());

        info!(
            "🎼 Servicio AOTY listo ({} → {}, caché de {} entradas)",
            fetcher.source_name(),
            base,
            config.cache_capacity
        );

        let pipeline = Pipeline {
            fetcher,
            assembler: RecordAssembler::new(base.clone(), config.recent_reviews_limit),
            locators: Locators::new(base),
            retry: RetryConfig::from_config(config),
            metrics: metrics.clone(),
        };

        Ok(Self {
            pipeline: Arc::new(pipeline),
            cache: RecordCache::new(config.cache_capacity, config.negative_ttl(), metrics.clone()),
            metrics,
            album_ttl: QueryKind::Album.ttl(config),
            user_ttl: QueryKind::User.ttl(config),
            similar_ttl: QueryKind::Similar.ttl(config),
        })
    }

    /// Album details for `artist` / `album`, resolved through the site search.
    pub async fn lookup_album(&self, artist: &str, album: &str) -> Result<Arc<Album>, LookupError> {
        let key = QueryKey::album(artist, album)?;
        info!("🔍 Buscando álbum: {}", key);

        let pipeline = self.pipeline.clone();
        let ids = key.identifiers().to_vec();
        let record = self
            .cache
            .get_or_load(key, self.album_ttl, move || async move {
                let album = pipeline.load_album(&ids[0], &ids[1]).await?;
                Ok(CachedRecord::Album(Arc::new(album)))
            })
            .await;

        match log_outcome("álbum", record)? {
            CachedRecord::Album(album) => Ok(album),
            other => Err(kind_mismatch(other)),
        }
    }

    /// Public profile of `username`.
    pub async fn lookup_user(&self, username: &str) -> Result<Arc<UserProfile>, LookupError> {
        let key = QueryKey::user(username)?;
        info!("👤 Buscando usuario: {}", key);

        let pipeline = self.pipeline.clone();
        let name = key.identifiers()[0].clone();
        let record = self
            .cache
            .get_or_load(key, self.user_ttl, move || async move {
                let profile = pipeline.load_user(&name).await?;
                Ok(CachedRecord::User(Arc::new(profile)))
            })
            .await;

        match log_outcome("usuario", record)? {
            CachedRecord::User(profile) => Ok(profile),
            other => Err(kind_mismatch(other)),
        }
    }

    /// Albums the site lists as similar to `artist` / `album`, each fully
    /// assembled. Entries whose page cannot be loaded are left out.
    pub async fn similar_albums(&self, artist: &str, album: &str) -> Result<Arc<Vec<Album>>, LookupError> {
        let key = QueryKey::similar(artist, album)?;
        info!("🧭 Buscando álbumes similares: {}", key);

        let pipeline = self.pipeline.clone();
        let ids = key.identifiers().to_vec();
        let record = self
            .cache
            .get_or_load(key, self.similar_ttl, move || async move {
                let albums = pipeline.load_similar(&ids[0], &ids[1]).await?;
                Ok(CachedRecord::Similar(Arc::new(albums)))
            })
            .await;

        match log_outcome("similares", record)? {
            CachedRecord::Similar(albums) => Ok(albums),
            other => Err(kind_mismatch(other)),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        info!("🔄 Métricas reiniciadas");
        self.metrics.reset();
    }

    /// Number of records currently resident in the cache.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

impl Pipeline {
    async fn load_album(&self, artist: &str, album: &str) -> Result<Album, LookupError> {
        let hit = self.resolve_album(artist, album).await?;
        self.load_album_page(&hit).await
    }

    async fn load_user(&self, username: &str) -> Result<UserProfile, LookupError> {
        let page = self.fetch(&self.locators.user_profile(username)).await.map_err(|err| match err {
            TransportError::NotFound { .. } => LookupError::NotFound(format!("user '{username}'")),
            other => other.into(),
        })?;

        let assembly = self.assembler.assemble_user(&page, username)?;
        self.metrics.record_partial_loss(assembly.skipped);
        Ok(assembly.record)
    }

    async fn load_similar(&self, artist: &str, album: &str) -> Result<Vec<Album>, LookupError> {
        let origin = self.resolve_album(artist, album).await?;
        let page = self.fetch(&self.locators.similar(&origin.locator)).await?;

        let hits = self.assembler.assemble_search(&page);
        self.metrics.record_partial_loss(hits.skipped);
        debug!("🧭 {} candidatos similares para '{}'", hits.record.len(), origin.title);

        let loaded: Vec<_> = stream::iter(hits.record)
            .map(|hit| async move {
                let result = self.load_album_page(&hit).await;
                (hit, result)
            })
            .buffered(SIMILAR_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut albums = Vec::with_capacity(loaded.len());
        for (hit, result) in loaded {
            match result {
                Ok(album) => albums.push(album),
                Err(err) => {
                    warn!("⚠️ Álbum similar omitido '{}': {}", hit.title, ErrorLabel(&err));
                    self.metrics.record_partial_loss(1);
                }
            }
        }

        Ok(albums)
    }

    /// First search hit for the query; no hits means the album does not exist.
    async fn resolve_album(&self, artist: &str, album: &str) -> Result<SearchHit, LookupError> {
        let page = self.fetch(&self.locators.album_search(artist, album)).await?;
        let hits = self.assembler.assemble_search(&page);
        self.metrics.record_partial_loss(hits.skipped);

        let hit = hits
            .record
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(format!("album '{artist} - {album}'")))?;

        debug!("🎯 Resuelto '{} - {}' → {}", artist, album, hit.locator);
        Ok(hit)
    }

    async fn load_album_page(&self, hit: &SearchHit) -> Result<Album, LookupError> {
        let page = self.fetch(&hit.locator).await?;
        let assembly = self.assembler.assemble_album(&page, Some(hit))?;
        self.metrics.record_partial_loss(assembly.skipped);
        Ok(assembly.record)
    }

    async fn fetch(&self, locator: &str) -> Result<RawDocument, TransportError> {
        let mut attempt = 0;

        loop {
            match self.fetcher.fetch(locator).await {
                Ok(doc) => return Ok(doc),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!("⚠️ Intento {} falló ({}), reintentando en {:?}", attempt, err, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn log_outcome(what: &str, outcome: Result<CachedRecord, LookupError>) -> Result<CachedRecord, LookupError> {
    if let Err(err) = &outcome {
        debug!("Consulta de {} terminó con error {}", what, ErrorLabel(err));
    }
    outcome
}

fn kind_mismatch(record: CachedRecord) -> LookupError {
    warn!("💥 Registro de tipo inesperado en caché: {}", record.kind().as_str());
    LookupError::AssemblyFailed(ExtractionError::StructureMismatch("cached record kind"))
}
