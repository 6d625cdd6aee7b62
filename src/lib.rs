//! # aoty-api
//!
//! Unofficial albumoftheyear.org client: fetches album, user and
//! similar-album pages, turns them into typed records and serves repeated
//! queries from a bounded, single-flight cache.
//!
//! ```rust,no_run
//! use aoty_api::{AotyClient, AotyService, Config};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let service = AotyService::new(&config, Arc::new(AotyClient::new(&config)?))?;
//!
//! let album = service.lookup_album("Radiohead", "OK Computer").await?;
//! println!("{} tracks, must hear: {}", album.tracks.len(), album.is_must_hear);
//! println!("{}", service.metrics());
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod models;
pub mod service;
pub mod sources;

pub use config::Config;
pub use error::{ExtractionError, LookupError, TransportError};
pub use metrics::MetricsSnapshot;
pub use service::AotyService;
pub use sources::{AotyClient, DocumentFetcher, RawDocument};
