pub mod fixtures;

use aoty_api::{AotyService, Config, DocumentFetcher, RawDocument, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

#[allow(unused_imports)]
pub use fixtures::*;

/// Fetcher that serves canned pages by locator and counts every fetch.
///
/// Unknown locators answer `TransportError::NotFound`, like the site does.
#[allow(dead_code)]
pub struct FixtureFetcher {
    routes: Mutex<HashMap<String, Result<String, TransportError>>>,
    latency: Duration,
    fetches: AtomicUsize,
    per_locator: Mutex<HashMap<String, usize>>,
}

#[allow(dead_code)]
impl FixtureFetcher {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            per_locator: Mutex::new(HashMap::new()),
        }
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn page(self, locator: &str, body: &str) -> Self {
        self.set_page(locator, body);
        self
    }

    pub fn failing(self, locator: &str, reason: &str) -> Self {
        self.set_failure(locator, reason);
        self
    }

    pub fn set_page(&self, locator: &str, body: &str) {
        self.routes
            .lock()
            .insert(locator.to_string(), Ok(body.to_string()));
    }

    pub fn set_failure(&self, locator: &str, reason: &str) {
        self.routes.lock().insert(
            locator.to_string(),
            Err(TransportError::Failed {
                locator: locator.to_string(),
                reason: reason.to_string(),
            }),
        );
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetches_of(&self, locator: &str) -> usize {
        self.per_locator.lock().get(locator).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DocumentFetcher for FixtureFetcher {
    async fn fetch(&self, locator: &str) -> Result<RawDocument, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.per_locator.lock().entry(locator.to_string()).or_default() += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let route = self.routes.lock().get(locator).cloned();
        match route {
            Some(Ok(body)) => Ok(RawDocument::new(locator, body)),
            Some(Err(err)) => Err(err),
            None => Err(TransportError::NotFound {
                locator: locator.to_string(),
            }),
        }
    }

    fn source_name(&self) -> &'static str {
        "fixtures"
    }
}

/// Config with no retries so transport failures surface at once.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config {
        fetch_retries: 0,
        ..Config::default()
    }
}

#[allow(dead_code)]
pub fn service_with(config: &Config, fetcher: Arc<FixtureFetcher>) -> AotyService {
    AotyService::new(config, fetcher).expect("valid test config")
}

/// Fetcher preloaded with every fixture page under its real locator.
#[allow(dead_code)]
pub fn site() -> FixtureFetcher {
    FixtureFetcher::new()
        .page(SEARCH_OK_COMPUTER, SEARCH_OK_COMPUTER_HTML)
        .page(ALBUM_OK_COMPUTER, ALBUM_OK_COMPUTER_HTML)
        .page(SIMILAR_OK_COMPUTER, SIMILAR_OK_COMPUTER_HTML)
        .page(ALBUM_KID_A, ALBUM_KID_A_HTML)
        .page(ALBUM_DUMMY, ALBUM_DUMMY_HTML)
        .page(USER_PROFILE, USER_PROFILE_HTML)
        .page(USER_MISSING, USER_MISSING_HTML)
}
