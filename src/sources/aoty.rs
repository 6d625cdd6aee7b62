use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{DocumentFetcher, RawDocument};
use crate::config::Config;
use crate::error::TransportError;

/// Cliente HTTP para albumoftheyear.org
pub struct AotyClient {
    client: reqwest::Client,
}

impl AotyClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for AotyClient {
    async fn fetch(&self, locator: &str) -> Result<RawDocument, TransportError> {
        debug!("🌐 GET {}", locator);

        let failed = |reason: String| TransportError::Failed {
            locator: locator.to_string(),
            reason,
        };

        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(TransportError::NotFound {
                    locator: locator.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("🚦 albumoftheyear.org limitó la petición: {}", locator);
                return Err(TransportError::RateLimited {
                    locator: locator.to_string(),
                });
            }
            status => return Err(failed(format!("HTTP error: {status}"))),
        }

        let body = response
            .text()
            .await
            .map_err(|e| failed(format!("Error leyendo respuesta: {e}")))?;

        Ok(RawDocument::new(locator, body))
    }

    fn source_name(&self) -> &'static str {
        "albumoftheyear.org"
    }
}
