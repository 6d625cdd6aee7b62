//! Error types for the extraction-and-caching pipeline.
//!
//! Three layers, innermost first:
//!
//! - [`ExtractionError`]: one element of a page could not be turned into a
//!   value. Absorbed by the assembler (skip-and-count), never returned to
//!   callers on its own.
//! - [`TransportError`]: the document fetcher could not deliver a page.
//! - [`LookupError`]: what a caller of the service sees. Every variant maps
//!   to a stable [`code`](LookupError::code) and
//!   [`http_status`](LookupError::http_status) for the boundary layer.

use std::fmt;

/// Failure to extract a single value from a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing required field `{0}`")]
    MissingRequiredField(&'static str),

    #[error("malformed value for `{0}`: {1:?}")]
    MalformedValue(&'static str, String),

    #[error("document does not look like {0}")]
    StructureMismatch(&'static str),
}

/// Failure reported by a [`DocumentFetcher`](crate::sources::DocumentFetcher).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("upstream has no document at {locator}")]
    NotFound { locator: String },

    #[error("upstream throttled request to {locator}")]
    RateLimited { locator: String },

    #[error("fetch of {locator} failed: {reason}")]
    Failed { locator: String, reason: String },
}

impl TransportError {
    /// Solo los fallos de red o de estado HTTP genérico merecen reintento.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Error surfaced by a lookup.
///
/// `Clone` because a single failed load is handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("assembly failed: {0}")]
    AssemblyFailed(ExtractionError),

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl LookupError {
    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::TransportFailure(_) => "transport_failure",
            Self::AssemblyFailed(_) => "assembly_failed",
            Self::RateLimited(_) => "rate_limited",
            Self::InvalidQuery(_) => "invalid_query",
        }
    }

    /// Suggested HTTP status for the boundary layer.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::TransportFailure(_) => 503,
            Self::AssemblyFailed(_) => 502,
            Self::RateLimited(_) => 429,
            Self::InvalidQuery(_) => 400,
        }
    }

    /// Whether this outcome increments the `errors` counter.
    ///
    /// `NotFound` is a terminal answer, not a failure of the service.
    pub fn counts_as_error(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::InvalidQuery(_))
    }

    /// Whether the outcome may be remembered as a negative cache entry.
    pub fn is_negative_cacheable(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<TransportError> for LookupError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound { locator } => Self::NotFound(locator),
            TransportError::RateLimited { locator } => Self::RateLimited(locator),
            failed @ TransportError::Failed { .. } => Self::TransportFailure(failed.to_string()),
        }
    }
}

impl From<ExtractionError> for LookupError {
    fn from(err: ExtractionError) -> Self {
        Self::AssemblyFailed(err)
    }
}

/// Short label used in log lines.
pub struct ErrorLabel<'a>(pub &'a LookupError);

impl fmt::Display for ErrorLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
