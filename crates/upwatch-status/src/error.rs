//! Error types for the status engine and its data sources.

use thiserror::Error;

/// Result type alias for data-source calls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures reported by a [`StatusSource`](crate::StatusSource).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Why a refresh pass did not replace the cache.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("config fetch failed: {0}")]
    Config(#[source] SourceError),

    #[error("health check fetch failed: {0}")]
    HealthChecks(#[source] SourceError),

    #[error("refresh task aborted: {0}")]
    Aborted(String),
}
