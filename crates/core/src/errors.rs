//! Error types

use thiserror::Error;

/// Failures of a single timed network fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("HTTP {0}")]
    Http(u16),
}

/// Failures surfaced by the price aggregator.
///
/// Provider-level failures are converted to fallback behavior wherever
/// a fallback exists; these variants only propagate when no usable
/// data, fresh or cached, is available at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid price payload: {0}")]
    InvalidData(String),
}

/// Result type aliases
pub type FetchResult<T> = Result<T, FetchError>;
pub type AggregateResult<T> = Result<T, AggregateError>;
