//! Error types for taskmill
//!
//! This module provides the error handling surface for the library:
//! - A top-level [`Error`] with domain sub-enums nested via `#[from]`
//! - A [`Result`] alias used throughout the crate
//!
//! Per-item fetch failures are deliberately *not* errors — they are data
//! carried inside [`crate::types::FetchResult`], so a batch never unwinds
//! because one item failed.

use thiserror::Error;

/// Result type alias for taskmill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for taskmill
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll_interval_ms")
        key: Option<String>,
    },

    /// Worker pool lifecycle error
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Task handler failure while processing a single task
    #[error("task error: {0}")]
    Task(String),

    /// Network error from the HTTP transport
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Worker pool lifecycle errors
#[derive(Debug, Error)]
pub enum PoolError {
    /// Operation requires a started pool
    #[error("pool not started")]
    NotStarted,

    /// The pool's workers are already running
    #[error("pool already started with {workers} workers")]
    AlreadyStarted {
        /// Number of workers launched by the earlier `start()` call
        workers: usize,
    },

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// The task queue was closed while enqueueing
    #[error("task queue closed")]
    QueueClosed,

    /// Worker count must be non-zero
    #[error("invalid worker count: {requested}")]
    InvalidWorkerCount {
        /// The rejected worker count
        requested: usize,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_error_converts_into_error() {
        let err: Error = PoolError::NotStarted.into();
        assert!(matches!(err, Error::Pool(PoolError::NotStarted)));
    }

    #[test]
    fn error_messages_carry_context() {
        let err = Error::Pool(PoolError::InvalidWorkerCount { requested: 0 });
        assert_eq!(err.to_string(), "pool error: invalid worker count: 0");

        let err = Error::Config {
            message: "poll interval must be non-zero".to_string(),
            key: Some("poll_interval_ms".to_string()),
        };
        assert!(err.to_string().contains("poll interval"));
    }
}
