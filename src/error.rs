//! Unified error handling for the acompanar crate
//!
//! Domain-specific errors stay in their modules ([`MatchError`] in
//! `matching::error`); this enum wraps them into one type usable across
//! module boundaries, together with a coarse category for handling
//! strategies at the API layer.

use std::io;
use thiserror::Error;

pub use crate::matching::error::MatchError;
pub use crate::models::InvalidTerm;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller-side input problems (bad term, missing roster)
    Input,
    /// Matching pipeline failures
    Matching,
    /// Database and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the acompanar crate
#[derive(Error, Debug)]
pub enum Error {
    /// Matching pipeline errors
    #[error("match error: {0}")]
    Match(#[from] MatchError),

    /// Malformed term identifier, rejected at the boundary
    #[error("{0}")]
    Term(#[from] InvalidTerm),

    /// Database driver errors
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool errors
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Match(MatchError::EmptyRoster { .. }) | Self::Term(_) => ErrorCategory::Input,
            Self::Match(_) => ErrorCategory::Matching,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Check if retrying the operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Match(e) => e.is_recoverable(),
            Self::Term(_) | Self::Json(_) | Self::Config(_) => false,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => true,
            Self::Other { .. } => false,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roster_is_input_error() {
        let err = Error::Match(MatchError::EmptyRoster {
            periodo: "2025-1".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_term_is_input_error() {
        let err = Error::Term(InvalidTerm("25-1".into()));
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.to_string().contains("25-1"));
    }

    #[test]
    fn test_batch_insert_is_matching_error() {
        let err = Error::Match(MatchError::BatchInsert {
            collection: "historial".into(),
            reason: "connection reset".into(),
        });
        assert_eq!(err.category(), ErrorCategory::Matching);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("pool_size must be at least 1");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }
}
