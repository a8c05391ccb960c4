//! Error types for the matching module

use std::fmt;

/// Result type for matching operations
pub type MatchResult<T> = Result<T, MatchError>;

/// Matching-specific errors
#[derive(Debug)]
pub enum MatchError {
    /// No roster rows exist for the requested term
    EmptyRoster {
        periodo: String,
    },

    /// One of the three source reads failed before processing started
    SourceRead {
        source: String,
        reason: String,
    },

    /// A batch insert into one of the output collections failed.
    /// Inserts are best-effort: a failure here does not roll back
    /// writes that already landed in the other collection.
    BatchInsert {
        collection: String,
        reason: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRoster { periodo } => {
                write!(f, "no teacher roster loaded for term {periodo}")
            }
            Self::SourceRead { source, reason } => {
                write!(f, "failed to read {source}: {reason}")
            }
            Self::BatchInsert { collection, reason } => {
                write!(f, "batch insert into '{collection}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for MatchError {}

impl MatchError {
    /// Whether retrying the whole run may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EmptyRoster { .. } => false,
            Self::SourceRead { .. } | Self::BatchInsert { .. } => true,
        }
    }
}
