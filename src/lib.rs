//! acompanar - Teacher-Specialist Matching Backend
//!
//! Academic-operations backend whose core is the per-term matching of
//! pedagogical-accompaniment specialists to teachers, with change tracking
//! and per-specialist notifications.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`matching`] - Match engine, indexes, transition classification, run orchestration
//! - [`notifications`] - Notification fan-out from change records
//! - [`storage`] - Database operations (PostgreSQL) behind repository traits
//! - [`coordinator`] - HTTP service layer (axum)
//! - [`metrics`] - Prometheus counters for the pipeline
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use acompanar::config::Config;
//! use acompanar::coordinator::ApiServer;
//! use acompanar::storage::Database;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let database = Database::connect(&config.database)?;
//!     let server = ApiServer::new(config, &database)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::matching::{AuditPolicy, MatchRunSummary, MatchRunner};
    pub use crate::models::{
        AssignmentSnapshot, AssignmentStatus, HistoryRecord, Notification, NotificationKind,
        ReadState, Term, TransitionKind,
    };
    pub use crate::storage::Database;
}

// Direct re-exports for convenience
pub use models::{AssignmentStatus, NotificationKind, ReadState, Term, TransitionKind};
