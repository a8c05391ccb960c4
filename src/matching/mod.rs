//! Teacher-specialist matching engine
//!
//! This module implements the per-term matching pipeline: deterministic
//! assignment of accompaniment specialists to teachers, classification of
//! every teacher's transition against the previous run, and persistence of
//! the resulting snapshots and audit history.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      MatchRunner                         │
//! │  - concurrent source reads (roster/pool/prior)           │
//! │  - per-teacher decision loop                             │
//! │  - snapshot + history persistence                        │
//! │  - notification fan-out                                  │
//! └──────────────────────────────────────────────────────────┘
//!          │                 │                  │
//!          ▼                 ▼                  ▼
//!   ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//!   │Availability│   │    Prior     │   │ Transition  │
//!   │   Index    │   │  Assignment  │   │ Classifier  │
//!   │            │   │    Index     │   │             │
//!   └────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! Both indexes are built once per run from point-in-time reads and are
//! immutable afterwards, so the decision loop needs no locking and is
//! reproducible: identical inputs in identical order always produce the
//! same assignments.
//!
//! # Modules
//!
//! - [`availability`] - (weekday, site, time-slot) lookup over the specialist pool
//! - [`prior`] - most-recent prior assignment per teacher
//! - [`engine`] - per-teacher retention / fresh-match decision and enrichment
//! - [`transition`] - five-way transition classification
//! - [`runner`] - run orchestration, persistence and notification fan-out
//! - [`error`] - matching-specific errors

pub mod availability;
pub mod engine;
pub mod error;
pub mod prior;
pub mod runner;
pub mod transition;

pub use availability::{AvailabilityIndex, Candidate, SlotKey};
pub use engine::{AssignedSpecialist, MatchEngine, MatchOutcome};
pub use error::{MatchError, MatchResult};
pub use prior::{PriorAssignment, PriorAssignmentIndex};
pub use runner::{AuditPolicy, MatchRunSummary, MatchRunner};
pub use transition::classify;
