//! HTTP service layer
//!
//! Thin plumbing around the core: the trigger endpoint that starts a
//! match run, read endpoints over snapshots/history/notifications, the
//! notification read-state transitions, and the bulk source loads. Term
//! identifiers are validated here so the core never sees a malformed one.
//!
//! # Modules
//!
//! - [`server`] - server struct, shared state, graceful shutdown
//! - [`api`] - routes and handlers

pub mod api;
pub mod server;

pub use api::create_router;
pub use server::{ApiServer, AppState, ServerError};
