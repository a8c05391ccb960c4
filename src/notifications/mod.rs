//! Per-specialist notification generation
//!
//! Every match run fans its change records out into notifications so each
//! specialist learns what they gained or lost without reading the raw
//! history:
//!
//! ```text
//!   ASIGNACION_NUEVA ──► NUEVA_ASIGNACION (new specialist, ALTA)
//!   REASIGNADO ────────► REASIGNACION_GANADA (new specialist, ALTA)
//!                    └─► REASIGNACION_PERDIDA (prior specialist, MEDIA)
//!   DESASIGNADO ───────► DESASIGNACION (prior specialist, ALTA)
//!   MANTENIDO / PERMANECE_SIN_ASIGNAR ──► (nothing)
//! ```
//!
//! Generation is pure: the generator consumes the in-memory change
//! records of one run and returns the notifications to batch-insert,
//! all initialized unseen. Read-state transitions happen later through
//! the retrieval endpoints.

pub mod generator;

pub use generator::generate;
