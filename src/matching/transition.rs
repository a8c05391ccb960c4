//! Transition classification
//!
//! Labels a teacher's outcome against their prior state with exactly one
//! of the five transition kinds. The classification is a pure function of
//! the prior state and the new assignment; the full decision table:
//!
//! | prior state            | new assignment | kind                   |
//! |------------------------|----------------|------------------------|
//! | none or not assigned   | none           | PERMANECE_SIN_ASIGNAR  |
//! | none or not assigned   | some           | ASIGNACION_NUEVA       |
//! | assigned, same id      | some, same     | MANTENIDO              |
//! | assigned, different id | some, other    | REASIGNADO             |
//! | assigned               | none           | DESASIGNADO            |

use crate::models::TransitionKind;

use super::prior::PriorAssignment;

/// Classify one teacher's transition.
///
/// `prior` is the teacher's most recent snapshot state (absent when the
/// teacher was never processed for the term); `nuevo` is the specialist id
/// assigned by the current run, if any.
pub fn classify(prior: Option<&PriorAssignment>, nuevo: Option<&str>) -> TransitionKind {
    let prior_dni = prior
        .filter(|p| p.is_assigned())
        .and_then(|p| p.especialista_dni.as_deref());

    match (prior_dni, nuevo) {
        (None, None) => TransitionKind::PermaneceSinAsignar,
        (None, Some(_)) => TransitionKind::AsignacionNueva,
        (Some(antes), Some(ahora)) if antes == ahora => TransitionKind::Mantenido,
        (Some(_), Some(_)) => TransitionKind::Reasignado,
        (Some(_), None) => TransitionKind::Desasignado,
    }
}
