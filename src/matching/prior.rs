//! Prior-assignment index
//!
//! Answers "what was this teacher's last known assignment state" in O(1),
//! built from all snapshots of the term ordered by execution timestamp
//! descending.

use std::collections::HashMap;

use crate::models::{AssignmentSnapshot, AssignmentStatus};

/// Last known assignment state of one teacher
#[derive(Debug, Clone, PartialEq)]
pub struct PriorAssignment {
    pub especialista_dni: Option<String>,
    pub nombre_especialista: Option<String>,
    pub estado: AssignmentStatus,
}

impl PriorAssignment {
    /// A prior state only counts as "assigned" when the last run both
    /// planned an accompaniment and recorded a specialist id.
    pub fn is_assigned(&self) -> bool {
        self.estado == AssignmentStatus::Planificado && self.especialista_dni.is_some()
    }
}

/// Lookup from teacher id to the most recent snapshot state.
///
/// Input must be ordered by `ejecutado_en` descending; for each teacher
/// only the first record encountered is kept, so older generations are
/// ignored without a second pass.
#[derive(Debug, Default)]
pub struct PriorAssignmentIndex {
    map: HashMap<String, PriorAssignment>,
}

impl PriorAssignmentIndex {
    pub fn build(snapshots_desc: &[AssignmentSnapshot]) -> Self {
        let mut map = HashMap::new();

        for snapshot in snapshots_desc {
            map.entry(snapshot.docente_id.clone())
                .or_insert_with(|| PriorAssignment {
                    especialista_dni: snapshot.especialista_dni.clone(),
                    nombre_especialista: snapshot.nombre_especialista.clone(),
                    estado: snapshot.estado_general,
                });
        }

        Self { map }
    }

    /// Most recent state for the teacher, or `None` when the teacher has
    /// no prior snapshot for the term
    pub fn get(&self, docente_id: &str) -> Option<&PriorAssignment> {
        self.map.get(docente_id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
