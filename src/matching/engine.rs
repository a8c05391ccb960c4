//! Per-teacher matching decision and course enrichment
//!
//! For each teacher the engine first tries to retain the prior specialist,
//! then falls back to the first available candidate, walking courses and
//! schedule slots strictly in roster order. "First match wins" on both
//! paths: the search stops at the first slot that satisfies it, with no
//! scoring of alternatives. Together with the insertion-order tie-break of
//! the availability index this makes the whole run deterministic.

use crate::models::{
    Acompanamiento, AssignmentStatus, EnrichedCourse, EnrichedSlot, TeacherTermRecord,
};

use super::availability::{AvailabilityIndex, SlotKey};
use super::prior::PriorAssignmentIndex;

/// Specialist chosen for a teacher by the current run
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedSpecialist {
    pub dni: String,
    pub nombre: String,
}

/// Outcome of one per-teacher decision
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub especialista: Option<AssignedSpecialist>,
    /// True when the prior specialist was kept (retention path)
    pub retenido: bool,
    pub cursos: Vec<EnrichedCourse>,
}

impl MatchOutcome {
    pub fn estado_general(&self) -> AssignmentStatus {
        if self.especialista.is_some() {
            AssignmentStatus::Planificado
        } else {
            AssignmentStatus::SinAsignar
        }
    }
}

/// Per-teacher decision function over the two run-scoped indexes.
///
/// Holds shared references only: the indexes are built once per run and
/// never mutated, so the engine can be called for any number of teachers
/// (or in parallel, though the runner does not) without synchronization.
pub struct MatchEngine<'a> {
    availability: &'a AvailabilityIndex,
    prior: &'a PriorAssignmentIndex,
}

impl<'a> MatchEngine<'a> {
    pub fn new(availability: &'a AvailabilityIndex, prior: &'a PriorAssignmentIndex) -> Self {
        Self {
            availability,
            prior,
        }
    }

    /// Decide the teacher's assignment for this run and build the
    /// enriched course list.
    pub fn decide(&self, teacher: &TeacherTermRecord) -> MatchOutcome {
        let retained = self.try_retention(teacher);
        let retenido = retained.is_some();

        let especialista = retained.or_else(|| self.try_fresh_match(teacher));
        let cursos = self.enrich(teacher, especialista.as_ref());

        MatchOutcome {
            especialista,
            retenido,
            cursos,
        }
    }

    /// Retention attempt: keep the prior specialist if the teacher's last
    /// state was assigned and that specialist is still free at any of the
    /// teacher's slots. Course-then-slot order defines the search; the
    /// first matching slot ends it.
    fn try_retention(&self, teacher: &TeacherTermRecord) -> Option<AssignedSpecialist> {
        let prior = self.prior.get(&teacher.docente_id)?;
        if !prior.is_assigned() {
            return None;
        }
        let prior_dni = prior.especialista_dni.as_deref()?;

        for curso in &teacher.cursos {
            for slot in &curso.horarios {
                let key = SlotKey::for_schedule(slot);
                if let Some(candidate) = self.availability.find(&key, prior_dni) {
                    return Some(AssignedSpecialist {
                        dni: candidate.dni.clone(),
                        nombre: candidate.nombre.clone(),
                    });
                }
            }
        }
        None
    }

    /// Fresh-match attempt: the first slot with any free specialist wins,
    /// and the first candidate in that bucket is taken.
    fn try_fresh_match(&self, teacher: &TeacherTermRecord) -> Option<AssignedSpecialist> {
        for curso in &teacher.cursos {
            for slot in &curso.horarios {
                let key = SlotKey::for_schedule(slot);
                if let Some(candidate) = self.availability.candidates(&key).first() {
                    return Some(AssignedSpecialist {
                        dni: candidate.dni.clone(),
                        nombre: candidate.nombre.clone(),
                    });
                }
            }
        }
        None
    }

    /// Build the enriched course list for the snapshot.
    ///
    /// Every slot whose bucket contains the assigned specialist gets an
    /// accompaniment annotation, not just the slot that triggered the
    /// match. Slots without a match stay unannotated. The roster record is
    /// read-only; enrichment constructs new structures.
    fn enrich(
        &self,
        teacher: &TeacherTermRecord,
        especialista: Option<&AssignedSpecialist>,
    ) -> Vec<EnrichedCourse> {
        teacher
            .cursos
            .iter()
            .map(|curso| EnrichedCourse {
                nombre: curso.nombre.clone(),
                horarios: curso
                    .horarios
                    .iter()
                    .map(|slot| {
                        let acompanamiento = especialista.and_then(|esp| {
                            let key = SlotKey::for_schedule(slot);
                            self.availability.find(&key, &esp.dni).map(|candidate| {
                                Acompanamiento {
                                    especialista_dni: esp.dni.clone(),
                                    nombre_especialista: esp.nombre.clone(),
                                    estado: AssignmentStatus::Planificado,
                                    disponibilidad: candidate.detalle.clone(),
                                }
                            })
                        });
                        EnrichedSlot {
                            horario: slot.clone(),
                            acompanamiento,
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}
