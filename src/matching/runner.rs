//! Match run orchestration
//!
//! One run = one request: read the three sources concurrently, walk the
//! roster once, persist a fresh snapshot generation plus the audited
//! history subset, then fan change records out into per-specialist
//! notifications. There is no cross-run lock; concurrent runs for the same
//! term each insert their own generation and the most-recent-by-timestamp
//! convention picks the winner for future reads.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::metrics;
use crate::models::{
    AssignmentSnapshot, EspecialistaAnterior, HistoryRecord, Term, TransitionKind,
};
use crate::notifications::generator;
use crate::storage::repository::{
    AvailabilityRepository, HistoryRepository, NotificationRepository, RosterRepository,
    SnapshotRepository,
};

use super::availability::AvailabilityIndex;
use super::engine::MatchEngine;
use super::error::{MatchError, MatchResult};
use super::prior::PriorAssignmentIndex;
use super::transition::classify;

/// Which transition kinds get a persisted history record.
///
/// The production default audits REASIGNADO only. The notification rules
/// clearly expect richer history, so the filter is a policy value rather
/// than a hard-wired constant; operators can widen it from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditPolicy {
    audited: Vec<TransitionKind>,
}

impl AuditPolicy {
    pub fn new(audited: Vec<TransitionKind>) -> Self {
        Self { audited }
    }

    /// The historical default: audit reassignments only
    pub fn reasignado_only() -> Self {
        Self::new(vec![TransitionKind::Reasignado])
    }

    /// Audit every kind that notifies a specialist
    pub fn all_active() -> Self {
        Self::new(vec![
            TransitionKind::AsignacionNueva,
            TransitionKind::Reasignado,
            TransitionKind::Desasignado,
        ])
    }

    pub fn audits(&self, kind: TransitionKind) -> bool {
        self.audited.contains(&kind)
    }

    pub fn kinds(&self) -> &[TransitionKind] {
        &self.audited
    }
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self::reasignado_only()
    }
}

/// Result of one match run, returned to the trigger caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRunSummary {
    pub message: String,
    pub total_procesados: usize,
    pub matches: usize,
    pub sin_match: usize,
}

/// Orchestrates one match run end to end over the repository seams
pub struct MatchRunner {
    roster: Arc<dyn RosterRepository>,
    pool: Arc<dyn AvailabilityRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    history: Arc<dyn HistoryRepository>,
    notifications: Arc<dyn NotificationRepository>,
    policy: AuditPolicy,
}

impl MatchRunner {
    pub fn new(
        roster: Arc<dyn RosterRepository>,
        pool: Arc<dyn AvailabilityRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        history: Arc<dyn HistoryRepository>,
        notifications: Arc<dyn NotificationRepository>,
        policy: AuditPolicy,
    ) -> Self {
        Self {
            roster,
            pool,
            snapshots,
            history,
            notifications,
            policy,
        }
    }

    /// Execute the match for one term.
    ///
    /// Fails without touching any collection when the term has no roster.
    /// The snapshot and history inserts are issued concurrently and are
    /// not transactional: a failure in one does not undo the other.
    pub async fn run(&self, periodo: &Term) -> MatchResult<MatchRunSummary> {
        tracing::info!(periodo = %periodo, "starting match run");

        let (roster, pool, priors) = futures::try_join!(
            async {
                self.roster
                    .fetch_roster(periodo)
                    .await
                    .map_err(|e| MatchError::SourceRead {
                        source: "roster".into(),
                        reason: e.to_string(),
                    })
            },
            async {
                self.pool
                    .fetch_pool()
                    .await
                    .map_err(|e| MatchError::SourceRead {
                        source: "availability pool".into(),
                        reason: e.to_string(),
                    })
            },
            async {
                self.snapshots
                    .fetch_for_term_desc(periodo)
                    .await
                    .map_err(|e| MatchError::SourceRead {
                        source: "prior snapshots".into(),
                        reason: e.to_string(),
                    })
            },
        )?;

        if roster.is_empty() {
            return Err(MatchError::EmptyRoster {
                periodo: periodo.to_string(),
            });
        }

        let availability = AvailabilityIndex::build(&pool);
        let prior_index = PriorAssignmentIndex::build(&priors);
        let engine = MatchEngine::new(&availability, &prior_index);

        tracing::debug!(
            docentes = roster.len(),
            especialistas = availability.pool_size(),
            claves = availability.len(),
            estados_previos = prior_index.len(),
            "indexes built"
        );

        // One execution timestamp groups every record this run produces
        let ejecutado_en = Utc::now();

        let mut snapshots = Vec::with_capacity(roster.len());
        let mut cambios = Vec::with_capacity(roster.len());
        let mut auditados = Vec::new();
        let mut persistidos: HashSet<Uuid> = HashSet::new();
        let mut matches = 0usize;

        for teacher in &roster {
            let outcome = engine.decide(teacher);
            let prior = prior_index.get(&teacher.docente_id);
            let kind = classify(
                prior,
                outcome.especialista.as_ref().map(|e| e.dni.as_str()),
            );

            if outcome.especialista.is_some() {
                matches += 1;
            }
            metrics::record_transition(kind);

            let anterior = prior
                .filter(|p| p.is_assigned())
                .map(|p| EspecialistaAnterior {
                    dni: p.especialista_dni.clone(),
                    nombre: p.nombre_especialista.clone(),
                })
                .unwrap_or_default();

            let snapshot = AssignmentSnapshot {
                periodo: periodo.clone(),
                docente_id: teacher.docente_id.clone(),
                nombre: teacher.nombre.clone(),
                rol: teacher.rol.clone(),
                programa: teacher.programa.clone(),
                modalidad: teacher.modalidad.clone(),
                esa: teacher.esa,
                cursos: outcome.cursos.clone(),
                especialista_dni: outcome.especialista.as_ref().map(|e| e.dni.clone()),
                nombre_especialista: outcome.especialista.as_ref().map(|e| e.nombre.clone()),
                estado_general: outcome.estado_general(),
                ejecutado_en,
            };

            let record = HistoryRecord {
                id: Uuid::new_v4(),
                snapshot: snapshot.clone(),
                tipo_cambio: kind,
                especialista_anterior: anterior,
            };

            if self.policy.audits(kind) {
                persistidos.insert(record.id);
                auditados.push(record.clone());
            }

            snapshots.push(snapshot);
            cambios.push(record);
        }

        // Best-effort batch writes: both inserts fly together, neither is
        // rolled back when the other fails.
        let snap_fut = async {
            self.snapshots
                .insert_batch(&snapshots)
                .await
                .map_err(|e| MatchError::BatchInsert {
                    collection: "asignaciones".into(),
                    reason: e.to_string(),
                })
        };
        let hist_fut = async {
            if auditados.is_empty() {
                Ok(0)
            } else {
                self.history
                    .insert_batch(&auditados)
                    .await
                    .map_err(|e| MatchError::BatchInsert {
                        collection: "historial".into(),
                        reason: e.to_string(),
                    })
            }
        };
        let (snap_res, hist_res) = futures::join!(snap_fut, hist_fut);
        let inserted_snapshots = snap_res?;
        let inserted_history = hist_res?;

        let notificaciones = generator::generate(&cambios, &persistidos, ejecutado_en);
        let inserted_notifications = if notificaciones.is_empty() {
            0
        } else {
            self.notifications
                .insert_batch(&notificaciones)
                .await
                .map_err(|e| MatchError::BatchInsert {
                    collection: "notificaciones".into(),
                    reason: e.to_string(),
                })?
        };

        let sin_match = roster.len() - matches;
        metrics::record_run(roster.len(), matches, sin_match);

        tracing::info!(
            periodo = %periodo,
            procesados = roster.len(),
            matches,
            sin_match,
            snapshots = inserted_snapshots,
            historial = inserted_history,
            notificaciones = inserted_notifications,
            "match run finished"
        );

        Ok(MatchRunSummary {
            message: format!("Match ejecutado para el periodo {periodo}"),
            total_procesados: roster.len(),
            matches,
            sin_match,
        })
    }
}
