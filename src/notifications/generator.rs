//! Notification fan-out rules

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::metrics;
use crate::models::{
    EspecialistaAnterior, HistoryRecord, Notification, NotificationKind, ReadState,
    TransitionKind,
};

/// Fan one run's change records out into per-specialist notifications.
///
/// `persistidos` holds the ids of the records the history writer actually
/// stored; notifications for those carry the reference, the rest carry
/// none. A notification is only emitted when the target specialist id is
/// non-null: a reassignment with no recorded prior specialist produces no
/// REASIGNACION_PERDIDA.
pub fn generate(
    cambios: &[HistoryRecord],
    persistidos: &HashSet<Uuid>,
    creado_en: DateTime<Utc>,
) -> Vec<Notification> {
    let mut notificaciones = Vec::new();

    for record in cambios {
        match record.tipo_cambio {
            TransitionKind::AsignacionNueva => {
                if let Some(nuevo) = record.snapshot.especialista_dni.as_deref() {
                    notificaciones.push(build(
                        record,
                        persistidos,
                        creado_en,
                        NotificationKind::NuevaAsignacion,
                        nuevo,
                        record.snapshot.nombre_especialista.clone(),
                        record.especialista_anterior.clone(),
                    ));
                }
            }
            TransitionKind::Reasignado => {
                // Two sides, each told about the other in especialistaAnterior
                if let Some(nuevo) = record.snapshot.especialista_dni.as_deref() {
                    notificaciones.push(build(
                        record,
                        persistidos,
                        creado_en,
                        NotificationKind::ReasignacionGanada,
                        nuevo,
                        record.snapshot.nombre_especialista.clone(),
                        record.especialista_anterior.clone(),
                    ));
                }
                if let Some(previo) = record.especialista_anterior.dni.as_deref() {
                    notificaciones.push(build(
                        record,
                        persistidos,
                        creado_en,
                        NotificationKind::ReasignacionPerdida,
                        previo,
                        record.especialista_anterior.nombre.clone(),
                        EspecialistaAnterior {
                            dni: record.snapshot.especialista_dni.clone(),
                            nombre: record.snapshot.nombre_especialista.clone(),
                        },
                    ));
                }
            }
            TransitionKind::Desasignado => {
                if let Some(previo) = record.especialista_anterior.dni.as_deref() {
                    notificaciones.push(build(
                        record,
                        persistidos,
                        creado_en,
                        NotificationKind::Desasignacion,
                        previo,
                        record.especialista_anterior.nombre.clone(),
                        record.especialista_anterior.clone(),
                    ));
                }
            }
            TransitionKind::Mantenido | TransitionKind::PermaneceSinAsignar => {}
        }
    }

    notificaciones
}

fn build(
    record: &HistoryRecord,
    persistidos: &HashSet<Uuid>,
    creado_en: DateTime<Utc>,
    tipo: NotificationKind,
    especialista_dni: &str,
    nombre_especialista: Option<String>,
    especialista_anterior: EspecialistaAnterior,
) -> Notification {
    metrics::record_notification(tipo);
    Notification {
        id: Uuid::new_v4(),
        historial_id: persistidos.contains(&record.id).then_some(record.id),
        especialista_dni: especialista_dni.to_string(),
        nombre_especialista,
        tipo,
        prioridad: tipo.priority(),
        estado: ReadState::NoVista,
        periodo: record.snapshot.periodo.clone(),
        docente_id: record.snapshot.docente_id.clone(),
        nombre_docente: record.snapshot.nombre.clone(),
        tipo_cambio: record.tipo_cambio,
        especialista_anterior,
        creado_en,
        visto_en: None,
        leido_en: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentSnapshot, AssignmentStatus, NotificationPriority};

    fn record(
        kind: TransitionKind,
        nuevo: Option<&str>,
        previo: Option<&str>,
    ) -> HistoryRecord {
        HistoryRecord {
            id: Uuid::new_v4(),
            snapshot: AssignmentSnapshot {
                periodo: "2025-1".parse().unwrap(),
                docente_id: "D1".into(),
                nombre: "Juan Quispe".into(),
                rol: None,
                programa: None,
                modalidad: None,
                esa: None,
                cursos: vec![],
                especialista_dni: nuevo.map(String::from),
                nombre_especialista: nuevo.map(|d| format!("Nombre {d}")),
                estado_general: if nuevo.is_some() {
                    AssignmentStatus::Planificado
                } else {
                    AssignmentStatus::SinAsignar
                },
                ejecutado_en: Utc::now(),
            },
            tipo_cambio: kind,
            especialista_anterior: EspecialistaAnterior {
                dni: previo.map(String::from),
                nombre: previo.map(|d| format!("Nombre {d}")),
            },
        }
    }

    #[test]
    fn test_new_assignment_notifies_new_specialist() {
        let cambios = vec![record(TransitionKind::AsignacionNueva, Some("E1"), None)];
        let out = generate(&cambios, &HashSet::new(), Utc::now());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tipo, NotificationKind::NuevaAsignacion);
        assert_eq!(out[0].prioridad, NotificationPriority::Alta);
        assert_eq!(out[0].especialista_dni, "E1");
        assert_eq!(out[0].estado, ReadState::NoVista);
        assert!(out[0].historial_id.is_none());
    }

    #[test]
    fn test_reassignment_notifies_both_sides_swapped() {
        let cambios = vec![record(TransitionKind::Reasignado, Some("E2"), Some("E1"))];
        let out = generate(&cambios, &HashSet::new(), Utc::now());

        assert_eq!(out.len(), 2);

        let ganada = out
            .iter()
            .find(|n| n.tipo == NotificationKind::ReasignacionGanada)
            .unwrap();
        assert_eq!(ganada.especialista_dni, "E2");
        assert_eq!(ganada.especialista_anterior.dni.as_deref(), Some("E1"));
        assert_eq!(ganada.prioridad, NotificationPriority::Alta);

        let perdida = out
            .iter()
            .find(|n| n.tipo == NotificationKind::ReasignacionPerdida)
            .unwrap();
        assert_eq!(perdida.especialista_dni, "E1");
        assert_eq!(perdida.especialista_anterior.dni.as_deref(), Some("E2"));
        assert_eq!(perdida.prioridad, NotificationPriority::Media);
    }

    #[test]
    fn test_reassignment_without_prior_id_emits_one() {
        let cambios = vec![record(TransitionKind::Reasignado, Some("E2"), None)];
        let out = generate(&cambios, &HashSet::new(), Utc::now());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tipo, NotificationKind::ReasignacionGanada);
    }

    #[test]
    fn test_unassignment_notifies_prior_specialist() {
        let cambios = vec![record(TransitionKind::Desasignado, None, Some("E1"))];
        let out = generate(&cambios, &HashSet::new(), Utc::now());

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tipo, NotificationKind::Desasignacion);
        assert_eq!(out[0].especialista_dni, "E1");
        assert_eq!(out[0].prioridad, NotificationPriority::Alta);
    }

    #[test]
    fn test_quiet_kinds_emit_nothing() {
        let cambios = vec![
            record(TransitionKind::Mantenido, Some("E1"), Some("E1")),
            record(TransitionKind::PermaneceSinAsignar, None, None),
        ];
        let out = generate(&cambios, &HashSet::new(), Utc::now());
        assert!(out.is_empty());
    }

    #[test]
    fn test_history_reference_set_only_when_persisted() {
        let cambios = vec![record(TransitionKind::Reasignado, Some("E2"), Some("E1"))];
        let persistidos: HashSet<Uuid> = cambios.iter().map(|c| c.id).collect();
        let out = generate(&cambios, &persistidos, Utc::now());

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|n| n.historial_id == Some(cambios[0].id)));
    }

    #[test]
    fn test_shared_creation_timestamp() {
        let now = Utc::now();
        let cambios = vec![
            record(TransitionKind::AsignacionNueva, Some("E1"), None),
            record(TransitionKind::Desasignado, None, Some("E2")),
        ];
        let out = generate(&cambios, &HashSet::new(), now);
        assert!(out.iter().all(|n| n.creado_en == now));
    }
}
