//! Repository traits over the five collections
//!
//! Business logic talks to storage through these traits so the match
//! runner and the API handlers can be exercised against in-memory mock
//! implementations, while production wires the PostgreSQL ones.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          MatchRunner / API handlers                 │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │  RosterRepository, AvailabilityRepository,          │
//! │  SnapshotRepository, HistoryRepository,             │
//! │  NotificationRepository                             │
//! └─────────────────────────────────────────────────────┘
//!              │                        │
//!              ▼                        ▼
//!      ┌──────────────┐        ┌──────────────┐
//!      │  PostgreSQL  │        │     Mock     │
//!      │     impl     │        │     impl     │
//!      └──────────────┘        └──────────────┘
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deadpool_postgres::Pool;
use serde_json::Value as JsonValue;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

use crate::models::{
    AssignmentSnapshot, AssignmentStatus, HistoryRecord, Notification, NotificationKind,
    ReadState, SpecialistAvailability, TeacherTermRecord, Term,
};

// ============================================================================
// Filters
// ============================================================================

/// Filter for snapshot reads
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilter {
    pub periodo: Option<Term>,
    pub docente_id: Option<String>,
    pub especialista_dni: Option<String>,
    pub estado: Option<AssignmentStatus>,
    /// Restrict to the most recent execution of each term
    pub solo_ultima: bool,
}

/// Filter for notification reads
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub especialista_dni: Option<String>,
    pub estado: Option<ReadState>,
    pub tipo: Option<NotificationKind>,
}

// ============================================================================
// Repository traits
// ============================================================================

/// Teacher-term roster, written by the bulk load and read by the runner
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// All roster records for the term, in load order
    async fn fetch_roster(&self, periodo: &Term) -> Result<Vec<TeacherTermRecord>>;

    /// Replace the term's roster with a new load
    async fn replace_roster(
        &self,
        periodo: &Term,
        records: &[TeacherTermRecord],
    ) -> Result<usize>;
}

/// Specialist availability pool. The whole pool is loaded per run; record
/// order is load order and feeds the index tie-break.
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn fetch_pool(&self) -> Result<Vec<SpecialistAvailability>>;

    async fn replace_pool(&self, records: &[SpecialistAvailability]) -> Result<usize>;
}

/// Assignment snapshots: append-only generations
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// All snapshots for the term, most recent execution first
    async fn fetch_for_term_desc(&self, periodo: &Term) -> Result<Vec<AssignmentSnapshot>>;

    /// Insert one run's generation. Not transactional: rows land one by
    /// one and a duplicate-key violation aborts the remainder.
    async fn insert_batch(&self, snapshots: &[AssignmentSnapshot]) -> Result<usize>;

    async fn query(&self, filter: &SnapshotFilter) -> Result<Vec<AssignmentSnapshot>>;
}

/// Audit history, append-only
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn insert_batch(&self, records: &[HistoryRecord]) -> Result<usize>;

    /// Records where the given specialist was the assigned side
    async fn fetch_by_specialist(&self, dni: &str) -> Result<Vec<HistoryRecord>>;
}

/// Notifications: inserted by the generator, mutated only through
/// read-state transitions
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_batch(&self, items: &[Notification]) -> Result<usize>;

    async fn query(&self, filter: &NotificationFilter) -> Result<Vec<Notification>>;

    /// NO_VISTA -> VISTA; returns false when the notification was not in
    /// the unseen state
    async fn mark_seen(&self, id: Uuid) -> Result<bool>;

    /// -> LEIDA (stamping visto_en when it was never seen)
    async fn mark_read(&self, id: Uuid) -> Result<bool>;

    /// Mark every unread notification of a specialist read
    async fn mark_all_read(&self, especialista_dni: &str) -> Result<u64>;

    /// Archive notifications older than the given number of days
    async fn archive_older_than(&self, days: i64) -> Result<u64>;
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

pub struct PgRosterRepository {
    pool: Pool,
}

impl PgRosterRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterRepository for PgRosterRepository {
    async fn fetch_roster(&self, periodo: &Term) -> Result<Vec<TeacherTermRecord>> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let rows = client
            .query(
                "SELECT datos FROM docentes_periodo WHERE periodo = $1 ORDER BY orden",
                &[&periodo.as_str()],
            )
            .await
            .context("roster query failed")?;

        rows.into_iter()
            .map(|row| {
                let datos: JsonValue = row.get(0);
                serde_json::from_value(datos).context("malformed roster document")
            })
            .collect()
    }

    async fn replace_roster(
        &self,
        periodo: &Term,
        records: &[TeacherTermRecord],
    ) -> Result<usize> {
        let mut client = self.pool.get().await.context("pool checkout failed")?;
        let tx = client.transaction().await?;
        tx.execute(
            "DELETE FROM docentes_periodo WHERE periodo = $1",
            &[&periodo.as_str()],
        )
        .await?;

        let stmt = tx
            .prepare(
                "INSERT INTO docentes_periodo (periodo, docente_id, datos, cargado_en)
                 VALUES ($1, $2, $3, $4)",
            )
            .await?;
        let cargado_en = Utc::now();
        for record in records {
            tx.execute(
                &stmt,
                &[
                    &periodo.as_str(),
                    &record.docente_id,
                    &serde_json::to_value(record)?,
                    &cargado_en,
                ],
            )
            .await
            .with_context(|| format!("roster insert failed for {}", record.docente_id))?;
        }
        tx.commit().await?;

        Ok(records.len())
    }
}

pub struct PgAvailabilityRepository {
    pool: Pool,
}

impl PgAvailabilityRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvailabilityRepository for PgAvailabilityRepository {
    async fn fetch_pool(&self) -> Result<Vec<SpecialistAvailability>> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let rows = client
            .query(
                "SELECT datos FROM disponibilidad_especialistas ORDER BY orden",
                &[],
            )
            .await
            .context("availability query failed")?;

        rows.into_iter()
            .map(|row| {
                let datos: JsonValue = row.get(0);
                serde_json::from_value(datos).context("malformed availability document")
            })
            .collect()
    }

    async fn replace_pool(&self, records: &[SpecialistAvailability]) -> Result<usize> {
        let mut client = self.pool.get().await.context("pool checkout failed")?;
        let tx = client.transaction().await?;
        tx.execute("DELETE FROM disponibilidad_especialistas", &[])
            .await?;

        let stmt = tx
            .prepare(
                "INSERT INTO disponibilidad_especialistas (dni, datos, cargado_en)
                 VALUES ($1, $2, $3)",
            )
            .await?;
        let cargado_en = Utc::now();
        for record in records {
            tx.execute(
                &stmt,
                &[&record.dni, &serde_json::to_value(record)?, &cargado_en],
            )
            .await
            .with_context(|| format!("availability insert failed for {}", record.dni))?;
        }
        tx.commit().await?;

        Ok(records.len())
    }
}

pub struct PgSnapshotRepository {
    pool: Pool,
}

impl PgSnapshotRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn fetch_for_term_desc(&self, periodo: &Term) -> Result<Vec<AssignmentSnapshot>> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let rows = client
            .query(
                "SELECT datos FROM asignaciones WHERE periodo = $1 ORDER BY ejecutado_en DESC",
                &[&periodo.as_str()],
            )
            .await
            .context("snapshot query failed")?;

        rows.into_iter()
            .map(|row| {
                let datos: JsonValue = row.get(0);
                serde_json::from_value(datos).context("malformed snapshot document")
            })
            .collect()
    }

    async fn insert_batch(&self, snapshots: &[AssignmentSnapshot]) -> Result<usize> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let stmt = client
            .prepare(
                "INSERT INTO asignaciones
                     (periodo, docente_id, especialista_dni, estado_general, ejecutado_en, datos)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .await?;

        let mut inserted = 0usize;
        for snapshot in snapshots {
            client
                .execute(
                    &stmt,
                    &[
                        &snapshot.periodo.as_str(),
                        &snapshot.docente_id,
                        &snapshot.especialista_dni,
                        &snapshot.estado_general.as_str(),
                        &snapshot.ejecutado_en,
                        &serde_json::to_value(snapshot)?,
                    ],
                )
                .await
                .with_context(|| {
                    format!(
                        "snapshot insert failed for docente {} after {inserted} rows",
                        snapshot.docente_id
                    )
                })?;
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn query(&self, filter: &SnapshotFilter) -> Result<Vec<AssignmentSnapshot>> {
        let client = self.pool.get().await.context("pool checkout failed")?;

        let periodo = filter.periodo.as_ref().map(|t| t.as_str().to_string());
        let estado = filter.estado.map(|s| s.as_str().to_string());

        let mut sql = String::from("SELECT datos FROM asignaciones a WHERE true");
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(p) = periodo.as_ref() {
            params.push(p);
            sql.push_str(&format!(" AND a.periodo = ${}", params.len()));
        }
        if let Some(d) = filter.docente_id.as_ref() {
            params.push(d);
            sql.push_str(&format!(" AND a.docente_id = ${}", params.len()));
        }
        if let Some(e) = filter.especialista_dni.as_ref() {
            params.push(e);
            sql.push_str(&format!(" AND a.especialista_dni = ${}", params.len()));
        }
        if let Some(s) = estado.as_ref() {
            params.push(s);
            sql.push_str(&format!(" AND a.estado_general = ${}", params.len()));
        }
        if filter.solo_ultima {
            sql.push_str(
                " AND a.ejecutado_en = (SELECT MAX(b.ejecutado_en)
                                        FROM asignaciones b WHERE b.periodo = a.periodo)",
            );
        }
        sql.push_str(" ORDER BY a.ejecutado_en DESC, a.docente_id");

        let rows = client
            .query(&sql, &params)
            .await
            .context("snapshot filter query failed")?;

        rows.into_iter()
            .map(|row| {
                let datos: JsonValue = row.get(0);
                serde_json::from_value(datos).context("malformed snapshot document")
            })
            .collect()
    }
}

pub struct PgHistoryRepository {
    pool: Pool,
}

impl PgHistoryRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn insert_batch(&self, records: &[HistoryRecord]) -> Result<usize> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let stmt = client
            .prepare(
                "INSERT INTO historial
                     (id, periodo, docente_id, especialista_dni, tipo_cambio, ejecutado_en, datos)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .await?;

        let mut inserted = 0usize;
        for record in records {
            client
                .execute(
                    &stmt,
                    &[
                        &record.id,
                        &record.snapshot.periodo.as_str(),
                        &record.snapshot.docente_id,
                        &record.snapshot.especialista_dni,
                        &record.tipo_cambio.as_str(),
                        &record.snapshot.ejecutado_en,
                        &serde_json::to_value(record)?,
                    ],
                )
                .await
                .with_context(|| {
                    format!(
                        "history insert failed for docente {} after {inserted} rows",
                        record.snapshot.docente_id
                    )
                })?;
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn fetch_by_specialist(&self, dni: &str) -> Result<Vec<HistoryRecord>> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let rows = client
            .query(
                "SELECT datos FROM historial
                 WHERE especialista_dni = $1 ORDER BY ejecutado_en DESC",
                &[&dni],
            )
            .await
            .context("history query failed")?;

        rows.into_iter()
            .map(|row| {
                let datos: JsonValue = row.get(0);
                serde_json::from_value(datos).context("malformed history document")
            })
            .collect()
    }
}

pub struct PgNotificationRepository {
    pool: Pool,
}

impl PgNotificationRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn from_row(row: tokio_postgres::Row) -> Result<Notification> {
        let datos: JsonValue = row.get(0);
        let estado: String = row.get(1);
        let visto_en: Option<DateTime<Utc>> = row.get(2);
        let leido_en: Option<DateTime<Utc>> = row.get(3);

        let mut notification: Notification =
            serde_json::from_value(datos).context("malformed notification document")?;
        // Read-state columns are authoritative; the JSONB payload keeps
        // the state it was created with.
        notification.estado = estado
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        notification.visto_en = visto_en;
        notification.leido_en = leido_en;
        Ok(notification)
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert_batch(&self, items: &[Notification]) -> Result<usize> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let stmt = client
            .prepare(
                "INSERT INTO notificaciones
                     (id, especialista_dni, tipo, prioridad, estado, creado_en, visto_en, leido_en, datos)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .await?;

        let mut inserted = 0usize;
        for item in items {
            client
                .execute(
                    &stmt,
                    &[
                        &item.id,
                        &item.especialista_dni,
                        &item.tipo.as_str(),
                        &item.prioridad.as_str(),
                        &item.estado.as_str(),
                        &item.creado_en,
                        &item.visto_en,
                        &item.leido_en,
                        &serde_json::to_value(item)?,
                    ],
                )
                .await
                .with_context(|| {
                    format!("notification insert failed after {inserted} rows")
                })?;
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn query(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let client = self.pool.get().await.context("pool checkout failed")?;

        let estado = filter.estado.map(|s| s.as_str().to_string());
        let tipo = filter.tipo.map(|t| t.as_str().to_string());

        let mut sql = String::from(
            "SELECT datos, estado, visto_en, leido_en FROM notificaciones WHERE true",
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(e) = filter.especialista_dni.as_ref() {
            params.push(e);
            sql.push_str(&format!(" AND especialista_dni = ${}", params.len()));
        }
        if let Some(s) = estado.as_ref() {
            params.push(s);
            sql.push_str(&format!(" AND estado = ${}", params.len()));
        }
        if let Some(t) = tipo.as_ref() {
            params.push(t);
            sql.push_str(&format!(" AND tipo = ${}", params.len()));
        }
        sql.push_str(" ORDER BY creado_en DESC");

        let rows = client
            .query(&sql, &params)
            .await
            .context("notification filter query failed")?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn mark_seen(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let updated = client
            .execute(
                "UPDATE notificaciones SET estado = 'VISTA', visto_en = NOW()
                 WHERE id = $1 AND estado = 'NO_VISTA'",
                &[&id],
            )
            .await
            .context("mark_seen failed")?;
        Ok(updated > 0)
    }

    async fn mark_read(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let updated = client
            .execute(
                "UPDATE notificaciones
                 SET estado = 'LEIDA', leido_en = NOW(), visto_en = COALESCE(visto_en, NOW())
                 WHERE id = $1 AND estado IN ('NO_VISTA', 'VISTA')",
                &[&id],
            )
            .await
            .context("mark_read failed")?;
        Ok(updated > 0)
    }

    async fn mark_all_read(&self, especialista_dni: &str) -> Result<u64> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let updated = client
            .execute(
                "UPDATE notificaciones
                 SET estado = 'LEIDA', leido_en = NOW(), visto_en = COALESCE(visto_en, NOW())
                 WHERE especialista_dni = $1 AND estado IN ('NO_VISTA', 'VISTA')",
                &[&especialista_dni],
            )
            .await
            .context("mark_all_read failed")?;
        Ok(updated)
    }

    async fn archive_older_than(&self, days: i64) -> Result<u64> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        let cutoff = Utc::now() - Duration::days(days);
        let updated = client
            .execute(
                "UPDATE notificaciones SET estado = 'ARCHIVADA'
                 WHERE creado_en < $1 AND estado <> 'ARCHIVADA'",
                &[&cutoff],
            )
            .await
            .context("archive_older_than failed")?;
        Ok(updated)
    }
}

// ============================================================================
// Mock implementations (in-memory, for tests)
// ============================================================================

/// In-memory roster keyed by term
#[derive(Default)]
pub struct MockRosterRepository {
    rosters: RwLock<HashMap<String, Vec<TeacherTermRecord>>>,
}

impl MockRosterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RosterRepository for MockRosterRepository {
    async fn fetch_roster(&self, periodo: &Term) -> Result<Vec<TeacherTermRecord>> {
        let rosters = self.rosters.read().unwrap();
        Ok(rosters.get(periodo.as_str()).cloned().unwrap_or_default())
    }

    async fn replace_roster(
        &self,
        periodo: &Term,
        records: &[TeacherTermRecord],
    ) -> Result<usize> {
        let mut rosters = self.rosters.write().unwrap();
        rosters.insert(periodo.as_str().to_string(), records.to_vec());
        Ok(records.len())
    }
}

/// In-memory availability pool preserving load order
#[derive(Default)]
pub struct MockAvailabilityRepository {
    pool: RwLock<Vec<SpecialistAvailability>>,
}

impl MockAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityRepository for MockAvailabilityRepository {
    async fn fetch_pool(&self) -> Result<Vec<SpecialistAvailability>> {
        Ok(self.pool.read().unwrap().clone())
    }

    async fn replace_pool(&self, records: &[SpecialistAvailability]) -> Result<usize> {
        let mut pool = self.pool.write().unwrap();
        *pool = records.to_vec();
        Ok(records.len())
    }
}

/// In-memory snapshot store enforcing the generation uniqueness invariant
#[derive(Default)]
pub struct MockSnapshotRepository {
    rows: RwLock<Vec<AssignmentSnapshot>>,
}

impl MockSnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored snapshot, in insertion order
    pub fn all(&self) -> Vec<AssignmentSnapshot> {
        self.rows.read().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotRepository for MockSnapshotRepository {
    async fn fetch_for_term_desc(&self, periodo: &Term) -> Result<Vec<AssignmentSnapshot>> {
        let rows = self.rows.read().unwrap();
        let mut result: Vec<AssignmentSnapshot> = rows
            .iter()
            .filter(|s| s.periodo == *periodo)
            .cloned()
            .collect();
        // Stable sort keeps insertion order within one execution timestamp
        result.sort_by(|a, b| b.ejecutado_en.cmp(&a.ejecutado_en));
        Ok(result)
    }

    async fn insert_batch(&self, snapshots: &[AssignmentSnapshot]) -> Result<usize> {
        let mut rows = self.rows.write().unwrap();
        for snapshot in snapshots {
            let duplicate = rows.iter().any(|s| {
                s.docente_id == snapshot.docente_id
                    && s.especialista_dni == snapshot.especialista_dni
                    && s.periodo == snapshot.periodo
                    && s.ejecutado_en == snapshot.ejecutado_en
            });
            if duplicate {
                bail!(
                    "duplicate snapshot generation for docente {}",
                    snapshot.docente_id
                );
            }
            rows.push(snapshot.clone());
        }
        Ok(snapshots.len())
    }

    async fn query(&self, filter: &SnapshotFilter) -> Result<Vec<AssignmentSnapshot>> {
        let rows = self.rows.read().unwrap();

        let mut latest_per_term: HashMap<String, DateTime<Utc>> = HashMap::new();
        if filter.solo_ultima {
            for s in rows.iter() {
                latest_per_term
                    .entry(s.periodo.as_str().to_string())
                    .and_modify(|t| {
                        if s.ejecutado_en > *t {
                            *t = s.ejecutado_en;
                        }
                    })
                    .or_insert(s.ejecutado_en);
            }
        }

        let mut result: Vec<AssignmentSnapshot> = rows
            .iter()
            .filter(|s| {
                filter.periodo.as_ref().map_or(true, |p| s.periodo == *p)
                    && filter
                        .docente_id
                        .as_ref()
                        .map_or(true, |d| s.docente_id == *d)
                    && filter
                        .especialista_dni
                        .as_ref()
                        .map_or(true, |e| s.especialista_dni.as_ref() == Some(e))
                    && filter.estado.map_or(true, |st| s.estado_general == st)
                    && (!filter.solo_ultima
                        || latest_per_term.get(s.periodo.as_str()) == Some(&s.ejecutado_en))
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.ejecutado_en.cmp(&a.ejecutado_en));
        Ok(result)
    }
}

/// In-memory history store
#[derive(Default)]
pub struct MockHistoryRepository {
    rows: RwLock<Vec<HistoryRecord>>,
}

impl MockHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<HistoryRecord> {
        self.rows.read().unwrap().clone()
    }
}

#[async_trait]
impl HistoryRepository for MockHistoryRepository {
    async fn insert_batch(&self, records: &[HistoryRecord]) -> Result<usize> {
        let mut rows = self.rows.write().unwrap();
        rows.extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn fetch_by_specialist(&self, dni: &str) -> Result<Vec<HistoryRecord>> {
        let rows = self.rows.read().unwrap();
        let mut result: Vec<HistoryRecord> = rows
            .iter()
            .filter(|r| r.snapshot.especialista_dni.as_deref() == Some(dni))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.snapshot.ejecutado_en.cmp(&a.snapshot.ejecutado_en));
        Ok(result)
    }
}

/// In-memory notification store with read-state transitions
#[derive(Default)]
pub struct MockNotificationRepository {
    rows: RwLock<Vec<Notification>>,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.rows.read().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn insert_batch(&self, items: &[Notification]) -> Result<usize> {
        let mut rows = self.rows.write().unwrap();
        rows.extend(items.iter().cloned());
        Ok(items.len())
    }

    async fn query(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let rows = self.rows.read().unwrap();
        let mut result: Vec<Notification> = rows
            .iter()
            .filter(|n| {
                filter
                    .especialista_dni
                    .as_ref()
                    .map_or(true, |e| n.especialista_dni == *e)
                    && filter.estado.map_or(true, |s| n.estado == s)
                    && filter.tipo.map_or(true, |t| n.tipo == t)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.creado_en.cmp(&a.creado_en));
        Ok(result)
    }

    async fn mark_seen(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.write().unwrap();
        for n in rows.iter_mut() {
            if n.id == id && n.estado == ReadState::NoVista {
                n.estado = ReadState::Vista;
                n.visto_en = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_read(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.write().unwrap();
        for n in rows.iter_mut() {
            if n.id == id && matches!(n.estado, ReadState::NoVista | ReadState::Vista) {
                n.estado = ReadState::Leida;
                n.leido_en = Some(Utc::now());
                n.visto_en.get_or_insert_with(Utc::now);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_all_read(&self, especialista_dni: &str) -> Result<u64> {
        let mut rows = self.rows.write().unwrap();
        let mut updated = 0u64;
        for n in rows.iter_mut() {
            if n.especialista_dni == especialista_dni
                && matches!(n.estado, ReadState::NoVista | ReadState::Vista)
            {
                n.estado = ReadState::Leida;
                n.leido_en = Some(Utc::now());
                n.visto_en.get_or_insert_with(Utc::now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn archive_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut rows = self.rows.write().unwrap();
        let mut updated = 0u64;
        for n in rows.iter_mut() {
            if n.creado_en < cutoff && n.estado != ReadState::Archivada {
                n.estado = ReadState::Archivada;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EspecialistaAnterior, NotificationPriority, TransitionKind};

    fn snapshot(docente: &str, dni: Option<&str>, minutes_ago: i64) -> AssignmentSnapshot {
        AssignmentSnapshot {
            periodo: "2025-1".parse().unwrap(),
            docente_id: docente.to_string(),
            nombre: format!("Docente {docente}"),
            rol: None,
            programa: None,
            modalidad: None,
            esa: None,
            cursos: vec![],
            especialista_dni: dni.map(String::from),
            nombre_especialista: dni.map(|d| format!("Especialista {d}")),
            estado_general: if dni.is_some() {
                AssignmentStatus::Planificado
            } else {
                AssignmentStatus::SinAsignar
            },
            ejecutado_en: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn notification(dni: &str, minutes_ago: i64) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            historial_id: None,
            especialista_dni: dni.to_string(),
            nombre_especialista: None,
            tipo: NotificationKind::NuevaAsignacion,
            prioridad: NotificationPriority::Alta,
            estado: ReadState::NoVista,
            periodo: "2025-1".parse().unwrap(),
            docente_id: "D1".into(),
            nombre_docente: "Juan Quispe".into(),
            tipo_cambio: TransitionKind::AsignacionNueva,
            especialista_anterior: EspecialistaAnterior::default(),
            creado_en: Utc::now() - Duration::minutes(minutes_ago),
            visto_en: None,
            leido_en: None,
        }
    }

    #[tokio::test]
    async fn test_mock_snapshot_rejects_duplicate_generation() {
        let repo = MockSnapshotRepository::new();
        let snap = snapshot("D1", Some("E1"), 0);

        repo.insert_batch(std::slice::from_ref(&snap)).await.unwrap();
        let err = repo.insert_batch(&[snap]).await.unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[tokio::test]
    async fn test_mock_snapshot_desc_order() {
        let repo = MockSnapshotRepository::new();
        repo.insert_batch(&[snapshot("D1", Some("E1"), 60)])
            .await
            .unwrap();
        repo.insert_batch(&[snapshot("D1", Some("E2"), 0)])
            .await
            .unwrap();

        let periodo: Term = "2025-1".parse().unwrap();
        let rows = repo.fetch_for_term_desc(&periodo).await.unwrap();
        assert_eq!(rows[0].especialista_dni.as_deref(), Some("E2"));
        assert_eq!(rows[1].especialista_dni.as_deref(), Some("E1"));
    }

    #[tokio::test]
    async fn test_mock_snapshot_latest_only_filter() {
        let repo = MockSnapshotRepository::new();
        repo.insert_batch(&[snapshot("D1", Some("E1"), 60), snapshot("D2", None, 60)])
            .await
            .unwrap();
        repo.insert_batch(&[snapshot("D1", Some("E2"), 0)])
            .await
            .unwrap();

        let filter = SnapshotFilter {
            periodo: Some("2025-1".parse().unwrap()),
            solo_ultima: true,
            ..Default::default()
        };
        let rows = repo.query(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].especialista_dni.as_deref(), Some("E2"));
    }

    #[tokio::test]
    async fn test_mock_notification_read_state_flow() {
        let repo = MockNotificationRepository::new();
        let n = notification("E1", 0);
        let id = n.id;
        repo.insert_batch(&[n]).await.unwrap();

        assert!(repo.mark_seen(id).await.unwrap());
        // Already seen: a second mark_seen is a no-op
        assert!(!repo.mark_seen(id).await.unwrap());
        assert!(repo.mark_read(id).await.unwrap());
        assert!(!repo.mark_read(id).await.unwrap());

        let all = repo.all();
        assert_eq!(all[0].estado, ReadState::Leida);
        assert!(all[0].visto_en.is_some());
        assert!(all[0].leido_en.is_some());
    }

    #[tokio::test]
    async fn test_mock_notification_bulk_read_and_archive() {
        let repo = MockNotificationRepository::new();
        repo.insert_batch(&[
            notification("E1", 0),
            notification("E1", 0),
            notification("E2", 0),
        ])
        .await
        .unwrap();

        assert_eq!(repo.mark_all_read("E1").await.unwrap(), 2);

        // Nothing is old enough to archive yet
        assert_eq!(repo.archive_older_than(30).await.unwrap(), 0);

        repo.insert_batch(&[notification("E3", 60 * 24 * 45)])
            .await
            .unwrap();
        assert_eq!(repo.archive_older_than(30).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mock_roster_replace_and_order() {
        let repo = MockRosterRepository::new();
        let periodo: Term = "2025-1".parse().unwrap();

        let make = |id: &str| TeacherTermRecord {
            periodo: periodo.clone(),
            docente_id: id.to_string(),
            nombre: format!("Docente {id}"),
            rol: None,
            programa: None,
            modalidad: None,
            esa: None,
            cursos: vec![],
        };

        repo.replace_roster(&periodo, &[make("D2"), make("D1")])
            .await
            .unwrap();
        let roster = repo.fetch_roster(&periodo).await.unwrap();
        assert_eq!(roster[0].docente_id, "D2");

        repo.replace_roster(&periodo, &[make("D3")]).await.unwrap();
        let roster = repo.fetch_roster(&periodo).await.unwrap();
        assert_eq!(roster.len(), 1);
    }
}
