//! Database operations for PostgreSQL
//!
//! The backend stores document-shaped records (courses, availability
//! tuples, enriched snapshots) as JSONB payloads next to the handful of
//! columns the filters need. Connection pooling goes through deadpool.

pub mod repository;

use anyhow::{Context, Result};
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;

/// Schema DDL, idempotent so `init-db` can run on every deploy.
///
/// `uniq_asignacion_generacion` enforces the snapshot uniqueness
/// invariant: one row per (teacher, specialist, term, execution
/// timestamp). A violation surfaces as a bulk-insert failure; the run
/// does not retry.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS docentes_periodo (
    orden BIGSERIAL,
    periodo TEXT NOT NULL,
    docente_id TEXT NOT NULL,
    datos JSONB NOT NULL,
    cargado_en TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_docentes_periodo
    ON docentes_periodo(periodo);

CREATE TABLE IF NOT EXISTS disponibilidad_especialistas (
    orden BIGSERIAL,
    dni TEXT NOT NULL,
    datos JSONB NOT NULL,
    cargado_en TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS asignaciones (
    periodo TEXT NOT NULL,
    docente_id TEXT NOT NULL,
    especialista_dni TEXT,
    estado_general TEXT NOT NULL,
    ejecutado_en TIMESTAMPTZ NOT NULL,
    datos JSONB NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS uniq_asignacion_generacion
    ON asignaciones(docente_id, COALESCE(especialista_dni, ''), periodo, ejecutado_en);

CREATE INDEX IF NOT EXISTS idx_asignaciones_periodo
    ON asignaciones(periodo, ejecutado_en DESC);

CREATE TABLE IF NOT EXISTS historial (
    id UUID PRIMARY KEY,
    periodo TEXT NOT NULL,
    docente_id TEXT NOT NULL,
    especialista_dni TEXT,
    tipo_cambio TEXT NOT NULL,
    ejecutado_en TIMESTAMPTZ NOT NULL,
    datos JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_historial_especialista
    ON historial(especialista_dni);

CREATE TABLE IF NOT EXISTS notificaciones (
    id UUID PRIMARY KEY,
    especialista_dni TEXT NOT NULL,
    tipo TEXT NOT NULL,
    prioridad TEXT NOT NULL,
    estado TEXT NOT NULL,
    creado_en TIMESTAMPTZ NOT NULL,
    visto_en TIMESTAMPTZ,
    leido_en TIMESTAMPTZ,
    datos JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notificaciones_especialista
    ON notificaciones(especialista_dni, estado);
"#;

/// Connection-pool wrapper
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Create the connection pool from configuration. Does not connect
    /// eagerly; the first checkout does.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(config.postgres_url.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("failed to create PostgreSQL connection pool")?;

        tracing::info!(pool_size = config.pool_size, "PostgreSQL pool created");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Round-trip check used by the health endpoint
    pub async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        client
            .simple_query("SELECT 1")
            .await
            .context("database ping failed")?;
        Ok(())
    }

    /// Create tables and indexes
    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await.context("pool checkout failed")?;
        client
            .batch_execute(SCHEMA)
            .await
            .context("failed to create schema")?;
        tracing::info!("database schema ready");
        Ok(())
    }
}
