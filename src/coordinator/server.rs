//! API server implementation
//!
//! Owns the shared application state (repositories + runner) and the
//! axum serving loop.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::matching::MatchRunner;
use crate::storage::repository::{
    AvailabilityRepository, HistoryRepository, NotificationRepository, PgAvailabilityRepository,
    PgHistoryRepository, PgNotificationRepository, PgRosterRepository, PgSnapshotRepository,
    RosterRepository, SnapshotRepository,
};
use crate::storage::Database;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn RosterRepository>,
    pub pool: Arc<dyn AvailabilityRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub runner: Arc<MatchRunner>,

    /// Server start time, for the health endpoint
    pub start_time: Instant,
}

// ============================================================================
// API Server
// ============================================================================

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("failed to bind listener: {0}")]
    BindError(String),

    #[error("server failed: {0}")]
    ServeError(String),
}

/// Main API server
pub struct ApiServer {
    config: Config,
    state: AppState,
}

impl ApiServer {
    /// Create a server wired to PostgreSQL repositories
    pub fn new(config: Config, database: &Database) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let pool = database.pool();
        Ok(Self::from_repositories(
            config,
            Arc::new(PgRosterRepository::new(pool.clone())),
            Arc::new(PgAvailabilityRepository::new(pool.clone())),
            Arc::new(PgSnapshotRepository::new(pool.clone())),
            Arc::new(PgHistoryRepository::new(pool.clone())),
            Arc::new(PgNotificationRepository::new(pool)),
        ))
    }

    /// Create a server over arbitrary repository implementations.
    /// Tests use this with the in-memory mocks.
    pub fn from_repositories(
        config: Config,
        roster: Arc<dyn RosterRepository>,
        pool: Arc<dyn AvailabilityRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        history: Arc<dyn HistoryRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        let runner = Arc::new(MatchRunner::new(
            roster.clone(),
            pool.clone(),
            snapshots.clone(),
            history.clone(),
            notifications.clone(),
            config.matching.audit_policy(),
        ));

        let state = AppState {
            roster,
            pool,
            snapshots,
            history,
            notifications,
            runner,
            start_time: Instant::now(),
        };

        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        tracing::info!("starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        tracing::info!("starting API server on {} (with graceful shutdown)", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("API server shutdown complete");
        Ok(())
    }
}
