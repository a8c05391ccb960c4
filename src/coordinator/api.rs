//! REST API handlers
//!
//! All boundary validation lives here: term identifiers, enum query
//! parameters and state-transition preconditions are checked before the
//! core or the repositories run.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::{MatchError, MatchRunSummary};
use crate::metrics;
use crate::models::{
    AssignmentSnapshot, AssignmentStatus, HistoryRecord, Notification, NotificationKind,
    ReadState, SpecialistAvailability, TeacherTermRecord, Term,
};
use crate::storage::repository::{NotificationFilter, SnapshotFilter};

use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message)))
}

fn internal(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Bulk roster load
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUpload {
    pub periodo: Term,
    pub docentes: Vec<TeacherTermRecord>,
}

/// Bulk availability load
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityUpload {
    pub especialistas: Vec<SpecialistAvailability>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub cargados: usize,
}

/// Snapshot read filters, as query parameters
#[derive(Debug, Deserialize)]
pub struct AsignacionesQuery {
    pub periodo: Option<String>,
    pub docente: Option<String>,
    pub especialista: Option<String>,
    pub estado: Option<String>,
    /// Restrict to the latest execution per term
    #[serde(default)]
    pub ultima: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistorialQuery {
    pub especialista: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificacionesQuery {
    pub especialista: Option<String>,
    pub estado: Option<String>,
    pub tipo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarcarLeidasRequest {
    pub especialista_dni: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchivarRequest {
    pub dias: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedResponse {
    pub actualizadas: u64,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and metrics
        .route("/api/health", get(health_check))
        .route("/api/metrics", get(metrics_endpoint))
        // Match trigger
        .route("/api/match/{periodo}", post(run_match))
        // Snapshot reads
        .route("/api/asignaciones", get(list_asignaciones))
        // History reads
        .route("/api/historial", get(list_historial))
        // Notifications
        .route("/api/notificaciones", get(list_notificaciones))
        .route("/api/notificaciones/{id}/vista", post(mark_vista))
        .route("/api/notificaciones/{id}/leida", post(mark_leida))
        .route("/api/notificaciones/marcar-leidas", post(marcar_leidas))
        .route("/api/notificaciones/archivar", post(archivar))
        // Bulk source loads
        .route("/api/docentes/carga", post(cargar_docentes))
        .route("/api/disponibilidad/carga", post(cargar_disponibilidad))
        .with_state(state)
}

// ============================================================================
// Health Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    }))
}

async fn metrics_endpoint() -> impl IntoResponse {
    metrics::gather()
}

// ============================================================================
// Match Handlers
// ============================================================================

async fn run_match(
    State(state): State<AppState>,
    Path(periodo): Path<String>,
) -> Result<Json<ApiResponse<MatchRunSummary>>, ApiError> {
    let periodo: Term = periodo.parse().map_err(|e: crate::models::InvalidTerm| {
        bad_request(e.to_string())
    })?;

    match state.runner.run(&periodo).await {
        Ok(summary) => Ok(Json(ApiResponse::success(summary))),
        Err(err @ MatchError::EmptyRoster { .. }) => Err(not_found(err.to_string())),
        Err(err) => {
            tracing::error!(periodo = %periodo, error = %err, "match run failed");
            Err(internal(err.to_string()))
        }
    }
}

// ============================================================================
// Snapshot Handlers
// ============================================================================

async fn list_asignaciones(
    State(state): State<AppState>,
    Query(query): Query<AsignacionesQuery>,
) -> Result<Json<ApiResponse<Vec<AssignmentSnapshot>>>, ApiError> {
    let periodo = query
        .periodo
        .map(|raw| raw.parse::<Term>())
        .transpose()
        .map_err(|e| bad_request(e.to_string()))?;
    let estado = query
        .estado
        .map(|raw| raw.parse::<AssignmentStatus>())
        .transpose()
        .map_err(|e| bad_request(e))?;

    let filter = SnapshotFilter {
        periodo,
        docente_id: query.docente,
        especialista_dni: query.especialista,
        estado,
        solo_ultima: query.ultima,
    };

    let snapshots = state
        .snapshots
        .query(&filter)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(snapshots)))
}

// ============================================================================
// History Handlers
// ============================================================================

async fn list_historial(
    State(state): State<AppState>,
    Query(query): Query<HistorialQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryRecord>>>, ApiError> {
    let records = state
        .history
        .fetch_by_specialist(&query.especialista)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(records)))
}

// ============================================================================
// Notification Handlers
// ============================================================================

async fn list_notificaciones(
    State(state): State<AppState>,
    Query(query): Query<NotificacionesQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let estado = query
        .estado
        .map(|raw| raw.parse::<ReadState>())
        .transpose()
        .map_err(|e| bad_request(e))?;
    let tipo = query
        .tipo
        .map(|raw| raw.parse::<NotificationKind>())
        .transpose()
        .map_err(|e| bad_request(e))?;

    let filter = NotificationFilter {
        especialista_dni: query.especialista,
        estado,
        tipo,
    };

    let items = state
        .notifications
        .query(&filter)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(items)))
}

async fn mark_vista(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UpdatedResponse>>, ApiError> {
    let updated = state
        .notifications
        .mark_seen(id)
        .await
        .map_err(|e| internal(e.to_string()))?;

    if updated {
        Ok(Json(ApiResponse::success(UpdatedResponse { actualizadas: 1 })))
    } else {
        Err(not_found("notification not found or already seen"))
    }
}

async fn mark_leida(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UpdatedResponse>>, ApiError> {
    let updated = state
        .notifications
        .mark_read(id)
        .await
        .map_err(|e| internal(e.to_string()))?;

    if updated {
        Ok(Json(ApiResponse::success(UpdatedResponse { actualizadas: 1 })))
    } else {
        Err(not_found("notification not found or already read"))
    }
}

async fn marcar_leidas(
    State(state): State<AppState>,
    Json(body): Json<MarcarLeidasRequest>,
) -> Result<Json<ApiResponse<UpdatedResponse>>, ApiError> {
    let updated = state
        .notifications
        .mark_all_read(&body.especialista_dni)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(UpdatedResponse {
        actualizadas: updated,
    })))
}

async fn archivar(
    State(state): State<AppState>,
    Json(body): Json<ArchivarRequest>,
) -> Result<Json<ApiResponse<UpdatedResponse>>, ApiError> {
    if body.dias <= 0 {
        return Err(bad_request("dias must be positive"));
    }

    let updated = state
        .notifications
        .archive_older_than(body.dias)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(UpdatedResponse {
        actualizadas: updated,
    })))
}

// ============================================================================
// Bulk Load Handlers
// ============================================================================

async fn cargar_docentes(
    State(state): State<AppState>,
    Json(body): Json<RosterUpload>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let cargados = state
        .roster
        .replace_roster(&body.periodo, &body.docentes)
        .await
        .map_err(|e| internal(e.to_string()))?;

    tracing::info!(periodo = %body.periodo, cargados, "roster replaced");
    Ok(Json(ApiResponse::success(UploadResponse { cargados })))
}

async fn cargar_disponibilidad(
    State(state): State<AppState>,
    Json(body): Json<AvailabilityUpload>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let cargados = state
        .pool
        .replace_pool(&body.especialistas)
        .await
        .map_err(|e| internal(e.to_string()))?;

    tracing::info!(cargados, "availability pool replaced");
    Ok(Json(ApiResponse::success(UploadResponse { cargados })))
}
