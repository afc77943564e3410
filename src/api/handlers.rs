//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::app::AppState;
use crate::domain::{
    ActionRecord, AppError, HealthResponse, HealthStatus, ListParams, PaginatedResponse,
    SignatureStatus, SubmitActionRequest,
};

/// Submit a new action
///
/// The action is validated and persisted, then built, signed, sent and
/// confirmed in the background. **A 202 response indicates acceptance, not
/// confirmation.** Poll `GET /actions/{id}` to follow the `stage`:
/// `building → signing → sending → confirming → confirmed | timed_out | failed`.
pub async fn submit_action_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitActionRequest>,
) -> Result<(StatusCode, Json<ActionRecord>), AppError> {
    let record = state.service.submit_action(&payload).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// List recent actions, newest first
pub async fn list_actions_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ActionRecord>>, AppError> {
    let page = state.service.list_actions(&params).await?;
    Ok(Json(page))
}

/// Get a single action by ID
pub async fn get_action_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionRecord>, AppError> {
    let record = state.service.get_action(&id).await?;
    Ok(Json(record))
}

/// Look up a signature on chain.
///
/// Used after a `timed_out` action: the transaction may still land.
pub async fn signature_status_handler(
    State(state): State<Arc<AppState>>,
    Path(signature): Path<String>,
) -> Result<Json<SignatureStatus>, AppError> {
    let status = state.service.signature_status(&signature).await?;
    Ok(Json(status))
}

/// Detailed health check
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health_check().await;
    Json(health)
}

/// Kubernetes liveness probe
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness probe
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    let health = state.service.health_check().await;
    match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}
