//! Router construction.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::handlers::{
    get_action_handler, health_check_handler, list_actions_handler, liveness_handler,
    readiness_handler, signature_status_handler, submit_action_handler,
};
use crate::app::AppState;

/// Remote payloads are small JSON objects
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the HTTP router over shared state
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/actions",
            post(submit_action_handler).get(list_actions_handler),
        )
        .route("/actions/{id}", get(get_action_handler))
        .route(
            "/signatures/{signature}/status",
            get(signature_status_handler),
        )
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
