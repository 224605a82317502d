//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// GET /ready - verifies the queue connection.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.queue.len().await {
        Ok(depth) => (StatusCode::OK, Json(json!({"status": "ready", "queue_depth": depth}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded", "error": e.to_string()})),
        ),
    }
}
