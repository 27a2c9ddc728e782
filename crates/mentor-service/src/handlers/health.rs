//! Health check handlers.
//!
//! - `/health`: Liveness probe, returns OK while the process is running
//! - `/ready`: Readiness probe, checks the meeting store

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does not check any dependencies; failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when the store answers, 503 otherwise. The error message is
/// generic; the actual error is logged.
#[tracing::instrument(skip_all, name = "ms.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.lifecycle.ping().await {
        tracing::warn!(target: "ms.handlers.health", error = %e, "Readiness check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                database: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            database: Some("healthy"),
            error: None,
        }),
    )
}
