//! HTTP routes for Mentor Service.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::clock::Clock;
use crate::services::lifecycle::MeetingLifecycle;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Meeting lifecycle engine.
    pub lifecycle: Arc<MeetingLifecycle>,

    /// Source of the current instant for every request.
    pub clock: Arc<dyn Clock>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Liveness and readiness probes, unversioned
/// - `/metrics` - Prometheus scrape endpoint, unversioned
/// - `/api/v1/mentors...` - Mentor directory and mentor meeting lists
/// - `/api/v1/meetings...` - Booking and status transitions
/// - `/api/v1/students...` - Student profile and meeting lookups
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/mentors", get(handlers::list_mentors))
        .route("/api/v1/mentors/:mentor_id", get(handlers::get_mentor))
        .route(
            "/api/v1/mentors/:mentor_id/meetings",
            get(handlers::get_mentor_meetings),
        )
        .route("/api/v1/meetings", post(handlers::book_meeting))
        .route("/api/v1/meetings/:meeting_id", get(handlers::get_meeting))
        .route(
            "/api/v1/meetings/:meeting_id/accept",
            post(handlers::accept_meeting),
        )
        .route(
            "/api/v1/meetings/:meeting_id/reject",
            post(handlers::reject_meeting),
        )
        .route(
            "/api/v1/meetings/:meeting_id/cancel",
            post(handlers::cancel_meeting),
        )
        .route(
            "/api/v1/meetings/:meeting_id/complete",
            post(handlers::complete_meeting),
        )
        .route("/api/v1/students/:student_id", get(handlers::get_student))
        .route(
            "/api/v1/students/:student_id/mentors/:mentor_id/meeting",
            get(handlers::get_active_meeting),
        )
        .route(
            "/api/v1/students/:student_id/meetings/upcoming",
            get(handlers::get_upcoming_meeting),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
