//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it. Labels carry no personal data.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns the Prometheus text format:
/// ```text
/// # TYPE ms_http_requests_total counter
/// ms_http_requests_total{method="GET",endpoint="/health",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "ms.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
