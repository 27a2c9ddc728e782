//! Metrics definitions for Mentor Service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ms_` prefix for Mentor Service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP verbs
//! - `endpoint`: route templates, unknown paths collapse to `/other`
//! - `transition`: accept, reject, cancel, complete
//! - `outcome`: success or the `MsError` kind
//! - `kind`: notification kinds
//! - `operation`: bounded by code (find_meeting, update_meeting, etc.)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ms_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("ms_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ms_http_requests_total`, `ms_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors such as
/// JSON rejections and unknown routes.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ms_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("ms_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto its route template.
fn normalize_endpoint(path: &str) -> &'static str {
    let trimmed = path.trim_end_matches('/');
    let parts: Vec<&str> = trimmed.split('/').collect();

    match parts.as_slice() {
        [""] => "/",
        ["", "health"] => "/health",
        ["", "ready"] => "/ready",
        ["", "metrics"] => "/metrics",
        ["", "api", "v1", "mentors"] => "/api/v1/mentors",
        ["", "api", "v1", "mentors", _] => "/api/v1/mentors/{mentor_id}",
        ["", "api", "v1", "mentors", _, "meetings"] => "/api/v1/mentors/{mentor_id}/meetings",
        ["", "api", "v1", "meetings"] => "/api/v1/meetings",
        ["", "api", "v1", "meetings", _] => "/api/v1/meetings/{meeting_id}",
        ["", "api", "v1", "meetings", _, "accept"] => "/api/v1/meetings/{meeting_id}/accept",
        ["", "api", "v1", "meetings", _, "reject"] => "/api/v1/meetings/{meeting_id}/reject",
        ["", "api", "v1", "meetings", _, "cancel"] => "/api/v1/meetings/{meeting_id}/cancel",
        ["", "api", "v1", "meetings", _, "complete"] => "/api/v1/meetings/{meeting_id}/complete",
        ["", "api", "v1", "students", _] => "/api/v1/students/{student_id}",
        ["", "api", "v1", "students", _, "mentors", _, "meeting"] => {
            "/api/v1/students/{student_id}/mentors/{mentor_id}/meeting"
        }
        ["", "api", "v1", "students", _, "meetings", "upcoming"] => {
            "/api/v1/students/{student_id}/meetings/upcoming"
        }
        // Unknown paths normalized to "/other" to bound cardinality
        _ => "/other",
    }
}

// ============================================================================
// Lifecycle Metrics
// ============================================================================

/// Record a lifecycle transition attempt.
///
/// Metric: `ms_meeting_transitions_total`
/// Labels: `transition` (book, accept, reject, cancel, complete), `outcome`
pub fn record_transition(transition: &'static str, outcome: &'static str) {
    counter!("ms_meeting_transitions_total",
        "transition" => transition,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a booking refused by validation or the booking window.
///
/// Metric: `ms_booking_rejections_total`
/// Labels: `reason`
pub fn record_booking_rejection(reason: &'static str) {
    counter!("ms_booking_rejections_total", "reason" => reason).increment(1);
}

/// Record a notification delivery attempt.
///
/// Metric: `ms_notifications_total`
/// Labels: `kind`, `status` (success, error)
pub fn record_notification(kind: &'static str, status: &'static str) {
    counter!("ms_notifications_total",
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// Record one reminder sweep run.
///
/// Metrics: `ms_reminder_sweeps_total`, `ms_reminders_sent_total`,
/// `ms_reminder_failures_total`
pub fn record_reminder_sweep(status: &'static str, sent: u64, failed: u64) {
    counter!("ms_reminder_sweeps_total", "status" => status).increment(1);
    counter!("ms_reminders_sent_total").increment(sent);
    counter!("ms_reminder_failures_total").increment(failed);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metrics: `ms_db_queries_total`, `ms_db_query_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("ms_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ms_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
