//! Mentor Service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are generic for storage failures; the
//! actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Mentor Service error type.
///
/// Maps to HTTP status codes:
/// - Validation: 400 Bad Request
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - InvalidTransition, Conflict: 409 Conflict
/// - BookingWindowViolation: 422 Unprocessable Entity
/// - Database, Internal: 500 Internal Server Error
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum MsError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Booking window violation: {reason}")]
    BookingWindowViolation {
        reason: String,
        /// Earliest local date-time a booking would currently be accepted for.
        earliest_allowed: NaiveDateTime,
        /// Last local date a booking may currently be placed on.
        latest_allowed_date: NaiveDate,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl MsError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            MsError::Validation(_) => 400,
            MsError::Forbidden(_) => 403,
            MsError::NotFound(_) => 404,
            MsError::InvalidTransition { .. } | MsError::Conflict(_) => 409,
            MsError::BookingWindowViolation { .. } => 422,
            MsError::Database(_) | MsError::Internal(_) => 500,
            MsError::ServiceUnavailable(_) => 503,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MsError::Validation(_) => "validation",
            MsError::BookingWindowViolation { .. } => "booking_window",
            MsError::NotFound(_) => "not_found",
            MsError::Forbidden(_) => "forbidden",
            MsError::InvalidTransition { .. } => "invalid_transition",
            MsError::Conflict(_) => "conflict",
            MsError::Database(_) => "database",
            MsError::ServiceUnavailable(_) => "unavailable",
            MsError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for MsError {
    fn into_response(self) -> Response {
        let mut details = None;

        let (status, code, message) = match &self {
            MsError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", reason.clone())
            }
            MsError::BookingWindowViolation {
                reason,
                earliest_allowed,
                latest_allowed_date,
            } => {
                details = Some(serde_json::json!({
                    "earliest_allowed": earliest_allowed.format("%Y-%m-%dT%H:%M").to_string(),
                    "latest_allowed_date": latest_allowed_date.to_string(),
                }));
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "BOOKING_WINDOW_VIOLATION",
                    reason.clone(),
                )
            }
            MsError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            MsError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            MsError::InvalidTransition { from, to } => {
                details = Some(serde_json::json!({ "from": from, "to": to }));
                (
                    StatusCode::CONFLICT,
                    "INVALID_TRANSITION",
                    format!("Meeting cannot move from {from} to {to}"),
                )
            }
            MsError::Conflict(reason) => (StatusCode::CONFLICT, "CONFLICT", reason.clone()),
            MsError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "ms.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            MsError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "ms.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            MsError::Internal(err) => {
                tracing::error!(target: "ms.internal", error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to MsError
impl From<sqlx::Error> for MsError {
    fn from(err: sqlx::Error) -> Self {
        MsError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn window_violation() -> MsError {
        MsError::BookingWindowViolation {
            reason: "Meetings must be booked at least 30 minutes in advance".to_string(),
            earliest_allowed: NaiveDate::from_ymd_opt(2026, 3, 10)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            latest_allowed_date: NaiveDate::from_ymd_opt(2026, 4, 9).unwrap(),
        }
    }

    #[test]
    fn test_display_invalid_transition() {
        let error = MsError::InvalidTransition {
            from: "completed".to_string(),
            to: "cancelled".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Invalid transition from completed to cancelled"
        );
    }

    #[test]
    fn test_display_validation() {
        let error = MsError::Validation("topic is required".to_string());
        assert_eq!(format!("{}", error), "Validation failed: topic is required");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MsError::Validation("test".to_string()).status_code(), 400);
        assert_eq!(MsError::Forbidden("test".to_string()).status_code(), 403);
        assert_eq!(MsError::NotFound("test".to_string()).status_code(), 404);
        assert_eq!(MsError::Conflict("test".to_string()).status_code(), 409);
        assert_eq!(
            MsError::InvalidTransition {
                from: "a".to_string(),
                to: "b".to_string()
            }
            .status_code(),
            409
        );
        assert_eq!(window_violation().status_code(), 422);
        assert_eq!(MsError::Database("test".to_string()).status_code(), 500);
        assert_eq!(MsError::Internal("test".to_string()).status_code(), 500);
        assert_eq!(
            MsError::ServiceUnavailable("test".to_string()).status_code(),
            503
        );
    }

    #[tokio::test]
    async fn test_into_response_booking_window_includes_details() {
        let response = window_violation().into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BOOKING_WINDOW_VIOLATION");
        assert_eq!(
            body_json["error"]["details"]["earliest_allowed"],
            "2026-03-10T10:30"
        );
        assert_eq!(
            body_json["error"]["details"]["latest_allowed_date"],
            "2026-04-09"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_transition() {
        let error = MsError::InvalidTransition {
            from: "pending".to_string(),
            to: "completed".to_string(),
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TRANSITION");
        assert_eq!(body_json["error"]["details"]["from"], "pending");
        assert_eq!(body_json["error"]["details"]["to"], "completed");
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let error = MsError::Database("connection refused on 10.0.0.5".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
        assert!(body_json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_into_response_forbidden() {
        let error = MsError::Forbidden("Only the mentor can accept this meeting".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "FORBIDDEN");
        assert_eq!(
            body_json["error"]["message"],
            "Only the mentor can accept this meeting"
        );
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable() {
        let error = MsError::ServiceUnavailable("database maintenance".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json["error"]["message"],
            "Service temporarily unavailable"
        );
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = MsError::Internal("mailbox parse".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body_json["error"]["message"], "An internal error occurred");
    }
}
