//! HTTP request handlers for Mentor Service.

pub mod health;
pub mod meetings;
pub mod mentors;
pub mod metrics;
pub mod students;

pub use health::{health_check, readiness_check};
pub use meetings::{
    accept_meeting, book_meeting, cancel_meeting, complete_meeting, get_meeting, reject_meeting,
};
pub use mentors::{get_mentor, get_mentor_meetings, list_mentors};
pub use metrics::metrics_handler;
pub use students::{get_active_meeting, get_student, get_upcoming_meeting};

use crate::errors::MsError;
use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

/// Deserialize a JSON request body, answering 400 rather than axum's 422.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, MsError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "ms.handlers", error = %e, "Invalid request body");
        MsError::Validation(format!("Invalid request body: {e}"))
    })
}

/// Path parameters whose rejection is a `VALIDATION_ERROR` body instead of
/// axum's plain-text 400.
#[derive(Debug)]
pub struct IdPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for IdPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = MsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                let reason = rejection.body_text();
                tracing::debug!(target: "ms.handlers", error = %reason, "Invalid path parameter");
                Err(MsError::Validation(format!("Invalid path parameter: {reason}")))
            }
        }
    }
}
