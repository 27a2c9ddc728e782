//! Mentor directory handlers.
//!
//! - `GET /api/v1/mentors` - List mentor profiles
//! - `GET /api/v1/mentors/:mentor_id` - One mentor profile
//! - `GET /api/v1/mentors/:mentor_id/meetings` - Mentor's meetings by bucket

use crate::errors::MsError;
use crate::handlers::meetings::meeting_view;
use crate::handlers::IdPath;
use crate::models::{Meeting, MentorListResponse, MentorMeetingsResponse, MentorProfile};
use crate::routes::AppState;
use axum::{
    extract::State,
    Json,
};
use common::types::MentorId;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/mentors
#[instrument(skip_all, name = "ms.mentor.list")]
pub async fn list_mentors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MentorListResponse>, MsError> {
    let mentors = state.lifecycle.list_mentors().await?;
    Ok(Json(MentorListResponse {
        mentors: mentors.iter().map(MentorProfile::from).collect(),
    }))
}

/// Handler for GET /api/v1/mentors/:mentor_id
#[instrument(skip_all, name = "ms.mentor.get", fields(mentor_id = %mentor_id))]
pub async fn get_mentor(
    State(state): State<Arc<AppState>>,
    IdPath(mentor_id): IdPath<Uuid>,
) -> Result<Json<MentorProfile>, MsError> {
    let mentor = state.lifecycle.get_mentor(MentorId(mentor_id)).await?;
    Ok(Json(MentorProfile::from(&mentor)))
}

/// Handler for GET /api/v1/mentors/:mentor_id/meetings
///
/// Buckets are recomputed against the current instant on every call.
#[instrument(skip_all, name = "ms.mentor.meetings", fields(mentor_id = %mentor_id))]
pub async fn get_mentor_meetings(
    State(state): State<Arc<AppState>>,
    IdPath(mentor_id): IdPath<Uuid>,
) -> Result<Json<MentorMeetingsResponse>, MsError> {
    let now = state.clock.now();
    let buckets = state
        .lifecycle
        .mentor_meetings(MentorId(mentor_id), now)
        .await?;

    let policy = state.lifecycle.scheduling();
    let view = |meetings: Vec<Meeting>| {
        meetings
            .iter()
            .map(|m| meeting_view(m, policy, now))
            .collect::<Vec<_>>()
    };

    Ok(Json(MentorMeetingsResponse {
        pending: view(buckets.pending),
        upcoming: view(buckets.upcoming),
        past: view(buckets.past),
    }))
}
