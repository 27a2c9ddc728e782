//! Student profile and student-facing meeting lookups.
//!
//! - `GET /api/v1/students/:student_id`
//! - `GET /api/v1/students/:student_id/mentors/:mentor_id/meeting`
//! - `GET /api/v1/students/:student_id/meetings/upcoming`

use crate::errors::MsError;
use crate::handlers::meetings::meeting_view;
use crate::handlers::IdPath;
use crate::models::{
    ActiveMeetingResponse, StudentProfile, UpcomingMeeting, UpcomingMeetingResponse,
};
use crate::routes::AppState;
use axum::{
    extract::State,
    Json,
};
use common::types::{MentorId, StudentId};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for GET /api/v1/students/:student_id
#[instrument(skip_all, name = "ms.student.get", fields(student_id = %student_id))]
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    IdPath(student_id): IdPath<Uuid>,
) -> Result<Json<StudentProfile>, MsError> {
    let student = state.lifecycle.get_student(StudentId(student_id)).await?;
    Ok(Json(StudentProfile::from(&student)))
}

/// Handler for GET /api/v1/students/:student_id/mentors/:mentor_id/meeting
///
/// Returns the pair's pending or scheduled meeting, or `{"meeting": null}`.
#[instrument(skip_all, name = "ms.student.active_meeting")]
pub async fn get_active_meeting(
    State(state): State<Arc<AppState>>,
    IdPath((student_id, mentor_id)): IdPath<(Uuid, Uuid)>,
) -> Result<Json<ActiveMeetingResponse>, MsError> {
    let now = state.clock.now();
    let meeting = state
        .lifecycle
        .active_meeting(StudentId(student_id), MentorId(mentor_id))
        .await?;

    Ok(Json(ActiveMeetingResponse {
        meeting: meeting.map(|m| meeting_view(&m, state.lifecycle.scheduling(), now)),
    }))
}

/// Handler for GET /api/v1/students/:student_id/meetings/upcoming
#[instrument(skip_all, name = "ms.student.upcoming_meeting", fields(student_id = %student_id))]
pub async fn get_upcoming_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(student_id): IdPath<Uuid>,
) -> Result<Json<UpcomingMeetingResponse>, MsError> {
    let now = state.clock.now();
    let next = state
        .lifecycle
        .next_upcoming_meeting(StudentId(student_id), now)
        .await?;

    Ok(Json(UpcomingMeetingResponse {
        meeting: next.map(|(meeting, mentor)| UpcomingMeeting {
            meeting: meeting_view(&meeting, state.lifecycle.scheduling(), now),
            mentor_name: mentor.full_name(),
        }),
    }))
}
