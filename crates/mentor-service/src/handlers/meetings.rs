//! Meeting handlers for Mentor Service.
//!
//! - `POST /api/v1/meetings` - Student requests a booking
//! - `GET /api/v1/meetings/:meeting_id` - Meeting view
//! - `POST /api/v1/meetings/:meeting_id/accept` - Mentor accepts
//! - `POST /api/v1/meetings/:meeting_id/reject` - Mentor rejects
//! - `POST /api/v1/meetings/:meeting_id/cancel` - Either party cancels
//! - `POST /api/v1/meetings/:meeting_id/complete` - Mentor completes
//!
//! Every handler reads the current instant from the clock once and passes it
//! down, so a response is consistent with the state it reports.

use crate::errors::MsError;
use crate::handlers::{parse_body, IdPath};
use crate::models::{
    format_meeting_time, parse_meeting_time, AcceptMeetingRequest, BookMeetingRequest,
    CancelMeetingRequest, CompleteMeetingRequest, Meeting, MeetingResponse, RejectMeetingRequest,
};
use crate::routes::AppState;
use crate::services::lifecycle::BookingRequest;
use crate::services::scheduling::SchedulingPolicy;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::types::{MeetingId, MentorId, StudentId};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Project a meeting into its API view with timing fields derived at `now`.
pub fn meeting_view(
    meeting: &Meeting,
    policy: &SchedulingPolicy,
    now: DateTime<Utc>,
) -> MeetingResponse {
    let time_remaining = policy.time_remaining(meeting, now);

    MeetingResponse {
        meeting_id: meeting.meeting_id.as_uuid(),
        mentor_id: meeting.mentor_id.as_uuid(),
        student_id: meeting.student_id.as_uuid(),
        date: meeting.date,
        time: format_meeting_time(meeting.time),
        duration: meeting.duration.minutes(),
        topic: meeting.topic.clone(),
        status: meeting.status,
        cancellation_reason: meeting.cancellation_reason.clone(),
        cancelled_at: meeting.cancelled_at,
        actual_duration: meeting.actual_duration,
        reminder_sent: meeting.reminder_sent_at.is_some(),
        created_at: meeting.created_at,
        updated_at: meeting.updated_at,
        starts_at: policy.starts_at(meeting),
        bucket: policy.bucket(meeting, now),
        can_join_call: policy.can_join_call(meeting, now),
        time_remaining,
        time_remaining_label: time_remaining.to_string(),
    }
}

/// Handler for POST /api/v1/meetings
///
/// # Response
///
/// - 201 Created: Meeting created as `pending`
/// - 400 Bad Request: Malformed body, bad duration, time or topic
/// - 404 Not Found: Unknown mentor or student
/// - 409 Conflict: The pair already has an active meeting
/// - 422 Unprocessable Entity: Outside the booking window
#[instrument(skip_all, name = "ms.meeting.book", fields(method = "POST", endpoint = "/api/v1/meetings"))]
pub async fn book_meeting(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MeetingResponse>), MsError> {
    let request: BookMeetingRequest = parse_body(&body)?;
    let now = state.clock.now();

    let booking = BookingRequest {
        mentor_id: MentorId(request.mentor_id),
        student_id: StudentId(request.student_id),
        date: request.date,
        time: parse_meeting_time(&request.time)?,
        duration: request.duration,
        topic: request.topic,
    };

    let meeting = state.lifecycle.request_booking(booking, now).await?;
    Ok((
        StatusCode::CREATED,
        Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)),
    ))
}

/// Handler for GET /api/v1/meetings/:meeting_id
#[instrument(skip_all, name = "ms.meeting.get", fields(meeting_id = %meeting_id))]
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(meeting_id): IdPath<Uuid>,
) -> Result<Json<MeetingResponse>, MsError> {
    let now = state.clock.now();
    let meeting = state.lifecycle.get_meeting(MeetingId(meeting_id)).await?;
    Ok(Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)))
}

/// Handler for POST /api/v1/meetings/:meeting_id/accept
#[instrument(skip_all, name = "ms.meeting.accept", fields(meeting_id = %meeting_id))]
pub async fn accept_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(meeting_id): IdPath<Uuid>,
    body: Bytes,
) -> Result<Json<MeetingResponse>, MsError> {
    let request: AcceptMeetingRequest = parse_body(&body)?;
    let now = state.clock.now();

    let meeting = state
        .lifecycle
        .accept(MeetingId(meeting_id), MentorId(request.mentor_id), now)
        .await?;
    Ok(Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)))
}

/// Handler for POST /api/v1/meetings/:meeting_id/reject
#[instrument(skip_all, name = "ms.meeting.reject", fields(meeting_id = %meeting_id))]
pub async fn reject_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(meeting_id): IdPath<Uuid>,
    body: Bytes,
) -> Result<Json<MeetingResponse>, MsError> {
    let request: RejectMeetingRequest = parse_body(&body)?;
    let now = state.clock.now();

    let meeting = state
        .lifecycle
        .reject(
            MeetingId(meeting_id),
            MentorId(request.mentor_id),
            request.reason.as_deref(),
            now,
        )
        .await?;
    Ok(Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)))
}

/// Handler for POST /api/v1/meetings/:meeting_id/cancel
#[instrument(skip_all, name = "ms.meeting.cancel", fields(meeting_id = %meeting_id))]
pub async fn cancel_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(meeting_id): IdPath<Uuid>,
    body: Bytes,
) -> Result<Json<MeetingResponse>, MsError> {
    let request: CancelMeetingRequest = parse_body(&body)?;
    let now = state.clock.now();

    let meeting = state
        .lifecycle
        .cancel(
            MeetingId(meeting_id),
            request.acting_party_id,
            request.reason.as_deref(),
            now,
        )
        .await?;
    Ok(Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)))
}

/// Handler for POST /api/v1/meetings/:meeting_id/complete
#[instrument(skip_all, name = "ms.meeting.complete", fields(meeting_id = %meeting_id))]
pub async fn complete_meeting(
    State(state): State<Arc<AppState>>,
    IdPath(meeting_id): IdPath<Uuid>,
    body: Bytes,
) -> Result<Json<MeetingResponse>, MsError> {
    let request: CompleteMeetingRequest = parse_body(&body)?;
    let now = state.clock.now();

    let meeting = state
        .lifecycle
        .complete(
            MeetingId(meeting_id),
            MentorId(request.mentor_id),
            request.actual_duration,
            now,
        )
        .await?;
    Ok(Json(meeting_view(&meeting, state.lifecycle.scheduling(), now)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{MeetingBucket, MeetingDuration, MeetingStatus};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone};

    fn scheduled_meeting() -> Meeting {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Meeting {
            meeting_id: MeetingId::new(),
            mentor_id: MentorId::new(),
            student_id: StudentId::new(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            duration: MeetingDuration::Hour,
            topic: "System design".to_string(),
            status: MeetingStatus::Scheduled,
            cancellation_reason: None,
            cancelled_at: None,
            actual_duration: None,
            reminder_sent_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_meeting_view_join_window() {
        let policy = SchedulingPolicy::default();
        let meeting = scheduled_meeting();
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();

        let early = meeting_view(&meeting, &policy, start - Duration::minutes(20));
        assert!(!early.can_join_call);
        assert_eq!(early.bucket, MeetingBucket::Upcoming);
        assert_eq!(early.time, "15:00");
        assert_eq!(early.time_remaining_label, "20 minutes 0 seconds");

        let close = meeting_view(&meeting, &policy, start - Duration::minutes(5));
        assert!(close.can_join_call);
        assert_eq!(close.starts_at, start);
    }

    #[test]
    fn test_meeting_view_past_meeting() {
        let policy = SchedulingPolicy::default();
        let meeting = scheduled_meeting();
        let after = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();

        let view = meeting_view(&meeting, &policy, after);
        assert_eq!(view.bucket, MeetingBucket::Past);
        assert!(view.time_remaining.passed);
        assert_eq!(view.time_remaining_label, "Meeting time has passed");
    }

    #[test]
    fn test_meeting_view_serialization_omits_empty_fields() {
        let policy = SchedulingPolicy::default();
        let meeting = scheduled_meeting();
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 15, 0, 0).unwrap();

        let json = serde_json::to_value(meeting_view(&meeting, &policy, now)).unwrap();
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["bucket"], "upcoming");
        assert_eq!(json["duration"], 60);
        assert!(json.get("cancellation_reason").is_none());
        assert!(json.get("actual_duration").is_none());
    }
}
