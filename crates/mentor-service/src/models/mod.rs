//! Mentor Service models.
//!
//! Contains the meeting entity with its status table, the directory records
//! for mentors and students, and the request/response types of the HTTP API.

use crate::errors::MsError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use common::types::{MeetingId, MentorId, StudentId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum topic length in characters.
pub const MAX_TOPIC_LENGTH: usize = 500;

/// Maximum cancellation/rejection reason length in characters.
pub const MAX_REASON_LENGTH: usize = 1000;

/// Meeting status enumeration.
///
/// Represents the lifecycle state of a meeting. Transitions are
/// one-directional:
///
/// ```text
/// pending ──accept──> scheduled ──complete──> completed
///    │                    │
///    └──reject──> rejected └──cancel──> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// Requested by a student, awaiting the mentor's decision.
    Pending,

    /// Accepted by the mentor.
    Scheduled,

    /// Call finished (terminal).
    Completed,

    /// Cancelled by either party after acceptance (terminal).
    Cancelled,

    /// Declined by the mentor (terminal).
    Rejected,
}

impl MeetingStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Rejected => "rejected",
        }
    }

    /// States reachable from this one in a single transition.
    pub fn allowed_next(&self) -> &'static [MeetingStatus] {
        match self {
            MeetingStatus::Pending => &[MeetingStatus::Scheduled, MeetingStatus::Rejected],
            MeetingStatus::Scheduled => &[MeetingStatus::Completed, MeetingStatus::Cancelled],
            MeetingStatus::Completed | MeetingStatus::Cancelled | MeetingStatus::Rejected => &[],
        }
    }

    /// Whether `next` is an edge of the transition table.
    pub fn can_transition_to(&self, next: MeetingStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Terminal states are kept for history and never change again.
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Pending and scheduled meetings block a second booking for the same pair.
    pub fn is_active(&self) -> bool {
        matches!(self, MeetingStatus::Pending | MeetingStatus::Scheduled)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = MsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MeetingStatus::Pending),
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "completed" => Ok(MeetingStatus::Completed),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "rejected" => Ok(MeetingStatus::Rejected),
            other => Err(MsError::Database(format!(
                "unknown meeting status '{other}'"
            ))),
        }
    }
}

/// Bookable meeting lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MeetingDuration {
    /// 30 minutes.
    HalfHour,
    /// 45 minutes.
    ThreeQuarters,
    /// 60 minutes.
    Hour,
}

impl MeetingDuration {
    /// All allowed values, in minutes.
    pub const ALLOWED_MINUTES: [i32; 3] = [30, 45, 60];

    /// Length in minutes.
    pub fn minutes(&self) -> i32 {
        match self {
            MeetingDuration::HalfHour => 30,
            MeetingDuration::ThreeQuarters => 45,
            MeetingDuration::Hour => 60,
        }
    }
}

impl TryFrom<i32> for MeetingDuration {
    type Error = MsError;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        match minutes {
            30 => Ok(MeetingDuration::HalfHour),
            45 => Ok(MeetingDuration::ThreeQuarters),
            60 => Ok(MeetingDuration::Hour),
            other => Err(MsError::Validation(format!(
                "duration must be one of 30, 45 or 60 minutes, got {other}"
            ))),
        }
    }
}

impl From<MeetingDuration> for i32 {
    fn from(duration: MeetingDuration) -> Self {
        duration.minutes()
    }
}

/// A booking between one mentor and one student.
///
/// `date` and `time` are wall-clock values in the service's scheduling zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    /// Unique meeting identifier.
    pub meeting_id: MeetingId,

    /// Mentor hosting the meeting.
    pub mentor_id: MentorId,

    /// Student who requested the meeting.
    pub student_id: StudentId,

    /// Calendar date of the meeting.
    pub date: NaiveDate,

    /// Start time of day (minute resolution).
    pub time: NaiveTime,

    /// Booked length.
    pub duration: MeetingDuration,

    /// What the student wants to discuss.
    pub topic: String,

    /// Current lifecycle status.
    pub status: MeetingStatus,

    /// Reason given on cancel or reject.
    pub cancellation_reason: Option<String>,

    /// When the meeting was cancelled or rejected.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Minutes the call actually ran, set on completion.
    pub actual_duration: Option<i32>,

    /// When the pre-meeting reminder was claimed for sending.
    pub reminder_sent_at: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Start of the meeting as a local (scheduling zone) date-time.
    pub fn local_start(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Mentor directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mentor {
    pub mentor_id: MentorId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub years_of_experience: Option<i32>,
    pub areas_of_interest: Vec<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

impl Mentor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Student directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub education_level: Option<String>,
    pub current_school: Option<String>,
    pub goals: Option<String>,
    pub areas_of_interest: Vec<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", self.first_name, last.trim()),
            _ => self.first_name.clone(),
        }
    }
}

/// Both participants of a meeting, as needed by notifications.
#[derive(Debug, Clone)]
pub struct Parties {
    pub mentor: Mentor,
    pub student: Student,
}

/// Parse a meeting time of day.
///
/// Accepts `HH:MM` or `HH:MM:SS`; seconds are dropped.
pub fn parse_meeting_time(value: &str) -> Result<NaiveTime, MsError> {
    let trimmed = value.trim();
    let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| {
            MsError::Validation(format!("time must be formatted as HH:MM, got '{trimmed}'"))
        })?;

    parsed
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| MsError::Validation("time is out of range".to_string()))
}

/// Format a meeting time of day for API output.
pub fn format_meeting_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

// ============================================================================
// Derived views
// ============================================================================

/// Display bucket for a meeting, recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingBucket {
    Pending,
    Upcoming,
    Past,
}

/// Countdown until a meeting starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,

    /// True once the start time has been reached.
    pub passed: bool,
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            return f.write_str("Meeting time has passed");
        }

        fn unit(n: i64, name: &str) -> String {
            if n == 1 {
                format!("{n} {name}")
            } else {
                format!("{n} {name}s")
            }
        }

        let mut parts = Vec::with_capacity(4);
        if self.days > 0 {
            parts.push(unit(self.days, "day"));
        }
        if self.hours > 0 || self.days > 0 {
            parts.push(unit(self.hours, "hour"));
        }
        if self.minutes > 0 || self.hours > 0 || self.days > 0 {
            parts.push(unit(self.minutes, "minute"));
        }
        parts.push(unit(self.seconds, "second"));

        f.write_str(&parts.join(" "))
    }
}

// ============================================================================
// API request models
// ============================================================================

/// Request body for `POST /api/v1/meetings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookMeetingRequest {
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    /// `HH:MM` in the scheduling zone.
    pub time: String,
    /// Minutes; one of 30, 45, 60.
    pub duration: i32,
    pub topic: String,
}

/// Request body for `POST /api/v1/meetings/:id/accept`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptMeetingRequest {
    pub mentor_id: Uuid,
}

/// Request body for `POST /api/v1/meetings/:id/reject`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectMeetingRequest {
    pub mentor_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for `POST /api/v1/meetings/:id/cancel`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelMeetingRequest {
    /// Id of the mentor or student cancelling.
    pub acting_party_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for `POST /api/v1/meetings/:id/complete`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteMeetingRequest {
    pub mentor_id: Uuid,
    /// Minutes the call ran; defaults to the booked duration.
    #[serde(default)]
    pub actual_duration: Option<i32>,
}

// ============================================================================
// API response models
// ============================================================================

/// Meeting as returned by the API, with derived timing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingResponse {
    pub meeting_id: Uuid,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub duration: i32,
    pub topic: String,
    pub status: MeetingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<i32>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub starts_at: DateTime<Utc>,
    pub bucket: MeetingBucket,
    pub can_join_call: bool,
    pub time_remaining: TimeRemaining,
    pub time_remaining_label: String,
}

/// Mentor's meetings grouped for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorMeetingsResponse {
    pub pending: Vec<MeetingResponse>,
    pub upcoming: Vec<MeetingResponse>,
    pub past: Vec<MeetingResponse>,
}

/// Active (pending or scheduled) meeting for a student/mentor pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveMeetingResponse {
    pub meeting: Option<MeetingResponse>,
}

/// A student's next scheduled meeting with the mentor's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingMeeting {
    #[serde(flatten)]
    pub meeting: MeetingResponse,
    pub mentor_name: String,
}

/// Response for `GET /api/v1/students/:id/meetings/upcoming`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingMeetingResponse {
    pub meeting: Option<UpcomingMeeting>,
}

/// Public mentor profile. Contact details are never exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorProfile {
    pub mentor_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<i32>,
    pub areas_of_interest: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl From<&Mentor> for MentorProfile {
    fn from(mentor: &Mentor) -> Self {
        Self {
            mentor_id: mentor.mentor_id.as_uuid(),
            first_name: mentor.first_name.clone(),
            last_name: mentor.last_name.clone(),
            years_of_experience: mentor.years_of_experience,
            areas_of_interest: mentor.areas_of_interest.clone(),
            bio: mentor.bio.clone(),
            profile_picture: mentor.profile_picture.clone(),
        }
    }
}

/// Public student profile. Contact details are never exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    pub areas_of_interest: Vec<String>,
}

impl From<&Student> for StudentProfile {
    fn from(student: &Student) -> Self {
        Self {
            student_id: student.student_id.as_uuid(),
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone().unwrap_or_default(),
            education_level: student.education_level.clone(),
            current_school: student.current_school.clone(),
            goals: student.goals.clone(),
            areas_of_interest: student.areas_of_interest.clone(),
        }
    }
}

/// Response for `GET /api/v1/mentors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorListResponse {
    pub mentors: Vec<MentorProfile>,
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
