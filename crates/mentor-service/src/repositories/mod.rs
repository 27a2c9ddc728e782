//! Repository layer for Mentor Service.
//!
//! The lifecycle engine talks to storage through two ports: `MeetingStore`
//! for the meetings it owns and `DirectoryStore` for the read-only mentor and
//! student records. Postgres adapters back production; the in-memory adapter
//! backs the test suite and the test server harness.

pub mod directory;
pub mod meetings;
pub mod memory;

use crate::errors::MsError;
use crate::models::{Meeting, MeetingStatus, Mentor, Student};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::types::{MeetingId, MentorId, StudentId};

pub use directory::PgDirectoryStore;
pub use meetings::PgMeetingStore;
pub use memory::InMemoryStore;

/// Storage port for meetings.
///
/// Every write is conditional so concurrent transitions on the same meeting
/// cannot both succeed.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Load one meeting.
    async fn find_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, MsError>;

    /// Insert a new meeting unless the pair already has an active one.
    ///
    /// Returns `false` without writing when a pending or scheduled meeting
    /// exists for the same student and mentor.
    async fn insert_meeting(&self, meeting: &Meeting) -> Result<bool, MsError>;

    /// Write a transitioned meeting if the stored status is still `expected_status`.
    ///
    /// Returns `false` without writing when the status moved underneath.
    async fn update_meeting(
        &self,
        meeting: &Meeting,
        expected_status: MeetingStatus,
    ) -> Result<bool, MsError>;

    /// All meetings of a mentor, any status.
    async fn find_meetings_by_mentor(&self, mentor_id: MentorId) -> Result<Vec<Meeting>, MsError>;

    /// The pending or scheduled meeting of a student/mentor pair.
    async fn find_active_meeting(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
    ) -> Result<Option<Meeting>, MsError>;

    /// Scheduled meetings on one local date.
    async fn find_meetings_scheduled_on(&self, date: NaiveDate) -> Result<Vec<Meeting>, MsError>;

    /// The student's earliest scheduled meeting on or after `from_date`.
    async fn find_next_scheduled_for_student(
        &self,
        student_id: StudentId,
        from_date: NaiveDate,
    ) -> Result<Option<Meeting>, MsError>;

    /// Mark the reminder as sent if nobody has yet and the meeting is still scheduled.
    ///
    /// Returns `true` only for the caller that set the marker.
    async fn claim_reminder(&self, meeting_id: MeetingId, at: DateTime<Utc>)
        -> Result<bool, MsError>;

    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), MsError>;
}

/// Read-only port for mentor and student records.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_mentor(&self, mentor_id: MentorId) -> Result<Option<Mentor>, MsError>;

    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>, MsError>;

    /// All mentors, ordered by last then first name.
    async fn list_mentors(&self) -> Result<Vec<Mentor>, MsError>;
}
