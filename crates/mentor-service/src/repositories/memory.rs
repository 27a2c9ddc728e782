//! In-memory meeting and directory store.
//!
//! Backs the test suite and the test server harness. Each operation holds the
//! lock for its whole read-check-write, which gives the same atomicity as the
//! conditional statements of the Postgres store.

use crate::errors::MsError;
use crate::models::{Meeting, MeetingStatus, Mentor, Student};
use crate::repositories::{DirectoryStore, MeetingStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::types::{MeetingId, MentorId, StudentId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Meeting and directory store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    meetings: RwLock<HashMap<MeetingId, Meeting>>,
    mentors: RwLock<HashMap<MentorId, Mentor>>,
    students: RwLock<HashMap<StudentId, Student>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mentor record.
    pub async fn add_mentor(&self, mentor: Mentor) {
        self.mentors.write().await.insert(mentor.mentor_id, mentor);
    }

    /// Add or replace a student record.
    pub async fn add_student(&self, student: Student) {
        self.students
            .write()
            .await
            .insert(student.student_id, student);
    }

    /// Store a meeting as-is, bypassing the active-meeting check.
    pub async fn put_meeting(&self, meeting: Meeting) {
        self.meetings
            .write()
            .await
            .insert(meeting.meeting_id, meeting);
    }

    /// Snapshot of one stored meeting.
    pub async fn meeting(&self, meeting_id: MeetingId) -> Option<Meeting> {
        self.meetings.read().await.get(&meeting_id).cloned()
    }

    /// Number of stored meetings.
    pub async fn meeting_count(&self) -> usize {
        self.meetings.read().await.len()
    }

    /// Make every operation fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MsError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MsError::Database("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

fn sort_by_start(meetings: &mut [Meeting]) {
    meetings.sort_by_key(|m| (m.date, m.time));
}

#[async_trait]
impl MeetingStore for InMemoryStore {
    async fn find_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, MsError> {
        self.check_available()?;
        Ok(self.meetings.read().await.get(&meeting_id).cloned())
    }

    async fn insert_meeting(&self, meeting: &Meeting) -> Result<bool, MsError> {
        self.check_available()?;
        let mut meetings = self.meetings.write().await;

        let pair_active = meetings.values().any(|m| {
            m.student_id == meeting.student_id
                && m.mentor_id == meeting.mentor_id
                && m.status.is_active()
        });
        if pair_active || meetings.contains_key(&meeting.meeting_id) {
            return Ok(false);
        }

        meetings.insert(meeting.meeting_id, meeting.clone());
        Ok(true)
    }

    async fn update_meeting(
        &self,
        meeting: &Meeting,
        expected_status: MeetingStatus,
    ) -> Result<bool, MsError> {
        self.check_available()?;
        let mut meetings = self.meetings.write().await;

        match meetings.get_mut(&meeting.meeting_id) {
            Some(stored) if stored.status == expected_status => {
                stored.status = meeting.status;
                stored.cancellation_reason = meeting.cancellation_reason.clone();
                stored.cancelled_at = meeting.cancelled_at;
                stored.actual_duration = meeting.actual_duration;
                stored.updated_at = meeting.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_meetings_by_mentor(&self, mentor_id: MentorId) -> Result<Vec<Meeting>, MsError> {
        self.check_available()?;
        let mut found: Vec<Meeting> = self
            .meetings
            .read()
            .await
            .values()
            .filter(|m| m.mentor_id == mentor_id)
            .cloned()
            .collect();
        sort_by_start(&mut found);
        Ok(found)
    }

    async fn find_active_meeting(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
    ) -> Result<Option<Meeting>, MsError> {
        self.check_available()?;
        Ok(self
            .meetings
            .read()
            .await
            .values()
            .find(|m| m.student_id == student_id && m.mentor_id == mentor_id && m.status.is_active())
            .cloned())
    }

    async fn find_meetings_scheduled_on(&self, date: NaiveDate) -> Result<Vec<Meeting>, MsError> {
        self.check_available()?;
        let mut found: Vec<Meeting> = self
            .meetings
            .read()
            .await
            .values()
            .filter(|m| m.date == date && m.status == MeetingStatus::Scheduled)
            .cloned()
            .collect();
        sort_by_start(&mut found);
        Ok(found)
    }

    async fn find_next_scheduled_for_student(
        &self,
        student_id: StudentId,
        from_date: NaiveDate,
    ) -> Result<Option<Meeting>, MsError> {
        self.check_available()?;
        Ok(self
            .meetings
            .read()
            .await
            .values()
            .filter(|m| {
                m.student_id == student_id
                    && m.status == MeetingStatus::Scheduled
                    && m.date >= from_date
            })
            .min_by_key(|m| (m.date, m.time))
            .cloned())
    }

    async fn claim_reminder(
        &self,
        meeting_id: MeetingId,
        at: DateTime<Utc>,
    ) -> Result<bool, MsError> {
        self.check_available()?;
        let mut meetings = self.meetings.write().await;

        match meetings.get_mut(&meeting_id) {
            Some(stored)
                if stored.status == MeetingStatus::Scheduled && stored.reminder_sent_at.is_none() =>
            {
                stored.reminder_sent_at = Some(at);
                stored.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), MsError> {
        self.check_available()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn find_mentor(&self, mentor_id: MentorId) -> Result<Option<Mentor>, MsError> {
        self.check_available()?;
        Ok(self.mentors.read().await.get(&mentor_id).cloned())
    }

    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>, MsError> {
        self.check_available()?;
        Ok(self.students.read().await.get(&student_id).cloned())
    }

    async fn list_mentors(&self) -> Result<Vec<Mentor>, MsError> {
        self.check_available()?;
        let mut mentors: Vec<Mentor> = self.mentors.read().await.values().cloned().collect();
        mentors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(mentors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::MeetingDuration;
    use chrono::{NaiveTime, TimeZone};

    fn meeting(student_id: StudentId, mentor_id: MentorId, status: MeetingStatus) -> Meeting {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        Meeting {
            meeting_id: MeetingId::new(),
            mentor_id,
            student_id,
            date: NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
            time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            duration: MeetingDuration::HalfHour,
            topic: "Interview prep".to_string(),
            status,
            cancellation_reason: None,
            cancelled_at: None,
            actual_duration: None,
            reminder_sent_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn test_insert_refuses_second_active_meeting_for_pair() {
        let store = InMemoryStore::new();
        let (student, mentor) = (StudentId::new(), MentorId::new());

        assert!(store
            .insert_meeting(&meeting(student, mentor, MeetingStatus::Pending))
            .await
            .unwrap());
        assert!(!store
            .insert_meeting(&meeting(student, mentor, MeetingStatus::Pending))
            .await
            .unwrap());

        // A different mentor is fine.
        assert!(store
            .insert_meeting(&meeting(student, MentorId::new(), MeetingStatus::Pending))
            .await
            .unwrap());
        assert_eq!(store.meeting_count().await, 2);
    }

    #[tokio::test]
    async fn test_insert_allowed_after_terminal_meeting() {
        let store = InMemoryStore::new();
        let (student, mentor) = (StudentId::new(), MentorId::new());
        store
            .put_meeting(meeting(student, mentor, MeetingStatus::Rejected))
            .await;

        assert!(store
            .insert_meeting(&meeting(student, mentor, MeetingStatus::Pending))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_is_conditional_on_status() {
        let store = InMemoryStore::new();
        let original = meeting(StudentId::new(), MentorId::new(), MeetingStatus::Pending);
        store.put_meeting(original.clone()).await;

        let mut accepted = original.clone();
        accepted.status = MeetingStatus::Scheduled;
        assert!(store
            .update_meeting(&accepted, MeetingStatus::Pending)
            .await
            .unwrap());

        let mut rejected = original.clone();
        rejected.status = MeetingStatus::Rejected;
        assert!(!store
            .update_meeting(&rejected, MeetingStatus::Pending)
            .await
            .unwrap());

        let stored = store.meeting(original.meeting_id).await.unwrap();
        assert_eq!(stored.status, MeetingStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_claim_reminder_once() {
        let store = InMemoryStore::new();
        let m = meeting(StudentId::new(), MentorId::new(), MeetingStatus::Scheduled);
        store.put_meeting(m.clone()).await;
        let at = Utc.with_ymd_and_hms(2026, 3, 12, 13, 30, 0).unwrap();

        assert!(store.claim_reminder(m.meeting_id, at).await.unwrap());
        assert!(!store.claim_reminder(m.meeting_id, at).await.unwrap());
        assert_eq!(
            store.meeting(m.meeting_id).await.unwrap().reminder_sent_at,
            Some(at)
        );
    }

    #[tokio::test]
    async fn test_claim_reminder_requires_scheduled() {
        let store = InMemoryStore::new();
        let m = meeting(StudentId::new(), MentorId::new(), MeetingStatus::Cancelled);
        store.put_meeting(m.clone()).await;

        let at = Utc.with_ymd_and_hms(2026, 3, 12, 13, 30, 0).unwrap();
        assert!(!store.claim_reminder(m.meeting_id, at).await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(store.ping().await, Err(MsError::Database(_))));
        assert!(store.find_meeting(MeetingId::new()).await.is_err());
        assert!(store.list_mentors().await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
