//! Meeting lifecycle engine.
//!
//! Owns booking and every status transition of a meeting:
//!
//! 1. Validate the request and the acting party
//! 2. Check the transition against the status table
//! 3. Write with a compare-and-set on the status that was read
//! 4. Notify both parties, best-effort
//!
//! A lost compare-and-set surfaces as `Conflict`. Notification failures are
//! logged and counted, never returned.

use crate::errors::MsError;
use crate::models::{
    Meeting, MeetingBucket, MeetingDuration, MeetingStatus, Mentor, Parties, Student,
    MAX_REASON_LENGTH, MAX_TOPIC_LENGTH,
};
use crate::observability::metrics;
use crate::repositories::{DirectoryStore, MeetingStore};
use crate::services::notifier::{NotificationKind, Notifier};
use crate::services::scheduling::SchedulingPolicy;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::types::{MeetingId, MentorId, StudentId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Reason recorded when a rejection carries none and the policy substitutes one.
pub const DEFAULT_REJECTION_REASON: &str = "Mentor is unavailable";

/// Who may cancel a scheduled meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Any caller may cancel.
    #[default]
    Lenient,

    /// Only the meeting's mentor or student may cancel.
    Strict,
}

impl FromStr for CancelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(CancelPolicy::Lenient),
            "strict" => Ok(CancelPolicy::Strict),
            other => Err(format!(
                "CANCEL_POLICY must be 'lenient' or 'strict', got '{other}'"
            )),
        }
    }
}

/// What to do with a rejection that has no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectReasonPolicy {
    /// Fail with a validation error.
    #[default]
    Require,

    /// Record [`DEFAULT_REJECTION_REASON`].
    UseDefault,
}

impl FromStr for RejectReasonPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require" => Ok(RejectReasonPolicy::Require),
            "default" => Ok(RejectReasonPolicy::UseDefault),
            other => Err(format!(
                "REJECT_REASON_POLICY must be 'require' or 'default', got '{other}'"
            )),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleConfig {
    pub scheduling: SchedulingPolicy,
    pub cancel_policy: CancelPolicy,
    pub reject_reason_policy: RejectReasonPolicy,
}

/// A booking request as received from a student.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub mentor_id: MentorId,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Minutes; validated against the allowed durations.
    pub duration: i32,
    pub topic: String,
}

/// Outcome of one reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Scheduled meetings looked at.
    pub examined: usize,
    /// Reminders claimed and delivered.
    pub sent: usize,
    /// Reminders claimed but not delivered.
    pub failed: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "examined={} sent={} failed={}",
            self.examined, self.sent, self.failed
        )
    }
}

/// A mentor's meetings grouped by display bucket, each sorted by start.
#[derive(Debug, Clone, Default)]
pub struct BucketedMeetings {
    pub pending: Vec<Meeting>,
    pub upcoming: Vec<Meeting>,
    pub past: Vec<Meeting>,
}

/// Trim a free-text reason; `None` when missing or blank.
fn normalize_reason(reason: Option<&str>) -> Result<Option<String>, MsError> {
    let Some(trimmed) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() > MAX_REASON_LENGTH {
        return Err(MsError::Validation(format!(
            "reason must be at most {MAX_REASON_LENGTH} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

fn invalid_transition(from: MeetingStatus, to: MeetingStatus) -> MsError {
    MsError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

fn ensure_transition(meeting: &Meeting, to: MeetingStatus) -> Result<(), MsError> {
    if meeting.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(invalid_transition(meeting.status, to))
    }
}

/// The meeting lifecycle engine.
pub struct MeetingLifecycle {
    meetings: Arc<dyn MeetingStore>,
    directory: Arc<dyn DirectoryStore>,
    notifier: Arc<dyn Notifier>,
    config: LifecycleConfig,
}

impl MeetingLifecycle {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        directory: Arc<dyn DirectoryStore>,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            meetings,
            directory,
            notifier,
            config,
        }
    }

    /// Timing rules in effect.
    pub fn scheduling(&self) -> &SchedulingPolicy {
        &self.config.scheduling
    }

    /// Check that storage is reachable.
    pub async fn ping(&self) -> Result<(), MsError> {
        self.meetings.ping().await
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Create a pending meeting.
    #[instrument(
        skip_all,
        name = "ms.lifecycle.request_booking",
        fields(mentor_id = %request.mentor_id, student_id = %request.student_id)
    )]
    pub async fn request_booking(
        &self,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MsError> {
        let result = self.book(request, now).await;
        match &result {
            Ok(_) => metrics::record_transition("book", "success"),
            Err(e) => {
                metrics::record_transition("book", e.kind());
                if matches!(
                    e,
                    MsError::Validation(_) | MsError::BookingWindowViolation { .. }
                ) {
                    metrics::record_booking_rejection(e.kind());
                }
            }
        }
        result
    }

    async fn book(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<Meeting, MsError> {
        let duration = MeetingDuration::try_from(request.duration)?;

        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(MsError::Validation("topic is required".to_string()));
        }
        if topic.chars().count() > MAX_TOPIC_LENGTH {
            return Err(MsError::Validation(format!(
                "topic must be at most {MAX_TOPIC_LENGTH} characters"
            )));
        }

        self.config
            .scheduling
            .check_booking_window(request.date, request.time, now)?;

        let parties = self
            .load_parties(request.mentor_id, request.student_id)
            .await?;

        let meeting = Meeting {
            meeting_id: MeetingId::new(),
            mentor_id: request.mentor_id,
            student_id: request.student_id,
            date: request.date,
            time: request.time,
            duration,
            topic: topic.to_string(),
            status: MeetingStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            actual_duration: None,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
        };

        if !self.meetings.insert_meeting(&meeting).await? {
            return Err(MsError::Conflict(
                "An active meeting with this mentor already exists".to_string(),
            ));
        }

        info!(
            target: "ms.services.lifecycle",
            meeting_id = %meeting.meeting_id,
            date = %meeting.date,
            time = %meeting.time.format("%H:%M"),
            duration = meeting.duration.minutes(),
            "Meeting requested"
        );

        self.notify(NotificationKind::Booked, &parties, &meeting, None)
            .await;

        Ok(meeting)
    }

    /// Mentor accepts a pending request.
    #[instrument(skip_all, name = "ms.lifecycle.accept", fields(meeting_id = %meeting_id))]
    pub async fn accept(
        &self,
        meeting_id: MeetingId,
        acting_mentor_id: MentorId,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MsError> {
        let result = async {
            let current = self.load_meeting(meeting_id).await?;
            Self::ensure_mentor(&current, acting_mentor_id, "accept")?;
            ensure_transition(&current, MeetingStatus::Scheduled)?;

            let mut next = current.clone();
            next.status = MeetingStatus::Scheduled;
            next.updated_at = now;

            self.commit(&next, current.status).await?;
            self.notify_meeting(NotificationKind::Accepted, &next, None)
                .await;
            Ok::<_, MsError>(next)
        }
        .await;

        Self::record("accept", &result);
        result
    }

    /// Mentor declines a pending request.
    #[instrument(skip_all, name = "ms.lifecycle.reject", fields(meeting_id = %meeting_id))]
    pub async fn reject(
        &self,
        meeting_id: MeetingId,
        acting_mentor_id: MentorId,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MsError> {
        let result = async {
            let reason = match (normalize_reason(reason)?, self.config.reject_reason_policy) {
                (Some(reason), _) => reason,
                (None, RejectReasonPolicy::UseDefault) => DEFAULT_REJECTION_REASON.to_string(),
                (None, RejectReasonPolicy::Require) => {
                    return Err(MsError::Validation(
                        "a rejection reason is required".to_string(),
                    ))
                }
            };

            let current = self.load_meeting(meeting_id).await?;
            Self::ensure_mentor(&current, acting_mentor_id, "reject")?;
            ensure_transition(&current, MeetingStatus::Rejected)?;

            let mut next = current.clone();
            next.status = MeetingStatus::Rejected;
            next.cancellation_reason = Some(reason.clone());
            next.cancelled_at = Some(now);
            next.updated_at = now;

            self.commit(&next, current.status).await?;
            self.notify_meeting(NotificationKind::Rejected, &next, Some(&reason))
                .await;
            Ok::<_, MsError>(next)
        }
        .await;

        Self::record("reject", &result);
        result
    }

    /// Either party cancels a scheduled meeting.
    #[instrument(skip_all, name = "ms.lifecycle.cancel", fields(meeting_id = %meeting_id))]
    pub async fn cancel(
        &self,
        meeting_id: MeetingId,
        acting_party_id: Uuid,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MsError> {
        let result = async {
            let reason = normalize_reason(reason)?.ok_or_else(|| {
                MsError::Validation("a cancellation reason is required".to_string())
            })?;

            let current = self.load_meeting(meeting_id).await?;
            ensure_transition(&current, MeetingStatus::Cancelled)?;

            if self.config.cancel_policy == CancelPolicy::Strict
                && acting_party_id != current.mentor_id.as_uuid()
                && acting_party_id != current.student_id.as_uuid()
            {
                return Err(MsError::Forbidden(
                    "Only the meeting's mentor or student can cancel it".to_string(),
                ));
            }

            let mut next = current.clone();
            next.status = MeetingStatus::Cancelled;
            next.cancellation_reason = Some(reason.clone());
            next.cancelled_at = Some(now);
            next.updated_at = now;

            self.commit(&next, current.status).await?;
            self.notify_meeting(NotificationKind::Cancelled, &next, Some(&reason))
                .await;
            Ok::<_, MsError>(next)
        }
        .await;

        Self::record("cancel", &result);
        result
    }

    /// Mentor marks a scheduled meeting as held.
    ///
    /// A missing or non-positive duration records the booked length.
    #[instrument(skip_all, name = "ms.lifecycle.complete", fields(meeting_id = %meeting_id))]
    pub async fn complete(
        &self,
        meeting_id: MeetingId,
        acting_mentor_id: MentorId,
        actual_duration: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MsError> {
        let result = async {
            let current = self.load_meeting(meeting_id).await?;
            Self::ensure_mentor(&current, acting_mentor_id, "complete")?;
            ensure_transition(&current, MeetingStatus::Completed)?;

            let minutes = actual_duration
                .filter(|d| *d > 0)
                .unwrap_or_else(|| current.duration.minutes());

            let mut next = current.clone();
            next.status = MeetingStatus::Completed;
            next.actual_duration = Some(minutes);
            next.updated_at = now;

            self.commit(&next, current.status).await?;
            Ok::<_, MsError>(next)
        }
        .await;

        Self::record("complete", &result);
        result
    }

    // ------------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------------

    /// Claim and send the reminder for one meeting if it is due.
    ///
    /// Returns `Ok(true)` when this call claimed the reminder. The claim is
    /// kept even if delivery fails, so a reminder is never sent twice.
    pub async fn send_reminder_if_due(
        &self,
        meeting: &Meeting,
        now: DateTime<Utc>,
    ) -> Result<bool, MsError> {
        if meeting.reminder_sent_at.is_some() || !self.config.scheduling.is_reminder_due(meeting, now)
        {
            return Ok(false);
        }

        if !self.meetings.claim_reminder(meeting.meeting_id, now).await? {
            debug!(
                target: "ms.services.lifecycle",
                meeting_id = %meeting.meeting_id,
                "Reminder already claimed"
            );
            return Ok(false);
        }

        let parties = self
            .load_parties(meeting.mentor_id, meeting.student_id)
            .await?;
        self.notifier.notify_reminder(&parties, meeting).await?;
        Ok(true)
    }

    /// Send every reminder that is due now.
    #[instrument(skip_all, name = "ms.lifecycle.reminder_sweep")]
    pub async fn run_reminder_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, MsError> {
        let mut report = SweepReport::default();

        for date in self.config.scheduling.reminder_sweep_dates(now) {
            for meeting in self.meetings.find_meetings_scheduled_on(date).await? {
                report.examined += 1;

                match self.send_reminder_if_due(&meeting, now).await {
                    Ok(true) => {
                        report.sent += 1;
                        metrics::record_notification(NotificationKind::Reminder.as_str(), "success");
                        info!(
                            target: "ms.services.lifecycle",
                            meeting_id = %meeting.meeting_id,
                            "Reminder sent"
                        );
                    }
                    Ok(false) => {}
                    Err(e) => {
                        report.failed += 1;
                        metrics::record_notification(NotificationKind::Reminder.as_str(), "error");
                        warn!(
                            target: "ms.services.lifecycle",
                            meeting_id = %meeting.meeting_id,
                            error = %e,
                            "Reminder delivery failed"
                        );
                    }
                }
            }
        }

        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn get_meeting(&self, meeting_id: MeetingId) -> Result<Meeting, MsError> {
        self.load_meeting(meeting_id).await
    }

    /// All of a mentor's meetings grouped for display.
    pub async fn mentor_meetings(
        &self,
        mentor_id: MentorId,
        now: DateTime<Utc>,
    ) -> Result<BucketedMeetings, MsError> {
        self.get_mentor(mentor_id).await?;

        let mut meetings = self.meetings.find_meetings_by_mentor(mentor_id).await?;
        meetings.sort_by_key(|m| (m.date, m.time));

        let mut buckets = BucketedMeetings::default();
        for meeting in meetings {
            match self.config.scheduling.bucket(&meeting, now) {
                MeetingBucket::Pending => buckets.pending.push(meeting),
                MeetingBucket::Upcoming => buckets.upcoming.push(meeting),
                MeetingBucket::Past => buckets.past.push(meeting),
            }
        }
        Ok(buckets)
    }

    /// The pair's pending or scheduled meeting, if any.
    pub async fn active_meeting(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
    ) -> Result<Option<Meeting>, MsError> {
        self.meetings
            .find_active_meeting(student_id, mentor_id)
            .await
    }

    /// The student's earliest scheduled meeting from today on, with its mentor.
    pub async fn next_upcoming_meeting(
        &self,
        student_id: StudentId,
        now: DateTime<Utc>,
    ) -> Result<Option<(Meeting, Mentor)>, MsError> {
        let today = self.config.scheduling.today(now);
        let Some(meeting) = self
            .meetings
            .find_next_scheduled_for_student(student_id, today)
            .await?
        else {
            return Ok(None);
        };

        let mentor = self.get_mentor(meeting.mentor_id).await?;
        Ok(Some((meeting, mentor)))
    }

    pub async fn list_mentors(&self) -> Result<Vec<Mentor>, MsError> {
        self.directory.list_mentors().await
    }

    pub async fn get_mentor(&self, mentor_id: MentorId) -> Result<Mentor, MsError> {
        self.directory
            .find_mentor(mentor_id)
            .await?
            .ok_or_else(|| MsError::NotFound("Mentor not found".to_string()))
    }

    pub async fn get_student(&self, student_id: StudentId) -> Result<Student, MsError> {
        self.directory
            .find_student(student_id)
            .await?
            .ok_or_else(|| MsError::NotFound("Student not found".to_string()))
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn load_meeting(&self, meeting_id: MeetingId) -> Result<Meeting, MsError> {
        self.meetings
            .find_meeting(meeting_id)
            .await?
            .ok_or_else(|| MsError::NotFound("Meeting not found".to_string()))
    }

    async fn load_parties(
        &self,
        mentor_id: MentorId,
        student_id: StudentId,
    ) -> Result<Parties, MsError> {
        let mentor = self.get_mentor(mentor_id).await?;
        let student = self.get_student(student_id).await?;
        Ok(Parties { mentor, student })
    }

    fn ensure_mentor(
        meeting: &Meeting,
        acting_mentor_id: MentorId,
        action: &str,
    ) -> Result<(), MsError> {
        if meeting.mentor_id == acting_mentor_id {
            Ok(())
        } else {
            Err(MsError::Forbidden(format!(
                "Only the meeting's mentor can {action} it"
            )))
        }
    }

    async fn commit(&self, next: &Meeting, expected: MeetingStatus) -> Result<(), MsError> {
        if self.meetings.update_meeting(next, expected).await? {
            info!(
                target: "ms.services.lifecycle",
                meeting_id = %next.meeting_id,
                from = %expected,
                to = %next.status,
                "Meeting transitioned"
            );
            Ok(())
        } else {
            warn!(
                target: "ms.services.lifecycle",
                meeting_id = %next.meeting_id,
                from = %expected,
                to = %next.status,
                "Meeting changed concurrently"
            );
            Err(MsError::Conflict(
                "Meeting was modified concurrently, please retry".to_string(),
            ))
        }
    }

    fn record(transition: &'static str, result: &Result<Meeting, MsError>) {
        match result {
            Ok(_) => metrics::record_transition(transition, "success"),
            Err(e) => metrics::record_transition(transition, e.kind()),
        }
    }

    /// Load both parties and notify; every failure is logged and swallowed.
    async fn notify_meeting(&self, kind: NotificationKind, meeting: &Meeting, reason: Option<&str>) {
        match self
            .load_parties(meeting.mentor_id, meeting.student_id)
            .await
        {
            Ok(parties) => self.notify(kind, &parties, meeting, reason).await,
            Err(e) => {
                metrics::record_notification(kind.as_str(), "error");
                warn!(
                    target: "ms.services.lifecycle",
                    kind = kind.as_str(),
                    meeting_id = %meeting.meeting_id,
                    error = %e,
                    "Could not load parties for notification"
                );
            }
        }
    }

    async fn notify(
        &self,
        kind: NotificationKind,
        parties: &Parties,
        meeting: &Meeting,
        reason: Option<&str>,
    ) {
        let reason_text = reason.unwrap_or_default();
        let result = match kind {
            NotificationKind::Booked => self.notifier.notify_booked(parties, meeting).await,
            NotificationKind::Accepted => self.notifier.notify_accepted(parties, meeting).await,
            NotificationKind::Rejected => {
                self.notifier
                    .notify_rejected(parties, meeting, reason_text)
                    .await
            }
            NotificationKind::Cancelled => {
                self.notifier
                    .notify_cancelled(parties, meeting, reason_text)
                    .await
            }
            NotificationKind::Reminder => self.notifier.notify_reminder(parties, meeting).await,
        };

        match result {
            Ok(()) => metrics::record_notification(kind.as_str(), "success"),
            Err(e) => {
                metrics::record_notification(kind.as_str(), "error");
                warn!(
                    target: "ms.services.lifecycle",
                    kind = kind.as_str(),
                    meeting_id = %meeting.meeting_id,
                    error = %e,
                    "Notification failed, transition kept"
                );
            }
        }
    }
}
