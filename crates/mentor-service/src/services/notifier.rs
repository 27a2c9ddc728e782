//! Notification port.
//!
//! The lifecycle engine tells both parties about bookings, decisions,
//! cancellations and upcoming calls through this trait. Delivery is
//! best-effort: the engine logs failures and never rolls back a transition
//! because a notification could not be sent.

use crate::errors::MsError;
use crate::models::{Meeting, Parties};
use async_trait::async_trait;
use tracing::info;

/// Kind of notification, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Booked,
    Accepted,
    Rejected,
    Cancelled,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booked => "booked",
            NotificationKind::Accepted => "accepted",
            NotificationKind::Rejected => "rejected",
            NotificationKind::Cancelled => "cancelled",
            NotificationKind::Reminder => "reminder",
        }
    }
}

/// Trait for delivering meeting notifications to both parties.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A student requested a meeting.
    async fn notify_booked(&self, parties: &Parties, meeting: &Meeting) -> Result<(), MsError>;

    /// The mentor accepted the request.
    async fn notify_accepted(&self, parties: &Parties, meeting: &Meeting)
        -> Result<(), MsError>;

    /// The mentor declined the request.
    async fn notify_rejected(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError>;

    /// A scheduled meeting was cancelled.
    async fn notify_cancelled(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError>;

    /// The meeting starts in about thirty minutes.
    async fn notify_reminder(&self, parties: &Parties, meeting: &Meeting)
        -> Result<(), MsError>;
}

/// Notifier that only writes a log line per notification.
///
/// Used when no email transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    fn log(kind: NotificationKind, parties: &Parties, meeting: &Meeting, reason: Option<&str>) {
        info!(
            target: "ms.services.notifier",
            kind = kind.as_str(),
            meeting_id = %meeting.meeting_id,
            mentor_id = %parties.mentor.mentor_id,
            student_id = %parties.student.student_id,
            date = %meeting.date,
            time = %meeting.time.format("%H:%M"),
            reason = reason.unwrap_or_default(),
            "Notification (log transport)"
        );
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_booked(&self, parties: &Parties, meeting: &Meeting) -> Result<(), MsError> {
        Self::log(NotificationKind::Booked, parties, meeting, None);
        Ok(())
    }

    async fn notify_accepted(
        &self,
        parties: &Parties,
        meeting: &Meeting,
    ) -> Result<(), MsError> {
        Self::log(NotificationKind::Accepted, parties, meeting, None);
        Ok(())
    }

    async fn notify_rejected(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError> {
        Self::log(NotificationKind::Rejected, parties, meeting, Some(reason));
        Ok(())
    }

    async fn notify_cancelled(
        &self,
        parties: &Parties,
        meeting: &Meeting,
        reason: &str,
    ) -> Result<(), MsError> {
        Self::log(NotificationKind::Cancelled, parties, meeting, Some(reason));
        Ok(())
    }

    async fn notify_reminder(
        &self,
        parties: &Parties,
        meeting: &Meeting,
    ) -> Result<(), MsError> {
        Self::log(NotificationKind::Reminder, parties, meeting, None);
        Ok(())
    }
}

/// Mock notifier for testing.
pub mod mock {
    use super::*;
    use common::types::MeetingId;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// A notification captured by [`RecordingNotifier`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentNotification {
        pub kind: NotificationKind,
        pub meeting_id: MeetingId,
        pub mentor_email: String,
        pub student_email: String,
        pub reason: Option<String>,
    }

    /// Records every notification it is asked to deliver.
    ///
    /// A failing notifier still records the attempt before returning an error.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<SentNotification>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        /// Create a notifier that accepts every notification.
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a notifier whose deliveries always fail.
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.set_failing(true);
            notifier
        }

        /// Toggle delivery failures.
        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        /// Everything recorded so far, oldest first.
        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .clone()
        }

        /// Number of recorded notifications of one kind.
        pub fn count_of(&self, kind: NotificationKind) -> usize {
            self.sent().iter().filter(|n| n.kind == kind).count()
        }

        /// Forget everything recorded so far.
        pub fn clear(&self) {
            self.sent
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .clear();
        }

        fn record(
            &self,
            kind: NotificationKind,
            parties: &Parties,
            meeting: &Meeting,
            reason: Option<&str>,
        ) -> Result<(), MsError> {
            self.sent
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(SentNotification {
                    kind,
                    meeting_id: meeting.meeting_id,
                    mentor_email: parties.mentor.email.clone(),
                    student_email: parties.student.email.clone(),
                    reason: reason.map(str::to_string),
                });

            if self.fail.load(Ordering::SeqCst) {
                return Err(MsError::ServiceUnavailable(
                    "mock notifier configured to fail".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_booked(
            &self,
            parties: &Parties,
            meeting: &Meeting,
        ) -> Result<(), MsError> {
            self.record(NotificationKind::Booked, parties, meeting, None)
        }

        async fn notify_accepted(
            &self,
            parties: &Parties,
            meeting: &Meeting,
        ) -> Result<(), MsError> {
            self.record(NotificationKind::Accepted, parties, meeting, None)
        }

        async fn notify_rejected(
            &self,
            parties: &Parties,
            meeting: &Meeting,
            reason: &str,
        ) -> Result<(), MsError> {
            self.record(NotificationKind::Rejected, parties, meeting, Some(reason))
        }

        async fn notify_cancelled(
            &self,
            parties: &Parties,
            meeting: &Meeting,
            reason: &str,
        ) -> Result<(), MsError> {
            self.record(NotificationKind::Cancelled, parties, meeting, Some(reason))
        }

        async fn notify_reminder(
            &self,
            parties: &Parties,
            meeting: &Meeting,
        ) -> Result<(), MsError> {
            self.record(NotificationKind::Reminder, parties, meeting, None)
        }
    }
}
