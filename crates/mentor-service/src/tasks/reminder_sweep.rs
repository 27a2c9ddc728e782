//! Reminder sweep background task.
//!
//! Every interval, asks the lifecycle engine to send the reminders that are
//! due. The interval is shorter than the reminder window, so each scheduled
//! meeting is examined at least once while its reminder is due; the claim in
//! the store keeps it from being sent twice.
//!
//! # Graceful Shutdown
//!
//! When the cancellation token is cancelled, the task finishes the current
//! sweep and exits.

use crate::observability::metrics;
use crate::services::clock::Clock;
use crate::services::lifecycle::{MeetingLifecycle, SweepReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Start the reminder sweep task.
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "ms.task.reminder_sweep")]
pub async fn start_reminder_sweep(
    lifecycle: Arc<MeetingLifecycle>,
    clock: Arc<dyn Clock>,
    interval_seconds: u64,
    cancel_token: CancellationToken,
) {
    info!(
        target: "ms.task.reminder_sweep",
        interval_seconds,
        "Starting reminder sweep task"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_sweep(&lifecycle, clock.as_ref()).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "ms.task.reminder_sweep",
                    "Reminder sweep task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "ms.task.reminder_sweep", "Reminder sweep task stopped");
}

/// Run a single sweep and record its outcome.
///
/// Separated from the loop for direct testing.
pub(crate) async fn run_sweep(lifecycle: &MeetingLifecycle, clock: &dyn Clock) -> Option<SweepReport> {
    match lifecycle.run_reminder_sweep(clock.now()).await {
        Ok(report) => {
            metrics::record_reminder_sweep("success", report.sent as u64, report.failed as u64);
            if report.sent > 0 || report.failed > 0 {
                info!(
                    target: "ms.task.reminder_sweep",
                    examined = report.examined,
                    sent = report.sent,
                    failed = report.failed,
                    "Reminder sweep finished"
                );
            } else {
                debug!(
                    target: "ms.task.reminder_sweep",
                    examined = report.examined,
                    "Reminder sweep found nothing due"
                );
            }
            Some(report)
        }
        Err(e) => {
            metrics::record_reminder_sweep("error", 0, 0);
            error!(
                target: "ms.task.reminder_sweep",
                error = %e,
                "Reminder sweep failed"
            );
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{Meeting, MeetingDuration, MeetingStatus, Mentor, Student};
    use crate::repositories::InMemoryStore;
    use crate::services::clock::mock::FixedClock;
    use crate::services::lifecycle::LifecycleConfig;
    use crate::services::notifier::mock::RecordingNotifier;
    use crate::services::notifier::NotificationKind;
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
    use common::types::{MeetingId, MentorId, StudentId};

    struct Setup {
        store: Arc<InMemoryStore>,
        notifier: Arc<RecordingNotifier>,
        lifecycle: Arc<MeetingLifecycle>,
        meeting_id: MeetingId,
    }

    async fn setup() -> Setup {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let mentor = Mentor {
            mentor_id: MentorId::new(),
            first_name: "Alan".to_string(),
            last_name: "Turing".to_string(),
            email: "alan@example.com".to_string(),
            years_of_experience: None,
            areas_of_interest: vec![],
            bio: None,
            profile_picture: None,
        };
        let student = Student {
            student_id: StudentId::new(),
            first_name: "Joan".to_string(),
            last_name: None,
            email: "joan@example.com".to_string(),
            education_level: None,
            current_school: None,
            goals: None,
            areas_of_interest: vec![],
        };

        let created = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let meeting = Meeting {
            meeting_id: MeetingId::new(),
            mentor_id: mentor.mentor_id,
            student_id: student.student_id,
            date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            duration: MeetingDuration::ThreeQuarters,
            topic: "Research careers".to_string(),
            status: MeetingStatus::Scheduled,
            cancellation_reason: None,
            cancelled_at: None,
            actual_duration: None,
            reminder_sent_at: None,
            created_at: created,
            updated_at: created,
        };
        let meeting_id = meeting.meeting_id;

        store.add_mentor(mentor).await;
        store.add_student(student).await;
        store.put_meeting(meeting).await;

        let lifecycle = Arc::new(MeetingLifecycle::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            LifecycleConfig::default(),
        ));

        Setup {
            store,
            notifier,
            lifecycle,
            meeting_id,
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_run_sweep_sends_due_reminder() {
        let s = setup().await;
        let clock = FixedClock::new(at(11, 30));

        let report = run_sweep(&s.lifecycle, &clock).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(s.notifier.count_of(NotificationKind::Reminder), 1);

        let again = run_sweep(&s.lifecycle, &clock).await.unwrap();
        assert_eq!(again.sent, 0);
        assert_eq!(s.notifier.count_of(NotificationKind::Reminder), 1);
    }

    #[tokio::test]
    async fn test_run_sweep_outside_window_sends_nothing() {
        let s = setup().await;

        for now in [at(11, 0), at(11, 45)] {
            let report = run_sweep(&s.lifecycle, &FixedClock::new(now)).await.unwrap();
            assert_eq!(report.sent, 0);
        }
        assert!(s
            .store
            .meeting(s.meeting_id)
            .await
            .unwrap()
            .reminder_sent_at
            .is_none());
    }

    #[tokio::test]
    async fn test_run_sweep_store_failure_returns_none() {
        let s = setup().await;
        s.store.set_unavailable(true);

        assert!(run_sweep(&s.lifecycle, &FixedClock::new(at(11, 30)))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_task_exits_on_cancellation() {
        let s = setup().await;
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at(11, 30)));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(start_reminder_sweep(
            s.lifecycle.clone(),
            clock,
            1,
            cancel_token.clone(),
        ));

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_token.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("task should stop after cancellation")
            .expect("task should not panic");
        assert_eq!(s.notifier.count_of(NotificationKind::Reminder), 1);
    }
}
