//! Postgres meeting store.
//!
//! # Concurrency
//!
//! - Booking relies on the partial unique index over active meetings per
//!   student/mentor pair; a second concurrent insert becomes a no-op.
//! - Transitions are `UPDATE ... WHERE status = <expected>`, so the second of
//!   two racing writers affects no rows.
//! - The reminder claim only succeeds while `reminder_sent_at IS NULL`.

use crate::errors::MsError;
use crate::models::{Meeting, MeetingDuration, MeetingStatus};
use crate::observability::metrics;
use crate::repositories::MeetingStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::types::{MeetingId, MentorId, StudentId};
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Record query metrics and convert the error.
pub(crate) fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, MsError> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
    Ok(result?)
}

/// Meeting store backed by Postgres.
#[derive(Clone)]
pub struct PgMeetingStore {
    pool: PgPool,
}

impl PgMeetingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingStore for PgMeetingStore {
    #[instrument(skip_all, name = "ms.repo.find_meeting", fields(meeting_id = %meeting_id))]
    async fn find_meeting(&self, meeting_id: MeetingId) -> Result<Option<Meeting>, MsError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, cancellation_reason, cancelled_at,
                actual_duration_minutes, reminder_sent_at, created_at, updated_at
            FROM meetings
            WHERE meeting_id = $1
            "#,
        )
        .bind(meeting_id.as_uuid())
        .fetch_optional(&self.pool)
        .await;

        observe("find_meeting", start, row)?
            .map(map_row_to_meeting)
            .transpose()
    }

    #[instrument(skip_all, name = "ms.repo.insert_meeting", fields(meeting_id = %meeting.meeting_id))]
    async fn insert_meeting(&self, meeting: &Meeting) -> Result<bool, MsError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            INSERT INTO meetings (
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (student_id, mentor_id) WHERE status IN ('pending', 'scheduled')
            DO NOTHING
            "#,
        )
        .bind(meeting.meeting_id.as_uuid()) // $1
        .bind(meeting.mentor_id.as_uuid()) // $2
        .bind(meeting.student_id.as_uuid()) // $3
        .bind(meeting.date) // $4
        .bind(meeting.time) // $5
        .bind(meeting.duration.minutes()) // $6
        .bind(&meeting.topic) // $7
        .bind(meeting.status.as_str()) // $8
        .bind(meeting.created_at) // $9
        .bind(meeting.updated_at) // $10
        .execute(&self.pool)
        .await;

        Ok(observe("insert_meeting", start, result)?.rows_affected() == 1)
    }

    #[instrument(
        skip_all,
        name = "ms.repo.update_meeting",
        fields(meeting_id = %meeting.meeting_id, from = %expected_status, to = %meeting.status)
    )]
    async fn update_meeting(
        &self,
        meeting: &Meeting,
        expected_status: MeetingStatus,
    ) -> Result<bool, MsError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET
                status = $2,
                cancellation_reason = $3,
                cancelled_at = $4,
                actual_duration_minutes = $5,
                updated_at = $6
            WHERE meeting_id = $1 AND status = $7
            "#,
        )
        .bind(meeting.meeting_id.as_uuid()) // $1
        .bind(meeting.status.as_str()) // $2
        .bind(meeting.cancellation_reason.as_deref()) // $3
        .bind(meeting.cancelled_at) // $4
        .bind(meeting.actual_duration) // $5
        .bind(meeting.updated_at) // $6
        .bind(expected_status.as_str()) // $7
        .execute(&self.pool)
        .await;

        Ok(observe("update_meeting", start, result)?.rows_affected() == 1)
    }

    #[instrument(skip_all, name = "ms.repo.find_meetings_by_mentor", fields(mentor_id = %mentor_id))]
    async fn find_meetings_by_mentor(&self, mentor_id: MentorId) -> Result<Vec<Meeting>, MsError> {
        let start = Instant::now();

        let rows = sqlx::query(
            r#"
            SELECT
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, cancellation_reason, cancelled_at,
                actual_duration_minutes, reminder_sent_at, created_at, updated_at
            FROM meetings
            WHERE mentor_id = $1
            ORDER BY meeting_date, meeting_time
            "#,
        )
        .bind(mentor_id.as_uuid())
        .fetch_all(&self.pool)
        .await;

        observe("find_meetings_by_mentor", start, rows)?
            .into_iter()
            .map(map_row_to_meeting)
            .collect()
    }

    #[instrument(skip_all, name = "ms.repo.find_active_meeting")]
    async fn find_active_meeting(
        &self,
        student_id: StudentId,
        mentor_id: MentorId,
    ) -> Result<Option<Meeting>, MsError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, cancellation_reason, cancelled_at,
                actual_duration_minutes, reminder_sent_at, created_at, updated_at
            FROM meetings
            WHERE student_id = $1
              AND mentor_id = $2
              AND status IN ('pending', 'scheduled')
            LIMIT 1
            "#,
        )
        .bind(student_id.as_uuid())
        .bind(mentor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await;

        observe("find_active_meeting", start, row)?
            .map(map_row_to_meeting)
            .transpose()
    }

    #[instrument(skip_all, name = "ms.repo.find_meetings_scheduled_on", fields(date = %date))]
    async fn find_meetings_scheduled_on(&self, date: NaiveDate) -> Result<Vec<Meeting>, MsError> {
        let start = Instant::now();

        let rows = sqlx::query(
            r#"
            SELECT
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, cancellation_reason, cancelled_at,
                actual_duration_minutes, reminder_sent_at, created_at, updated_at
            FROM meetings
            WHERE meeting_date = $1 AND status = 'scheduled'
            ORDER BY meeting_time
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await;

        observe("find_meetings_scheduled_on", start, rows)?
            .into_iter()
            .map(map_row_to_meeting)
            .collect()
    }

    #[instrument(skip_all, name = "ms.repo.find_next_scheduled_for_student")]
    async fn find_next_scheduled_for_student(
        &self,
        student_id: StudentId,
        from_date: NaiveDate,
    ) -> Result<Option<Meeting>, MsError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT
                meeting_id, mentor_id, student_id, meeting_date, meeting_time,
                duration_minutes, topic, status, cancellation_reason, cancelled_at,
                actual_duration_minutes, reminder_sent_at, created_at, updated_at
            FROM meetings
            WHERE student_id = $1
              AND status = 'scheduled'
              AND meeting_date >= $2
            ORDER BY meeting_date, meeting_time
            LIMIT 1
            "#,
        )
        .bind(student_id.as_uuid())
        .bind(from_date)
        .fetch_optional(&self.pool)
        .await;

        observe("find_next_scheduled_for_student", start, row)?
            .map(map_row_to_meeting)
            .transpose()
    }

    #[instrument(skip_all, name = "ms.repo.claim_reminder", fields(meeting_id = %meeting_id))]
    async fn claim_reminder(
        &self,
        meeting_id: MeetingId,
        at: DateTime<Utc>,
    ) -> Result<bool, MsError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET reminder_sent_at = $2, updated_at = $2
            WHERE meeting_id = $1
              AND status = 'scheduled'
              AND reminder_sent_at IS NULL
            "#,
        )
        .bind(meeting_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await;

        Ok(observe("claim_reminder", start, result)?.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<(), MsError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        observe("ping", start, result)?;
        Ok(())
    }
}

/// Map a database row to a `Meeting`.
///
/// Fails if the row carries a status or duration outside the known sets.
fn map_row_to_meeting(row: sqlx::postgres::PgRow) -> Result<Meeting, MsError> {
    let status: String = row.try_get("status")?;
    let duration: i32 = row.try_get("duration_minutes")?;

    Ok(Meeting {
        meeting_id: MeetingId(row.try_get::<Uuid, _>("meeting_id")?),
        mentor_id: MentorId(row.try_get::<Uuid, _>("mentor_id")?),
        student_id: StudentId(row.try_get::<Uuid, _>("student_id")?),
        date: row.try_get("meeting_date")?,
        time: row.try_get("meeting_time")?,
        duration: MeetingDuration::try_from(duration)
            .map_err(|_| MsError::Database(format!("invalid stored duration {duration}")))?,
        topic: row.try_get("topic")?,
        status: status.parse()?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        cancelled_at: row.try_get("cancelled_at")?,
        actual_duration: row.try_get("actual_duration_minutes")?,
        reminder_sent_at: row.try_get("reminder_sent_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
