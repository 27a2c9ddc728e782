//! Postgres directory of mentors and students.

use crate::errors::MsError;
use crate::models::{Mentor, Student};
use crate::repositories::meetings::observe;
use crate::repositories::DirectoryStore;
use async_trait::async_trait;
use common::types::{MentorId, StudentId};
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Directory store backed by Postgres.
#[derive(Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    #[instrument(skip_all, name = "ms.repo.find_mentor", fields(mentor_id = %mentor_id))]
    async fn find_mentor(&self, mentor_id: MentorId) -> Result<Option<Mentor>, MsError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT
                mentor_id, first_name, last_name, email, years_of_experience,
                areas_of_interest, bio, profile_picture
            FROM mentors
            WHERE mentor_id = $1
            "#,
        )
        .bind(mentor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await;

        observe("find_mentor", start, row)?
            .map(map_row_to_mentor)
            .transpose()
    }

    #[instrument(skip_all, name = "ms.repo.find_student", fields(student_id = %student_id))]
    async fn find_student(&self, student_id: StudentId) -> Result<Option<Student>, MsError> {
        let start = Instant::now();

        let row = sqlx::query(
            r#"
            SELECT
                student_id, first_name, last_name, email, education_level,
                current_school, goals, areas_of_interest
            FROM students
            WHERE student_id = $1
            "#,
        )
        .bind(student_id.as_uuid())
        .fetch_optional(&self.pool)
        .await;

        observe("find_student", start, row)?
            .map(map_row_to_student)
            .transpose()
    }

    #[instrument(skip_all, name = "ms.repo.list_mentors")]
    async fn list_mentors(&self) -> Result<Vec<Mentor>, MsError> {
        let start = Instant::now();

        let rows = sqlx::query(
            r#"
            SELECT
                mentor_id, first_name, last_name, email, years_of_experience,
                areas_of_interest, bio, profile_picture
            FROM mentors
            ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await;

        observe("list_mentors", start, rows)?
            .into_iter()
            .map(map_row_to_mentor)
            .collect()
    }
}

fn map_row_to_mentor(row: sqlx::postgres::PgRow) -> Result<Mentor, MsError> {
    Ok(Mentor {
        mentor_id: MentorId(row.try_get::<Uuid, _>("mentor_id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        years_of_experience: row.try_get("years_of_experience")?,
        areas_of_interest: row.try_get("areas_of_interest")?,
        bio: row.try_get("bio")?,
        profile_picture: row.try_get("profile_picture")?,
    })
}

fn map_row_to_student(row: sqlx::postgres::PgRow) -> Result<Student, MsError> {
    Ok(Student {
        student_id: StudentId(row.try_get::<Uuid, _>("student_id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        education_level: row.try_get("education_level")?,
        current_school: row.try_get("current_school")?,
        goals: row.try_get("goals")?,
        areas_of_interest: row.try_get("areas_of_interest")?,
    })
}
