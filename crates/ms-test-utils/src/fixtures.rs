//! Directory records for tests.

use common::types::{MentorId, StudentId};
use mentor_service::models::{Mentor, Student};

/// A mentor with a fresh id and an address derived from the first name.
pub fn mentor(first_name: &str, last_name: &str) -> Mentor {
    Mentor {
        mentor_id: MentorId::new(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@mentors.test", first_name.to_lowercase()),
        years_of_experience: Some(10),
        areas_of_interest: vec!["Software".to_string()],
        bio: Some(format!("{first_name} mentors early-career engineers.")),
        profile_picture: None,
    }
}

/// A student with a fresh id and an address derived from the first name.
pub fn student(first_name: &str) -> Student {
    Student {
        student_id: StudentId::new(),
        first_name: first_name.to_string(),
        last_name: None,
        email: format!("{}@students.test", first_name.to_lowercase()),
        education_level: Some("Undergraduate".to_string()),
        current_school: None,
        goals: None,
        areas_of_interest: vec![],
    }
}
