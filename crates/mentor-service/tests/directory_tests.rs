//! Mentor directory and student lookup integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::Duration;
use ms_test_utils::{fixtures, TestMentorServer};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

async fn get(url: String) -> Result<(StatusCode, Value), anyhow::Error> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

async fn book(
    server: &TestMentorServer,
    mentor_id: Uuid,
    student_id: Uuid,
    date: &str,
    time: &str,
) -> Result<String, anyhow::Error> {
    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/v1/meetings", server.url()))
        .json(&json!({
            "mentor_id": mentor_id,
            "student_id": student_id,
            "date": date,
            "time": time,
            "duration": 30,
            "topic": "Portfolio review",
        }))
        .send()
        .await?
        .json()
        .await?;
    Ok(body["meeting_id"].as_str().unwrap().to_string())
}

async fn accept(
    server: &TestMentorServer,
    meeting_id: &str,
    mentor_id: Uuid,
) -> Result<(), anyhow::Error> {
    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/meetings/{}/accept", server.url(), meeting_id))
        .json(&json!({ "mentor_id": mentor_id }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_list_mentors_hides_email() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    server.store().add_mentor(fixtures::mentor("Edsger", "Dijkstra")).await;
    server.store().add_mentor(fixtures::mentor("Barbara", "Liskov")).await;

    let (status, body) = get(format!("{}/api/v1/mentors", server.url())).await?;
    assert_eq!(status, StatusCode::OK);

    let mentors = body["mentors"].as_array().unwrap();
    assert_eq!(mentors.len(), 2);
    assert_eq!(mentors[0]["last_name"], "Dijkstra");
    assert_eq!(mentors[1]["last_name"], "Liskov");
    assert!(mentors.iter().all(|m| m.get("email").is_none()));
    Ok(())
}

#[tokio::test]
async fn test_get_mentor_profile() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    let (mentor, _) = server.seed_pair().await;

    let (status, body) = get(format!("{}/api/v1/mentors/{}", server.url(), mentor.mentor_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Grace");
    assert!(body.get("email").is_none());

    let (status, body) = get(format!("{}/api/v1/mentors/{}", server.url(), Uuid::new_v4())).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_get_student_profile() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    let (_, student) = server.seed_pair().await;

    let (status, body) =
        get(format!("{}/api/v1/students/{}", server.url(), student.student_id)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student_id"], student.student_id.to_string());
    assert_eq!(body["first_name"], "Ada");
    assert_eq!(body["last_name"], "");
    assert_eq!(body["education_level"], "Undergraduate");
    assert!(body.get("email").is_none());

    let (status, body) = get(format!("{}/api/v1/students/{}", server.url(), Uuid::new_v4())).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = get(format!("{}/api/v1/students/not-a-uuid", server.url())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn test_mentor_meetings_are_bucketed() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    let (mentor, first) = server.seed_pair().await;
    let second = fixtures::student("Katherine");
    server.store().add_student(second.clone()).await;
    let mentor_id = mentor.mentor_id.as_uuid();

    book(&server, mentor_id, first.student_id.as_uuid(), "2026-03-12", "09:00").await?;
    let scheduled = book(&server, mentor_id, second.student_id.as_uuid(), "2026-03-11", "16:00").await?;
    accept(&server, &scheduled, mentor_id).await?;

    let url = format!("{}/api/v1/mentors/{}/meetings", server.url(), mentor_id);
    let (status, body) = get(url.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending"].as_array().unwrap().len(), 1);
    assert_eq!(body["upcoming"][0]["meeting_id"], scheduled);
    assert!(body["past"].as_array().unwrap().is_empty());

    // Once the start passes, the scheduled meeting moves to past.
    server.clock().advance(Duration::days(2));
    let (_, body) = get(url).await?;
    assert!(body["upcoming"].as_array().unwrap().is_empty());
    assert_eq!(body["past"][0]["meeting_id"], scheduled);
    Ok(())
}

#[tokio::test]
async fn test_mentor_meetings_unknown_mentor() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;

    let (status, _) = get(format!(
        "{}/api/v1/mentors/{}/meetings",
        server.url(),
        Uuid::new_v4()
    ))
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_active_meeting_for_pair() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    let (mentor, student) = server.seed_pair().await;
    let url = format!(
        "{}/api/v1/students/{}/mentors/{}/meeting",
        server.url(),
        student.student_id,
        mentor.mentor_id
    );

    let (status, body) = get(url.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["meeting"].is_null());

    let meeting_id = book(
        &server,
        mentor.mentor_id.as_uuid(),
        student.student_id.as_uuid(),
        "2026-03-11",
        "14:00",
    )
    .await?;

    let (_, body) = get(url).await?;
    assert_eq!(body["meeting"]["meeting_id"], meeting_id);
    assert_eq!(body["meeting"]["status"], "pending");
    Ok(())
}

#[tokio::test]
async fn test_upcoming_meeting_for_student() -> Result<(), anyhow::Error> {
    let server = TestMentorServer::spawn().await?;
    let (mentor, student) = server.seed_pair().await;
    let url = format!(
        "{}/api/v1/students/{}/meetings/upcoming",
        server.url(),
        student.student_id
    );

    let meeting_id = book(
        &server,
        mentor.mentor_id.as_uuid(),
        student.student_id.as_uuid(),
        "2026-03-11",
        "14:00",
    )
    .await?;

    // Pending meetings are not upcoming.
    let (_, body) = get(url.clone()).await?;
    assert!(body["meeting"].is_null());

    accept(&server, &meeting_id, mentor.mentor_id.as_uuid()).await?;

    let (status, body) = get(url).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meeting"]["meeting_id"], meeting_id);
    assert_eq!(body["meeting"]["mentor_name"], "Grace Hopper");
    assert_eq!(body["meeting"]["status"], "scheduled");
    Ok(())
}
