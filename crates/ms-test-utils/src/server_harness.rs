//! Test server harness for E2E testing
//!
//! Provides `TestMentorServer` for spawning real Mentor Service routers in
//! tests, backed by the in-memory store, a recording notifier and a fixed
//! clock the test can move.

use crate::fixtures;
use chrono::{DateTime, TimeZone, Utc};
use mentor_service::models::{Mentor, Student};
use mentor_service::repositories::InMemoryStore;
use mentor_service::routes::{self, AppState};
use mentor_service::services::clock::mock::FixedClock;
use mentor_service::services::lifecycle::{LifecycleConfig, MeetingLifecycle};
use mentor_service::services::notifier::mock::RecordingNotifier;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Instant the harness clock starts at: Tuesday 2026-03-10 10:00 UTC.
pub fn default_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Test harness for spawning Mentor Service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let server = TestMentorServer::spawn().await?;
/// let (mentor, student) = server.seed_pair().await;
/// server.clock().advance(chrono::Duration::days(1));
/// ```
pub struct TestMentorServer {
    addr: SocketAddr,
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FixedClock>,
    lifecycle: Arc<MeetingLifecycle>,
    _handle: JoinHandle<()>,
}

impl TestMentorServer {
    /// Spawn a server with default lifecycle settings.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(LifecycleConfig::default()).await
    }

    /// Spawn a server with the given lifecycle settings.
    ///
    /// The server binds to a random port on 127.0.0.1.
    pub async fn spawn_with(config: LifecycleConfig) -> Result<Self, anyhow::Error> {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(FixedClock::new(default_now()));

        let lifecycle = Arc::new(MeetingLifecycle::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            config,
        ));

        let state = Arc::new(AppState {
            lifecycle: lifecycle.clone(),
            clock: clock.clone(),
        });

        // A recorder that is not installed globally; each server gets its own.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            notifier,
            clock,
            lifecycle,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Backing store, for seeding and inspecting state.
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Notifications sent so far.
    pub fn notifier(&self) -> &Arc<RecordingNotifier> {
        &self.notifier
    }

    /// Clock shared by the handlers.
    pub fn clock(&self) -> &Arc<FixedClock> {
        &self.clock
    }

    /// Engine behind the router, for driving the reminder sweep directly.
    pub fn lifecycle(&self) -> &Arc<MeetingLifecycle> {
        &self.lifecycle
    }

    /// Seed one mentor and one student.
    pub async fn seed_pair(&self) -> (Mentor, Student) {
        let mentor = fixtures::mentor("Grace", "Hopper");
        let student = fixtures::student("Ada");
        self.store.add_mentor(mentor.clone()).await;
        self.store.add_student(student.clone()).await;
        (mentor, student)
    }
}

impl Drop for TestMentorServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_and_answers_health() -> Result<(), anyhow::Error> {
        let server = TestMentorServer::spawn().await?;
        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_pair_is_visible() -> Result<(), anyhow::Error> {
        let server = TestMentorServer::spawn().await?;
        let (mentor, _) = server.seed_pair().await;

        let body: serde_json::Value =
            reqwest::get(format!("{}/api/v1/mentors", server.url()))
                .await?
                .json()
                .await?;
        assert_eq!(body["mentors"][0]["mentor_id"], mentor.mentor_id.to_string());
        Ok(())
    }
}
