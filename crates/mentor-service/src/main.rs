//! Mentor Service
//!
//! Serves the meeting lifecycle API and runs the reminder sweep.

use mentor_service::config::{Config, EmailTransportConfig};
use mentor_service::observability::metrics::init_metrics_recorder;
use mentor_service::repositories::{PgDirectoryStore, PgMeetingStore};
use mentor_service::routes::{self, AppState};
use mentor_service::services::{
    Clock, EmailNotifier, LogNotifier, MeetingLifecycle, Notifier, SystemClock,
};
use mentor_service::tasks::start_reminder_sweep;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Mentor Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        booking_lead_minutes = config.booking_lead_minutes,
        booking_horizon_days = config.booking_horizon_days,
        schedule_utc_offset = %config.schedule_utc_offset,
        cancel_policy = ?config.cancel_policy,
        reject_reason_policy = ?config.reject_reason_policy,
        email_transport = config.email.transport.name(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_url_with_timeout = add_query_timeout(&config.database_url, 5);
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;
    info!("Database connection established");

    let notifier: Arc<dyn Notifier> = match &config.email.transport {
        EmailTransportConfig::Log => Arc::new(LogNotifier),
        _ => Arc::new(EmailNotifier::new(&config.email).map_err(|e| {
            error!("Failed to build email transport: {}", e);
            e
        })?),
    };

    let lifecycle = Arc::new(MeetingLifecycle::new(
        Arc::new(PgMeetingStore::new(db_pool.clone())),
        Arc::new(PgDirectoryStore::new(db_pool)),
        notifier,
        config.lifecycle_config(),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cancel_token = CancellationToken::new();
    let sweep_handle = tokio::spawn(start_reminder_sweep(
        lifecycle.clone(),
        clock.clone(),
        config.reminder_sweep_interval_seconds,
        cancel_token.clone(),
    ));

    let state = Arc::new(AppState { lifecycle, clock });
    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Mentor Service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.drain_seconds))
        .await?;

    cancel_token.cancel();
    if let Err(e) = sweep_handle.await {
        error!("Reminder sweep task ended abnormally: {}", e);
    }

    info!("Mentor Service shutdown complete");
    Ok(())
}

/// Install the tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mentor_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wait for SIGINT or SIGTERM, then hold for the drain period.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}

/// Append a server-side statement timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}
