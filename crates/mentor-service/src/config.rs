//! Mentor Service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use crate::services::lifecycle::{CancelPolicy, LifecycleConfig, RejectReasonPolicy};
use crate::services::scheduling::SchedulingPolicy;
use chrono::FixedOffset;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default minimum lead time for same-day bookings.
pub const DEFAULT_BOOKING_LEAD_MINUTES: i64 = 30;

/// Default number of days ahead a meeting may be booked.
pub const DEFAULT_BOOKING_HORIZON_DAYS: i64 = 30;

/// Default reminder sweep interval in seconds.
pub const DEFAULT_REMINDER_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// The sweep must run more often than the reminder window is wide,
/// otherwise a meeting can slip through between two ticks.
pub const MAX_REMINDER_SWEEP_INTERVAL_SECONDS: u64 = 119;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default directory for the file email transport.
pub const DEFAULT_EMAIL_FILE_DIR: &str = "./emails";

/// Default sender address.
pub const DEFAULT_EMAIL_FROM_ADDRESS: &str = "noreply@localhost";

/// Default sender display name.
pub const DEFAULT_EMAIL_FROM_NAME: &str = "MentorConnect";

/// How outgoing notifications are delivered.
#[derive(Clone)]
pub enum EmailTransportConfig {
    /// Log notifications instead of sending them.
    Log,

    /// Write each email as a file into a directory.
    File { dir: PathBuf },

    /// Relay through an SMTP server.
    Smtp(SmtpConfig),
}

impl EmailTransportConfig {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTransportConfig::Log => "log",
            EmailTransportConfig::File { .. } => "file",
            EmailTransportConfig::Smtp(_) => "smtp",
        }
    }
}

/// SMTP relay settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    /// Protected by `SecretString` to prevent accidental logging.
    pub password: Option<SecretString>,
    /// STARTTLS when true, plaintext otherwise (local relays only).
    pub use_tls: bool,
}

/// Notification email settings.
#[derive(Clone)]
pub struct EmailConfig {
    pub transport: EmailTransportConfig,
    pub from_address: String,
    pub from_name: String,
}

/// Mentor Service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Database URL and SMTP password are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Minimum lead time for bookings on the current day, in minutes.
    pub booking_lead_minutes: i64,

    /// How many days ahead a meeting may be booked.
    pub booking_horizon_days: i64,

    /// Fixed UTC offset of the zone meeting dates and times are expressed in.
    pub schedule_utc_offset: FixedOffset,

    /// Who may cancel a scheduled meeting.
    pub cancel_policy: CancelPolicy,

    /// Whether a rejection must carry a reason.
    pub reject_reason_policy: RejectReasonPolicy,

    /// Reminder sweep interval in seconds (default: 60).
    pub reminder_sweep_interval_seconds: u64,

    /// Graceful shutdown drain period in seconds (default: 30).
    pub drain_seconds: u64,

    /// Notification email settings.
    pub email: EmailConfig,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("booking_lead_minutes", &self.booking_lead_minutes)
            .field("booking_horizon_days", &self.booking_horizon_days)
            .field("schedule_utc_offset", &self.schedule_utc_offset)
            .field("cancel_policy", &self.cancel_policy)
            .field("reject_reason_policy", &self.reject_reason_policy)
            .field(
                "reminder_sweep_interval_seconds",
                &self.reminder_sweep_interval_seconds,
            )
            .field("drain_seconds", &self.drain_seconds)
            .field("email", &self.email)
            .finish()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("EmailConfig");
        s.field("transport", &self.transport.name());
        match &self.transport {
            EmailTransportConfig::Log => {}
            EmailTransportConfig::File { dir } => {
                s.field("dir", dir);
            }
            EmailTransportConfig::Smtp(smtp) => {
                s.field("smtp_host", &smtp.host)
                    .field("smtp_port", &smtp.port)
                    .field("smtp_username", &smtp.username)
                    .field(
                        "smtp_password",
                        &smtp.password.as_ref().map(|_| "[REDACTED]"),
                    )
                    .field("smtp_tls", &smtp.use_tls);
            }
        }
        s.field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid booking window configuration: {0}")]
    InvalidBookingWindow(String),

    #[error("Invalid schedule offset configuration: {0}")]
    InvalidScheduleOffset(String),

    #[error("Invalid policy configuration: {0}")]
    InvalidPolicy(String),

    #[error("Invalid reminder sweep configuration: {0}")]
    InvalidReminderSweep(String),

    #[error("Invalid email configuration: {0}")]
    InvalidEmail(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

/// Parse an optional integer variable and check it against an inclusive range.
fn parse_bounded<T>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T, String>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: T = value_str.trim().parse().map_err(|e| {
        format!(
            "{} must be a valid integer, got '{}': {}",
            key, value_str, e
        )
    })?;

    if value < min || value > max {
        return Err(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        ));
    }

    Ok(value)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let booking_lead_minutes = parse_bounded(
            vars,
            "BOOKING_LEAD_MINUTES",
            DEFAULT_BOOKING_LEAD_MINUTES,
            1,
            1440,
        )
        .map_err(ConfigError::InvalidBookingWindow)?;

        let booking_horizon_days = parse_bounded(
            vars,
            "BOOKING_HORIZON_DAYS",
            DEFAULT_BOOKING_HORIZON_DAYS,
            1,
            365,
        )
        .map_err(ConfigError::InvalidBookingWindow)?;

        let offset_minutes = parse_bounded(vars, "SCHEDULE_UTC_OFFSET_MINUTES", 0i32, -720, 840)
            .map_err(ConfigError::InvalidScheduleOffset)?;
        let schedule_utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            ConfigError::InvalidScheduleOffset(format!(
                "SCHEDULE_UTC_OFFSET_MINUTES out of range: {}",
                offset_minutes
            ))
        })?;

        let cancel_policy = match vars.get("CANCEL_POLICY") {
            Some(value) => value.parse().map_err(ConfigError::InvalidPolicy)?,
            None => CancelPolicy::default(),
        };

        let reject_reason_policy = match vars.get("REJECT_REASON_POLICY") {
            Some(value) => value.parse().map_err(ConfigError::InvalidPolicy)?,
            None => RejectReasonPolicy::default(),
        };

        let reminder_sweep_interval_seconds = parse_bounded(
            vars,
            "REMINDER_SWEEP_INTERVAL_SECONDS",
            DEFAULT_REMINDER_SWEEP_INTERVAL_SECONDS,
            1,
            MAX_REMINDER_SWEEP_INTERVAL_SECONDS,
        )
        .map_err(ConfigError::InvalidReminderSweep)?;

        let drain_seconds = parse_bounded(vars, "DRAIN_SECONDS", DEFAULT_DRAIN_SECONDS, 0, 300)
            .map_err(ConfigError::InvalidDrainPeriod)?;

        let email = Self::email_from_vars(vars)?;

        Ok(Config {
            database_url,
            bind_address,
            booking_lead_minutes,
            booking_horizon_days,
            schedule_utc_offset,
            cancel_policy,
            reject_reason_policy,
            reminder_sweep_interval_seconds,
            drain_seconds,
            email,
        })
    }

    fn email_from_vars(vars: &HashMap<String, String>) -> Result<EmailConfig, ConfigError> {
        let transport_name = vars
            .get("EMAIL_TRANSPORT")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "log".to_string());

        let transport = match transport_name.as_str() {
            "log" => EmailTransportConfig::Log,
            "file" => EmailTransportConfig::File {
                dir: PathBuf::from(
                    vars.get("EMAIL_FILE_DIR")
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_EMAIL_FILE_DIR.to_string()),
                ),
            },
            "smtp" => {
                let host = vars
                    .get("SMTP_HOST")
                    .filter(|h| !h.trim().is_empty())
                    .ok_or_else(|| {
                        ConfigError::InvalidEmail(
                            "SMTP_HOST is required when EMAIL_TRANSPORT=smtp".to_string(),
                        )
                    })?
                    .clone();

                let port = parse_bounded(vars, "SMTP_PORT", DEFAULT_SMTP_PORT, 1, u16::MAX)
                    .map_err(ConfigError::InvalidEmail)?;

                let username = vars.get("SMTP_USERNAME").cloned();
                let password = vars.get("SMTP_PASSWORD").cloned().map(SecretString::from);
                if username.is_some() != password.is_some() {
                    return Err(ConfigError::InvalidEmail(
                        "SMTP_USERNAME and SMTP_PASSWORD must be set together".to_string(),
                    ));
                }

                let use_tls = match vars.get("SMTP_TLS").map(|v| v.trim().to_ascii_lowercase()) {
                    None => true,
                    Some(v) if v == "true" || v == "1" => true,
                    Some(v) if v == "false" || v == "0" => false,
                    Some(other) => {
                        return Err(ConfigError::InvalidEmail(format!(
                            "SMTP_TLS must be true or false, got '{}'",
                            other
                        )))
                    }
                };

                EmailTransportConfig::Smtp(SmtpConfig {
                    host,
                    port,
                    username,
                    password,
                    use_tls,
                })
            }
            other => {
                return Err(ConfigError::InvalidEmail(format!(
                    "EMAIL_TRANSPORT must be one of smtp, file, log, got '{}'",
                    other
                )))
            }
        };

        let from_address = vars
            .get("EMAIL_FROM_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_EMAIL_FROM_ADDRESS.to_string());

        if !from_address.contains('@') {
            return Err(ConfigError::InvalidEmail(format!(
                "EMAIL_FROM_ADDRESS must be an email address, got '{}'",
                from_address
            )));
        }

        let from_name = vars
            .get("EMAIL_FROM_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_EMAIL_FROM_NAME.to_string());

        Ok(EmailConfig {
            transport,
            from_address,
            from_name,
        })
    }

    /// Booking window and timing rules derived from this configuration.
    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::new(
            self.schedule_utc_offset,
            self.booking_lead_minutes,
            self.booking_horizon_days,
        )
    }

    /// Lifecycle engine settings derived from this configuration.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            scheduling: self.scheduling_policy(),
            cancel_policy: self.cancel_policy,
            reject_reason_policy: self.reject_reason_policy,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "DATABASE_URL".to_string(),
            "postgresql://localhost/mentor_test".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let vars = base_vars();

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.database_url, "postgresql://localhost/mentor_test");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.booking_lead_minutes, DEFAULT_BOOKING_LEAD_MINUTES);
        assert_eq!(config.booking_horizon_days, DEFAULT_BOOKING_HORIZON_DAYS);
        assert_eq!(config.schedule_utc_offset.local_minus_utc(), 0);
        assert_eq!(config.cancel_policy, CancelPolicy::Lenient);
        assert_eq!(config.reject_reason_policy, RejectReasonPolicy::Require);
        assert_eq!(
            config.reminder_sweep_interval_seconds,
            DEFAULT_REMINDER_SWEEP_INTERVAL_SECONDS
        );
        assert_eq!(config.drain_seconds, DEFAULT_DRAIN_SECONDS);
        assert!(matches!(config.email.transport, EmailTransportConfig::Log));
        assert_eq!(config.email.from_address, DEFAULT_EMAIL_FROM_ADDRESS);
        assert_eq!(config.email.from_name, DEFAULT_EMAIL_FROM_NAME);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("BOOKING_LEAD_MINUTES".to_string(), "60".to_string());
        vars.insert("BOOKING_HORIZON_DAYS".to_string(), "14".to_string());
        vars.insert("SCHEDULE_UTC_OFFSET_MINUTES".to_string(), "330".to_string());
        vars.insert("CANCEL_POLICY".to_string(), "strict".to_string());
        vars.insert("REJECT_REASON_POLICY".to_string(), "default".to_string());
        vars.insert(
            "REMINDER_SWEEP_INTERVAL_SECONDS".to_string(),
            "30".to_string(),
        );
        vars.insert("DRAIN_SECONDS".to_string(), "5".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.booking_lead_minutes, 60);
        assert_eq!(config.booking_horizon_days, 14);
        assert_eq!(config.schedule_utc_offset.local_minus_utc(), 330 * 60);
        assert_eq!(config.cancel_policy, CancelPolicy::Strict);
        assert_eq!(config.reject_reason_policy, RejectReasonPolicy::UseDefault);
        assert_eq!(config.reminder_sweep_interval_seconds, 30);
        assert_eq!(config.drain_seconds, 5);
    }

    #[test]
    fn test_from_vars_missing_database_url() {
        let vars = HashMap::new();

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_booking_lead_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("BOOKING_LEAD_MINUTES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidBookingWindow(msg)) if msg.contains("must be between 1 and 1440"))
        );
    }

    #[test]
    fn test_booking_horizon_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("BOOKING_HORIZON_DAYS".to_string(), "a month".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidBookingWindow(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_schedule_offset_rejects_out_of_range() {
        let mut vars = base_vars();
        vars.insert("SCHEDULE_UTC_OFFSET_MINUTES".to_string(), "900".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidScheduleOffset(_))));
    }

    #[test]
    fn test_schedule_offset_accepts_negative() {
        let mut vars = base_vars();
        vars.insert("SCHEDULE_UTC_OFFSET_MINUTES".to_string(), "-300".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.schedule_utc_offset.local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_unknown_cancel_policy_rejected() {
        let mut vars = base_vars();
        vars.insert("CANCEL_POLICY".to_string(), "anyone".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidPolicy(msg)) if msg.contains("CANCEL_POLICY"))
        );
    }

    #[test]
    fn test_reminder_sweep_interval_must_fit_window() {
        let mut vars = base_vars();
        vars.insert(
            "REMINDER_SWEEP_INTERVAL_SECONDS".to_string(),
            "120".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidReminderSweep(msg)) if msg.contains("between 1 and 119"))
        );
    }

    #[test]
    fn test_file_transport_uses_default_dir() {
        let mut vars = base_vars();
        vars.insert("EMAIL_TRANSPORT".to_string(), "file".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert!(matches!(
            config.email.transport,
            EmailTransportConfig::File { ref dir } if *dir == PathBuf::from(DEFAULT_EMAIL_FILE_DIR)
        ));
    }

    #[test]
    fn test_smtp_transport_requires_host() {
        let mut vars = base_vars();
        vars.insert("EMAIL_TRANSPORT".to_string(), "smtp".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidEmail(msg)) if msg.contains("SMTP_HOST"))
        );
    }

    #[test]
    fn test_smtp_transport_full() {
        let mut vars = base_vars();
        vars.insert("EMAIL_TRANSPORT".to_string(), "SMTP".to_string());
        vars.insert("SMTP_HOST".to_string(), "smtp.example.com".to_string());
        vars.insert("SMTP_PORT".to_string(), "2525".to_string());
        vars.insert("SMTP_USERNAME".to_string(), "mailer".to_string());
        vars.insert("SMTP_PASSWORD".to_string(), "hunter2".to_string());
        vars.insert("SMTP_TLS".to_string(), "false".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        let smtp = match &config.email.transport {
            EmailTransportConfig::Smtp(smtp) => Some(smtp),
            _ => None,
        }
        .expect("expected smtp transport");

        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert_eq!(
            smtp.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("hunter2".to_string())
        );
        assert!(!smtp.use_tls);
    }

    #[test]
    fn test_smtp_credentials_must_be_paired() {
        let mut vars = base_vars();
        vars.insert("EMAIL_TRANSPORT".to_string(), "smtp".to_string());
        vars.insert("SMTP_HOST".to_string(), "smtp.example.com".to_string());
        vars.insert("SMTP_USERNAME".to_string(), "mailer".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidEmail(msg)) if msg.contains("set together"))
        );
    }

    #[test]
    fn test_unknown_email_transport_rejected() {
        let mut vars = base_vars();
        vars.insert("EMAIL_TRANSPORT".to_string(), "pigeon".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidEmail(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = base_vars();
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://admin:sup3rs3cret@db/mentor".to_string(),
        );
        vars.insert("EMAIL_TRANSPORT".to_string(), "smtp".to_string());
        vars.insert("SMTP_HOST".to_string(), "smtp.example.com".to_string());
        vars.insert("SMTP_USERNAME".to_string(), "mailer".to_string());
        vars.insert("SMTP_PASSWORD".to_string(), "hunter2".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        let debug = format!("{:?}", config);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sup3rs3cret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("smtp.example.com"));
    }
}
