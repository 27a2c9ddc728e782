//! Mentor Service Library
//!
//! Meeting lifecycle and scheduling engine for the mentor-matching platform:
//!
//! - Booking requests inside the booking window
//! - Accept, reject, cancel and complete transitions
//! - Join-call window, countdown and display buckets
//! - Pre-meeting reminders from a background sweep
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Domain and API models
//! - `observability` - Prometheus metrics
//! - `repositories` - Meeting and directory stores
//! - `routes` - Axum router setup
//! - `services` - Lifecycle engine, scheduling rules, notifications
//! - `tasks` - Background reminder sweep

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
