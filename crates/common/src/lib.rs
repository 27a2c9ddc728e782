//! Common utilities and types shared across MentorConnect components.

#![warn(clippy::pedantic)]

/// Module for common data types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
