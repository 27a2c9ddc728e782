//! Observability module for Mentor Service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
