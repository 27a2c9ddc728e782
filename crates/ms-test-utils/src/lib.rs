//! # MS Test Utilities
//!
//! Shared test utilities for the Mentor Service.
//!
//! This crate provides:
//! - Server test harness (`TestMentorServer` for E2E tests)
//! - Directory fixtures (`fixtures::mentor`, `fixtures::student`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ms_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestMentorServer::spawn().await?;
//!     let response = reqwest::get(format!("{}/health", server.url())).await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod server_harness;

pub use server_harness::*;
