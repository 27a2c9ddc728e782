//! Secret types for values that must never reach logs.
//!
//! Re-exports [`secrecy`] types. Wrap SMTP credentials, database URLs with
//! embedded passwords, and any other credential in `SecretString` so that a
//! derived `Debug` on the containing struct redacts it automatically.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SmtpCredentials {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let creds = SmtpCredentials {
//!     username: "mailer".to_string(),
//!     password: SecretString::from("app-password"),
//! };
//!
//! // Debug output redacts the password
//! assert!(!format!("{creds:?}").contains("app-password"));
//!
//! // Reading the value is always explicit
//! let password: &str = creds.password.expose_secret();
//! assert_eq!(password, "app-password");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
