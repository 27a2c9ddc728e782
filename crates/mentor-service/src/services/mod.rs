//! Service layer for Mentor Service.
//!
//! # Components
//!
//! - `clock` - Injectable source of the current instant
//! - `email` - SMTP and file-backed notification delivery
//! - `lifecycle` - Booking and meeting status transitions
//! - `notifier` - Notification port and log-only implementation
//! - `scheduling` - Booking window and timing rules

pub mod clock;
pub mod email;
pub mod lifecycle;
pub mod notifier;
pub mod scheduling;

pub use clock::{Clock, SystemClock};
pub use email::EmailNotifier;
pub use lifecycle::{
    BookingRequest, CancelPolicy, LifecycleConfig, MeetingLifecycle, RejectReasonPolicy,
    SweepReport,
};
pub use notifier::{LogNotifier, NotificationKind, Notifier};
pub use scheduling::SchedulingPolicy;
