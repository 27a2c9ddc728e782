//! Background tasks for Mentor Service.
//!
//! - `reminder_sweep` - Sends pre-meeting reminders on a fixed interval

pub mod reminder_sweep;

pub use reminder_sweep::start_reminder_sweep;
