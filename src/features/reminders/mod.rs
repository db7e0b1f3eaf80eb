//! # Reminders Feature
//!
//! Daily review reminders delivered through a pluggable notifier, with
//! bounded retry and per-item review bookkeeping.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Notifier and recipient traits, capped messages, cycle reports
//! - 1.0.0: Daily channel reminders

pub mod message;
pub mod notifier;
pub mod retry;
pub mod scheduler;
pub mod trigger;

pub use message::{compose_reminder, ReminderMessage};
pub use notifier::{DiscordNotifier, DiscordRecipients, Notifier, Recipient, RecipientResolver};
pub use retry::{Attempted, RetryPolicy};
pub use scheduler::{CycleOutcome, CycleReport, ReminderScheduler, SchedulerHandle, SchedulerState};
pub use trigger::DailyTrigger;
