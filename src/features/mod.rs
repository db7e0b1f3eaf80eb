//! # Features
//!
//! - **reviews**: tracked items and the review-due policy
//! - **reminders**: the daily reminder scheduler

pub mod reminders;
pub mod reviews;

pub use reminders::{ReminderScheduler, SchedulerHandle};
pub use reviews::{due_items, Difficulty, ItemFilter, NewItem, SolveStatus, TrackedItem, UserStats};
