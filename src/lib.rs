// Core layer - configuration, errors and message utilities
pub mod core;

// Features layer - reviews and reminders
pub mod features;

// Infrastructure
pub mod database;

// Re-export core config
pub use core::Config;

// Re-export the storage capability
pub use database::{Database, ItemStore};

// Re-export feature items
pub use features::{
    // Reviews
    due_items, Difficulty, ItemFilter, NewItem, SolveStatus, TrackedItem, UserStats,
    // Reminders
    ReminderScheduler, SchedulerHandle,
};
