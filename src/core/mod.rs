//! # Core Module
//!
//! Configuration, error types and Discord message utilities.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add error module with store and delivery errors
//! - 1.1.0: Add response module with Discord message size utilities
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;
pub mod response;

// Re-export commonly used items
pub use config::{Config, SchedulerConfig};
pub use error::{DeliveryError, StoreError, StoreResult};
pub use response::{truncate_to, MESSAGE_LIMIT};
