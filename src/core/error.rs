//! Error types shared by the store and the reminder pipeline
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use thiserror::Error;

/// Errors raised by item store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Item fields failed required/enum checks; raised before any write
    #[error("Invalid item: {0}")]
    Validation(String),

    /// The referenced item does not exist
    #[error("Item not found: {0}")]
    NotFound(i64),

    /// The underlying database failed; the transaction was rolled back
    #[error("Database transaction failed: {0}")]
    Transaction(#[from] sqlite::Error),

    /// A persisted value could not be decoded
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A notifier failed to deliver a message
#[derive(Debug, Error)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(pub String);

impl From<serenity::Error> for DeliveryError {
    fn from(err: serenity::Error) -> Self {
        DeliveryError(err.to_string())
    }
}
