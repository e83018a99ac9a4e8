//! Error types for transport operations.

use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Cannot create link for '{entity}': {message}")]
    LinkCreation { entity: String, message: String },

    #[error("Cannot receive messages: {message}")]
    Receive { message: String },

    #[error("Cannot send message: {message}")]
    Send { message: String },

    #[error("Cannot complete message: {message}")]
    Complete { message: String },

    #[error("Cannot create message batch: {message}")]
    BatchCreate { message: String },

    #[error("Cannot send message batch: {message}")]
    BatchSend { message: String },

    #[error("Message at index {index} does not fit into the batch ({batched} messages already accepted)")]
    BatchCapacityExceeded { index: usize, batched: usize },

    #[error("Message at index {index} is too large for an empty batch")]
    MessageTooLarge { index: usize },

    #[error("Operation '{operation}' timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl TransportError {
    /// Check if error is transient and a caller-level retry could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LinkCreation { .. } => false,
            Self::Receive { .. } => true,
            Self::Send { .. } => true,
            Self::Complete { .. } => true,
            Self::BatchCreate { .. } => true,
            Self::BatchSend { .. } => true,
            Self::BatchCapacityExceeded { .. } => false,
            Self::MessageTooLarge { .. } => false,
            Self::Timeout { .. } => true,
            Self::Configuration(_) => false,
            Self::Validation(_) => false,
        }
    }
}

/// Errors in construction arguments (connection string, options)
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Connection string parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors for caller-supplied values
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
