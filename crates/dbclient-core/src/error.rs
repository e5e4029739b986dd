//! Error types for dbclient

use thiserror::Error;

/// Core error type for binding, configuration and execution
#[derive(Error, Debug)]
pub enum DbClientError {
    /// A binding with the same (case-insensitive) name is already in the set
    #[error("Duplicate binding: {0}")]
    DuplicateBinding(String),

    /// A binding was declared with an unusable name
    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    /// Missing or unknown provider, connection string, or command text
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the underlying driver while connecting or executing
    #[error("Driver error: {0}")]
    Driver(String),
}

impl DbClientError {
    /// Returns `true` for errors raised before any connection was attempted
    pub fn is_configuration(&self) -> bool {
        matches!(self, DbClientError::Configuration(_))
    }

    /// Returns `true` for errors surfaced from the driver
    pub fn is_driver(&self) -> bool {
        matches!(self, DbClientError::Driver(_))
    }
}

/// Result type alias for dbclient operations
pub type Result<T> = std::result::Result<T, DbClientError>;
