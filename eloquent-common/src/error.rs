//! Common error types for Eloquent

use thiserror::Error;

/// Common result type for Eloquent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Eloquent services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
