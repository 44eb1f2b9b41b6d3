//! Error types for storage operations

use std::fmt;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug)]
pub enum StorageError {
    /// Invalid configuration (malformed address, zero bulk size, ...)
    InvalidConfig(String),

    /// Dialing or pinging the database failed
    ConnectionFailed(String),

    /// Bulk insert execution failed
    QueryFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidConfig(msg) => {
                write!(f, "invalid database configuration: {}", msg)
            }
            StorageError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to database: {}", msg)
            }
            StorageError::QueryFailed(msg) => write!(f, "bulk insert failed: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}
