//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// The transaction read data that a concurrently committed transaction
    /// changed. Retrying from the start is expected to succeed.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// The substrate could not complete the operation right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The transaction exceeded a size or time limit.
    #[error("transaction limit exceeded: {0}")]
    LimitExceeded(String),

    /// A write was attempted in a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// An internal error in the backend.
    #[error("internal storage error: {0}")]
    Internal(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether retrying the whole transaction may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
