//! Error types for RecorDB.
//!
//! This module provides the [`enum@Error`] type returned by every record
//! store and transaction runner operation.

use recordb_core::CoreError;
use recordb_storage::StorageError;
use thiserror::Error;

/// Errors that can occur when using RecorDB.
///
/// Only [`Error::Conflict`] and transient substrate errors are retried by the
/// [`TransactionRunner`](crate::TransactionRunner); every other kind reaches
/// the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema is malformed, or does not match the stored data.
    #[error("schema error: {0}")]
    Schema(String),

    /// The schema was already built and can no longer be changed.
    #[error("schema is immutable once built: {0}")]
    ImmutableSchema(String),

    /// A record does not conform to its declared record type.
    #[error("validation error: {0}")]
    Validation(String),

    /// A key could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A stored payload could not be decoded.
    #[error("corrupt record payload: {0}")]
    CorruptPayload(String),

    /// A concurrent transaction committed a write this transaction read.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// The transaction exceeded a substrate size or time limit.
    #[error("transaction limit exceeded: {0}")]
    LimitExceeded(String),

    /// A unit of work kept failing with retryable errors.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error of the final attempt.
        #[source]
        last: Box<Error>,
    },

    /// The unit of work was cancelled before it committed.
    #[error("transaction cancelled")]
    Cancelled,

    /// Any other substrate error.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl Error {
    /// Whether a fresh attempt of the unit of work may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Decode(msg) => Self::Decode(msg),
            CoreError::CorruptPayload(msg) => Self::CorruptPayload(msg),
            CoreError::Validation(msg) => Self::Validation(msg),
            CoreError::Schema(msg) => Self::Schema(msg),
            CoreError::ImmutableSchema(msg) => Self::ImmutableSchema(msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => Self::Conflict(msg),
            StorageError::LimitExceeded(msg) => Self::LimitExceeded(msg),
            other => Self::Storage(other),
        }
    }
}

/// Result type alias for RecorDB operations.
pub type Result<T> = std::result::Result<T, Error>;
