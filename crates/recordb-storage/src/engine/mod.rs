//! Substrate traits and abstractions.
//!
//! This module defines the traits that an ordered transactional key-value
//! substrate must implement:
//!
//! - [`StorageEngine`] - Main entry point for creating transactions
//! - [`Transaction`] - Snapshot reads, staged writes, atomic commit
//! - [`Cursor`] - Ordered iteration over a key range
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`] which is an alias for
//! `Result<T, StorageError>`. See [`StorageError`] for the possible error variants.

mod error;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{Cursor, CursorResult, KeyValue, RangeOptions, StorageEngine, Transaction};
