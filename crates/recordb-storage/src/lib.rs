//! RecorDB Storage
//!
//! This crate provides the substrate abstraction the record store runs on,
//! and two substrate implementations.
//!
//! # Overview
//!
//! The substrate is an ordered, transactional key-value store: one sorted
//! keyspace of byte strings, snapshot reads, staged writes, range reads in
//! either direction, and atomic commit that may fail with a conflict.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - The main entry point for creating transactions
//! - [`Transaction`] - Get, put, clear, range, commit, rollback
//! - [`Cursor`] - Ordered iteration over a key range
//!
//! # Backends
//!
//! - [`MemoryEngine`] - Optimistic MVCC with read-conflict detection
//! - [`RedbEngine`] - Durable single-writer storage on Redb
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Errors for which a fresh
//! attempt may succeed report [`StorageError::is_retryable`].
//!
//! # Modules
//!
//! - [`engine`] - Substrate traits and errors
//! - [`backends`] - Concrete substrate implementations

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;

pub use backends::{Fault, MemoryConfig, MemoryEngine, RedbConfig, RedbEngine};
pub use engine::{
    Cursor, CursorResult, KeyValue, RangeOptions, StorageEngine, StorageError, StorageResult, Transaction,
};
