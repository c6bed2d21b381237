//! Redb substrate backend.
//!
//! This module provides a durable substrate using Redb, a pure-Rust
//! embedded database. All keys live in one physical table; record stores
//! separate their data by key prefix.
//!
//! Redb serializes write transactions, so commits on this backend never
//! fail with a conflict.
//!
//! # Example
//!
//! ```
//! use recordb_storage::backends::RedbEngine;
//! use recordb_storage::{StorageEngine, Transaction};
//!
//! let engine = RedbEngine::in_memory()?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.put(b"user:1", b"Alice")?;
//! tx.commit()?;
//!
//! let tx = engine.begin_read()?;
//! assert_eq!(tx.get(b"user:1")?, Some(b"Alice".to_vec()));
//! # Ok::<(), recordb_storage::StorageError>(())
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! use recordb_storage::backends::{RedbConfig, RedbEngine};
//!
//! let config = RedbConfig::new().cache_size(100 * 1024 * 1024);
//! let engine = RedbEngine::open_with_config("records.redb", config)?;
//! ```

mod engine;
mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbCursor, RedbTransaction};
