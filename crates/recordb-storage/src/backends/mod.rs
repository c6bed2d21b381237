//! Substrate backend implementations.
//!
//! - [`memory`] - In-memory optimistic MVCC engine with conflict detection
//! - [`redb`] - Durable embedded engine backed by Redb

pub mod memory;
pub mod redb;

pub use self::redb::{RedbConfig, RedbEngine};
pub use memory::{Fault, MemoryConfig, MemoryEngine};
