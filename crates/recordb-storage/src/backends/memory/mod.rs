//! In-memory optimistic MVCC backend.
//!
//! This backend reproduces the concurrency contract of a distributed
//! transactional key-value store inside one process:
//!
//! - **Snapshot reads**: a transaction reads the committed state as of its
//!   begin, plus its own staged writes.
//! - **Optimistic validation**: every read records a read-conflict range. At
//!   commit, if any transaction that committed after this one began wrote a
//!   key inside one of those ranges, the commit fails with
//!   [`StorageError::Conflict`](crate::StorageError::Conflict).
//! - **Limits**: commits larger than
//!   [`MemoryConfig::max_transaction_bytes`] or older than
//!   [`MemoryConfig::transaction_timeout`] fail with
//!   [`StorageError::LimitExceeded`](crate::StorageError::LimitExceeded).
//! - **Fault injection**: [`MemoryEngine::inject_fault`] makes an upcoming
//!   commit fail, for exercising retry logic.
//!
//! Blind writes (writes to keys the transaction never read) never conflict.
//!
//! # Example
//!
//! ```
//! use recordb_storage::{MemoryEngine, StorageEngine, StorageError, Transaction};
//!
//! let engine = MemoryEngine::new();
//!
//! let mut a = engine.begin_write()?;
//! let mut b = engine.begin_write()?;
//! assert_eq!(a.get(b"counter")?, None);
//! assert_eq!(b.get(b"counter")?, None);
//! a.put(b"counter", b"1")?;
//! b.put(b"counter", b"1")?;
//!
//! a.commit()?;
//! assert!(matches!(b.commit(), Err(StorageError::Conflict(_))));
//! # Ok::<(), StorageError>(())
//! ```

mod cursor;
mod engine;
mod transaction;

pub use cursor::MemoryCursor;
pub use engine::{Fault, MemoryConfig, MemoryEngine};
pub use transaction::MemoryTransaction;
