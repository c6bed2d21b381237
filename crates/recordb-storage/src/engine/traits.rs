//! Core substrate traits.
//!
//! The substrate is a single ordered keyspace of byte strings. Keys from
//! different record stores are separated by prefix, not by table.

use std::ops::Bound;
use std::sync::Arc;

use super::{StorageError, StorageResult};

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that return a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// Options for [`Transaction::range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeOptions {
    /// Maximum number of pairs to return.
    pub limit: Option<usize>,
    /// Iterate from the end of the range towards the start.
    pub reverse: bool,
}

impl RangeOptions {
    /// Forward iteration without a limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { limit: None, reverse: false }
    }

    /// Limit the number of returned pairs.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Iterate in descending key order.
    #[must_use]
    pub const fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// A substrate that provides transactional ordered key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```
/// use recordb_storage::{MemoryEngine, StorageEngine, Transaction};
///
/// let engine = MemoryEngine::new();
///
/// let mut tx = engine.begin_write()?;
/// tx.put(b"key", b"value")?;
/// tx.commit()?;
///
/// let tx = engine.begin_read()?;
/// assert_eq!(tx.get(b"key")?, Some(b"value".to_vec()));
/// # Ok::<(), recordb_storage::StorageError>(())
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction.
    ///
    /// Read transactions observe a consistent snapshot taken at begin.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>>;

    /// Begin a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>>;
}

/// A substrate transaction.
///
/// Reads observe the snapshot taken at begin plus this transaction's own
/// staged writes. Staged writes become visible to other transactions only
/// after [`commit`](Self::commit) succeeds. Dropping a transaction without
/// committing discards its writes.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Stage a write of `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] in a read-only transaction.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Stage removal of `key`. Clearing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] in a read-only transaction.
    fn clear(&mut self, key: &[u8]) -> StorageResult<()>;

    /// Stage removal of every key in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] in a read-only transaction.
    fn clear_range(&mut self, start: &[u8], end: &[u8]) -> StorageResult<()>;

    /// Iterate the pairs whose keys fall between `start` and `end`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::ops::Bound;
    /// use recordb_storage::{Cursor, MemoryEngine, RangeOptions, StorageEngine, Transaction};
    ///
    /// let engine = MemoryEngine::new();
    /// let mut tx = engine.begin_write()?;
    /// for key in [b"a", b"b", b"c"] {
    ///     tx.put(key, b"")?;
    /// }
    ///
    /// let mut cursor = tx.range(
    ///     Bound::Included(b"a".as_slice()),
    ///     Bound::Excluded(b"c".as_slice()),
    ///     RangeOptions::new().reverse(true),
    /// )?;
    /// assert_eq!(cursor.next()?.map(|(k, _)| k), Some(b"b".to_vec()));
    /// assert_eq!(cursor.next()?.map(|(k, _)| k), Some(b"a".to_vec()));
    /// assert_eq!(cursor.next()?, None);
    /// # Ok::<(), recordb_storage::StorageError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn range(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
        options: RangeOptions,
    ) -> StorageResult<Self::Cursor<'_>>;

    /// Atomically apply all staged writes.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if a concurrently committed transaction
    ///   wrote data this transaction read
    /// - [`StorageError::LimitExceeded`] if the transaction is too large or too old
    /// - [`StorageError::Unavailable`] if the substrate cannot commit right now
    fn commit(self) -> StorageResult<()>;

    /// Discard all staged writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release the transaction.
    fn rollback(self) -> StorageResult<()>;

    /// Check if this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// A cursor over a key range, yielding pairs in the requested direction.
pub trait Cursor {
    /// Move to the next key-value pair.
    ///
    /// Returns `None` once the range or the limit is exhausted.
    fn next(&mut self) -> CursorResult;

    /// Drain the remaining pairs.
    ///
    /// # Errors
    ///
    /// Returns the first error the cursor reports.
    fn collect_remaining(&mut self) -> StorageResult<Vec<KeyValue>> {
        let mut out = Vec::new();
        while let Some(pair) = self.next()? {
            out.push(pair);
        }
        Ok(out)
    }
}

// ============================================================================
// Blanket Implementations
// ============================================================================

/// Implement `StorageEngine` for `Arc<E>` to allow shared ownership of engines.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        (**self).begin_write()
    }
}
