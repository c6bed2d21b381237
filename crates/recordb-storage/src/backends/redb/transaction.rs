//! Redb transaction implementation.
//!
//! # Memory-Efficient Cursors
//!
//! The cursor loads entries in batches (default 1000 entries), fetching the
//! next batch on demand as the cursor advances, so a scan over a large range
//! never materializes the whole range.

use std::collections::VecDeque;
use std::ops::Bound;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, RangeOptions, StorageError, StorageResult, Transaction};

use super::tables::DATA_TABLE;

/// Default batch size for cursor operations.
const DEFAULT_BATCH_SIZE: usize = 1000;

fn internal(e: impl std::fmt::Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// A transaction for the Redb storage engine.
///
/// Note: We allow the `large_enum_variant` lint here because boxing the
/// `WriteTransaction` would add indirection to every operation.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

impl RedbTransaction {
    /// Create a new read-only transaction.
    pub const fn new_read(tx: ReadTransaction) -> Self {
        Self::Read(tx)
    }

    /// Create a new read-write transaction.
    pub const fn new_write(tx: WriteTransaction) -> Self {
        Self::Write(tx)
    }

    fn write_tx(&mut self) -> StorageResult<&mut WriteTransaction> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => Ok(tx),
        }
    }

    /// Fetch up to `batch_size` entries in `(start, end)`, in cursor order.
    fn fetch_batch(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
        reverse: bool,
        batch_size: usize,
    ) -> StorageResult<Vec<KeyValue>> {
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => collect_range(&t, start, end, reverse, batch_size),
                // No data table means no data, which is not an error
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                collect_range(&t, start, end, reverse, batch_size)
            }
        }
    }
}

fn collect_range<T>(
    table: &T,
    start: Bound<&[u8]>,
    end: Bound<&[u8]>,
    reverse: bool,
    batch_size: usize,
) -> StorageResult<Vec<KeyValue>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    if range_is_empty(start, end) {
        return Ok(Vec::new());
    }
    let range = table.range::<&[u8]>((start, end)).map_err(internal)?;
    let mut entries = Vec::with_capacity(batch_size.min(1024));
    if reverse {
        for result in range.rev().take(batch_size) {
            let (k, v) = result.map_err(internal)?;
            entries.push((k.value().to_vec(), v.value().to_vec()));
        }
    } else {
        for result in range.take(batch_size) {
            let (k, v) = result.map_err(internal)?;
            entries.push((k.value().to_vec(), v.value().to_vec()));
        }
    }
    Ok(entries)
}

/// Redb panics on inverted ranges; treat them as empty instead.
fn range_is_empty(start: Bound<&[u8]>, end: Bound<&[u8]>) -> bool {
    match (start, end) {
        (Bound::Included(s), Bound::Included(e)) => s > e,
        (Bound::Included(s) | Bound::Excluded(s), Bound::Excluded(e))
        | (Bound::Excluded(s), Bound::Included(e)) => s >= e,
        _ => false,
    }
}

/// Convert a `Bound<&[u8]>` to `Bound<Vec<u8>>`.
fn bound_to_owned(bound: Bound<&[u8]>) -> Bound<Vec<u8>> {
    match bound {
        Bound::Included(b) => Bound::Included(b.to_vec()),
        Bound::Excluded(b) => Bound::Excluded(b.to_vec()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn bound_as_slice(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(b) => Bound::Included(b.as_slice()),
        Bound::Excluded(b) => Bound::Excluded(b.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => Ok(t.get(key).map_err(internal)?.map(|v| v.value().to_vec())),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(internal(e)),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(internal)?;
                let value = t.get(key).map_err(internal)?.map(|v| v.value().to_vec());
                Ok(value)
            }
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let tx = self.write_tx()?;
        let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
        t.insert(key, value).map_err(internal)?;
        Ok(())
    }

    fn clear(&mut self, key: &[u8]) -> StorageResult<()> {
        let tx = self.write_tx()?;
        let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
        t.remove(key).map_err(internal)?;
        Ok(())
    }

    fn clear_range(&mut self, start: &[u8], end: &[u8]) -> StorageResult<()> {
        let tx = self.write_tx()?;
        if start >= end {
            return Ok(());
        }
        let mut t = tx.open_table(DATA_TABLE).map_err(internal)?;
        let doomed: Vec<Vec<u8>> = t
            .range(start..end)
            .map_err(internal)?
            .map(|r| r.map(|(k, _)| k.value().to_vec()).map_err(internal))
            .collect::<StorageResult<_>>()?;
        for key in &doomed {
            t.remove(key.as_slice()).map_err(internal)?;
        }
        Ok(())
    }

    fn range(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
        options: RangeOptions,
    ) -> StorageResult<Self::Cursor<'_>> {
        Ok(RedbCursor {
            tx: self,
            start: bound_to_owned(start),
            end: bound_to_owned(end),
            reverse: options.reverse,
            remaining: options.limit,
            batch: VecDeque::new(),
            exhausted: false,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    fn commit(self) -> StorageResult<()> {
        match self {
            // Read transactions don't need explicit commit
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Unavailable(e.to_string())),
        }
    }

    fn rollback(self) -> StorageResult<()> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.abort().map_err(internal),
        }
    }

    fn is_read_only(&self) -> bool {
        matches!(self, Self::Read(_))
    }
}

/// A batched streaming cursor over a Redb transaction.
///
/// At any time the cursor holds at most one batch of entries. After each
/// batch the consumed side of the range is narrowed past the last key seen.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    start: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
    reverse: bool,
    remaining: Option<usize>,
    batch: VecDeque<KeyValue>,
    exhausted: bool,
    batch_size: usize,
}

impl RedbCursor<'_> {
    fn refill(&mut self) -> StorageResult<()> {
        let want = self.remaining.map_or(self.batch_size, |r| r.min(self.batch_size));
        let entries = self.tx.fetch_batch(
            bound_as_slice(&self.start),
            bound_as_slice(&self.end),
            self.reverse,
            want,
        )?;
        if entries.len() < want {
            self.exhausted = true;
        }
        if let Some((last, _)) = entries.last() {
            if self.reverse {
                self.end = Bound::Excluded(last.clone());
            } else {
                self.start = Bound::Excluded(last.clone());
            }
        }
        self.batch.extend(entries);
        Ok(())
    }
}

impl Cursor for RedbCursor<'_> {
    fn next(&mut self) -> CursorResult {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        if self.batch.is_empty() && !self.exhausted {
            self.refill()?;
        }
        let Some(pair) = self.batch.pop_front() else {
            return Ok(None);
        };
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(pair))
    }
}
