//! Memory transaction: snapshot, write buffer, and read-conflict tracking.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::engine::{RangeOptions, StorageError, StorageResult, Transaction};

use super::cursor::MemoryCursor;
use super::engine::{CommitRequest, Shared, Snapshot};

/// A half-open key range `[start, end)`; `end: None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn point(key: &[u8]) -> Self {
        let mut end = key.to_vec();
        end.push(0x00);
        Self { start: key.to_vec(), end: Some(end) }
    }

    pub fn from_bounds(start: Bound<&[u8]>, end: Bound<&[u8]>) -> Self {
        let start = match start {
            Bound::Included(k) => k.to_vec(),
            Bound::Excluded(k) => {
                let mut s = k.to_vec();
                s.push(0x00);
                s
            }
            Bound::Unbounded => Vec::new(),
        };
        let end = match end {
            Bound::Included(k) => {
                let mut e = k.to_vec();
                e.push(0x00);
                Some(e)
            }
            Bound::Excluded(k) => Some(k.to_vec()),
            Bound::Unbounded => None,
        };
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end.as_ref().is_some_and(|end| *end <= self.start)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_ref().map_or(true, |end| key < end.as_slice())
    }

    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let self_before_other_end = other.end.as_ref().map_or(true, |end| self.start < *end);
        let other_before_self_end = self.end.as_ref().map_or(true, |end| other.start < *end);
        self_before_other_end && other_before_self_end
    }

    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        (
            Bound::Included(self.start.as_slice()),
            self.end.as_deref().map_or(Bound::Unbounded, Bound::Excluded),
        )
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "[{}, {})", self.start.escape_ascii(), end.escape_ascii()),
            None => write!(f, "[{}, ...)", self.start.escape_ascii()),
        }
    }
}

/// A transaction on a [`MemoryEngine`](super::MemoryEngine).
///
/// Writes are buffered locally; the commit applies them atomically after
/// validating the recorded read ranges.
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    snapshot: Snapshot,
    read_version: u64,
    started: Instant,
    read_only: bool,
    reads: Mutex<Vec<KeyRange>>,
    /// Staged writes; `None` marks a cleared key.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    cleared: Vec<KeyRange>,
    write_bytes: usize,
}

impl MemoryTransaction {
    pub(crate) fn new(shared: Arc<Shared>, read_only: bool) -> Self {
        let (read_version, snapshot) = shared.begin();
        Self {
            shared,
            snapshot,
            read_version,
            started: Instant::now(),
            read_only,
            reads: Mutex::new(Vec::new()),
            writes: BTreeMap::new(),
            cleared: Vec::new(),
            write_bytes: 0,
        }
    }

    /// The committed version this transaction reads at.
    #[must_use]
    pub const fn read_version(&self) -> u64 {
        self.read_version
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }

    fn check_age(&self) -> StorageResult<()> {
        let timeout = self.shared.config.transaction_timeout;
        if self.started.elapsed() > timeout {
            return Err(StorageError::LimitExceeded(format!(
                "transaction older than {}ms",
                timeout.as_millis()
            )));
        }
        Ok(())
    }

    fn record_read(&self, range: KeyRange) {
        if !self.read_only {
            self.reads.lock().push(range);
        }
    }

    pub(crate) fn is_cleared(&self, key: &[u8]) -> bool {
        self.cleared.iter().any(|r| r.contains(key))
    }

    pub(crate) fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub(crate) fn writes(&self) -> &BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        &self.writes
    }

    pub(crate) fn cleared(&self) -> &[KeyRange] {
        &self.cleared
    }
}

impl Transaction for MemoryTransaction {
    type Cursor<'a>
        = MemoryCursor<'a>
    where
        Self: 'a;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.check_age()?;
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        self.record_read(KeyRange::point(key));
        if self.is_cleared(key) {
            return Ok(None);
        }
        Ok(self.snapshot.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        self.write_bytes += key.len() + value.len();
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn clear(&mut self, key: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        self.write_bytes += key.len();
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn clear_range(&mut self, start: &[u8], end: &[u8]) -> StorageResult<()> {
        self.check_writable()?;
        let range = KeyRange { start: start.to_vec(), end: Some(end.to_vec()) };
        if range.is_empty() {
            return Ok(());
        }
        let staged: Vec<Vec<u8>> =
            self.writes.range::<[u8], _>(range.bounds()).map(|(k, _)| k.clone()).collect();
        for key in staged {
            self.writes.remove(&key);
        }
        self.write_bytes += start.len() + end.len();
        self.cleared.push(range);
        Ok(())
    }

    fn range(
        &self,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
        options: RangeOptions,
    ) -> StorageResult<Self::Cursor<'_>> {
        self.check_age()?;
        let range = KeyRange::from_bounds(start, end);
        self.record_read(range.clone());
        Ok(MemoryCursor::new(self, range, options))
    }

    fn commit(mut self) -> StorageResult<()> {
        if self.read_only {
            return Ok(());
        }
        self.check_age()?;
        let limit = self.shared.config.max_transaction_bytes;
        if self.write_bytes > limit {
            return Err(StorageError::LimitExceeded(format!(
                "transaction wrote {} bytes, limit is {limit}",
                self.write_bytes
            )));
        }
        let reads = std::mem::take(&mut *self.reads.lock());
        self.shared.commit(CommitRequest {
            read_version: self.read_version,
            reads: &reads,
            writes: std::mem::take(&mut self.writes),
            cleared: std::mem::take(&mut self.cleared),
        })
    }

    fn rollback(self) -> StorageResult<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.shared.end(self.read_version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_range_contains_and_intersects() {
        let ab = KeyRange { start: b"a".to_vec(), end: Some(b"b".to_vec()) };
        assert!(ab.contains(b"a"));
        assert!(ab.contains(b"az"));
        assert!(!ab.contains(b"b"));

        let point = KeyRange::point(b"a");
        assert!(point.contains(b"a"));
        assert!(!point.contains(b"a\x00"));
        assert!(ab.intersects(&point));

        let tail = KeyRange { start: b"b".to_vec(), end: None };
        assert!(!ab.intersects(&tail));
        assert!(tail.contains(b"zzz"));
    }

    #[test]
    fn bounds_normalize_to_half_open() {
        let r = KeyRange::from_bounds(Bound::Excluded(b"a".as_slice()), Bound::Included(b"c".as_slice()));
        assert!(!r.contains(b"a"));
        assert!(r.contains(b"a\x00"));
        assert!(r.contains(b"c"));
        assert!(!r.contains(b"c\x00"));
    }

    #[test]
    fn empty_range_intersects_nothing() {
        let empty = KeyRange { start: b"b".to_vec(), end: Some(b"a".to_vec()) };
        assert!(empty.is_empty());
        assert!(!empty.intersects(&KeyRange { start: Vec::new(), end: None }));
    }
}
