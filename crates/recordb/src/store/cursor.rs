//! Lazy cursors over records and index entries.

use recordb_core::encoding::{decode_key, deserialize_record};
use recordb_core::{printable, IndexDefinition, MetaData, Tuple};
use recordb_storage::Cursor;

use crate::error::{Error, Result};
use crate::index::IndexEntry;

use super::StoredRecord;

/// Iterates stored records in key order, decoding each on demand.
///
/// Yields an error for an entry that cannot be decoded; decode failures are
/// never skipped.
pub struct RecordCursor<'a, C> {
    inner: C,
    metadata: &'a MetaData,
    prefix: &'a [u8],
    done: bool,
}

impl<'a, C: Cursor> RecordCursor<'a, C> {
    pub(crate) fn new(inner: C, metadata: &'a MetaData, prefix: &'a [u8]) -> Self {
        Self { inner, metadata, prefix, done: false }
    }

    fn decode(&self, key: &[u8], value: &[u8]) -> Result<StoredRecord> {
        let rest = key.strip_prefix(self.prefix).ok_or_else(|| {
            Error::Decode(format!("record key {} outside the store", printable(key)))
        })?;
        let (type_key, primary_key) = decode_key(rest)?;
        let record_type = self.metadata.record_type_for_key(&type_key).ok_or_else(|| {
            Error::Decode(format!("record key {} has unknown record type key {type_key}", printable(key)))
        })?;
        let record = deserialize_record(record_type, value)?;
        Ok(StoredRecord { primary_key, record })
    }
}

impl<C: Cursor> Iterator for RecordCursor<'_, C> {
    type Item = Result<StoredRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.inner.next() {
            Ok(Some((key, value))) => self.decode(&key, &value),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e.into()),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}

/// Iterates the entries of one index in key order.
pub struct IndexCursor<'a, C> {
    inner: C,
    index: &'a IndexDefinition,
    prefix: Vec<u8>,
    done: bool,
}

impl<'a, C: Cursor> IndexCursor<'a, C> {
    pub(crate) fn new(inner: C, index: &'a IndexDefinition, prefix: Vec<u8>) -> Self {
        Self { inner, index, prefix, done: false }
    }

    fn decode(&self, key: &[u8]) -> Result<IndexEntry> {
        let malformed = || {
            Error::Decode(format!("malformed entry {} in index {}", printable(key), self.index.name()))
        };
        let rest = key.strip_prefix(self.prefix.as_slice()).ok_or_else(malformed)?;
        let tuple = Tuple::unpack(rest)?;
        IndexEntry::from_tuple(tuple, self.index.expression().column_count()).ok_or_else(malformed)
    }
}

impl<C: Cursor> Iterator for IndexCursor<'_, C> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.inner.next() {
            Ok(Some((key, _))) => self.decode(&key),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => Err(e.into()),
        };
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }
}
