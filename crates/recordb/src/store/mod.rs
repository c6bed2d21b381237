//! The record store: typed records and their indexes in one subspace.
//!
//! # Key Layout
//!
//! ```text
//! subspace ++ 0x00                                  store header
//! subspace ++ 0x01 ++ pack((typeKey, pk...))        record payload
//! subspace ++ 0x02 ++ pack((index, values..., pk...))  index entry (empty value)
//! ```
//!
//! Records of one type are contiguous and ordered by primary key, so a
//! primary-key range scan is a single substrate range read. A store is bound
//! to one transaction; obtain it inside a
//! [`TransactionRunner`](crate::TransactionRunner) unit of work so that
//! conflicts are retried.
//!
//! # Example
//!
//! ```
//! use recordb::{
//!     FieldDef, FieldType, IndexDefinition, KeyExpression, MemoryEngine, MetaDataBuilder, Record,
//!     RecordStore, RecordTypeDef, SaveOutcome, Subspace, TransactionRunner, Tuple,
//! };
//!
//! let mut builder = MetaDataBuilder::new();
//! builder
//!     .register_type(
//!         RecordTypeDef::new("Order")
//!             .field(FieldDef::new("order_id", 1, FieldType::Int))
//!             .field(FieldDef::new("price", 2, FieldType::Int)),
//!     )?
//!     .set_primary_key("Order", KeyExpression::field("order_id"))?
//!     .add_index("Order", IndexDefinition::new("priceIndex", KeyExpression::field("price")))?;
//! let metadata = builder.build()?;
//! let subspace = Subspace::new(&Tuple::new().with("demo"));
//!
//! let runner = TransactionRunner::new(MemoryEngine::new());
//! let outcome = runner.run(|tx| {
//!     let mut store = RecordStore::builder()
//!         .metadata(metadata.clone())
//!         .subspace(subspace.clone())
//!         .create_or_open(tx)?;
//!     store.save_record(&Record::new("Order").with_field("order_id", 1i64).with_field("price", 123i64))
//! })?;
//! assert_eq!(outcome, SaveOutcome::Inserted);
//! # Ok::<(), recordb::Error>(())
//! ```

mod cursor;
mod header;

pub use cursor::{IndexCursor, RecordCursor};

use std::ops::Bound;
use std::sync::Arc;

use recordb_core::encoding::{deserialize_record, encode_key, serialize_record};
use recordb_core::{printable, MetaData, Record, RecordType, Subspace, Tuple, TupleRange, Value};
use recordb_storage::{RangeOptions, Transaction};
use tracing::{info, trace};

use crate::error::{Error, Result};
use crate::index::IndexMaintainer;

use header::StoreHeader;

/// Key prefix byte of the store header.
const HEADER_KEY: u8 = 0x00;
/// Key prefix byte of the records subspace.
const RECORDS_KEY: u8 = 0x01;
/// Key prefix byte of the indexes subspace.
const INDEXES_KEY: u8 = 0x02;

/// Whether [`RecordStore::save_record`] created or replaced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No record existed under the primary key.
    Inserted,
    /// An existing record was replaced.
    Updated,
}

/// Scan order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanDirection {
    /// Ascending key order.
    #[default]
    Forward,
    /// Descending key order.
    Reverse,
}

impl ScanDirection {
    const fn options(self) -> RangeOptions {
        RangeOptions::new().reverse(matches!(self, Self::Reverse))
    }
}

/// A record read back from the store, with its primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// The primary-key tuple.
    pub primary_key: Tuple,
    /// The decoded record.
    pub record: Record,
}

impl StoredRecord {
    /// The record's type name.
    #[must_use]
    pub fn record_type(&self) -> &str {
        self.record.record_type()
    }
}

/// Builder for [`RecordStore`].
#[derive(Debug, Clone, Default)]
pub struct RecordStoreBuilder {
    metadata: Option<Arc<MetaData>>,
    subspace: Subspace,
}

impl RecordStoreBuilder {
    /// Set the catalog. Required.
    #[must_use]
    pub fn metadata(mut self, metadata: Arc<MetaData>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the subspace the store lives in. Defaults to the empty prefix.
    #[must_use]
    pub fn subspace(mut self, subspace: Subspace) -> Self {
        self.subspace = subspace;
        self
    }

    /// Open an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if no store exists in the subspace, no
    /// metadata was set, or the stored versions are newer than the catalog.
    pub fn open<T: Transaction>(self, tx: &mut T) -> Result<RecordStore<'_, T>> {
        let mut store = self.into_store(tx)?;
        let key = store.header_key();
        match StoreHeader::load(&*store.tx, &key)? {
            Some(header) => header.reconcile(&mut *store.tx, &key, &store.metadata)?,
            None => {
                return Err(Error::Schema(format!(
                    "no record store exists at {}",
                    printable(store.subspace.raw())
                )))
            }
        }
        Ok(store)
    }

    /// Open the store, creating its header if the subspace holds none.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), except that a missing store is created.
    pub fn create_or_open<T: Transaction>(self, tx: &mut T) -> Result<RecordStore<'_, T>> {
        let mut store = self.into_store(tx)?;
        let key = store.header_key();
        match StoreHeader::load(&*store.tx, &key)? {
            Some(header) => header.reconcile(&mut *store.tx, &key, &store.metadata)?,
            None => {
                info!(
                    subspace = %printable(store.subspace.raw()),
                    metadata_version = store.metadata.version(),
                    "creating record store"
                );
                StoreHeader::for_metadata(&store.metadata).save(&mut *store.tx, &key)?;
            }
        }
        Ok(store)
    }

    fn into_store<T: Transaction>(self, tx: &mut T) -> Result<RecordStore<'_, T>> {
        let metadata = self
            .metadata
            .ok_or_else(|| Error::Schema("record store builder has no metadata".into()))?;
        Ok(RecordStore::new(tx, metadata, self.subspace))
    }
}

/// Typed record access within one transaction.
pub struct RecordStore<'t, T> {
    tx: &'t mut T,
    metadata: Arc<MetaData>,
    subspace: Subspace,
    records: Subspace,
    indexes: Subspace,
}

impl RecordStore<'static, ()> {
    /// Start building a store.
    ///
    /// The builder is not tied to a transaction type; the store's type is
    /// fixed by the transaction passed to [`RecordStoreBuilder::open`].
    #[must_use]
    pub fn builder() -> RecordStoreBuilder {
        RecordStoreBuilder::default()
    }
}

impl<'t, T: Transaction> RecordStore<'t, T> {
    fn new(tx: &'t mut T, metadata: Arc<MetaData>, subspace: Subspace) -> Self {
        let records = subspace.child(&[RECORDS_KEY]);
        let indexes = subspace.child(&[INDEXES_KEY]);
        Self { tx, metadata, subspace, records, indexes }
    }

    /// The catalog this store validates against.
    #[must_use]
    pub fn metadata(&self) -> &Arc<MetaData> {
        &self.metadata
    }

    /// The subspace holding this store.
    #[must_use]
    pub fn subspace(&self) -> &Subspace {
        &self.subspace
    }

    fn header_key(&self) -> Vec<u8> {
        self.subspace.child(&[HEADER_KEY]).raw().to_vec()
    }

    fn record_type(&self, name: &str) -> Result<&RecordType> {
        self.metadata
            .record_type(name)
            .ok_or_else(|| Error::Schema(format!("record type {name} is not in the metadata")))
    }

    fn record_key(&self, record_type: &RecordType, primary_key: &Tuple) -> Vec<u8> {
        let mut key = self.records.raw().to_vec();
        key.extend_from_slice(&encode_key(record_type.key(), primary_key));
        key
    }

    /// Save a record, inserting it or replacing the record with the same primary key.
    ///
    /// Index entries of the old and new record are swapped in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the record's type is not registered or
    /// the record does not conform to it, and [`Error::CorruptPayload`] if
    /// the record it replaces cannot be decoded.
    pub fn save_record(&mut self, record: &Record) -> Result<SaveOutcome> {
        let metadata = Arc::clone(&self.metadata);
        let record_type = metadata.record_type(record.record_type()).ok_or_else(|| {
            Error::Validation(format!("record type {} is not registered", record.record_type()))
        })?;
        let payload = serialize_record(record_type, record)?;
        let primary_key = record_type.primary_key_of(record)?;
        let key = self.record_key(record_type, &primary_key);
        let maintainer = IndexMaintainer::new(record_type, &self.indexes);

        let (plan, outcome) = match self.tx.get(&key)? {
            Some(old) => {
                let old = deserialize_record(record_type, &old)?;
                (maintainer.record_updated(&old, record, &primary_key), SaveOutcome::Updated)
            }
            None => (maintainer.record_inserted(record, &primary_key), SaveOutcome::Inserted),
        };

        trace!(key = %printable(&key), ?outcome, "save record");
        self.tx.put(&key, &payload)?;
        plan.apply(&mut *self.tx)?;
        Ok(outcome)
    }

    /// Load the record of `record_type` with `primary_key`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown type and
    /// [`Error::CorruptPayload`] if the stored payload cannot be decoded.
    pub fn load_record(&self, record_type: &str, primary_key: &Tuple) -> Result<Option<StoredRecord>> {
        let record_type = self.record_type(record_type)?;
        self.load(record_type, primary_key)
    }

    /// Load a record by its full key tuple `(typeKey, pk...)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty tuple and [`Error::Schema`]
    /// if the leading element is not a registered record-type key.
    pub fn load_record_by_key(&self, key: &Tuple) -> Result<Option<StoredRecord>> {
        let mut values = key.values().iter();
        let type_key = values
            .next()
            .ok_or_else(|| Error::Validation("record key tuple is empty".into()))?;
        let record_type = self.metadata.record_type_for_key(type_key).ok_or_else(|| {
            Error::Schema(format!("no record type has key {type_key}"))
        })?;
        let primary_key: Tuple = values.cloned().collect();
        self.load(record_type, &primary_key)
    }

    fn load(&self, record_type: &RecordType, primary_key: &Tuple) -> Result<Option<StoredRecord>> {
        let key = self.record_key(record_type, primary_key);
        let Some(bytes) = self.tx.get(&key)? else {
            return Ok(None);
        };
        let record = deserialize_record(record_type, &bytes)?;
        Ok(Some(StoredRecord { primary_key: primary_key.clone(), record }))
    }

    /// Delete a record and its index entries. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown type and
    /// [`Error::CorruptPayload`] if the stored payload cannot be decoded.
    pub fn delete_record(&mut self, record_type: &str, primary_key: &Tuple) -> Result<bool> {
        let metadata = Arc::clone(&self.metadata);
        let record_type = metadata
            .record_type(record_type)
            .ok_or_else(|| Error::Schema(format!("record type {record_type} is not in the metadata")))?;
        let key = self.record_key(record_type, primary_key);
        let Some(bytes) = self.tx.get(&key)? else {
            return Ok(false);
        };
        let old = deserialize_record(record_type, &bytes)?;
        let plan = IndexMaintainer::new(record_type, &self.indexes).record_deleted(&old, primary_key);

        trace!(key = %printable(&key), "delete record");
        self.tx.clear(&key)?;
        plan.apply(&mut *self.tx)?;
        Ok(true)
    }

    /// Delete every record and index entry in the store. The header is kept.
    ///
    /// # Errors
    ///
    /// Returns the substrate error if the clear cannot be staged.
    pub fn delete_all_records(&mut self) -> Result<()> {
        let (start, end) = self.records.range();
        self.tx.clear_range(&start, &end)?;
        let (start, end) = self.indexes.range();
        self.tx.clear_range(&start, &end)?;
        info!(subspace = %printable(self.subspace.raw()), "deleted all records");
        Ok(())
    }

    /// Scan records of one type in primary-key order.
    ///
    /// `range` bounds the primary-key tuple; `None` scans the whole type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown type. Decode failures are
    /// reported by the cursor.
    pub fn scan_records(
        &self,
        record_type: &str,
        range: Option<TupleRange>,
        direction: ScanDirection,
    ) -> Result<RecordCursor<'_, T::Cursor<'_>>> {
        let record_type = self.record_type(record_type)?;
        let prefix = self.record_key(record_type, &Tuple::new());
        let (start, end) = range.unwrap_or_default().to_byte_range(&prefix);
        let inner = self.tx.range(
            Bound::Included(start.as_slice()),
            Bound::Excluded(end.as_slice()),
            direction.options(),
        )?;
        Ok(RecordCursor::new(inner, &self.metadata, self.records.raw()))
    }

    /// Scan every record in the store, across types, in storage-key order.
    ///
    /// # Errors
    ///
    /// Returns the substrate error if the scan cannot start.
    pub fn scan_all_records(&self, direction: ScanDirection) -> Result<RecordCursor<'_, T::Cursor<'_>>> {
        let (start, end) = self.records.range();
        let inner = self.tx.range(
            Bound::Included(start.as_slice()),
            Bound::Excluded(end.as_slice()),
            direction.options(),
        )?;
        Ok(RecordCursor::new(inner, &self.metadata, self.records.raw()))
    }

    /// Scan the entries of an index in value order.
    ///
    /// `range` bounds the indexed-values tuple; `None` scans the whole index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] for an unknown index.
    pub fn scan_index(
        &self,
        index_name: &str,
        range: Option<TupleRange>,
        direction: ScanDirection,
    ) -> Result<IndexCursor<'_, T::Cursor<'_>>> {
        let index = self
            .metadata
            .index(index_name)
            .ok_or_else(|| Error::Schema(format!("index {index_name} is not in the metadata")))?;
        let prefix = self.indexes.pack(&Tuple::new().with(Value::from(index_name)));
        let (start, end) = range.unwrap_or_default().to_byte_range(&prefix);
        let inner = self.tx.range(
            Bound::Included(start.as_slice()),
            Bound::Excluded(end.as_slice()),
            direction.options(),
        )?;
        Ok(IndexCursor::new(inner, index, prefix))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use recordb_core::{FieldDef, FieldType, KeyExpression, MetaDataBuilder, RecordTypeDef};
    use recordb_storage::{MemoryEngine, StorageEngine};

    fn metadata(version: u32) -> Arc<MetaData> {
        let mut builder = MetaDataBuilder::new();
        builder
            .register_type(RecordTypeDef::new("Item").field(FieldDef::new("id", 1, FieldType::Int)))
            .unwrap()
            .set_primary_key("Item", KeyExpression::field("id"))
            .unwrap()
            .version(version)
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn open_requires_existing_store() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin_write().unwrap();
        let err = RecordStore::builder().metadata(metadata(1)).open(&mut tx).err().unwrap();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn builder_requires_metadata() {
        let engine = MemoryEngine::new();
        let mut tx = engine.begin_write().unwrap();
        let err = RecordStore::builder().create_or_open(&mut tx).err().unwrap();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn header_version_check_and_upgrade() {
        let engine = MemoryEngine::new();
        let subspace = Subspace::from_bytes(b"s".to_vec());
        let header_key = b"s\x00".to_vec();

        let mut tx = engine.begin_write().unwrap();
        RecordStore::builder().metadata(metadata(2)).subspace(subspace.clone()).create_or_open(&mut tx).unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin_write().unwrap();
        let err = RecordStore::builder().metadata(metadata(1)).subspace(subspace.clone()).open(&mut tx).err();
        assert!(matches!(err, Some(Error::Schema(_))));
        drop(tx);

        let mut tx = engine.begin_write().unwrap();
        RecordStore::builder().metadata(metadata(5)).subspace(subspace).open(&mut tx).unwrap();
        let header = StoreHeader::load(&tx, &header_key).unwrap().unwrap();
        assert_eq!(header.metadata_version, 5);
    }

    #[test]
    fn read_only_open_leaves_older_header_for_the_next_write() {
        let engine = MemoryEngine::new();
        let subspace = Subspace::from_bytes(b"s".to_vec());
        let header_key = b"s\x00".to_vec();

        let mut tx = engine.begin_write().unwrap();
        RecordStore::builder().metadata(metadata(1)).subspace(subspace.clone()).create_or_open(&mut tx).unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin_read().unwrap();
        let store = RecordStore::builder().metadata(metadata(2)).subspace(subspace.clone()).open(&mut tx).unwrap();
        assert_eq!(store.scan_all_records(ScanDirection::Forward).unwrap().count(), 0);
        drop(store);
        let header = StoreHeader::load(&tx, &header_key).unwrap().unwrap();
        assert_eq!(header.metadata_version, 1);
        drop(tx);

        let mut tx = engine.begin_write().unwrap();
        RecordStore::builder().metadata(metadata(2)).subspace(subspace).open(&mut tx).unwrap();
        let header = StoreHeader::load(&tx, &header_key).unwrap().unwrap();
        assert_eq!(header.metadata_version, 2);
    }

    #[test]
    fn direction_maps_to_range_options() {
        assert_eq!(ScanDirection::default(), ScanDirection::Forward);
        assert!(ScanDirection::Reverse.options().reverse);
        assert!(!ScanDirection::Forward.options().reverse);
    }
}
