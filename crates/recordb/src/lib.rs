//! # RecorDB
//!
//! A transactional record store layered on an ordered key-value substrate.
//!
//! RecorDB stores typed records under keys derived from their primary keys,
//! keeps secondary indexes exactly in sync with the records they cover, and
//! runs units of work in transactions that are retried on conflict.
//!
//! ## Quick Start
//!
//! ```
//! use recordb::{
//!     FieldDef, FieldType, IndexDefinition, KeyExpression, MemoryEngine, MetaDataBuilder, Record,
//!     RecordStore, RecordTypeDef, ScanDirection, Subspace, TransactionRunner, Tuple, TupleRange,
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
//! let subspace = Subspace::new(&Tuple::new().with("quick-start"));
//! let runner = TransactionRunner::new(MemoryEngine::new());
//!
//! runner.run(|tx| {
//!     let mut store = RecordStore::builder()
//!         .metadata(metadata.clone())
//!         .subspace(subspace.clone())
//!         .create_or_open(tx)?;
//!     for (id, price) in [(1i64, 300i64), (2, 100), (3, 200)] {
//!         store.save_record(&Record::new("Order").with_field("order_id", id).with_field("price", price))?;
//!     }
//!     Ok(())
//! })?;
//!
//! let cheap: Vec<Tuple> = runner.read(|tx| {
//!     let store = RecordStore::builder().metadata(metadata.clone()).subspace(subspace.clone()).open(tx)?;
//!     let range = TupleRange::less_than(Tuple::new().with(250i64));
//!     let mut keys = Vec::new();
//!     for entry in store.scan_index("priceIndex", Some(range), ScanDirection::Forward)? {
//!         keys.push(entry?.primary_key);
//!     }
//!     Ok(keys)
//! })?;
//! assert_eq!(cheap, vec![Tuple::new().with(2i64), Tuple::new().with(3i64)]);
//! # Ok::<(), recordb::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`store`] - [`RecordStore`]: save, load, delete, and scan records and indexes
//! - [`index`] - [`IndexMaintainer`]: deriving index entries from records
//! - [`runner`] - [`TransactionRunner`]: retrying units of work
//! - [`config`] - [`RunnerConfig`]
//! - [`error`] - [`enum@Error`] taxonomy
//!
//! The data model and codecs come from `recordb-core`, and the substrate
//! traits and backends from `recordb-storage`; the commonly used items of
//! both are re-exported here.

#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod index;
pub mod runner;
pub mod store;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use index::{IndexEntry, IndexMaintainer, IndexUpdatePlan};
pub use runner::{CancellationToken, TransactionRunner};
pub use store::{
    IndexCursor, RecordCursor, RecordStore, RecordStoreBuilder, SaveOutcome, ScanDirection,
    StoredRecord,
};

pub use recordb_core::{
    printable, EnumDef, FieldDef, FieldType, IndexDefinition, KeyExpression, MessageDef, MetaData,
    MetaDataBuilder, Record, RecordType, RecordTypeDef, Subspace, Tuple, TupleRange, Value,
};
pub use recordb_storage::{
    Cursor, Fault, MemoryConfig, MemoryEngine, RangeOptions, RedbConfig, RedbEngine,
    StorageEngine, StorageError, Transaction,
};
