//! The metadata catalog: record types, primary keys, and secondary indexes.
//!
//! # Overview
//!
//! A schema is assembled with a [`MetaDataBuilder`] and validated by
//! [`MetaDataBuilder::build`] into a [`MetaData`]. The built catalog is
//! immutable and shared as `Arc<MetaData>`, so any number of stores and
//! threads can read it without locking.
//!
//! Each [`RecordType`] carries a record-type key. Every storage key of the
//! type starts with that key, so records of different types never collide
//! even when their primary keys are equal.
//!
//! # Example
//!
//! ```
//! use recordb_core::metadata::{FieldDef, KeyExpression, MetaDataBuilder, RecordTypeDef};
//! use recordb_core::types::{FieldType, Value};
//!
//! let mut builder = MetaDataBuilder::new();
//! for name in ["Order", "Person"] {
//!     builder
//!         .register_type(RecordTypeDef::new(name).field(FieldDef::new("id", 1, FieldType::Int)))?
//!         .set_primary_key(name, KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("id")]))?;
//! }
//! let metadata = builder.build()?;
//!
//! assert_eq!(metadata.record_type("Person").map(|t| t.key()), Some(&Value::Int(2)));
//! assert_eq!(metadata.record_type_for_key(&Value::Int(1)).map(|t| t.name()), Some("Order"));
//! # Ok::<(), recordb_core::CoreError>(())
//! ```

mod builder;
mod expression;
mod record_type;

use std::collections::HashMap;

pub use builder::MetaDataBuilder;
pub use expression::KeyExpression;
pub use record_type::{FieldDef, IndexDefinition, MessageDef, RecordType, RecordTypeDef};

use crate::encoding::tuple::encode_element;
use crate::types::Value;

/// An immutable, validated schema.
#[derive(Debug)]
pub struct MetaData {
    version: u32,
    types: Vec<RecordType>,
    by_name: HashMap<String, usize>,
    by_key: HashMap<Vec<u8>, usize>,
    by_index: HashMap<String, (usize, usize)>,
}

impl MetaData {
    fn new(version: u32, types: Vec<RecordType>) -> Self {
        let mut by_name = HashMap::with_capacity(types.len());
        let mut by_key = HashMap::with_capacity(types.len());
        let mut by_index = HashMap::new();
        for (i, record_type) in types.iter().enumerate() {
            by_name.insert(record_type.name.clone(), i);
            by_key.insert(packed_key(&record_type.key), i);
            for (j, index) in record_type.indexes.iter().enumerate() {
                by_index.insert(index.name().to_owned(), (i, j));
            }
        }
        Self { version, types, by_name, by_key, by_index }
    }

    /// The metadata version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// All record types in registration order.
    #[must_use]
    pub fn record_types(&self) -> &[RecordType] {
        &self.types
    }

    /// Look up a record type by name.
    #[must_use]
    pub fn record_type(&self, name: &str) -> Option<&RecordType> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Look up the record type that owns a record-type key.
    #[must_use]
    pub fn record_type_for_key(&self, key: &Value) -> Option<&RecordType> {
        self.by_key.get(&packed_key(key)).map(|&i| &self.types[i])
    }

    /// Look up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.by_index.get(name).map(|&(i, j)| &self.types[i].indexes[j])
    }

    /// Indexes defined on a record type; empty if the type is unknown.
    #[must_use]
    pub fn indexes_for_type(&self, name: &str) -> &[IndexDefinition] {
        self.record_type(name).map(RecordType::indexes).unwrap_or_default()
    }
}

fn packed_key(key: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    encode_element(key, &mut buf);
    buf
}
