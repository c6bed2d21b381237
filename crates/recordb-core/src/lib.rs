//! RecorDB Core
//!
//! This crate provides the data model and codecs shared by the record store:
//! values and records, the order-preserving tuple key codec, the record
//! payload codec, and the metadata catalog.
//!
//! # Overview
//!
//! - **Values**: [`Value`] enum for field values and tuple elements
//! - **Records**: [`Record`], a typed map of field values
//! - **Keys**: [`Tuple`] packing and [`Subspace`] prefixes
//! - **Schema**: [`MetaDataBuilder`] and the immutable [`MetaData`] catalog
//!
//! # Example
//!
//! ```
//! use recordb_core::{FieldDef, FieldType, KeyExpression, MetaDataBuilder, Record, RecordTypeDef, Tuple};
//! use recordb_core::encoding::{deserialize_record, serialize_record};
//!
//! let mut builder = MetaDataBuilder::new();
//! builder
//!     .register_type(RecordTypeDef::new("Order").field(FieldDef::new("order_id", 1, FieldType::Int)))?
//!     .set_primary_key("Order", KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("order_id")]))?;
//! let metadata = builder.build()?;
//! let order_type = metadata.record_type("Order").unwrap();
//!
//! let order = Record::new("Order").with_field("order_id", 1i64);
//! assert_eq!(order_type.primary_key_of(&order)?, Tuple::new().with(1i64));
//!
//! let bytes = serialize_record(order_type, &order)?;
//! assert_eq!(deserialize_record(order_type, &bytes)?, order);
//! # Ok::<(), recordb_core::CoreError>(())
//! ```
//!
//! # Modules
//!
//! - [`types`] - Core data types ([`Value`], [`Record`], [`FieldType`])
//! - [`encoding`] - Key and payload codecs
//! - [`metadata`] - Record types, key expressions, and indexes
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod metadata;
pub mod types;

pub use encoding::{printable, Subspace, Tuple, TupleRange};
pub use error::{CoreError, CoreResult};
pub use metadata::{
    FieldDef, IndexDefinition, KeyExpression, MessageDef, MetaData, MetaDataBuilder, RecordType,
    RecordTypeDef,
};
pub use types::{EnumDef, FieldType, Record, UnknownField, Value};
