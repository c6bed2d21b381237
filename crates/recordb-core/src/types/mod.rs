//! Core data types for RecorDB.
//!
//! This module defines field values, field types, and the [`Record`] a
//! record store persists.

mod record;
mod value;

pub use record::{Record, UnknownField};
pub use value::{EnumDef, FieldType, Value};
