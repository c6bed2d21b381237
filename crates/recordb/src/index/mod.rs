//! Secondary index maintenance.
//!
//! Every index entry is derived from a record: for an index named `n` with
//! expression values `v...`, a record with primary key `pk...` owns the key
//! `indexes ++ pack((n, v..., pk...))` with an empty value. The
//! [`IndexMaintainer`] computes which entries a record change adds and
//! removes, and stages them on the same transaction as the record write, so
//! records and entries commit together or not at all.

mod maintainer;

pub use maintainer::{IndexMaintainer, IndexUpdatePlan};

use recordb_core::{Tuple, Value};

/// An entry read back from a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The indexed values, in expression order.
    pub values: Tuple,
    /// The primary key of the record the entry points at.
    pub primary_key: Tuple,
}

impl IndexEntry {
    /// Split the tuple stored after an index name into values and primary key.
    pub(crate) fn from_tuple(tuple: Tuple, value_count: usize) -> Option<Self> {
        if tuple.len() < value_count {
            return None;
        }
        let mut values: Vec<Value> = tuple.into_values();
        let primary_key = values.split_off(value_count);
        Some(Self { values: Tuple::from(values), primary_key: Tuple::from(primary_key) })
    }
}
