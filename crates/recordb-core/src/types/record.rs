//! Typed records.
//!
//! A [`Record`] is an instance of a record type: the type's name plus a map
//! of field names to values. Fields of a message type hold a nested
//! [`Record`] instead of a value. Fields written by a newer schema that the
//! current schema does not declare are carried along as [`UnknownField`]s so
//! that a read-modify-write cycle does not drop them.
//!
//! # Example
//!
//! ```
//! use recordb_core::types::{Record, Value};
//!
//! let order = Record::new("Order")
//!     .with_field("order_id", 1i64)
//!     .with_field("price", 123i64);
//!
//! assert_eq!(order.record_type(), "Order");
//! assert_eq!(order.get_field("price"), Some(&Value::Int(123)));
//!
//! let order = order.with_message("flower", Record::new("Flower").with_field("type", "ROSE"));
//! assert_eq!(order.get_path(&["flower", "type"]), Some(&Value::from("ROSE")));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Value;

/// A field preserved verbatim from a payload written by a different schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownField {
    /// The field number as it appeared on the wire.
    pub number: u32,
    /// The encoded value bytes, kept opaque.
    pub bytes: Vec<u8>,
}

/// An instance of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    record_type: String,
    fields: BTreeMap<String, Value>,
    messages: BTreeMap<String, Record>,
    unknown_fields: Vec<UnknownField>,
}

impl Record {
    /// Create an empty record of the named type.
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            fields: BTreeMap::new(),
            messages: BTreeMap::new(),
            unknown_fields: Vec::new(),
        }
    }

    /// Set a field (builder pattern).
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a message-typed field to a nested record (builder pattern).
    #[must_use]
    pub fn with_message(mut self, name: impl Into<String>, message: Record) -> Self {
        self.set_message(name, message);
        self
    }

    /// The name of this record's type.
    #[inline]
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Get a field value by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        self.messages.remove(&name);
        self.fields.insert(name, value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Get a nested message by field name.
    #[must_use]
    pub fn get_message(&self, name: &str) -> Option<&Record> {
        self.messages.get(name)
    }

    /// Set a message-typed field, returning the previous nested record.
    pub fn set_message(&mut self, name: impl Into<String>, message: Record) -> Option<Record> {
        let name = name.into();
        self.fields.remove(&name);
        self.messages.insert(name, message)
    }

    /// Remove a nested message, returning it.
    pub fn remove_message(&mut self, name: &str) -> Option<Record> {
        self.messages.remove(name)
    }

    /// Whether a field or nested message is set under `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.messages.contains_key(name)
    }

    /// Follow a path of message fields down to a value.
    ///
    /// `["flower", "type"]` reads field `type` of the message in `flower`.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut record = self;
        for parent in parents {
            record = record.messages.get(*parent)?;
        }
        record.fields.get(*last)
    }

    /// All known fields in name order.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// All nested messages in field-name order.
    #[must_use]
    pub fn messages(&self) -> &BTreeMap<String, Record> {
        &self.messages
    }

    /// Fields carried over from a payload written by another schema version.
    #[must_use]
    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown_fields
    }

    pub(crate) fn push_unknown_field(&mut self, field: UnknownField) {
        self.unknown_fields.push(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_remove_fields() {
        let mut record = Record::new("Person").with_field("name", "Ada");
        assert_eq!(record.set_field("name", "Grace"), Some(Value::from("Ada")));
        assert_eq!(record.get_field("name"), Some(&Value::from("Grace")));
        assert_eq!(record.remove_field("name"), Some(Value::from("Grace")));
        assert!(record.fields().is_empty());
        assert!(record.unknown_fields().is_empty());
    }

    #[test]
    fn messages_and_paths() {
        let flower = Record::new("Flower").with_field("type", "ROSE");
        let mut order = Record::new("Order").with_field("flower", "rose").with_message("flower", flower);
        assert!(order.get_field("flower").is_none());
        assert!(order.has_field("flower"));
        assert_eq!(order.get_path(&["flower", "type"]), Some(&Value::from("ROSE")));
        assert_eq!(order.get_path(&["flower", "color"]), None);
        assert_eq!(order.get_path(&["missing", "type"]), None);
        assert_eq!(order.get_path(&[]), None);

        order.set_field("flower", 1i64);
        assert!(order.get_message("flower").is_none());
        assert_eq!(order.get_path(&["flower"]), Some(&Value::Int(1)));
    }
}
