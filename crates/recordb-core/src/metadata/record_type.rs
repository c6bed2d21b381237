//! Record type, field, and index definitions.

use serde::{Deserialize, Serialize};

use crate::encoding::tuple::Tuple;
use crate::error::{CoreError, CoreResult};
use crate::types::{FieldType, Record, Value};

use super::KeyExpression;

/// A declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within its record type.
    pub name: String,
    /// Field number written on the wire; stable across schema versions.
    pub number: u32,
    /// Declared value type.
    pub field_type: FieldType,
    /// Whether the field may be absent.
    pub optional: bool,
}

impl FieldDef {
    /// A required field.
    #[must_use]
    pub fn new(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self { name: name.into(), number, field_type, optional: false }
    }

    /// An optional field.
    #[must_use]
    pub fn optional(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self { optional: true, ..Self::new(name, number, field_type) }
    }
}

/// A nested message type: a named group of fields stored inside a record
/// field rather than under its own key.
///
/// # Example
///
/// ```
/// use recordb_core::metadata::{FieldDef, MessageDef};
/// use recordb_core::types::{FieldType, Record};
///
/// let flower = MessageDef::new("Flower")
///     .field(FieldDef::new("type", 1, FieldType::String))
///     .field(FieldDef::optional("color", 2, FieldType::Int));
///
/// let rose = Record::new("Flower").with_field("type", "ROSE");
/// assert!(flower.validate(&rose).is_ok());
/// assert!(flower.validate(&Record::new("Flower")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDef {
    name: String,
    fields: Vec<FieldDef>,
}

impl MessageDef {
    /// A message type with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    /// Declare a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// The message type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Check that a nested record conforms to this message type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] under the same rules as
    /// [`RecordType::validate`].
    pub fn validate(&self, record: &Record) -> CoreResult<()> {
        validate_fields(&self.name, &self.fields, record)
    }
}

/// Check a record's fields and nested messages against declared fields.
pub(crate) fn validate_fields(type_name: &str, fields: &[FieldDef], record: &Record) -> CoreResult<()> {
    if record.record_type() != type_name {
        return Err(CoreError::Validation(format!(
            "record of type {} checked against type {type_name}",
            record.record_type()
        )));
    }
    let declared = |name: &str| {
        fields.iter().find(|f| f.name == name).ok_or_else(|| {
            CoreError::Validation(format!("field {type_name}.{name} is not declared"))
        })
    };
    for (name, value) in record.fields() {
        let def = declared(name)?;
        if !def.field_type.accepts(value) {
            return Err(CoreError::field_type_mismatch(type_name, name, &def.field_type, value));
        }
    }
    for (name, nested) in record.messages() {
        let def = declared(name)?;
        let FieldType::Message(message) = &def.field_type else {
            return Err(CoreError::field_type_mismatch(
                type_name,
                name,
                &def.field_type,
                format_args!("message {}", nested.record_type()),
            ));
        };
        message.validate(nested).map_err(|e| match e {
            CoreError::Validation(msg) => CoreError::Validation(format!("in {type_name}.{name}: {msg}")),
            other => other,
        })?;
    }
    if let Some(missing) = fields.iter().find(|f| !f.optional && !record.has_field(&f.name)) {
        return Err(CoreError::Validation(format!(
            "required field {type_name}.{} is missing",
            missing.name
        )));
    }
    Ok(())
}

/// Resolve a field path to the chain of field definitions it passes through.
///
/// Every component but the last must name a message field.
pub(crate) fn resolve_path<'a>(fields: &'a [FieldDef], path: &[&str]) -> Option<Vec<&'a FieldDef>> {
    let mut chain = Vec::with_capacity(path.len());
    let mut scope = fields;
    for (i, name) in path.iter().enumerate() {
        let def = scope.iter().find(|f| f.name == *name)?;
        chain.push(def);
        if i + 1 < path.len() {
            let FieldType::Message(message) = &def.field_type else {
                return None;
            };
            scope = message.fields();
        }
    }
    Some(chain)
}

/// A record type as registered with a
/// [`MetaDataBuilder`](super::MetaDataBuilder), before it is built.
///
/// # Example
///
/// ```
/// use recordb_core::metadata::{FieldDef, RecordTypeDef};
/// use recordb_core::types::FieldType;
///
/// let order = RecordTypeDef::new("Order")
///     .field(FieldDef::new("order_id", 1, FieldType::Int))
///     .field(FieldDef::optional("price", 2, FieldType::Int));
/// assert_eq!(order.fields().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTypeDef {
    pub(crate) name: String,
    pub(crate) key: Option<Value>,
    pub(crate) fields: Vec<FieldDef>,
}

impl RecordTypeDef {
    /// A record type with no fields and an auto-assigned record-type key.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), key: None, fields: Vec::new() }
    }

    /// Use an explicit record-type key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Declare a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
}

/// A secondary index over fields of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    name: String,
    record_type: String,
    expression: KeyExpression,
}

impl IndexDefinition {
    /// An index named `name` over `expression`. The owning record type is
    /// assigned when the index is added to a builder.
    #[must_use]
    pub fn new(name: impl Into<String>, expression: KeyExpression) -> Self {
        Self { name: name.into(), record_type: String::new(), expression }
    }

    pub(crate) fn for_type(mut self, record_type: &str) -> Self {
        record_type.clone_into(&mut self.record_type);
        self
    }

    /// Index name, unique across the catalog.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the record type this index covers.
    #[must_use]
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The indexed expression.
    #[must_use]
    pub fn expression(&self) -> &KeyExpression {
        &self.expression
    }

    /// The indexed values of a record; missing optional fields index as null.
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> Tuple {
        self.expression.evaluate(record)
    }
}

/// A built, immutable record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub(crate) name: String,
    pub(crate) key: Value,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) primary_key: KeyExpression,
    pub(crate) indexes: Vec<IndexDefinition>,
}

impl RecordType {
    /// The type name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record-type key prefixed to every storage key of this type.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by wire number.
    #[must_use]
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// The primary-key expression.
    #[must_use]
    pub fn primary_key(&self) -> &KeyExpression {
        &self.primary_key
    }

    /// Secondary indexes on this type.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Check that a record conforms to this type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the record names another type,
    /// lacks a required field, sets an undeclared field, or holds a value of
    /// the wrong type.
    pub fn validate(&self, record: &Record) -> CoreResult<()> {
        validate_fields(&self.name, &self.fields, record)
    }

    /// The primary-key tuple of a record: its primary-key field values in order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a primary-key field is absent.
    pub fn primary_key_of(&self, record: &Record) -> CoreResult<Tuple> {
        self.primary_key
            .field_paths()
            .into_iter()
            .map(|path| {
                record.get_path(&path).cloned().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "primary key field {}.{} is missing",
                        self.name,
                        path.join(".")
                    ))
                })
            })
            .collect()
    }
}
