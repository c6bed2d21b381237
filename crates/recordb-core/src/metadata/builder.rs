//! Schema builder.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::encoding::tuple::encode_element;
use crate::error::{CoreError, CoreResult};
use crate::types::{FieldType, Value};

use super::record_type::resolve_path;
use super::{FieldDef, IndexDefinition, KeyExpression, MetaData, RecordType, RecordTypeDef};

#[derive(Debug)]
struct PendingType {
    def: RecordTypeDef,
    primary_key: Option<KeyExpression>,
    indexes: Vec<IndexDefinition>,
}

/// Accumulates record types, primary keys, and indexes, then validates them
/// into an immutable [`MetaData`].
///
/// Once [`build`](Self::build) succeeds the builder is sealed and every
/// mutating call fails with [`CoreError::ImmutableSchema`].
///
/// # Example
///
/// ```
/// use recordb_core::metadata::{FieldDef, IndexDefinition, KeyExpression, MetaDataBuilder, RecordTypeDef};
/// use recordb_core::types::FieldType;
///
/// let mut builder = MetaDataBuilder::new();
/// builder
///     .register_type(
///         RecordTypeDef::new("Order")
///             .field(FieldDef::new("order_id", 1, FieldType::Int))
///             .field(FieldDef::new("price", 2, FieldType::Int)),
///     )?
///     .set_primary_key(
///         "Order",
///         KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("order_id")]),
///     )?
///     .add_index("Order", IndexDefinition::new("priceIndex", KeyExpression::field("price")))?;
///
/// let metadata = builder.build()?;
/// assert_eq!(metadata.indexes_for_type("Order").len(), 1);
/// assert!(builder.version(2).is_err());
/// # Ok::<(), recordb_core::CoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MetaDataBuilder {
    types: Vec<PendingType>,
    version: u32,
    built: Option<Arc<MetaData>>,
}

impl MetaDataBuilder {
    /// Create an empty builder at metadata version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, operation: &str) -> CoreResult<()> {
        if self.built.is_some() {
            return Err(CoreError::ImmutableSchema(operation.to_owned()));
        }
        Ok(())
    }

    fn pending_mut(&mut self, name: &str) -> CoreResult<&mut PendingType> {
        self.types
            .iter_mut()
            .find(|t| t.def.name == name)
            .ok_or_else(|| CoreError::Schema(format!("record type {name} is not registered")))
    }

    /// Register a record type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ImmutableSchema`] if the builder is sealed
    /// - [`CoreError::Schema`] if the type name is taken or a field name or
    ///   field number is declared twice
    pub fn register_type(&mut self, def: RecordTypeDef) -> CoreResult<&mut Self> {
        self.ensure_open("register_type")?;
        if self.types.iter().any(|t| t.def.name == def.name) {
            return Err(CoreError::Schema(format!("record type {} is already registered", def.name)));
        }
        check_field_list(&def.name, &def.fields)?;
        self.types.push(PendingType { def, primary_key: None, indexes: Vec::new() });
        Ok(self)
    }

    /// Set the primary-key expression of a registered type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ImmutableSchema`] if the builder is sealed
    /// - [`CoreError::Schema`] if the type is not registered
    pub fn set_primary_key(&mut self, record_type: &str, expression: KeyExpression) -> CoreResult<&mut Self> {
        self.ensure_open("set_primary_key")?;
        self.pending_mut(record_type)?.primary_key = Some(expression);
        Ok(self)
    }

    /// Add a secondary index to a registered type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ImmutableSchema`] if the builder is sealed
    /// - [`CoreError::Schema`] if the type is not registered
    pub fn add_index(&mut self, record_type: &str, index: IndexDefinition) -> CoreResult<&mut Self> {
        self.ensure_open("add_index")?;
        self.pending_mut(record_type)?.indexes.push(index.for_type(record_type));
        Ok(self)
    }

    /// Set the metadata version recorded in store headers.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImmutableSchema`] if the builder is sealed.
    pub fn version(&mut self, version: u32) -> CoreResult<&mut Self> {
        self.ensure_open("version")?;
        self.version = version;
        Ok(self)
    }

    /// Validate the schema and produce the immutable catalog.
    ///
    /// Calling `build` again after success returns the same catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] if a type lacks a primary key, an index
    /// name is used twice, an expression names an undeclared field or puts
    /// the record-type component anywhere but first in a primary key, a
    /// primary-key field is optional, or two types share a record-type key.
    pub fn build(&mut self) -> CoreResult<Arc<MetaData>> {
        if let Some(built) = &self.built {
            return Ok(Arc::clone(built));
        }

        let mut types = Vec::with_capacity(self.types.len());
        let mut seen_keys: HashMap<Vec<u8>, String> = HashMap::new();
        let mut seen_indexes: HashSet<&str> = HashSet::new();

        for (position, pending) in self.types.iter().enumerate() {
            let name = &pending.def.name;
            let Some(primary_key) = pending.primary_key.clone() else {
                return Err(CoreError::Schema(format!("record type {name} has no primary key")));
            };
            check_primary_key(&pending.def, &primary_key)?;

            for index in &pending.indexes {
                if !seen_indexes.insert(index.name()) {
                    return Err(CoreError::Schema(format!("index {} is defined twice", index.name())));
                }
                check_index(&pending.def, index)?;
            }

            let key = match &pending.def.key {
                Some(explicit) => explicit.clone(),
                None => Value::Int(i64::try_from(position + 1).unwrap_or(i64::MAX)),
            };
            let mut packed = Vec::new();
            encode_element(&key, &mut packed);
            if let Some(other) = seen_keys.insert(packed, name.clone()) {
                return Err(CoreError::Schema(format!(
                    "record types {other} and {name} share record-type key {key}"
                )));
            }

            types.push(RecordType {
                name: name.clone(),
                key,
                fields: pending.def.fields.clone(),
                primary_key,
                indexes: pending.indexes.clone(),
            });
        }

        let metadata = Arc::new(MetaData::new(self.version, types));
        self.built = Some(Arc::clone(&metadata));
        Ok(metadata)
    }
}

fn check_field_list(owner: &str, fields: &[FieldDef]) -> CoreResult<()> {
    let mut names = HashSet::new();
    let mut numbers = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(CoreError::Schema(format!("field {owner}.{} is declared twice", field.name)));
        }
        if !numbers.insert(field.number) {
            return Err(CoreError::Schema(format!(
                "field number {} is used twice in {owner}",
                field.number
            )));
        }
        if let FieldType::Message(message) = &field.field_type {
            check_field_list(&format!("{owner}.{}", field.name), message.fields())?;
        }
    }
    Ok(())
}

/// Resolve every path of `expression`, returning the field chains.
fn check_fields_declared<'a>(
    def: &'a RecordTypeDef,
    expression: &KeyExpression,
    what: &str,
) -> CoreResult<Vec<Vec<&'a FieldDef>>> {
    let paths = expression.field_paths();
    if paths.is_empty() {
        return Err(CoreError::Schema(format!("{what} of {} has no fields", def.name)));
    }
    paths
        .iter()
        .map(|path| {
            let chain = resolve_path(&def.fields, path).ok_or_else(|| {
                CoreError::Schema(format!(
                    "{what} of {} references undeclared field {}",
                    def.name,
                    path.join(".")
                ))
            })?;
            if chain.last().is_some_and(|f| matches!(f.field_type, FieldType::Message(_))) {
                return Err(CoreError::Schema(format!(
                    "{what} of {} must name a field inside message {}, not the message itself",
                    def.name,
                    path.join(".")
                )));
            }
            Ok(chain)
        })
        .collect()
}

fn check_primary_key(def: &RecordTypeDef, expression: &KeyExpression) -> CoreResult<()> {
    if expression.has_misplaced_record_type() {
        return Err(CoreError::Schema(format!(
            "primary key of {} may only use the record type as its first component",
            def.name
        )));
    }
    for chain in check_fields_declared(def, expression, "primary key")? {
        if chain.iter().any(|f| f.optional) {
            let path: Vec<&str> = chain.iter().map(|f| f.name.as_str()).collect();
            return Err(CoreError::Schema(format!(
                "primary key field {}.{} must not be optional",
                def.name,
                path.join(".")
            )));
        }
    }
    Ok(())
}

fn check_index(def: &RecordTypeDef, index: &IndexDefinition) -> CoreResult<()> {
    if index.expression().has_record_type() {
        return Err(CoreError::Schema(format!(
            "index {} may not use the record type component",
            index.name()
        )));
    }
    check_fields_declared(def, index.expression(), &format!("index {}", index.name()))?;
    Ok(())
}
