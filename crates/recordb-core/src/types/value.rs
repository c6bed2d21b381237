//! Field values and field types.
//!
//! This module provides the [`Value`] enum, which represents every value a
//! record field or a tuple element can hold, and [`FieldType`], which a
//! record type declares for each of its fields.
//!
//! # Example
//!
//! ```
//! use recordb_core::{EnumDef, FieldType, Value};
//!
//! let price: Value = 123i64.into();
//! let name: Value = "rose".into();
//! assert_eq!(price.as_int(), Some(123));
//! assert_eq!(name.as_str(), Some("rose"));
//!
//! let color = EnumDef::new("Color", ["RED", "GREEN", "BLUE"]);
//! let red = color.value("RED").unwrap();
//! assert_eq!(red, Value::Enum(0));
//! assert!(FieldType::Enum(color).accepts(&red));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::MessageDef;

/// A value stored in a record field or a tuple element.
///
/// | Variant | Rust Type | Use Case |
/// |---------|-----------|----------|
/// | `Null` | - | Missing optional values in index keys |
/// | `Bool` | `bool` | Flags |
/// | `Int` | `i64` | Identifiers, amounts, timestamps |
/// | `Float` | `f64` | Measurements |
/// | `String` | `String` | Text |
/// | `Bytes` | `Vec<u8>` | Opaque binary data |
/// | `Enum` | `u32` | Ordinal of an enumerated value |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordinal of a variant of an [`EnumDef`]
    Enum(u32),
}

impl Value {
    /// Returns the name of this value's kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Enum(_) => "enum",
        }
    }

    /// Returns `true` if this is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float if this is a `Float`.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes if this is `Bytes`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the ordinal if this is an `Enum`.
    #[must_use]
    pub const fn as_enum(&self) -> Option<u32> {
        match self {
            Self::Enum(ordinal) => Some(*ordinal),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "b{:?}", crate::encoding::printable(b)),
            Self::Enum(ordinal) => write!(f, "#{ordinal}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// An enumerated type: a name and its ordered variants.
///
/// Variant ordinals are their positions, so enum values sort in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    name: String,
    variants: Vec<String>,
}

impl EnumDef {
    /// Create an enum definition from its name and variants.
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), variants: variants.into_iter().map(Into::into).collect() }
    }

    /// The enum's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variant names in ordinal order.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// The [`Value::Enum`] for a variant name.
    #[must_use]
    pub fn value(&self, variant: &str) -> Option<Value> {
        self.variants
            .iter()
            .position(|v| v == variant)
            .and_then(|pos| u32::try_from(pos).ok())
            .map(Value::Enum)
    }

    /// The variant name for an ordinal.
    #[must_use]
    pub fn variant_name(&self, ordinal: u32) -> Option<&str> {
        self.variants.get(ordinal as usize).map(String::as_str)
    }

    /// Whether the ordinal names a declared variant.
    #[must_use]
    pub fn contains(&self, ordinal: u32) -> bool {
        (ordinal as usize) < self.variants.len()
    }
}

/// The declared type of a record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
    /// Enumerated value.
    Enum(EnumDef),
    /// Nested message, held as a [`Record`](super::Record) rather than a [`Value`].
    Message(MessageDef),
}

impl FieldType {
    /// Check whether a value is an instance of this type.
    ///
    /// `Null` is never accepted; optional fields are represented by absence.
    /// A message type accepts no value, since messages are nested records.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::String, Value::String(_))
            | (Self::Bytes, Value::Bytes(_)) => true,
            (Self::Enum(def), Value::Enum(ordinal)) => def.contains(*ordinal),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::Enum(def) => write!(f, "enum {}", def.name()),
            Self::Message(def) => write!(f, "message {}", def.name()),
        }
    }
}
