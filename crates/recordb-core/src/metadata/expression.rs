//! Key expressions.
//!
//! A [`KeyExpression`] describes how to derive a tuple from a record. Primary
//! keys and secondary indexes are both defined by one.

use serde::{Deserialize, Serialize};

use crate::encoding::tuple::Tuple;
use crate::types::{Record, Value};

/// Describes how to extract a tuple of values from a record.
///
/// # Example
///
/// ```
/// use recordb_core::metadata::KeyExpression;
/// use recordb_core::types::Record;
///
/// let pk = KeyExpression::concat([KeyExpression::RecordType, KeyExpression::field("order_id")]);
/// let order = Record::new("Order").with_field("order_id", 7i64);
///
/// assert_eq!(pk.field_paths(), vec![vec!["order_id"]]);
/// assert_eq!(pk.evaluate(&order).len(), 1);
///
/// let flower_type = KeyExpression::nested("flower", KeyExpression::field("type"));
/// assert_eq!(flower_type.field_paths(), vec![vec!["flower", "type"]]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyExpression {
    /// The value of a single named field.
    Field(String),
    /// The record-type key. Only valid as the leading component of a primary key.
    RecordType,
    /// Several expressions, flattened left to right.
    Concat(Vec<KeyExpression>),
    /// An expression evaluated against the message held in a field.
    Nested(String, Box<KeyExpression>),
}

impl KeyExpression {
    /// A single-field expression.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Concatenate expressions.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = KeyExpression>) -> Self {
        Self::Concat(parts.into_iter().collect())
    }

    /// Concatenate single-field expressions.
    #[must_use]
    pub fn concat_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Concat(names.into_iter().map(|n| Self::Field(n.into())).collect())
    }

    /// Evaluate `child` against the message stored in field `parent`.
    #[must_use]
    pub fn nested(parent: impl Into<String>, child: KeyExpression) -> Self {
        Self::Nested(parent.into(), Box::new(child))
    }

    /// The field paths this expression reads, in evaluation order.
    ///
    /// Each path lists the message fields to descend through, ending with the
    /// field whose value is taken.
    #[must_use]
    pub fn field_paths(&self) -> Vec<Vec<&str>> {
        let mut out = Vec::new();
        self.collect_paths(&mut Vec::new(), &mut out);
        out
    }

    fn collect_paths<'a>(&'a self, prefix: &mut Vec<&'a str>, out: &mut Vec<Vec<&'a str>>) {
        match self {
            Self::Field(name) => {
                let mut path = prefix.clone();
                path.push(name);
                out.push(path);
            }
            Self::RecordType => {}
            Self::Concat(parts) => {
                for part in parts {
                    part.collect_paths(prefix, out);
                }
            }
            Self::Nested(parent, child) => {
                prefix.push(parent);
                child.collect_paths(prefix, out);
                prefix.pop();
            }
        }
    }

    /// Number of values the expression produces.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.field_paths().len()
    }

    /// Whether a record-type component appears anywhere but the first
    /// top-level position.
    #[must_use]
    pub fn has_misplaced_record_type(&self) -> bool {
        match self {
            Self::Concat(parts) => {
                parts.iter().enumerate().any(|(i, part)| match part {
                    Self::RecordType => i > 0,
                    other => other.has_record_type(),
                })
            }
            Self::Nested(_, child) => child.has_record_type(),
            Self::Field(_) | Self::RecordType => false,
        }
    }

    /// Whether the expression contains a record-type component at all.
    #[must_use]
    pub fn has_record_type(&self) -> bool {
        match self {
            Self::RecordType => true,
            Self::Field(_) => false,
            Self::Concat(parts) => parts.iter().any(Self::has_record_type),
            Self::Nested(_, child) => child.has_record_type(),
        }
    }

    /// Evaluate the field components against a record.
    ///
    /// Missing fields, including fields under a missing message, evaluate to
    /// [`Value::Null`]. The record-type component contributes nothing; storage
    /// keys carry the type key separately.
    #[must_use]
    pub fn evaluate(&self, record: &Record) -> Tuple {
        self.field_paths()
            .into_iter()
            .map(|path| record.get_path(&path).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
