//! Order-preserving tuple encoding for storage keys.
//!
//! This module is the key codec: it packs a [`Tuple`] of [`Value`]s into
//! bytes whose lexicographic order matches the element-wise order of the
//! tuples, and unpacks them again. Every storage key and index entry key is
//! built from a packed tuple.
//!
//! # Element Encoding
//!
//! Each element is a one-byte type tag followed by its payload. Different
//! types order by their tag:
//!
//! - `Null` (0x00)
//! - `Bool` (0x01) - false before true
//! - `Int` (0x02) - negative to positive
//! - `Float` (0x03) - negative to positive, NaN last
//! - `String` (0x04) - lexicographic UTF-8 order
//! - `Bytes` (0x05) - lexicographic byte order
//! - `Enum` (0x06) - by ordinal
//!
//! ## Integer Encoding
//!
//! XOR with `0x8000_0000_0000_0000` flips the sign bit so that negative
//! numbers sort before positive ones; the result is stored big-endian.
//!
//! ## Float Encoding
//!
//! - Positive floats: flip sign bit
//! - Negative floats: flip all bits
//! - NaN is encoded as `u64::MAX` so it sorts after all other floats
//!
//! ## String and Bytes Encoding
//!
//! - `0x00` in the data is escaped to `0x00 0x01`
//! - The sequence ends with `0x00 0x00`
//!
//! The escaping makes every element prefix-free, so a shorter tuple sorts
//! before any tuple it is a prefix of.
//!
//! # Example
//!
//! ```
//! use recordb_core::encoding::tuple::Tuple;
//! use recordb_core::types::Value;
//!
//! let a = Tuple::from(vec![Value::Int(1), Value::from("b")]);
//! let b = Tuple::from(vec![Value::Int(2), Value::from("a")]);
//! assert!(a.pack() < b.pack());
//!
//! let unpacked = Tuple::unpack(&a.pack()).unwrap();
//! assert_eq!(unpacked, a);
//! ```

use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Value;

/// Type tags for tuple elements.
///
/// These tags define the sort order of different types.
pub mod tags {
    /// Null values sort first.
    pub const NULL: u8 = 0x00;
    /// Boolean values (false=0x00, true=0x01).
    pub const BOOL: u8 = 0x01;
    /// 64-bit signed integers.
    pub const INT: u8 = 0x02;
    /// 64-bit floating point numbers.
    pub const FLOAT: u8 = 0x03;
    /// UTF-8 strings.
    pub const STRING: u8 = 0x04;
    /// Raw bytes.
    pub const BYTES: u8 = 0x05;
    /// Enum ordinals.
    pub const ENUM: u8 = 0x06;
}

/// Appended to a packed prefix to form the exclusive end of its range.
///
/// No element tag is this large, so every extension of the prefix sorts below it.
pub const RANGE_END: u8 = 0xFF;

const SIGN_FLIP_I64: u64 = 0x8000_0000_0000_0000;
const ESCAPE_BYTE: u8 = 0x01;
const TERMINATOR: u8 = 0x00;

fn encode_bytes_escaped(data: &[u8], buf: &mut Vec<u8>) {
    for &byte in data {
        if byte == 0x00 {
            buf.push(0x00);
            buf.push(ESCAPE_BYTE);
        } else {
            buf.push(byte);
        }
    }
    buf.push(TERMINATOR);
    buf.push(TERMINATOR);
}

/// Returns the decoded bytes and the number of input bytes consumed.
fn decode_bytes_escaped(data: &[u8]) -> Result<(Vec<u8>, usize), CoreError> {
    let mut result = Vec::new();
    let mut i = 0;

    while i < data.len() {
        if data[i] == 0x00 {
            match data.get(i + 1) {
                Some(&TERMINATOR) => return Ok((result, i + 2)),
                Some(&ESCAPE_BYTE) => {
                    result.push(0x00);
                    i += 2;
                }
                Some(other) => {
                    return Err(CoreError::Decode(format!(
                        "invalid escape sequence: 0x00 0x{other:02x}"
                    )));
                }
                None => {
                    return Err(CoreError::Decode("unexpected end of escaped bytes".into()));
                }
            }
        } else {
            result.push(data[i]);
            i += 1;
        }
    }

    Err(CoreError::Decode("missing terminator in escaped bytes".into()))
}

/// Append the order-preserving encoding of one element to `buf`.
pub fn encode_element(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(tags::NULL),
        Value::Bool(b) => {
            buf.push(tags::BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(tags::INT);
            #[allow(clippy::cast_sign_loss)]
            let encoded = (*i as u64) ^ SIGN_FLIP_I64;
            buf.extend_from_slice(&encoded.to_be_bytes());
        }
        Value::Float(f) => {
            buf.push(tags::FLOAT);
            let bits = f.to_bits();
            let encoded = if f.is_nan() {
                u64::MAX
            } else if bits & SIGN_FLIP_I64 == 0 {
                bits ^ SIGN_FLIP_I64
            } else {
                !bits
            };
            buf.extend_from_slice(&encoded.to_be_bytes());
        }
        Value::String(s) => {
            buf.push(tags::STRING);
            encode_bytes_escaped(s.as_bytes(), buf);
        }
        Value::Bytes(b) => {
            buf.push(tags::BYTES);
            encode_bytes_escaped(b, buf);
        }
        Value::Enum(ordinal) => {
            buf.push(tags::ENUM);
            buf.extend_from_slice(&ordinal.to_be_bytes());
        }
    }
}

fn fixed<const N: usize>(rest: &[u8], what: &str) -> Result<[u8; N], CoreError> {
    rest.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| CoreError::Decode(format!("unexpected end of input reading {what}")))
}

/// Decode one element and return the number of bytes consumed.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] if the bytes are malformed or incomplete.
pub fn decode_element(bytes: &[u8]) -> Result<(Value, usize), CoreError> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| CoreError::Decode("unexpected end of input in tuple element".into()))?;

    match tag {
        tags::NULL => Ok((Value::Null, 1)),

        tags::BOOL => match fixed::<1>(rest, "bool")? {
            [0] => Ok((Value::Bool(false), 2)),
            [1] => Ok((Value::Bool(true), 2)),
            [other] => Err(CoreError::Decode(format!("invalid bool byte: {other:#x}"))),
        },

        tags::INT => {
            let encoded = u64::from_be_bytes(fixed::<8>(rest, "int")?);
            #[allow(clippy::cast_possible_wrap)]
            let value = (encoded ^ SIGN_FLIP_I64) as i64;
            Ok((Value::Int(value), 9))
        }

        tags::FLOAT => {
            let encoded = u64::from_be_bytes(fixed::<8>(rest, "float")?);
            let bits = if encoded == u64::MAX {
                f64::NAN.to_bits()
            } else if encoded & SIGN_FLIP_I64 != 0 {
                encoded ^ SIGN_FLIP_I64
            } else {
                !encoded
            };
            Ok((Value::Float(f64::from_bits(bits)), 9))
        }

        tags::STRING => {
            let (decoded, consumed) = decode_bytes_escaped(rest)?;
            let s = String::from_utf8(decoded)
                .map_err(|e| CoreError::Decode(format!("invalid UTF-8: {e}")))?;
            Ok((Value::String(s), 1 + consumed))
        }

        tags::BYTES => {
            let (decoded, consumed) = decode_bytes_escaped(rest)?;
            Ok((Value::Bytes(decoded), 1 + consumed))
        }

        tags::ENUM => Ok((Value::Enum(u32::from_be_bytes(fixed::<4>(rest, "enum")?)), 5)),

        _ => Err(CoreError::Decode(format!("unknown tuple type tag: {tag:#x}"))),
    }
}

/// An ordered sequence of values: a primary key, an index key, or a key prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    /// Create an empty tuple.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an element (builder pattern).
    #[must_use]
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Append an element.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// The elements as a slice.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Consume the tuple, returning its elements.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Pack the tuple into its order-preserving byte form.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.0.len() * 9);
        self.pack_into(&mut buf);
        buf
    }

    /// Append the packed form of the tuple to `buf`.
    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        for value in &self.0 {
            encode_element(value, buf);
        }
    }

    /// Unpack a tuple from bytes produced by [`pack`](Self::pack).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if any element is malformed.
    pub fn unpack(bytes: &[u8]) -> Result<Self, CoreError> {
        let mut values = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let (value, consumed) = decode_element(&bytes[offset..])?;
            values.push(value);
            offset += consumed;
        }
        Ok(Self(values))
    }

    /// The byte range `[packed, packed ++ 0xFF)` covering every tuple this one is a prefix of.
    #[must_use]
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let start = self.pack();
        let mut end = start.clone();
        end.push(RANGE_END);
        (start, end)
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Encode a record-type key and primary key as one packed key tuple `(tag, pk...)`.
#[must_use]
pub fn encode_key(tag: &Value, primary_key: &Tuple) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9 + primary_key.len() * 9);
    encode_element(tag, &mut buf);
    primary_key.pack_into(&mut buf);
    buf
}

/// Split a packed key into its record-type key and primary key.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] on empty input or a malformed element.
pub fn decode_key(bytes: &[u8]) -> Result<(Value, Tuple), CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::Decode("empty key".into()));
    }
    let (tag, consumed) = decode_element(bytes)?;
    let primary_key = Tuple::unpack(&bytes[consumed..])?;
    Ok((tag, primary_key))
}

/// A range of tuples, resolved against a packed prefix when scanning.
///
/// An inclusive bound on a tuple covers every tuple it is a prefix of; an
/// exclusive bound covers none of them.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleRange {
    /// Lower bound.
    pub low: Bound<Tuple>,
    /// Upper bound.
    pub high: Bound<Tuple>,
}

impl TupleRange {
    /// Every tuple.
    #[must_use]
    pub const fn all() -> Self {
        Self { low: Bound::Unbounded, high: Bound::Unbounded }
    }

    /// Every tuple that starts with `prefix`.
    #[must_use]
    pub fn prefix(prefix: Tuple) -> Self {
        Self { low: Bound::Included(prefix.clone()), high: Bound::Included(prefix) }
    }

    /// Tuples from `low` (inclusive) up to `high` (exclusive).
    #[must_use]
    pub const fn between(low: Tuple, high: Tuple) -> Self {
        Self { low: Bound::Included(low), high: Bound::Excluded(high) }
    }

    /// Tuples from `low` (inclusive) up to and including `high` and its extensions.
    #[must_use]
    pub const fn between_inclusive(low: Tuple, high: Tuple) -> Self {
        Self { low: Bound::Included(low), high: Bound::Included(high) }
    }

    /// Tuples at or after `low`.
    #[must_use]
    pub const fn at_least(low: Tuple) -> Self {
        Self { low: Bound::Included(low), high: Bound::Unbounded }
    }

    /// Tuples strictly before `high`.
    #[must_use]
    pub const fn less_than(high: Tuple) -> Self {
        Self { low: Bound::Unbounded, high: Bound::Excluded(high) }
    }

    /// Resolve to a half-open byte range `[start, end)` under `prefix`.
    #[must_use]
    pub fn to_byte_range(&self, prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let with = |tuple: &Tuple, extend: bool| {
            let mut key = prefix.to_vec();
            tuple.pack_into(&mut key);
            if extend {
                key.push(RANGE_END);
            }
            key
        };
        let start = match &self.low {
            Bound::Included(t) => with(t, false),
            Bound::Excluded(t) => with(t, true),
            Bound::Unbounded => prefix.to_vec(),
        };
        let end = match &self.high {
            Bound::Included(t) => with(t, true),
            Bound::Excluded(t) => with(t, false),
            Bound::Unbounded => {
                let mut key = prefix.to_vec();
                key.push(RANGE_END);
                key
            }
        };
        (start, end)
    }
}

impl Default for TupleRange {
    fn default() -> Self {
        Self::all()
    }
}
