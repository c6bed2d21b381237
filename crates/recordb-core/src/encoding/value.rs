//! Self-describing serialization for [`Value`] types.
//!
//! This is the encoding used for field values inside record payloads. It is
//! compact rather than order-preserving; see [`tuple`](super::tuple) for the
//! key encoding.
//!
//! # Format
//!
//! Each value is encoded with a 1-byte type tag followed by the payload:
//!
//! - `Null`: `0x00`
//! - `Bool`: `0x01` + `0x00` (false) or `0x01` (true)
//! - `Int`: `0x02` + 8 bytes (big-endian i64)
//! - `Float`: `0x03` + 8 bytes (IEEE 754 f64)
//! - `String`: `0x04` + 4 bytes length + UTF-8 bytes
//! - `Bytes`: `0x05` + 4 bytes length + raw bytes
//! - `Enum`: `0x06` + 4 bytes ordinal
//!
//! Tag `0x07` marks a nested message. Its body is written and read by the
//! [`record`](super::record) codec, which knows the message's fields;
//! [`decode_value`] rejects it.

use crate::error::CoreError;
use crate::types::Value;

use super::traits::{Decoder, Encoder};

pub(crate) mod tags {
    pub const NULL: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STRING: u8 = 0x04;
    pub const BYTES: u8 = 0x05;
    pub const ENUM: u8 = 0x06;
    pub const MESSAGE: u8 = 0x07;
}

fn encode_len(len: usize, what: &str, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    let len = u32::try_from(len).map_err(|_| CoreError::Validation(format!("{what} too long")))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

impl Encoder for Value {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        match self {
            Self::Null => buf.push(tags::NULL),
            Self::Bool(b) => {
                buf.push(tags::BOOL);
                buf.push(u8::from(*b));
            }
            Self::Int(i) => {
                buf.push(tags::INT);
                buf.extend_from_slice(&i.to_be_bytes());
            }
            Self::Float(f) => {
                buf.push(tags::FLOAT);
                buf.extend_from_slice(&f.to_be_bytes());
            }
            Self::String(s) => {
                buf.push(tags::STRING);
                encode_len(s.len(), "string", buf)?;
                buf.extend_from_slice(s.as_bytes());
            }
            Self::Bytes(b) => {
                buf.push(tags::BYTES);
                encode_len(b.len(), "bytes", buf)?;
                buf.extend_from_slice(b);
            }
            Self::Enum(ordinal) => {
                buf.push(tags::ENUM);
                buf.extend_from_slice(&ordinal.to_be_bytes());
            }
        }
        Ok(())
    }
}

impl Decoder for Value {
    fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        let (value, consumed) = decode_value(bytes)?;
        if consumed != bytes.len() {
            return Err(CoreError::Decode(format!(
                "{} trailing bytes after value",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }
}

fn take<const N: usize>(rest: &[u8]) -> Result<[u8; N], CoreError> {
    rest.get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| CoreError::Decode("unexpected end of input".to_owned()))
}

fn take_len_prefixed(rest: &[u8]) -> Result<&[u8], CoreError> {
    let len = u32::from_be_bytes(take::<4>(rest)?) as usize;
    rest.get(4..4 + len).ok_or_else(|| CoreError::Decode("unexpected end of input".to_owned()))
}

/// Decode a value and return the number of bytes consumed.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] on truncated input, an unknown tag, or invalid UTF-8.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize), CoreError> {
    let (&tag, rest) =
        bytes.split_first().ok_or_else(|| CoreError::Decode("unexpected end of input".to_owned()))?;

    match tag {
        tags::NULL => Ok((Value::Null, 1)),
        tags::BOOL => match take::<1>(rest)?[0] {
            0 => Ok((Value::Bool(false), 2)),
            1 => Ok((Value::Bool(true), 2)),
            other => Err(CoreError::Decode(format!("invalid bool byte: {other:#x}"))),
        },
        tags::INT => Ok((Value::Int(i64::from_be_bytes(take::<8>(rest)?)), 9)),
        tags::FLOAT => Ok((Value::Float(f64::from_be_bytes(take::<8>(rest)?)), 9)),
        tags::STRING => {
            let data = take_len_prefixed(rest)?;
            let s = std::str::from_utf8(data)
                .map_err(|e| CoreError::Decode(format!("invalid UTF-8: {e}")))?;
            Ok((Value::String(s.to_owned()), 5 + data.len()))
        }
        tags::BYTES => {
            let data = take_len_prefixed(rest)?;
            Ok((Value::Bytes(data.to_vec()), 5 + data.len()))
        }
        tags::ENUM => Ok((Value::Enum(u32::from_be_bytes(take::<4>(rest)?)), 5)),
        _ => Err(CoreError::Decode(format!("unknown value tag: {tag:#x}"))),
    }
}
