//! Record payload serialization.
//!
//! # Format
//!
//! ```text
//! [FORMAT_VERSION: u8]
//! [record-type key: tuple element]
//! body:
//!   [field count: u32 BE]
//!   repeated: [field number: u32 BE][value length: u32 BE][value bytes]
//! ```
//!
//! Value bytes use the self-describing [`value`](super::value) encoding,
//! except for message-typed fields, whose value bytes are the message tag
//! `0x07` followed by a nested body in the same layout. Known fields are
//! written in declaration order, followed by any unknown fields the record
//! carried in from a payload written by another schema version. Fields are
//! identified by number, never by name, so renaming a field does not change
//! its stored form.

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::metadata::{FieldDef, RecordType};
use crate::types::{FieldType, Record, UnknownField, Value};

use super::traits::{Decoder, Encoder, FORMAT_VERSION};
use super::tuple::{decode_element, encode_element};
use super::value::tags;

/// Smallest encoded field entry: a number and a length, with no value bytes.
const MIN_FIELD_LEN: usize = 8;

fn push_u32(buf: &mut Vec<u8>, n: usize, what: &str) -> CoreResult<()> {
    let n = u32::try_from(n).map_err(|_| CoreError::Validation(format!("{what} too large")))?;
    buf.extend_from_slice(&n.to_be_bytes());
    Ok(())
}

/// Serialize a record of the given type.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the record does not conform to the type.
pub fn serialize_record(record_type: &RecordType, record: &Record) -> CoreResult<Vec<u8>> {
    record_type.validate(record)?;

    let mut buf = Vec::with_capacity(64);
    buf.push(FORMAT_VERSION);
    encode_element(record_type.key(), &mut buf);
    encode_body(record_type.fields(), record, &mut buf)?;
    Ok(buf)
}

fn encode_body(fields: &[FieldDef], record: &Record, buf: &mut Vec<u8>) -> CoreResult<()> {
    let present = fields.iter().filter(|def| record.has_field(&def.name)).count();
    push_u32(buf, present + record.unknown_fields().len(), "field count")?;

    let mut scratch = Vec::new();
    for def in fields {
        scratch.clear();
        match (&def.field_type, record.get_message(&def.name), record.get_field(&def.name)) {
            (FieldType::Message(message), Some(nested), _) => {
                scratch.push(tags::MESSAGE);
                encode_body(message.fields(), nested, &mut scratch)?;
            }
            (_, _, Some(value)) => value.encode_to(&mut scratch)?,
            _ => continue,
        }
        buf.extend_from_slice(&def.number.to_be_bytes());
        push_u32(buf, scratch.len(), "field value")?;
        buf.extend_from_slice(&scratch);
    }
    for unknown in record.unknown_fields() {
        buf.extend_from_slice(&unknown.number.to_be_bytes());
        push_u32(buf, unknown.bytes.len(), "field value")?;
        buf.extend_from_slice(&unknown.bytes);
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let slice = self
            .pos
            .checked_add(n)
            .and_then(|end| self.bytes.get(self.pos..end))
            .ok_or_else(|| format!("truncated at offset {}", self.pos))?;
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, String> {
        let bytes = self.take(4)?;
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(arr))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

/// Deserialize a payload written for the given record type.
///
/// Fields whose numbers the type does not declare are kept as
/// [`UnknownField`]s and written back unchanged by [`serialize_record`].
///
/// # Errors
///
/// Returns [`CoreError::CorruptPayload`] if the format version or record-type
/// key does not match, the layout is truncated or has trailing bytes, the
/// field count cannot fit in the payload, a field number repeats, or a known
/// field holds a value of the wrong type.
pub fn deserialize_record(record_type: &RecordType, bytes: &[u8]) -> CoreResult<Record> {
    let corrupt = |msg: String| CoreError::CorruptPayload(format!("{}: {msg}", record_type.name()));

    let (&version, rest) = bytes.split_first().ok_or_else(|| corrupt("empty payload".into()))?;
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {version}")));
    }

    let (type_key, consumed) =
        decode_element(rest).map_err(|e| corrupt(format!("bad record-type key: {e}")))?;
    if &type_key != record_type.key() {
        return Err(corrupt(format!("record-type key {type_key} does not match {}", record_type.key())));
    }

    decode_body(record_type.name(), record_type.name(), record_type.fields(), &rest[consumed..])
}

/// Decode a body into a record named `record_name`; `path` prefixes error messages.
fn decode_body(path: &str, record_name: &str, fields: &[FieldDef], body: &[u8]) -> CoreResult<Record> {
    let corrupt = |msg: String| CoreError::CorruptPayload(format!("{path}: {msg}"));
    let mut reader = Reader { bytes: body, pos: 0 };

    let count = reader.u32().map_err(corrupt)? as usize;
    if count > reader.remaining() / MIN_FIELD_LEN {
        return Err(corrupt(format!(
            "field count {count} does not fit in {} bytes",
            reader.remaining()
        )));
    }

    let mut record = Record::new(record_name);
    let mut seen = HashSet::new();
    for _ in 0..count {
        let number = reader.u32().map_err(corrupt)?;
        let len = reader.u32().map_err(corrupt)? as usize;
        let value_bytes = reader.take(len).map_err(corrupt)?;
        if !seen.insert(number) {
            return Err(corrupt(format!("field number {number} appears twice")));
        }

        let Some(def) = fields.iter().find(|f| f.number == number) else {
            record.push_unknown_field(UnknownField { number, bytes: value_bytes.to_vec() });
            continue;
        };
        if let FieldType::Message(message) = &def.field_type {
            let nested_body = match value_bytes.split_first() {
                Some((&tags::MESSAGE, nested_body)) => nested_body,
                _ => return Err(corrupt(format!("field {} expected {}", def.name, def.field_type))),
            };
            let nested_path = format!("{path}.{}", def.name);
            let nested = decode_body(&nested_path, message.name(), message.fields(), nested_body)?;
            record.set_message(def.name.clone(), nested);
            continue;
        }

        let value = Value::decode(value_bytes).map_err(|e| corrupt(format!("field {}: {e}", def.name)))?;
        if !def.field_type.accepts(&value) {
            return Err(corrupt(format!(
                "field {} expected {}, found {}",
                def.name,
                def.field_type,
                value.kind()
            )));
        }
        record.set_field(def.name.clone(), value);
    }

    if reader.remaining() != 0 {
        return Err(corrupt(format!("{} trailing bytes", reader.remaining())));
    }
    Ok(record)
}
