//! Property-based tests for the key and payload codecs.

#![allow(clippy::expect_used, clippy::float_cmp)]

use std::cmp::Ordering;

use proptest::prelude::*;

use crate::encoding::record::{deserialize_record, serialize_record};
use crate::encoding::tuple::{decode_key, encode_key, Tuple};
use crate::encoding::value::decode_value;
use crate::encoding::{Decoder, Encoder, FORMAT_VERSION};
use crate::metadata::{FieldDef, KeyExpression, MessageDef, MetaDataBuilder, RecordType, RecordTypeDef};
use crate::types::{EnumDef, FieldType, Record, Value};

/// Strategy for generating arbitrary `Value` instances.
fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Filter out NaN since NaN != NaN
        any::<f64>().prop_filter("not NaN", |f| !f.is_nan()).prop_map(Value::Float),
        ".*".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..40).prop_map(Value::Bytes),
        any::<u32>().prop_map(Value::Enum),
    ]
}

fn arb_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(arb_value(), 0..5).prop_map(Tuple::from)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Float(_) => 3,
        Value::String(_) => 4,
        Value::Bytes(_) => 5,
        Value::Enum(_) => 6,
    }
}

/// Reference ordering: by type first, then by natural order within a type.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Enum(x), Value::Enum(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn cmp_tuples(a: &Tuple, b: &Tuple) -> Ordering {
    for (x, y) in a.values().iter().zip(b.values()) {
        match cmp_values(x, y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn order_type() -> RecordType {
    let mut builder = MetaDataBuilder::new();
    builder
        .register_type(
            RecordTypeDef::new("Order")
                .field(FieldDef::new("order_id", 1, FieldType::Int))
                .field(FieldDef::optional("flower", 2, FieldType::String))
                .field(FieldDef::optional("price", 3, FieldType::Float))
                .field(FieldDef::optional("color", 4, FieldType::Enum(EnumDef::new("Color", ["RED", "GREEN"]))))
                .field(FieldDef::optional("blob", 5, FieldType::Bytes))
                .field(FieldDef::optional(
                    "bouquet",
                    6,
                    FieldType::Message(
                        MessageDef::new("Bouquet")
                            .field(FieldDef::new("stems", 1, FieldType::Int))
                            .field(FieldDef::optional("note", 2, FieldType::String)),
                    ),
                )),
        )
        .expect("register")
        .set_primary_key("Order", KeyExpression::field("order_id"))
        .expect("primary key");
    builder.build().expect("build").record_type("Order").expect("type").clone()
}

fn arb_order() -> impl Strategy<Value = Record> {
    (
        any::<i64>(),
        proptest::option::of(".*"),
        proptest::option::of(any::<f64>().prop_filter("not NaN", |f| !f.is_nan())),
        proptest::option::of(0u32..2),
        proptest::option::of(prop::collection::vec(any::<u8>(), 0..20)),
        proptest::option::of((any::<i64>(), proptest::option::of("[a-z ]*"))),
    )
        .prop_map(|(id, flower, price, color, blob, bouquet)| {
            let mut record = Record::new("Order").with_field("order_id", id);
            if let Some(flower) = flower {
                record.set_field("flower", flower);
            }
            if let Some(price) = price {
                record.set_field("price", price);
            }
            if let Some(color) = color {
                record.set_field("color", Value::Enum(color));
            }
            if let Some(blob) = blob {
                record.set_field("blob", blob);
            }
            if let Some((stems, note)) = bouquet {
                let mut nested = Record::new("Bouquet").with_field("stems", stems);
                if let Some(note) = note {
                    nested.set_field("note", note);
                }
                record.set_message("bouquet", nested);
            }
            record
        })
}

proptest! {
    #[test]
    fn value_roundtrip(value in arb_value()) {
        let encoded = value.encode().expect("encoding should succeed");
        let decoded = Value::decode(&encoded).expect("decoding should succeed");
        prop_assert_eq!(value, decoded);
    }

    #[test]
    fn value_consumed_length_matches(value in arb_value(), trailer in prop::collection::vec(any::<u8>(), 0..8)) {
        let mut encoded = value.encode().expect("encoding should succeed");
        let len = encoded.len();
        encoded.extend(trailer);
        let (_, consumed) = decode_value(&encoded).expect("decoding should succeed");
        prop_assert_eq!(consumed, len);
    }

    #[test]
    fn tuple_unpack_inverts_pack(tuple in arb_tuple()) {
        let unpacked = Tuple::unpack(&tuple.pack()).expect("unpack should succeed");
        prop_assert_eq!(unpacked, tuple);
    }

    #[test]
    fn packed_order_matches_tuple_order(a in arb_tuple(), b in arb_tuple()) {
        prop_assert_eq!(a.pack().cmp(&b.pack()), cmp_tuples(&a, &b));
    }

    #[test]
    fn key_order_is_tag_major(tag_a in any::<i64>(), tag_b in any::<i64>(), a in arb_tuple(), b in arb_tuple()) {
        prop_assume!(tag_a != tag_b);
        let ka = encode_key(&Value::Int(tag_a), &a);
        let kb = encode_key(&Value::Int(tag_b), &b);
        prop_assert_eq!(ka.cmp(&kb), tag_a.cmp(&tag_b));
        let (decoded_tag, decoded_pk) = decode_key(&ka).expect("decode should succeed");
        prop_assert_eq!(decoded_tag, Value::Int(tag_a));
        prop_assert_eq!(decoded_pk, a);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = Tuple::unpack(&bytes);
        let _ = decode_key(&bytes);
        let _ = decode_value(&bytes);
    }

    #[test]
    fn record_roundtrip(record in arb_order()) {
        let rt = order_type();
        let bytes = serialize_record(&rt, &record).expect("serialize should succeed");
        let decoded = deserialize_record(&rt, &bytes).expect("deserialize should succeed");
        prop_assert_eq!(decoded, record);
    }

    /// Garbage after a valid header must be reported, never panic or over-allocate.
    #[test]
    fn arbitrary_payload_bodies_never_panic(body in prop::collection::vec(any::<u8>(), 0..128)) {
        let rt = order_type();
        let mut bytes = vec![FORMAT_VERSION];
        crate::encoding::tuple::encode_element(rt.key(), &mut bytes);
        bytes.extend(body);
        let _ = deserialize_record(&rt, &bytes);
    }

    #[test]
    fn mutated_payloads_never_panic(record in arb_order(), idx in any::<usize>(), byte in any::<u8>()) {
        let rt = order_type();
        let mut bytes = serialize_record(&rt, &record).expect("serialize should succeed");
        let at = idx % bytes.len();
        bytes[at] = byte;
        let _ = deserialize_record(&rt, &bytes);
    }
}
