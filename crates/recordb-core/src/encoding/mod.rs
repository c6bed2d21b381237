//! Serialization and key encoding for storage.
//!
//! # Key Encoding
//!
//! The [`tuple`] module packs tuples of values into order-preserving byte
//! strings. Storage keys, index entry keys, and [`Subspace`] prefixes are all
//! built from packed tuples, so a range scan over bytes is a range scan over
//! tuples.
//!
//! # Payload Encoding
//!
//! The [`record`] module turns a [`Record`](crate::types::Record) into the
//! bytes stored under its key, using the self-describing [`value`] encoding
//! for each field.

pub mod record;
mod subspace;
mod traits;
pub mod tuple;
pub mod value;

#[cfg(test)]
mod proptest_tests;

pub use record::{deserialize_record, serialize_record};
pub use subspace::{printable, Subspace};
pub use traits::{Decoder, Encoder, FORMAT_VERSION};
pub use tuple::{decode_key, encode_key, Tuple, TupleRange};
