//! Key prefixes and key rendering.
//!
//! A [`Subspace`] is a byte prefix that partitions the substrate keyspace:
//! every key a record store writes begins with its subspace. Subspaces are
//! usually built from a tuple path such as `("record-layer-demo",)`.

use crate::error::CoreError;

use super::tuple::{Tuple, RANGE_END};

/// A byte prefix that scopes keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Subspace {
    raw: Vec<u8>,
}

impl Subspace {
    /// A subspace whose prefix is the packed tuple.
    #[must_use]
    pub fn new(path: &Tuple) -> Self {
        Self { raw: path.pack() }
    }

    /// A subspace with an explicit raw prefix.
    #[must_use]
    pub fn from_bytes(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw prefix.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// A nested subspace: this prefix followed by the packed tuple.
    #[must_use]
    pub fn subspace(&self, path: &Tuple) -> Self {
        Self { raw: self.pack(path) }
    }

    /// A nested subspace: this prefix followed by raw bytes.
    #[must_use]
    pub fn child(&self, suffix: &[u8]) -> Self {
        let mut raw = self.raw.clone();
        raw.extend_from_slice(suffix);
        Self { raw }
    }

    /// The prefix followed by the packed tuple.
    #[must_use]
    pub fn pack(&self, tuple: &Tuple) -> Vec<u8> {
        let mut key = self.raw.clone();
        tuple.pack_into(&mut key);
        key
    }

    /// Strip the prefix and unpack the remainder.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] if the key lies outside this subspace or
    /// the remainder is not a packed tuple.
    pub fn unpack(&self, key: &[u8]) -> Result<Tuple, CoreError> {
        let rest = key.strip_prefix(self.raw.as_slice()).ok_or_else(|| {
            CoreError::Decode(format!("key {} outside subspace {}", printable(key), printable(&self.raw)))
        })?;
        Tuple::unpack(rest)
    }

    /// Whether `key` lies in this subspace.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        key.starts_with(&self.raw)
    }

    /// The byte range `[prefix, prefix ++ 0xFF)` covering every packed key in this subspace.
    #[must_use]
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let mut end = self.raw.clone();
        end.push(RANGE_END);
        (self.raw.clone(), end)
    }
}

/// Render bytes for diagnostics.
///
/// Printable ASCII is kept as is, a backslash is doubled, and every other
/// byte is written as `\xNN`.
#[must_use]
pub fn printable(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            32..=126 => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out
}
