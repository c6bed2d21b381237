//! The byte codec traits implemented by field values.

use crate::CoreError;

/// Current layout version of record payloads; the first byte of every payload
/// written by [`serialize_record`](super::record::serialize_record).
pub const FORMAT_VERSION: u8 = 1;

/// Writes a self-describing byte form.
pub trait Encoder: Sized {
    /// Append the byte form of `self` to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a length does not fit the wire format.
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), CoreError>;

    /// The byte form of `self` in a fresh buffer.
    ///
    /// # Errors
    ///
    /// As [`encode_to`](Self::encode_to).
    fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut out = Vec::with_capacity(16);
        self.encode_to(&mut out)?;
        Ok(out)
    }
}

/// Reads back what an [`Encoder`] wrote.
pub trait Decoder: Sized {
    /// Decode exactly one value spanning all of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] on an unknown tag, truncation, or trailing bytes.
    fn decode(bytes: &[u8]) -> Result<Self, CoreError>;
}
