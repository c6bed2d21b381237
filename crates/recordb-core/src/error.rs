//! Error types for the core crate.

use thiserror::Error;

/// Maximum length for value display in error messages.
const MAX_VALUE_DISPLAY_LEN: usize = 100;

/// Errors that can occur in the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A key could not be decoded (wrong length, unknown type byte, truncation).
    #[error("decode error: {0}")]
    Decode(String),

    /// A stored record payload does not match the layout of its record type.
    #[error("corrupt record payload: {0}")]
    CorruptPayload(String),

    /// A record does not conform to its declared record type.
    #[error("validation error: {0}")]
    Validation(String),

    /// The schema is malformed or incomplete.
    #[error("schema error: {0}")]
    Schema(String),

    /// The schema was already built and can no longer be changed.
    #[error("schema is immutable once built: {0}")]
    ImmutableSchema(String),
}

impl CoreError {
    /// Creates a validation error describing a field type mismatch.
    ///
    /// The offending value is truncated to 100 characters for display.
    #[must_use]
    pub fn field_type_mismatch(
        record_type: &str,
        field: &str,
        expected: impl std::fmt::Display,
        value: impl std::fmt::Debug,
    ) -> Self {
        let value_str = format!("{value:?}");
        let truncated = if value_str.len() > MAX_VALUE_DISPLAY_LEN {
            let mut end = MAX_VALUE_DISPLAY_LEN;
            while !value_str.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &value_str[..end])
        } else {
            value_str
        };
        Self::Validation(format!(
            "field {record_type}.{field}: expected {expected}, got {truncated}"
        ))
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
