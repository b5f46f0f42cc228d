//! Error types for the strata-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for registry lookups, buffer layout and codec failures.

use thiserror::Error;

/// Result type alias for strata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all strata operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A descriptor referenced a type name that is not registered
    #[error("unknown type '{name}': no codec registered under this name")]
    UnknownType {
        /// The unresolved type name
        name: String,
    },

    /// A header contained a type ID with no registry entry
    #[error("unknown type id {id}: registry holds {registered} codecs")]
    UnknownTypeId {
        /// The unresolved type ID
        id: i32,
        /// Number of codecs in the registry
        registered: usize,
    },

    /// A write would run past the end of the data region
    #[error("capacity exceeded writing '{field}': need {needed} bytes, {remaining} remaining")]
    CapacityExceeded {
        /// Field being written
        field: String,
        /// Bytes the write requires (length prefix included)
        needed: usize,
        /// Bytes left in the data region
        remaining: usize,
    },

    /// The descriptor has no field with this name
    #[error("unknown field '{name}'")]
    UnknownField {
        /// The missing field name
        name: String,
    },

    /// A field was read before it was written
    #[error("field '{name}' has not been written")]
    FieldNotSet {
        /// The unwritten field
        name: String,
    },

    /// A field was written out of descriptor order
    #[error("field '{field}' written out of order: next writable field is '{next}'")]
    FieldOrder {
        /// The field the caller tried to write
        field: String,
        /// The field that has to be written next
        next: String,
    },

    /// An already written field was rewritten with a different encoded length
    #[error("field '{field}' occupies {current} payload bytes and cannot be resized to {requested}")]
    SlotResize {
        /// The field being rewritten
        field: String,
        /// Payload length currently stored
        current: usize,
        /// Payload length of the new value
        requested: usize,
    },

    /// A codec produced no bytes for a field value
    #[error("codec '{codec}' produced an empty payload for '{field}'")]
    EmptyPayload {
        /// Field being written
        field: String,
        /// Name of the field's codec
        codec: String,
    },

    /// An accessor was used with a Rust type the codec does not handle
    #[error("type mismatch on '{field}': codec '{codec}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Field being accessed
        field: String,
        /// Name of the field's codec
        codec: String,
        /// Rust type the codec works with
        expected: &'static str,
        /// Rust type supplied by the caller
        found: &'static str,
    },

    /// A build call was missing a value for a descriptor field
    #[error("no value supplied for field '{field}'")]
    MissingValue {
        /// The field without a value
        field: String,
    },

    /// The header's type for a field differs from the descriptor's declared type
    #[error("header declares '{field}' as '{header}' but descriptor declares '{declared}'")]
    HeaderMismatch {
        /// Field with conflicting types
        field: String,
        /// Type name resolved from the header
        header: String,
        /// Type name the descriptor declares
        declared: String,
    },

    /// Input ended before a complete value could be read
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// Bytes did not form a valid encoding
    #[error("invalid data at offset {offset}: {details}")]
    InvalidData {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A string payload was not valid UTF-8
    #[error("invalid utf-8 in string payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A value is too large for its length prefix
    #[error("{what} of length {len} exceeds maximum {max}")]
    ValueTooLarge {
        /// What was being encoded
        what: &'static str,
        /// Actual length
        len: usize,
        /// Maximum encodable length
        max: usize,
    },
}

impl Error {
    /// Creates a new unknown type error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    /// Creates a new unknown field error
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Creates a new field-not-set error
    pub fn field_not_set(name: impl Into<String>) -> Self {
        Self::FieldNotSet { name: name.into() }
    }

    /// Creates a new truncation error
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }

    /// Creates a new invalid data error
    pub fn invalid_data(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidData {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new missing value error
    pub fn missing_value(field: impl Into<String>) -> Self {
        Self::MissingValue {
            field: field.into(),
        }
    }

    /// Returns true if the error comes from malformed input bytes rather than misuse of the API
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownTypeId { .. }
                | Self::Truncated { .. }
                | Self::InvalidData { .. }
                | Self::InvalidUtf8(_)
        )
    }
}
