//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding or encoding a field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No codec is registered for this type tag.
    #[error("unsupported type: {type_tag}")]
    UnsupportedType {
        /// The remote type tag.
        type_tag: String,
    },

    /// The field is computed remotely and cannot be written.
    #[error("computed field of type {type_tag} cannot be written")]
    ComputedField {
        /// The remote type tag.
        type_tag: String,
    },

    /// Rollup cells are resolved through their relation, not decoded.
    #[error("rollup values are resolved through relations, not decoded")]
    DerivedValue,

    /// The raw payload does not have the expected shape.
    #[error("malformed {type_tag} payload: {message}")]
    Malformed {
        /// The remote type tag.
        type_tag: String,
        /// Description of the problem.
        message: String,
    },

    /// The local value has the wrong variant for this type.
    #[error("cannot encode {found} value as {type_tag}")]
    TypeMismatch {
        /// The remote type tag.
        type_tag: String,
        /// The variant that was supplied.
        found: &'static str,
    },
}

impl CodecError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_tag: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_tag: type_tag.into(),
        }
    }

    /// Create a computed field error.
    pub fn computed_field(type_tag: impl Into<String>) -> Self {
        Self::ComputedField {
            type_tag: type_tag.into(),
        }
    }

    /// Create a malformed payload error.
    pub fn malformed(type_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            type_tag: type_tag.into(),
            message: message.into(),
        }
    }

    /// Returns true for the non-fatal "skip this column" kinds.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            CodecError::UnsupportedType { .. } | CodecError::ComputedField { .. }
        )
    }
}
