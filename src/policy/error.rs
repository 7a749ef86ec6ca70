//! Error types for value conversion.

use thiserror::Error;

/// Errors raised when a value cannot cross the boundary.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("No conversion rule for type {type_name}")]
    Unsupported { type_name: String },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Value {value} is out of range for {target}")]
    OutOfRange { target: String, value: String },

    #[error("'{name}' is not a member of enumeration {enum_name}")]
    InvalidEnumName { enum_name: String, name: String },

    #[error("Value {value} has no name in enumeration {enum_name}")]
    InvalidEnumValue { enum_name: String, value: i64 },

    #[error("Values of type {type_name} only convert from native to script")]
    OneWay { type_name: String },

    #[error("Missing argument at position {index}")]
    MissingArgument { index: usize },

    #[error("Invalid JSON: {0}")]
    Json(String),
}

impl ConversionError {
    pub(crate) fn mismatch(expected: impl ToString, got: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            got: got.into(),
        }
    }

    pub(crate) fn out_of_range(target: impl ToString, value: impl ToString) -> Self {
        Self::OutOfRange {
            target: target.to_string(),
            value: value.to_string(),
        }
    }
}
