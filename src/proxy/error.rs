//! Error types for construction of native instances from script.

use thiserror::Error;

use crate::policy::ConversionError;

/// Errors raised when script code asks for a new native instance.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("{type_name} has no constructor taking {arity} argument(s)")]
    NoMatchingConstructor { type_name: String, arity: usize },

    #[error("{type_name} has no zero-argument constructor")]
    NoDefaultConstructor { type_name: String },

    #[error("Invalid argument for {type_name} constructor: {source}")]
    Argument {
        type_name: String,
        #[source]
        source: ConversionError,
    },

    #[error("{type_name} constructor failed: {source}")]
    Failed {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },
}
