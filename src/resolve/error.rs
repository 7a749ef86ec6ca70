//! Error types for member resolution.

use thiserror::Error;

use crate::native::MemberCategory;

/// Errors raised while resolving the exposed members of a type.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Type {type_name} should be an interface")]
    NotAnInterface { type_name: String },

    #[error("Type {type_name} is an interface and cannot be constructed")]
    NotAClass { type_name: String },

    #[error("Type {type_name} has no {category} named '{member}'")]
    UnknownMember {
        type_name: String,
        member: String,
        category: MemberCategory,
    },
}
