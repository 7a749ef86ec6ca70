//! Convenient re-exports for common usage patterns.
//!
//! This module provides a single import to bring all commonly used types
//! into scope.
//!
//! # Example
//!
//! ```ignore
//! use native_exposer::prelude::*;
//!
//! let exposer = Exposer::default();
//! let realm = Realm::new();
//! exposer.expose_type(&realm, "Counter", &COUNTER)?;
//! ```

pub use std::sync::{Arc, LazyLock};

// Unified error handling
pub use crate::error::{Error, Result};

// Exposer
pub use crate::config::ExposerConfig;
pub use crate::exposer::{Exposer, InterfaceFactory};

// Native side
pub use crate::native::{
    CallableShape, EnumDef, EnumRepr, EventDef, Expose, MethodDef, NativeCallable, NativeClass,
    NativeDate, NativeObject, NativeType, NativeValue, ObjectRef, Param, PropertyDef, TypeHandle,
    arg, opt_arg,
};

// Script side
pub use crate::script::{Realm, ScriptEngine, ScriptFunction, ScriptObject, ScriptValue};

// Member annotations registered from outside a type
pub use crate::resolve::Descriptor;
