//! Expose native objects to an embedded script runtime.
//!
//! Native types are described with [`NativeClass`] metadata. The
//! [`Exposer`] resolves which members a type exposes, builds one proxy
//! definition per type, and wraps instances in script objects whose
//! members convert arguments, call the native member and convert the result
//! back. Script functions passed where native code expects a callable are
//! bridged the other way.
//!
//! # Quick Start
//!
//! ```ignore
//! use native_exposer::prelude::*;
//!
//! struct Calculator;
//!
//! static CALCULATOR: LazyLock<TypeHandle> = LazyLock::new(|| {
//!     NativeClass::class::<Calculator>("Calculator")
//!         .method(
//!             MethodDef::new("mul")
//!                 .param("a", NativeType::I32)
//!                 .param("b", NativeType::I32)
//!                 .returns(NativeType::I32)
//!                 .expose(Expose::function()),
//!             |_, args| Ok(NativeValue::I32(arg::<i32>(args, 0)? * arg::<i32>(args, 1)?)),
//!         )
//!         .build()
//! });
//!
//! let exposer = Exposer::default();
//! let realm = Realm::new();
//! exposer.expose_instance(&realm, "calc", Arc::new(Calculator))?;
//! ```
//!
//! # Modules
//!
//! - [`native`] - Native type metadata and values
//! - [`script`] - Script-side value model and the [`ScriptEngine`] boundary
//! - [`policy`] - Which native kinds map to which script kinds
//! - [`resolve`] - Exposed member resolution
//! - [`proxy`] - Proxy definitions, cache and instances
//! - [`callback`] - Script functions as native callables
//! - [`config`] - Exposer settings
//!
//! # Feature Flags
//!
//! - `config` - Load [`ExposerConfig`] from TOML (enabled by default)
//! - `json` - Native JSON-text values (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `full` - Enable all features

pub mod callback;
pub mod config;
mod error;
mod exposer;
mod logging;
mod marshal;
pub mod native;
pub mod policy;
pub mod prelude;
pub mod proxy;
pub mod resolve;
pub mod script;

// Re-export the unified error type
pub use error::{Error, Result};

pub use exposer::{Exposer, InterfaceFactory};

#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::{EventConfig, ExposerConfig, ProxyConfig};

pub use native::{
    CallableShape, EnumDef, EnumRepr, Expose, NativeCallable, NativeClass, NativeObject,
    NativeType, NativeValue, ObjectRef, TypeHandle,
};
pub use policy::{ConversionError, ScriptKind};
pub use proxy::{ConstructionError, ProxyDefinition, ProxyMode};
pub use resolve::{Descriptor, MemberDescriptor, MemberKind, ResolutionError};
pub use script::{Realm, ScriptEngine, ScriptFunction, ScriptObject, ScriptValue};
