//! Proxy synthesis, caching and instantiation.
//!
//! A [`ProxyDefinition`] is built once per native type. It holds one
//! [`MemberPlan`] per exposed member, an ordered sequence of [`Op`]s that
//! converts arguments, invokes the native member and converts the result,
//! plus a prototype object carrying the script-visible functions. Wrapping
//! an instance only allocates a [`ProxyInstance`] pointing at the cached
//! definition.

mod cache;
mod definition;
mod error;
mod instance;
mod interp;
mod synth;

pub use cache::ProxyCache;
pub use definition::{ConstructorPlan, MemberPlan, Op, ProxyDefinition, ProxyMode};
pub(crate) use definition::signature_ops;
pub use error::ConstructionError;
pub use instance::ProxyInstance;
pub(crate) use instance::instantiate;
pub(crate) use interp::run;
