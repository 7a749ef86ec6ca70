//! Script side of the boundary.
//!
//! A small object model standing in for the embedded runtime: values,
//! objects with prototypes and accessors, callable functions with weak
//! handles, and a [`ScriptEngine`] trait for publishing globals.

mod function;
mod object;
mod realm;
mod value;

pub use function::{ScriptFunction, WeakScriptFunction};
pub use object::{Property, ScriptObject};
pub use realm::{Realm, ScriptEngine};
pub use value::{ScriptArray, ScriptValue};
