//! Native side of the boundary.
//!
//! Native code describes its types with [`NativeClass`] and hands values
//! over as [`NativeValue`]s. Nothing in this module knows about the script
//! runtime except [`NativeValue::Script`], which carries a script value
//! through native code unconverted.

mod callable;
mod class;
mod object;
mod value;

pub use callable::{CallableShape, NativeCallable, Param};
pub use class::{
    Ancestors, ClassBuilder, ClassKind, ConstructorDef, EventDef, Expose, MemberCategory,
    MethodDef, NativeClass, PropertyDef, TypeHandle,
};
pub(crate) use class::{ConstructorBody, EventBody, GetterBody, MethodBody, SetterBody};
pub use object::{NativeObject, ObjectRef};
pub use value::{
    EnumBuilder, EnumDef, EnumRepr, NativeDate, NativeType, NativeValue, arg, opt_arg,
};
