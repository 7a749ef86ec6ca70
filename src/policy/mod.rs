//! Type conversion policy.
//!
//! Decides, for every native kind, which script kind it becomes when it
//! crosses to the script side, and which native kind a script value lands
//! in when no target type is declared. The marshaller and the proxy
//! synthesizer both consult this table so that they can never disagree.
//!
//! | Native kind                         | Script kind            |
//! |-------------------------------------|------------------------|
//! | `i8` `u8` `i16` `u16` `i32`         | integer                |
//! | `u32`                               | unsigned integer       |
//! | `i64` `u64` `f32` `f64`             | number                 |
//! | `char` `string`                     | string                 |
//! | `datetime`                          | date                   |
//! | flag enumeration                    | its underlying integer |
//! | other enumeration                   | string (variant name)  |
//! | array, sequence                     | array                  |
//! | dictionary, multimap, json, object  | object                 |
//! | callable                            | function               |

mod error;

use std::fmt;
use std::sync::Arc;

pub use error::ConversionError;

use crate::native::{CallableShape, NativeType};
use crate::script::ScriptValue;

/// Script-side representation chosen for a native kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Void,
    Boolean,
    Integer,
    UnsignedInteger,
    Number,
    String,
    Date,
    Array,
    Object,
    Function,
    /// Decided per value at runtime.
    Any,
}

impl ScriptKind {
    /// Kind of an actual script value.
    pub fn of(value: &ScriptValue) -> ScriptKind {
        match value {
            ScriptValue::Undefined | ScriptValue::Null => ScriptKind::Void,
            ScriptValue::Bool(_) => ScriptKind::Boolean,
            ScriptValue::Int(_) => ScriptKind::Integer,
            ScriptValue::UInt(_) => ScriptKind::UnsignedInteger,
            ScriptValue::Number(_) => ScriptKind::Number,
            ScriptValue::String(_) => ScriptKind::String,
            ScriptValue::Date(_) => ScriptKind::Date,
            ScriptValue::Array(_) => ScriptKind::Array,
            ScriptValue::Object(_) => ScriptKind::Object,
            ScriptValue::Function(_) => ScriptKind::Function,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScriptKind::Void => "undefined",
            ScriptKind::Boolean => "boolean",
            ScriptKind::Integer => "integer",
            ScriptKind::UnsignedInteger => "unsigned integer",
            ScriptKind::Number => "number",
            ScriptKind::String => "string",
            ScriptKind::Date => "date",
            ScriptKind::Array => "array",
            ScriptKind::Object => "object",
            ScriptKind::Function => "function",
            ScriptKind::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// Script kind used for values of native type `ty`.
///
/// Fails for object types that expose nothing at all, since there is no
/// conversion rule and no member to build a proxy from.
pub fn script_kind_for(ty: &NativeType) -> Result<ScriptKind, ConversionError> {
    Ok(match ty {
        NativeType::Void => ScriptKind::Void,
        NativeType::Bool => ScriptKind::Boolean,
        NativeType::I8 | NativeType::U8 | NativeType::I16 | NativeType::U16 | NativeType::I32 => {
            ScriptKind::Integer
        }
        NativeType::U32 => ScriptKind::UnsignedInteger,
        NativeType::I64 | NativeType::U64 | NativeType::F32 | NativeType::F64 => ScriptKind::Number,
        NativeType::Char | NativeType::String => ScriptKind::String,
        NativeType::DateTime => ScriptKind::Date,
        NativeType::Enum(def) if def.is_flags() => script_kind_for(&def.repr().native_type())?,
        NativeType::Enum(_) => ScriptKind::String,
        NativeType::Array(elem) | NativeType::Sequence(elem) => {
            script_kind_for(elem)?;
            ScriptKind::Array
        }
        NativeType::Dictionary(value) => {
            script_kind_for(value)?;
            ScriptKind::Object
        }
        NativeType::MultiMap | NativeType::Json => ScriptKind::Object,
        NativeType::Callable(shape) => {
            for param in &shape.params {
                script_kind_for(&param.ty)?;
            }
            script_kind_for(&shape.ret)?;
            ScriptKind::Function
        }
        NativeType::Object(class) if class.declares_no_members() => {
            return Err(ConversionError::Unsupported {
                type_name: class.name().to_string(),
            });
        }
        NativeType::Object(_) => ScriptKind::Object,
        NativeType::Any => ScriptKind::Any,
    })
}

/// Native type a script kind lands in when the target is undeclared.
pub fn native_type_for(kind: ScriptKind) -> NativeType {
    match kind {
        ScriptKind::Void => NativeType::Void,
        ScriptKind::Boolean => NativeType::Bool,
        ScriptKind::Integer | ScriptKind::UnsignedInteger | ScriptKind::Number => NativeType::F64,
        ScriptKind::String => NativeType::String,
        ScriptKind::Date => NativeType::DateTime,
        ScriptKind::Array => NativeType::array(NativeType::Any),
        ScriptKind::Object => NativeType::dictionary(NativeType::Any),
        ScriptKind::Function => NativeType::Callable(Arc::new(CallableShape::any())),
        ScriptKind::Any => NativeType::Any,
    }
}
