use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::function::ScriptFunction;
use super::object::ScriptObject;

/// A value living in the script runtime.
///
/// Arrays, objects and functions are references: cloning shares the
/// underlying storage and equality is identity.
#[derive(Clone)]
pub enum ScriptValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Number(f64),
    String(String),
    /// Milliseconds since the Unix epoch (UTC).
    Date(f64),
    Array(ScriptArray),
    Object(ScriptObject),
    Function(ScriptFunction),
}

impl ScriptValue {
    pub fn string(value: impl Into<String>) -> Self {
        ScriptValue::String(value.into())
    }

    pub fn array(items: Vec<ScriptValue>) -> Self {
        ScriptValue::Array(ScriptArray::from_vec(items))
    }

    /// `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    /// The `typeof`-style name of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Int(_) | ScriptValue::UInt(_) | ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Date(_) => "date",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "object",
            ScriptValue::Function(_) => "function",
        }
    }

    /// Numeric value of any number variant.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(v) => Some(f64::from(*v)),
            ScriptValue::UInt(v) => Some(f64::from(*v)),
            ScriptValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ScriptArray> {
        match self {
            ScriptValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            ScriptValue::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            ScriptValue::Function(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::UInt(a), ScriptValue::UInt(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Date(a), ScriptValue::Date(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a.ptr_eq(b),
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a.ptr_eq(b),
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Undefined => write!(f, "undefined"),
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(v) => write!(f, "{v}"),
            ScriptValue::Int(v) => write!(f, "{v}"),
            ScriptValue::UInt(v) => write!(f, "{v}u"),
            ScriptValue::Number(v) => write!(f, "{v:?}"),
            ScriptValue::String(v) => write!(f, "{v:?}"),
            ScriptValue::Date(v) => write!(f, "Date({v})"),
            ScriptValue::Array(v) => f.debug_list().entries(v.to_vec()).finish(),
            ScriptValue::Object(v) => write!(f, "[object {}]", v.class_name()),
            ScriptValue::Function(v) => write!(f, "[function {}]", v.name()),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<ScriptObject> for ScriptValue {
    fn from(value: ScriptObject) -> Self {
        ScriptValue::Object(value)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(value: ScriptFunction) -> Self {
        ScriptValue::Function(value)
    }
}

/// A script array. Clones share storage.
#[derive(Clone, Default)]
pub struct ScriptArray(Arc<RwLock<Vec<ScriptValue>>>);

impl ScriptArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<ScriptValue>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ScriptValue> {
        self.0.read().get(index).cloned()
    }

    pub fn push(&self, value: ScriptValue) {
        self.0.write().push(value);
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<ScriptValue> {
        self.0.read().clone()
    }

    pub fn ptr_eq(&self, other: &ScriptArray) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
