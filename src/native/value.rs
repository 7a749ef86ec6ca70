//! Native kinds and values.
//!
//! [`NativeType`] is the closed set of native shapes the marshaller knows how
//! to convert; [`NativeValue`] is a value of one of those shapes.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::callable::{CallableShape, NativeCallable};
use super::class::TypeHandle;
use super::object::ObjectRef;
use crate::policy::ConversionError;
use crate::script::ScriptValue;

/// Native date/time. [`NativeDate::MIN_UTC`] is the "no date" sentinel.
pub type NativeDate = DateTime<Utc>;

/// Underlying integer width of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumRepr {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
}

impl EnumRepr {
    /// The native integer type backing this representation.
    pub fn native_type(self) -> NativeType {
        match self {
            EnumRepr::I8 => NativeType::I8,
            EnumRepr::U8 => NativeType::U8,
            EnumRepr::I16 => NativeType::I16,
            EnumRepr::U16 => NativeType::U16,
            EnumRepr::I32 => NativeType::I32,
            EnumRepr::U32 => NativeType::U32,
            EnumRepr::I64 => NativeType::I64,
        }
    }

    /// Build the plain integer value for `raw` in this width.
    pub(crate) fn to_value(self, raw: i64) -> Result<NativeValue, ConversionError> {
        let out_of_range = || ConversionError::OutOfRange {
            target: self.native_type().to_string(),
            value: raw.to_string(),
        };
        Ok(match self {
            EnumRepr::I8 => NativeValue::I8(i8::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::U8 => NativeValue::U8(u8::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::I16 => NativeValue::I16(i16::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::U16 => NativeValue::U16(u16::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::I32 => NativeValue::I32(i32::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::U32 => NativeValue::U32(u32::try_from(raw).map_err(|_| out_of_range())?),
            EnumRepr::I64 => NativeValue::I64(raw),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct EnumInfo {
    name: String,
    flags: bool,
    repr: EnumRepr,
    variants: Vec<(String, i64)>,
}

/// Definition of a native enumeration.
///
/// Flag-style enumerations cross the boundary as their underlying integer,
/// all others as the symbolic name of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef(Arc<EnumInfo>);

impl EnumDef {
    /// Start a plain (symbolic) enumeration.
    pub fn new(name: impl Into<String>, repr: EnumRepr) -> EnumBuilder {
        EnumBuilder {
            info: EnumInfo {
                name: name.into(),
                flags: false,
                repr,
                variants: Vec::new(),
            },
        }
    }

    /// Start a flag-style enumeration.
    pub fn flags(name: impl Into<String>, repr: EnumRepr) -> EnumBuilder {
        let mut builder = Self::new(name, repr);
        builder.info.flags = true;
        builder
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_flags(&self) -> bool {
        self.0.flags
    }

    pub fn repr(&self) -> EnumRepr {
        self.0.repr
    }

    /// Symbolic name of `value`, if it has one.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.0
            .variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    /// Value of the variant called `name`.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.0
            .variants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Value of `name` wrapped as a [`NativeValue::Enum`].
    pub fn value(&self, name: &str) -> Option<NativeValue> {
        self.value_of(name).map(|v| NativeValue::Enum(self.clone(), v))
    }
}

/// Builder returned by [`EnumDef::new`] and [`EnumDef::flags`].
pub struct EnumBuilder {
    info: EnumInfo,
}

impl EnumBuilder {
    pub fn variant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.info.variants.push((name.into(), value));
        self
    }

    pub fn build(self) -> EnumDef {
        EnumDef(Arc::new(self.info))
    }
}

/// The native kinds the conversion policy covers.
///
/// Anything that is not a primitive or a recognised collection is a
/// [`NativeType::Object`] and crosses the boundary through a generated proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeType {
    Void,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    DateTime,
    String,
    Enum(EnumDef),
    /// Fixed array; converts both ways element-wise.
    Array(Box<NativeType>),
    /// Enumerable sequence; converts native to script only.
    Sequence(Box<NativeType>),
    /// String-keyed dictionary.
    Dictionary(Box<NativeType>),
    /// String-keyed collection where each key may carry several values.
    MultiMap,
    /// Native callable (delegate) of the given shape.
    Callable(Arc<CallableShape>),
    /// JSON text.
    Json,
    /// Instance of a native class or interface.
    Object(TypeHandle),
    /// Decided by the runtime shape of the value.
    Any,
}

impl NativeType {
    pub fn array(elem: NativeType) -> Self {
        NativeType::Array(Box::new(elem))
    }

    pub fn sequence(elem: NativeType) -> Self {
        NativeType::Sequence(Box::new(elem))
    }

    pub fn dictionary(value: NativeType) -> Self {
        NativeType::Dictionary(Box::new(value))
    }

    pub fn callable(shape: CallableShape) -> Self {
        NativeType::Callable(Arc::new(shape))
    }

    pub fn object(class: &TypeHandle) -> Self {
        NativeType::Object(class.clone())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NativeType::Void)
    }

    /// The value a parameter of this type takes when the script passes
    /// `null` or nothing at all.
    pub fn default_value(&self) -> NativeValue {
        match self {
            NativeType::Bool => NativeValue::Bool(false),
            NativeType::I8 => NativeValue::I8(0),
            NativeType::U8 => NativeValue::U8(0),
            NativeType::I16 => NativeValue::I16(0),
            NativeType::U16 => NativeValue::U16(0),
            NativeType::I32 => NativeValue::I32(0),
            NativeType::U32 => NativeValue::U32(0),
            NativeType::I64 => NativeValue::I64(0),
            NativeType::U64 => NativeValue::U64(0),
            NativeType::F32 => NativeValue::F32(0.0),
            NativeType::F64 => NativeValue::F64(0.0),
            NativeType::Char => NativeValue::Char('\0'),
            NativeType::DateTime => NativeValue::DateTime(NativeDate::MIN_UTC),
            NativeType::Enum(def) => NativeValue::Enum(def.clone(), 0),
            NativeType::Void
            | NativeType::String
            | NativeType::Array(_)
            | NativeType::Sequence(_)
            | NativeType::Dictionary(_)
            | NativeType::MultiMap
            | NativeType::Callable(_)
            | NativeType::Json
            | NativeType::Object(_)
            | NativeType::Any => NativeValue::Null,
        }
    }

    /// Class handles reachable from this type (element types included).
    pub(crate) fn referenced_class(&self) -> Option<&TypeHandle> {
        match self {
            NativeType::Object(class) => Some(class),
            NativeType::Array(inner) | NativeType::Sequence(inner) | NativeType::Dictionary(inner) => {
                inner.referenced_class()
            }
            _ => None,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::Void => write!(f, "void"),
            NativeType::Bool => write!(f, "bool"),
            NativeType::I8 => write!(f, "i8"),
            NativeType::U8 => write!(f, "u8"),
            NativeType::I16 => write!(f, "i16"),
            NativeType::U16 => write!(f, "u16"),
            NativeType::I32 => write!(f, "i32"),
            NativeType::U32 => write!(f, "u32"),
            NativeType::I64 => write!(f, "i64"),
            NativeType::U64 => write!(f, "u64"),
            NativeType::F32 => write!(f, "f32"),
            NativeType::F64 => write!(f, "f64"),
            NativeType::Char => write!(f, "char"),
            NativeType::DateTime => write!(f, "datetime"),
            NativeType::String => write!(f, "string"),
            NativeType::Enum(def) => write!(f, "enum {}", def.name()),
            NativeType::Array(elem) => write!(f, "array<{}>", elem),
            NativeType::Sequence(elem) => write!(f, "sequence<{}>", elem),
            NativeType::Dictionary(value) => write!(f, "dictionary<{}>", value),
            NativeType::MultiMap => write!(f, "multimap"),
            NativeType::Callable(shape) => write!(f, "callable {}", shape.name),
            NativeType::Json => write!(f, "json"),
            NativeType::Object(class) => write!(f, "{}", class.name()),
            NativeType::Any => write!(f, "any"),
        }
    }
}

/// A native value crossing (or about to cross) the boundary.
#[derive(Clone)]
pub enum NativeValue {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    DateTime(NativeDate),
    String(String),
    Enum(EnumDef, i64),
    Array(Vec<NativeValue>),
    Sequence(Vec<NativeValue>),
    Dictionary(Vec<(String, NativeValue)>),
    MultiMap(Vec<(String, Vec<Option<String>>)>),
    Callable(NativeCallable),
    Json(String),
    Object(ObjectRef),
    /// A script value carried through native code untouched.
    Script(ScriptValue),
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            NativeValue::Null => "null".to_string(),
            NativeValue::Bool(_) => "bool".to_string(),
            NativeValue::I8(_) => "i8".to_string(),
            NativeValue::U8(_) => "u8".to_string(),
            NativeValue::I16(_) => "i16".to_string(),
            NativeValue::U16(_) => "u16".to_string(),
            NativeValue::I32(_) => "i32".to_string(),
            NativeValue::U32(_) => "u32".to_string(),
            NativeValue::I64(_) => "i64".to_string(),
            NativeValue::U64(_) => "u64".to_string(),
            NativeValue::F32(_) => "f32".to_string(),
            NativeValue::F64(_) => "f64".to_string(),
            NativeValue::Char(_) => "char".to_string(),
            NativeValue::DateTime(_) => "datetime".to_string(),
            NativeValue::String(_) => "string".to_string(),
            NativeValue::Enum(def, _) => format!("enum {}", def.name()),
            NativeValue::Array(_) => "array".to_string(),
            NativeValue::Sequence(_) => "sequence".to_string(),
            NativeValue::Dictionary(_) => "dictionary".to_string(),
            NativeValue::MultiMap(_) => "multimap".to_string(),
            NativeValue::Callable(c) => format!("callable {}", c.shape().name),
            NativeValue::Json(_) => "json".to_string(),
            NativeValue::Object(obj) => obj.native_class().name().to_string(),
            NativeValue::Script(v) => format!("script {}", v.type_name()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            NativeValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Downcast a wrapped object to its concrete Rust type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object().and_then(|obj| obj.as_any().downcast_ref::<T>())
    }

    pub fn as_callable(&self) -> Option<&NativeCallable> {
        match self {
            NativeValue::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Look up a key of a [`NativeValue::Dictionary`].
    pub fn entry(&self, key: &str) -> Option<&NativeValue> {
        match self {
            NativeValue::Dictionary(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => write!(f, "Null"),
            NativeValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            NativeValue::I8(v) => f.debug_tuple("I8").field(v).finish(),
            NativeValue::U8(v) => f.debug_tuple("U8").field(v).finish(),
            NativeValue::I16(v) => f.debug_tuple("I16").field(v).finish(),
            NativeValue::U16(v) => f.debug_tuple("U16").field(v).finish(),
            NativeValue::I32(v) => f.debug_tuple("I32").field(v).finish(),
            NativeValue::U32(v) => f.debug_tuple("U32").field(v).finish(),
            NativeValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            NativeValue::U64(v) => f.debug_tuple("U64").field(v).finish(),
            NativeValue::F32(v) => f.debug_tuple("F32").field(v).finish(),
            NativeValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            NativeValue::Char(v) => f.debug_tuple("Char").field(v).finish(),
            NativeValue::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            NativeValue::String(v) => f.debug_tuple("String").field(v).finish(),
            NativeValue::Enum(def, v) => f.debug_tuple("Enum").field(&def.name()).field(v).finish(),
            NativeValue::Array(v) => f.debug_tuple("Array").field(v).finish(),
            NativeValue::Sequence(v) => f.debug_tuple("Sequence").field(v).finish(),
            NativeValue::Dictionary(v) => f.debug_tuple("Dictionary").field(v).finish(),
            NativeValue::MultiMap(v) => f.debug_tuple("MultiMap").field(v).finish(),
            NativeValue::Callable(c) => f.debug_tuple("Callable").field(&c.shape().name).finish(),
            NativeValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            NativeValue::Object(obj) => f.debug_tuple("Object").field(&obj.native_class().name()).finish(),
            NativeValue::Script(v) => f.debug_tuple("Script").field(v).finish(),
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NativeValue::Null, NativeValue::Null) => true,
            (NativeValue::Bool(a), NativeValue::Bool(b)) => a == b,
            (NativeValue::I8(a), NativeValue::I8(b)) => a == b,
            (NativeValue::U8(a), NativeValue::U8(b)) => a == b,
            (NativeValue::I16(a), NativeValue::I16(b)) => a == b,
            (NativeValue::U16(a), NativeValue::U16(b)) => a == b,
            (NativeValue::I32(a), NativeValue::I32(b)) => a == b,
            (NativeValue::U32(a), NativeValue::U32(b)) => a == b,
            (NativeValue::I64(a), NativeValue::I64(b)) => a == b,
            (NativeValue::U64(a), NativeValue::U64(b)) => a == b,
            (NativeValue::F32(a), NativeValue::F32(b)) => a == b,
            (NativeValue::F64(a), NativeValue::F64(b)) => a == b,
            (NativeValue::Char(a), NativeValue::Char(b)) => a == b,
            (NativeValue::DateTime(a), NativeValue::DateTime(b)) => a == b,
            (NativeValue::String(a), NativeValue::String(b)) => a == b,
            (NativeValue::Enum(da, a), NativeValue::Enum(db, b)) => da == db && a == b,
            (NativeValue::Array(a), NativeValue::Array(b)) => a == b,
            (NativeValue::Sequence(a), NativeValue::Sequence(b)) => a == b,
            (NativeValue::Dictionary(a), NativeValue::Dictionary(b)) => a == b,
            (NativeValue::MultiMap(a), NativeValue::MultiMap(b)) => a == b,
            (NativeValue::Callable(a), NativeValue::Callable(b)) => a.ptr_eq(b),
            (NativeValue::Json(a), NativeValue::Json(b)) => a == b,
            (NativeValue::Object(a), NativeValue::Object(b)) => Arc::ptr_eq(a, b),
            (NativeValue::Script(a), NativeValue::Script(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! native_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeValue {
                fn from(value: $ty) -> Self {
                    NativeValue::$variant(value)
                }
            }

            impl TryFrom<&NativeValue> for $ty {
                type Error = ConversionError;

                fn try_from(value: &NativeValue) -> Result<Self, Self::Error> {
                    match value {
                        NativeValue::$variant(v) => Ok(v.clone()),
                        other => Err(ConversionError::TypeMismatch {
                            expected: stringify!($variant).to_lowercase(),
                            got: other.kind_name(),
                        }),
                    }
                }
            }
        )*
    };
}

native_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    NativeDate => DateTime,
    String => String,
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::String(value.to_string())
    }
}

impl From<ObjectRef> for NativeValue {
    fn from(value: ObjectRef) -> Self {
        NativeValue::Object(value)
    }
}

impl From<NativeCallable> for NativeValue {
    fn from(value: NativeCallable) -> Self {
        NativeValue::Callable(value)
    }
}

impl<T: Into<NativeValue>> From<Option<T>> for NativeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(NativeValue::Null, Into::into)
    }
}

/// Fetch argument `index` as `T` inside a native member body.
///
/// ```ignore
/// |calc: &Calculator, args: &[NativeValue]| {
///     let a: i32 = arg(args, 0)?;
///     let b: i32 = arg(args, 1)?;
///     Ok(NativeValue::I32(calc.multiply(a, b)))
/// }
/// ```
pub fn arg<'a, T>(args: &'a [NativeValue], index: usize) -> Result<T, ConversionError>
where
    T: TryFrom<&'a NativeValue, Error = ConversionError>,
{
    let value = args
        .get(index)
        .ok_or(ConversionError::MissingArgument { index })?;
    T::try_from(value)
}

/// Like [`arg`] but maps a `null` argument to `None`.
pub fn opt_arg<'a, T>(args: &'a [NativeValue], index: usize) -> Result<Option<T>, ConversionError>
where
    T: TryFrom<&'a NativeValue, Error = ConversionError>,
{
    match args.get(index) {
        None | Some(NativeValue::Null) => Ok(None),
        Some(value) => T::try_from(value).map(Some),
    }
}
