//! Value marshaller.
//!
//! [`Exposer::to_script`] converts in the native → script direction and is
//! driven by the value itself; [`Exposer::to_native`] converts script →
//! native and is driven by the declared target type. Both follow the table
//! in [`crate::policy`]. Objects without a closer rule are wrapped in a
//! proxy (to script) or unwrapped from one (to native).

mod declared;
#[cfg(feature = "json")]
mod json;
mod numeric;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};

use crate::error::{Error, Result};
use crate::exposer::Exposer;
use crate::native::{
    CallableShape, NativeCallable, NativeClass, NativeDate, NativeType, NativeValue, ObjectRef,
};
use crate::policy::ConversionError;
use crate::proxy::{ConstructionError, instantiate, run, signature_ops};
use crate::resolve::MemberKind;
use crate::script::{ScriptFunction, ScriptObject, ScriptValue};

impl Exposer {
    /// Convert a native value to its script representation.
    pub fn to_script(&self, value: &NativeValue) -> Result<ScriptValue> {
        Ok(match value {
            NativeValue::Null => ScriptValue::Undefined,
            NativeValue::Bool(b) => ScriptValue::Bool(*b),
            NativeValue::I8(v) => ScriptValue::Int(i32::from(*v)),
            NativeValue::U8(v) => ScriptValue::Int(i32::from(*v)),
            NativeValue::I16(v) => ScriptValue::Int(i32::from(*v)),
            NativeValue::U16(v) => ScriptValue::Int(i32::from(*v)),
            NativeValue::I32(v) => ScriptValue::Int(*v),
            NativeValue::U32(v) => ScriptValue::UInt(*v),
            NativeValue::I64(v) => ScriptValue::Number(*v as f64),
            NativeValue::U64(v) => ScriptValue::Number(*v as f64),
            NativeValue::F32(v) => ScriptValue::Number(f64::from(*v)),
            NativeValue::F64(v) => ScriptValue::Number(*v),
            NativeValue::Char(c) => ScriptValue::String(c.to_string()),
            NativeValue::DateTime(dt) if *dt == NativeDate::MIN_UTC => ScriptValue::Undefined,
            NativeValue::DateTime(dt) => ScriptValue::Date(dt.timestamp_millis() as f64),
            NativeValue::String(s) => ScriptValue::String(s.clone()),
            NativeValue::Enum(def, raw) if def.is_flags() => {
                self.to_script(&def.repr().to_value(*raw)?)?
            }
            NativeValue::Enum(def, raw) => match def.name_of(*raw) {
                Some(name) => ScriptValue::string(name),
                None => {
                    return Err(ConversionError::InvalidEnumValue {
                        enum_name: def.name().to_string(),
                        value: *raw,
                    }
                    .into());
                }
            },
            NativeValue::Array(items) | NativeValue::Sequence(items) => ScriptValue::array(
                items
                    .iter()
                    .map(|item| self.to_script(item))
                    .collect::<Result<_>>()?,
            ),
            NativeValue::Dictionary(entries) => {
                let object = ScriptObject::new();
                for (key, value) in entries {
                    object.insert(key.clone(), self.to_script(value)?);
                }
                ScriptValue::Object(object)
            }
            NativeValue::MultiMap(entries) => {
                let object = ScriptObject::new();
                for (key, values) in entries {
                    let text = |v: &Option<String>| {
                        v.as_ref()
                            .map_or(ScriptValue::Null, |s| ScriptValue::String(s.clone()))
                    };
                    let value = match values.as_slice() {
                        [single] => text(single),
                        many => ScriptValue::array(many.iter().map(text).collect()),
                    };
                    object.insert(key.clone(), value);
                }
                ScriptValue::Object(object)
            }
            NativeValue::Callable(callable) => ScriptValue::Function(self.wrap_callable(callable)),
            NativeValue::Json(text) => json_to_script(text)?,
            NativeValue::Object(object) => self.wrap_object(object)?,
            NativeValue::Script(value) => value.clone(),
        })
    }

    /// Convert a native result to script after checking it against its
    /// declared type.
    pub(crate) fn to_script_as(&self, value: &NativeValue, declared: &NativeType) -> Result<ScriptValue> {
        let value = declared::conform(value, declared)?;
        self.to_script(&value)
    }

    /// Convert a script value to the native type `target`.
    ///
    /// `undefined` and `null` become the target's default value; a callable
    /// target receives a null callable.
    pub fn to_native(&self, value: &ScriptValue, target: &NativeType) -> Result<NativeValue> {
        if value.is_nullish() {
            return Ok(target.default_value());
        }

        let mismatch = || -> Error { ConversionError::mismatch(target, value.type_name()).into() };

        Ok(match target {
            NativeType::Void => NativeValue::Null,
            NativeType::Bool => NativeValue::Bool(value.as_bool().ok_or_else(mismatch)?),
            NativeType::I8
            | NativeType::U8
            | NativeType::I16
            | NativeType::U16
            | NativeType::I32
            | NativeType::U32
            | NativeType::I64
            | NativeType::U64
            | NativeType::F32
            | NativeType::F64 => numeric::to_native_number(value, target)?,
            NativeType::Char => {
                let text = value.as_str().ok_or_else(mismatch)?;
                NativeValue::Char(text.chars().next().unwrap_or('\0'))
            }
            NativeType::DateTime => match value {
                ScriptValue::Date(ms) => NativeValue::DateTime(date_from_millis(*ms)?),
                _ => return Err(mismatch()),
            },
            NativeType::String => NativeValue::String(value.as_str().ok_or_else(mismatch)?.to_string()),
            NativeType::Enum(def) if def.is_flags() => {
                let raw = numeric::to_enum_raw(value, target)?;
                def.repr().to_value(raw)?;
                NativeValue::Enum(def.clone(), raw)
            }
            NativeType::Enum(def) => {
                let name = value.as_str().ok_or_else(mismatch)?;
                let raw = def
                    .value_of(name)
                    .ok_or_else(|| ConversionError::InvalidEnumName {
                        enum_name: def.name().to_string(),
                        name: name.to_string(),
                    })?;
                NativeValue::Enum(def.clone(), raw)
            }
            NativeType::Array(elem) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                NativeValue::Array(
                    items
                        .to_vec()
                        .iter()
                        .map(|item| self.to_native(item, elem))
                        .collect::<Result<_>>()?,
                )
            }
            NativeType::Sequence(_) => {
                return Err(ConversionError::OneWay {
                    type_name: target.to_string(),
                }
                .into());
            }
            NativeType::Dictionary(elem) => {
                let object = value.as_object().ok_or_else(mismatch)?;
                NativeValue::Dictionary(
                    object
                        .entries()?
                        .into_iter()
                        .map(|(key, item)| Ok((key, self.to_native(&item, elem)?)))
                        .collect::<Result<_>>()?,
                )
            }
            NativeType::MultiMap => {
                let object = value.as_object().ok_or_else(mismatch)?;
                NativeValue::MultiMap(multimap_entries(object)?)
            }
            NativeType::Callable(shape) => {
                let function = value.as_function().ok_or_else(mismatch)?;
                NativeValue::Callable(self.callable_for(function, shape))
            }
            NativeType::Json => NativeValue::Json(script_to_json(value)?),
            NativeType::Object(class) => {
                let object = value.as_object().ok_or_else(mismatch)?;
                match object.host() {
                    Some(instance) => {
                        let actual = instance.target().native_class();
                        if !actual.is_assignable_to(class) {
                            return Err(ConversionError::mismatch(class.name(), actual.name()).into());
                        }
                        NativeValue::Object(instance.target().clone())
                    }
                    None => self.construct_from_plain(object, class)?,
                }
            }
            NativeType::Any => self.any_to_native(value)?,
        })
    }

    /// Proxy object for a native instance, built from its runtime class.
    pub(crate) fn wrap_object(&self, object: &ObjectRef) -> Result<ScriptValue> {
        let definition = self.get_or_build(&object.native_class())?;
        Ok(ScriptValue::Object(instantiate(&definition, object.clone())))
    }

    /// Script function calling a native callable.
    pub(crate) fn wrap_callable(&self, callable: &NativeCallable) -> ScriptFunction {
        let exposer = self.downgrade();
        let target = callable.clone();
        let ops = signature_ops(&callable.shape().params, &callable.shape().ret);
        ScriptFunction::wrapping_native(callable.clone(), move |_this, args| {
            let exposer = exposer.upgrade()?;
            run(&exposer, &ops, args, |natives| {
                target
                    .call(&natives)
                    .map_err(|err| Error::from_native(&target.shape().name, err))
            })
        })
    }

    /// Native callable for a script function: the function's own native
    /// callable when it wraps one of the same shape, otherwise a bridge
    /// wrapper.
    fn callable_for(&self, function: &ScriptFunction, shape: &Arc<CallableShape>) -> NativeCallable {
        match function.native_callable() {
            Some(native) if native.shape() == shape => native.clone(),
            _ => self.wrap_script_callable(function, shape),
        }
    }

    fn any_to_native(&self, value: &ScriptValue) -> Result<NativeValue> {
        Ok(match value {
            ScriptValue::Undefined | ScriptValue::Null => NativeValue::Null,
            ScriptValue::Bool(b) => NativeValue::Bool(*b),
            ScriptValue::Int(i) => NativeValue::I32(*i),
            ScriptValue::UInt(u) => NativeValue::U32(*u),
            ScriptValue::Number(n) => NativeValue::F64(*n),
            ScriptValue::String(s) => NativeValue::String(s.clone()),
            ScriptValue::Date(ms) => NativeValue::DateTime(date_from_millis(*ms)?),
            ScriptValue::Array(items) => NativeValue::Array(
                items
                    .to_vec()
                    .iter()
                    .map(|item| self.any_to_native(item))
                    .collect::<Result<_>>()?,
            ),
            ScriptValue::Object(object) => match object.host() {
                Some(instance) => NativeValue::Object(instance.target().clone()),
                None => NativeValue::Dictionary(
                    object
                        .entries()?
                        .into_iter()
                        .map(|(key, item)| Ok((key, self.any_to_native(&item)?)))
                        .collect::<Result<_>>()?,
                ),
            },
            ScriptValue::Function(function) => {
                NativeValue::Callable(self.callable_for(function, &Arc::new(CallableShape::any())))
            }
        })
    }

    /// Build a `class` instance with its zero-argument constructor and fill
    /// its exposed writable properties from `object`.
    ///
    /// Each property is looked up under its exposed name, then its member
    /// name; properties the object does not mention take their declared
    /// default, or are left alone when there is none.
    fn construct_from_plain(&self, object: &ScriptObject, class: &NativeClass) -> Result<NativeValue> {
        if class.is_interface() {
            return Err(ConversionError::mismatch(class.name(), "plain object").into());
        }
        let constructor = class
            .constructor_for(0)
            .ok_or_else(|| ConstructionError::NoDefaultConstructor {
                type_name: class.name().to_string(),
            })?;
        let instance = (constructor.body)(&[]).map_err(|source| ConstructionError::Failed {
            type_name: class.name().to_string(),
            source,
        })?;

        let handle = instance.native_class();
        for descriptor in self.resolve_members(&handle)? {
            if descriptor.kind != MemberKind::PropertySet {
                continue;
            }
            let member = descriptor.member_name.as_str();
            let Some(property) = handle.property_signature(member) else {
                continue;
            };
            let Some(setter) = handle.property_impl(member, true).and_then(|p| p.setter.clone()) else {
                continue;
            };

            let mut raw = object.get(&descriptor.exposed_name)?;
            if raw.is_undefined() && descriptor.exposed_name != member {
                raw = object.get(member)?;
            }
            let value = if raw.is_undefined() {
                match &property.default {
                    Some(default) => default.clone(),
                    None => continue,
                }
            } else {
                self.to_native(&raw, &property.ty)?
            };
            setter(instance.as_ref(), value).map_err(|err| Error::from_native(member, err))?;
        }

        Ok(NativeValue::Object(instance))
    }
}

fn date_from_millis(ms: f64) -> std::result::Result<NativeDate, ConversionError> {
    if !ms.is_finite() {
        return Err(ConversionError::out_of_range(NativeType::DateTime, ms));
    }
    DateTime::from_timestamp_millis(ms.trunc() as i64)
        .ok_or_else(|| ConversionError::out_of_range(NativeType::DateTime, ms))
}

/// Key → values of a script object. Arrays give several values, nested
/// objects are skipped, `null` gives a null value.
fn multimap_entries(object: &ScriptObject) -> Result<Vec<(String, Vec<Option<String>>)>> {
    let mut out = Vec::new();
    for (key, value) in object.entries()? {
        let values = match &value {
            ScriptValue::Array(items) => items
                .to_vec()
                .iter()
                .filter_map(scalar_text)
                .collect(),
            other => match scalar_text(other) {
                Some(text) => vec![text],
                None => continue,
            },
        };
        out.push((key, values));
    }
    Ok(out)
}

/// Text form of a scalar; `None` for values that have none.
fn scalar_text(value: &ScriptValue) -> Option<Option<String>> {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => Some(None),
        ScriptValue::Bool(b) => Some(Some(b.to_string())),
        ScriptValue::Int(i) => Some(Some(i.to_string())),
        ScriptValue::UInt(u) => Some(Some(u.to_string())),
        ScriptValue::Number(n) => Some(Some(n.to_string())),
        ScriptValue::String(s) => Some(Some(s.clone())),
        ScriptValue::Date(ms) => DateTime::from_timestamp_millis(*ms as i64)
            .map(|dt| Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true))),
        ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Function(_) => None,
    }
}

#[cfg(feature = "json")]
fn json_to_script(text: &str) -> Result<ScriptValue> {
    Ok(json::parse(text)?)
}

#[cfg(not(feature = "json"))]
fn json_to_script(_text: &str) -> Result<ScriptValue> {
    Err(ConversionError::Unsupported {
        type_name: NativeType::Json.to_string(),
    }
    .into())
}

#[cfg(feature = "json")]
fn script_to_json(value: &ScriptValue) -> Result<String> {
    Ok(json::stringify(value)?)
}

#[cfg(not(feature = "json"))]
fn script_to_json(_value: &ScriptValue) -> Result<String> {
    Err(ConversionError::Unsupported {
        type_name: NativeType::Json.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{EnumDef, EnumRepr};

    fn exposer() -> Exposer {
        Exposer::default()
    }

    #[test]
    fn test_primitive_widening() {
        let ex = exposer();
        assert_eq!(ex.to_script(&NativeValue::U8(255)).unwrap(), ScriptValue::Int(255));
        assert_eq!(ex.to_script(&NativeValue::U32(7)).unwrap(), ScriptValue::UInt(7));
        assert_eq!(ex.to_script(&NativeValue::I64(-9)).unwrap(), ScriptValue::Number(-9.0));
        assert_eq!(ex.to_script(&NativeValue::Char('x')).unwrap(), ScriptValue::string("x"));
        assert_eq!(ex.to_script(&NativeValue::Null).unwrap(), ScriptValue::Undefined);
    }

    #[test]
    fn test_null_gives_target_default() {
        let ex = exposer();
        assert_eq!(
            ex.to_native(&ScriptValue::Null, &NativeType::I32).unwrap(),
            NativeValue::I32(0)
        );
        assert_eq!(
            ex.to_native(&ScriptValue::Undefined, &NativeType::callable(CallableShape::any()))
                .unwrap(),
            NativeValue::Null
        );
    }

    #[test]
    fn test_char_takes_first_character() {
        let ex = exposer();
        assert_eq!(
            ex.to_native(&ScriptValue::string("hey"), &NativeType::Char).unwrap(),
            NativeValue::Char('h')
        );
        assert_eq!(
            ex.to_native(&ScriptValue::string(""), &NativeType::Char).unwrap(),
            NativeValue::Char('\0')
        );
    }

    #[test]
    fn test_date_sentinel_and_epoch() {
        let ex = exposer();
        assert_eq!(
            ex.to_script(&NativeValue::DateTime(NativeDate::MIN_UTC)).unwrap(),
            ScriptValue::Undefined
        );
        let epoch = DateTime::from_timestamp_millis(0).unwrap();
        assert_eq!(
            ex.to_script(&NativeValue::DateTime(epoch)).unwrap(),
            ScriptValue::Date(0.0)
        );
        assert_eq!(
            ex.to_native(&ScriptValue::Undefined, &NativeType::DateTime).unwrap(),
            NativeValue::DateTime(NativeDate::MIN_UTC)
        );
    }

    #[test]
    fn test_enums() {
        let ex = exposer();
        let color = EnumDef::new("Color", EnumRepr::I32)
            .variant("Red", 1)
            .variant("Green", 2)
            .build();
        let target = NativeType::Enum(color.clone());
        assert_eq!(
            ex.to_native(&ScriptValue::string("Green"), &target).unwrap(),
            NativeValue::Enum(color.clone(), 2)
        );
        let err = ex.to_native(&ScriptValue::string("Blue"), &target).unwrap_err();
        assert!(matches!(
            err,
            Error::Conversion(ConversionError::InvalidEnumName { .. })
        ));
        assert!(ex.to_script(&NativeValue::Enum(color, 9)).is_err());

        let access = EnumDef::flags("Access", EnumRepr::U8)
            .variant("Read", 1)
            .variant("Write", 2)
            .build();
        assert_eq!(
            ex.to_script(&NativeValue::Enum(access.clone(), 3)).unwrap(),
            ScriptValue::Int(3)
        );
        assert!(ex
            .to_native(&ScriptValue::Int(300), &NativeType::Enum(access))
            .is_err());
    }

    #[test]
    fn test_sequence_is_one_way() {
        let ex = exposer();
        let seq = NativeValue::Sequence(vec![NativeValue::I32(1), NativeValue::I32(2)]);
        let script = ex.to_script(&seq).unwrap();
        assert_eq!(script.as_array().map(|a| a.len()), Some(2));
        let err = ex
            .to_native(&script, &NativeType::sequence(NativeType::I32))
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::OneWay { .. })));
    }

    #[test]
    fn test_multimap_single_and_many() {
        let ex = exposer();
        let map = NativeValue::MultiMap(vec![
            ("one".to_string(), vec![Some("a".to_string())]),
            (
                "many".to_string(),
                vec![Some("b".to_string()), None],
            ),
        ]);
        let object = ex.to_script(&map).unwrap();
        let object = object.as_object().unwrap();
        assert_eq!(object.get("one").unwrap(), ScriptValue::string("a"));
        let many = object.get("many").unwrap();
        assert_eq!(
            many.as_array().map(|a| a.to_vec()),
            Some(vec![ScriptValue::string("b"), ScriptValue::Null])
        );

        object.insert("nested", ScriptObject::new());
        object.insert("count", 3);
        let back = ex
            .to_native(&ScriptValue::Object(object.clone()), &NativeType::MultiMap)
            .unwrap();
        assert_eq!(
            back,
            NativeValue::MultiMap(vec![
                ("one".to_string(), vec![Some("a".to_string())]),
                ("many".to_string(), vec![Some("b".to_string()), None]),
                ("count".to_string(), vec![Some("3".to_string())]),
            ])
        );
    }

    #[test]
    fn test_dictionary_and_any() {
        let ex = exposer();
        let object = ScriptObject::new();
        object.insert("x", 1);
        object.insert("y", ScriptValue::array(vec![ScriptValue::Bool(true)]));
        let native = ex
            .to_native(&ScriptValue::Object(object), &NativeType::Any)
            .unwrap();
        assert_eq!(native.entry("x"), Some(&NativeValue::I32(1)));
        assert_eq!(
            native.entry("y"),
            Some(&NativeValue::Array(vec![NativeValue::Bool(true)]))
        );
    }

    #[test]
    fn test_mismatches_fail_loudly() {
        let ex = exposer();
        assert!(ex.to_native(&ScriptValue::Int(1), &NativeType::String).is_err());
        assert!(ex.to_native(&ScriptValue::string("x"), &NativeType::Bool).is_err());
        assert!(ex
            .to_native(&ScriptValue::Int(1), &NativeType::array(NativeType::I32))
            .is_err());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_text() {
        let ex = exposer();
        let script = ex
            .to_script(&NativeValue::Json(r#"{"name":"a","value":2}"#.to_string()))
            .unwrap();
        let object = script.as_object().unwrap();
        assert_eq!(object.get("value").unwrap(), ScriptValue::Int(2));
        assert_eq!(
            ex.to_native(&script, &NativeType::Json).unwrap(),
            NativeValue::Json(r#"{"name":"a","value":2}"#.to_string())
        );
    }
}
