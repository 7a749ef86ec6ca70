//! Native results checked against the type their member declares.
//!
//! A body may hand back any [`NativeValue`]; before it reaches script it
//! must fit the declared type. Numbers are re-expressed in the declared
//! width when that loses nothing, integers become discriminants of a
//! declared enumeration, and everything else has to match exactly.

use crate::native::{NativeType, NativeValue};
use crate::policy::ConversionError;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn of(value: &NativeValue) -> Option<Self> {
        Some(match value {
            NativeValue::I8(v) => Number::Int(i128::from(*v)),
            NativeValue::U8(v) => Number::Int(i128::from(*v)),
            NativeValue::I16(v) => Number::Int(i128::from(*v)),
            NativeValue::U16(v) => Number::Int(i128::from(*v)),
            NativeValue::I32(v) => Number::Int(i128::from(*v)),
            NativeValue::U32(v) => Number::Int(i128::from(*v)),
            NativeValue::I64(v) => Number::Int(i128::from(*v)),
            NativeValue::U64(v) => Number::Int(i128::from(*v)),
            NativeValue::F32(v) => Number::Float(f64::from(*v)),
            NativeValue::F64(v) => Number::Float(*v),
            _ => return None,
        })
    }

    fn integral(self) -> Option<i128> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i128),
            Number::Float(_) => None,
        }
    }

    fn float(self) -> Option<f64> {
        match self {
            Number::Int(i) => {
                let f = i as f64;
                (f as i128 == i).then_some(f)
            }
            Number::Float(f) => Some(f),
        }
    }

    fn text(self) -> String {
        match self {
            Number::Int(i) => i.to_string(),
            Number::Float(f) => f.to_string(),
        }
    }
}

/// Re-express `value` as a value of `declared`, or fail.
pub(crate) fn conform(value: &NativeValue, declared: &NativeType) -> Result<NativeValue, ConversionError> {
    let mismatch = || ConversionError::mismatch(declared, value.kind_name());

    match (declared, value) {
        (NativeType::Void | NativeType::Any, _) => Ok(value.clone()),
        (_, NativeValue::Null) if declared.default_value().is_null() => Ok(NativeValue::Null),
        (NativeType::Bool, NativeValue::Bool(_))
        | (NativeType::Char, NativeValue::Char(_))
        | (NativeType::DateTime, NativeValue::DateTime(_))
        | (NativeType::String, NativeValue::String(_))
        | (NativeType::MultiMap, NativeValue::MultiMap(_))
        | (NativeType::Json, NativeValue::Json(_))
        | (NativeType::Callable(_), NativeValue::Callable(_)) => Ok(value.clone()),
        (
            NativeType::I8
            | NativeType::U8
            | NativeType::I16
            | NativeType::U16
            | NativeType::I32
            | NativeType::U32
            | NativeType::I64
            | NativeType::U64
            | NativeType::F32
            | NativeType::F64,
            _,
        ) => match Number::of(value) {
            Some(number) => conform_number(number, declared),
            None => Err(mismatch()),
        },
        (NativeType::Enum(def), NativeValue::Enum(actual, raw)) if actual.name() == def.name() => {
            Ok(NativeValue::Enum(def.clone(), *raw))
        }
        (NativeType::Enum(def), _) => {
            let number = Number::of(value).ok_or_else(mismatch)?;
            number
                .integral()
                .and_then(|raw| i64::try_from(raw).ok())
                .map(|raw| NativeValue::Enum(def.clone(), raw))
                .ok_or_else(|| ConversionError::out_of_range(declared, number.text()))
        }
        (NativeType::Array(elem), NativeValue::Array(items)) => {
            Ok(NativeValue::Array(conform_all(items, elem)?))
        }
        (NativeType::Sequence(elem), NativeValue::Sequence(items) | NativeValue::Array(items)) => {
            Ok(NativeValue::Sequence(conform_all(items, elem)?))
        }
        (NativeType::Dictionary(elem), NativeValue::Dictionary(entries)) => Ok(NativeValue::Dictionary(
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), conform(item, elem)?)))
                .collect::<Result<_, ConversionError>>()?,
        )),
        (NativeType::Object(class), NativeValue::Object(object))
            if object.native_class().is_assignable_to(class) =>
        {
            Ok(value.clone())
        }
        _ => Err(mismatch()),
    }
}

fn conform_all(items: &[NativeValue], elem: &NativeType) -> Result<Vec<NativeValue>, ConversionError> {
    items.iter().map(|item| conform(item, elem)).collect()
}

fn conform_number(number: Number, declared: &NativeType) -> Result<NativeValue, ConversionError> {
    let out_of_range = || ConversionError::out_of_range(declared, number.text());
    let int = || number.integral().ok_or_else(out_of_range);

    Ok(match declared {
        NativeType::I8 => NativeValue::I8(i8::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::U8 => NativeValue::U8(u8::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::I16 => NativeValue::I16(i16::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::U16 => NativeValue::U16(u16::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::I32 => NativeValue::I32(i32::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::U32 => NativeValue::U32(u32::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::I64 => NativeValue::I64(i64::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::U64 => NativeValue::U64(u64::try_from(int()?).map_err(|_| out_of_range())?),
        NativeType::F32 => {
            let wide = number.float().ok_or_else(out_of_range)?;
            let narrow = wide as f32;
            if f64::from(narrow) != wide && !wide.is_nan() {
                return Err(out_of_range());
            }
            NativeValue::F32(narrow)
        }
        NativeType::F64 => NativeValue::F64(number.float().ok_or_else(out_of_range)?),
        other => return Err(ConversionError::mismatch(other, "number")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{EnumDef, EnumRepr};

    #[test]
    fn test_numbers_keep_their_value_or_fail() {
        assert_eq!(
            conform(&NativeValue::U8(7), &NativeType::I64).unwrap(),
            NativeValue::I64(7)
        );
        assert_eq!(
            conform(&NativeValue::F64(3.0), &NativeType::I32).unwrap(),
            NativeValue::I32(3)
        );
        assert_eq!(
            conform(&NativeValue::I32(2), &NativeType::F64).unwrap(),
            NativeValue::F64(2.0)
        );
        assert!(matches!(
            conform(&NativeValue::I32(300), &NativeType::U8),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            conform(&NativeValue::F64(0.5), &NativeType::I32),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(conform(&NativeValue::F64(0.1), &NativeType::F32).is_err());
    }

    #[test]
    fn test_kind_mismatches_are_rejected() {
        assert!(matches!(
            conform(&NativeValue::from("seven"), &NativeType::I32),
            Err(ConversionError::TypeMismatch { .. })
        ));
        assert!(conform(&NativeValue::I32(1), &NativeType::String).is_err());
        assert!(conform(&NativeValue::Null, &NativeType::Bool).is_err());
        assert!(conform(&NativeValue::Script(1.into()), &NativeType::I32).is_err());
        assert_eq!(
            conform(&NativeValue::Null, &NativeType::String).unwrap(),
            NativeValue::Null
        );
        assert_eq!(
            conform(&NativeValue::from("x"), &NativeType::Any).unwrap(),
            NativeValue::from("x")
        );
    }

    #[test]
    fn test_enum_results() {
        let color = EnumDef::new("Color", EnumRepr::I32).variant("Red", 1).build();
        let other = EnumDef::new("Shade", EnumRepr::I32).variant("Dark", 1).build();
        let declared = NativeType::Enum(color.clone());

        assert_eq!(
            conform(&NativeValue::I32(1), &declared).unwrap(),
            NativeValue::Enum(color.clone(), 1)
        );
        assert_eq!(
            conform(&NativeValue::Enum(color.clone(), 1), &declared).unwrap(),
            NativeValue::Enum(color, 1)
        );
        assert!(conform(&NativeValue::Enum(other, 1), &declared).is_err());
        assert!(conform(&NativeValue::from("Red"), &declared).is_err());
    }

    #[test]
    fn test_collections_check_their_elements() {
        let ints = NativeType::array(NativeType::I32);
        assert!(conform(&NativeValue::Array(vec![NativeValue::I32(1)]), &ints).is_ok());
        assert!(conform(&NativeValue::Array(vec![NativeValue::from("a")]), &ints).is_err());
        assert_eq!(
            conform(
                &NativeValue::Array(vec![NativeValue::U8(1)]),
                &NativeType::sequence(NativeType::I32)
            )
            .unwrap(),
            NativeValue::Sequence(vec![NativeValue::I32(1)])
        );
        assert!(conform(
            &NativeValue::Dictionary(vec![("a".to_string(), NativeValue::Bool(true))]),
            &NativeType::dictionary(NativeType::I32)
        )
        .is_err());
    }
}
