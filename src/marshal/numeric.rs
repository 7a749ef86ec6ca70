//! Strict numeric conversion from script numbers.
//!
//! Integral targets accept only finite, integral values inside the target's
//! range. Numeric strings are parsed first.

use crate::native::{NativeType, NativeValue};
use crate::policy::ConversionError;
use crate::script::ScriptValue;

/// Numeric view of a script value. Strings are parsed after trimming.
pub(crate) fn number_of(value: &ScriptValue, target: &NativeType) -> Result<f64, ConversionError> {
    match value {
        ScriptValue::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::mismatch(target, format!("string {text:?}"))),
        other => other
            .as_number()
            .ok_or_else(|| ConversionError::mismatch(target, other.type_name())),
    }
}

/// Integral value of `n` when it fits between `min` and `max`.
fn integral(n: f64, min: f64, max: f64, target: &NativeType) -> Result<f64, ConversionError> {
    if !n.is_finite() || n.fract() != 0.0 || n < min || n > max {
        return Err(ConversionError::out_of_range(target, n));
    }
    Ok(n)
}

/// Convert a script number to the native numeric `target`.
pub(crate) fn to_native_number(value: &ScriptValue, target: &NativeType) -> Result<NativeValue, ConversionError> {
    let n = number_of(value, target)?;
    Ok(match target {
        NativeType::I8 => NativeValue::I8(integral(n, f64::from(i8::MIN), f64::from(i8::MAX), target)? as i8),
        NativeType::U8 => NativeValue::U8(integral(n, 0.0, f64::from(u8::MAX), target)? as u8),
        NativeType::I16 => {
            NativeValue::I16(integral(n, f64::from(i16::MIN), f64::from(i16::MAX), target)? as i16)
        }
        NativeType::U16 => NativeValue::U16(integral(n, 0.0, f64::from(u16::MAX), target)? as u16),
        NativeType::I32 => {
            NativeValue::I32(integral(n, f64::from(i32::MIN), f64::from(i32::MAX), target)? as i32)
        }
        NativeType::U32 => NativeValue::U32(integral(n, 0.0, f64::from(u32::MAX), target)? as u32),
        // 64-bit bounds are not exactly representable; `as` saturates at the
        // nearest bound, which is where the widened value came from.
        NativeType::I64 => NativeValue::I64(integral(n, i64::MIN as f64, i64::MAX as f64, target)? as i64),
        NativeType::U64 => NativeValue::U64(integral(n, 0.0, u64::MAX as f64, target)? as u64),
        NativeType::F32 => {
            if n.is_finite() && n.abs() > f64::from(f32::MAX) {
                return Err(ConversionError::out_of_range(target, n));
            }
            NativeValue::F32(n as f32)
        }
        NativeType::F64 => NativeValue::F64(n),
        other => return Err(ConversionError::mismatch(other, value.type_name())),
    })
}

/// Integral value used for flag enumerations.
pub(crate) fn to_enum_raw(value: &ScriptValue, target: &NativeType) -> Result<i64, ConversionError> {
    let n = number_of(value, target)?;
    Ok(integral(n, i64::MIN as f64, i64::MAX as f64, target)? as i64)
}
