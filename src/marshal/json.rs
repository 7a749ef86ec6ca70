//! JSON text values.

use chrono::DateTime;
use serde_json::{Map, Number, Value};

use crate::policy::ConversionError;
use crate::script::{ScriptObject, ScriptValue};

/// Parse JSON text into a fresh script value tree.
pub(crate) fn parse(text: &str) -> Result<ScriptValue, ConversionError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ConversionError::Json(e.to_string()))?;
    Ok(from_json(value))
}

fn from_json(value: Value) -> ScriptValue {
    match value {
        Value::Null => ScriptValue::Null,
        Value::Bool(b) => ScriptValue::Bool(b),
        Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => ScriptValue::Int(i),
            None => ScriptValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ScriptValue::String(s),
        Value::Array(items) => ScriptValue::array(items.into_iter().map(from_json).collect()),
        Value::Object(entries) => {
            let object = ScriptObject::new();
            for (key, value) in entries {
                object.insert(key, from_json(value));
            }
            ScriptValue::Object(object)
        }
    }
}

/// Serialize a script value as JSON text. Functions and `undefined`
/// properties are omitted, as the script runtime's own serializer does.
pub(crate) fn stringify(value: &ScriptValue) -> Result<String, ConversionError> {
    match to_json(value)? {
        Some(json) => Ok(json.to_string()),
        None => Err(ConversionError::Unsupported {
            type_name: value.type_name().to_string(),
        }),
    }
}

fn to_json(value: &ScriptValue) -> Result<Option<Value>, ConversionError> {
    Ok(Some(match value {
        ScriptValue::Undefined | ScriptValue::Function(_) => return Ok(None),
        ScriptValue::Null => Value::Null,
        ScriptValue::Bool(b) => Value::Bool(*b),
        ScriptValue::Int(i) => Value::from(*i),
        ScriptValue::UInt(u) => Value::from(*u),
        ScriptValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        ScriptValue::String(s) => Value::String(s.clone()),
        ScriptValue::Date(ms) => DateTime::from_timestamp_millis(*ms as i64)
            .map_or(Value::Null, |dt| Value::String(dt.to_rfc3339())),
        ScriptValue::Array(items) => Value::Array(
            items
                .to_vec()
                .iter()
                .map(|item| to_json(item).map(|v| v.unwrap_or(Value::Null)))
                .collect::<Result<_, _>>()?,
        ),
        ScriptValue::Object(object) => {
            let entries = object
                .entries()
                .map_err(|e| ConversionError::Json(e.to_string()))?;
            let mut map = Map::new();
            for (key, value) in entries {
                if let Some(json) = to_json(&value)? {
                    map.insert(key, json);
                }
            }
            Value::Object(map)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_objects() {
        let value = parse(r#"{"name": "n", "value": 3, "ratio": 0.5, "tags": ["a"]}"#).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("name").unwrap(), ScriptValue::string("n"));
        assert_eq!(object.get("value").unwrap(), ScriptValue::Int(3));
        assert_eq!(object.get("ratio").unwrap(), ScriptValue::Number(0.5));
        assert_eq!(object.get("tags").unwrap().as_array().map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_property_order_survives_round_trip() {
        let text = r#"{"zeta":1,"alpha":2,"mid":{"y":true,"b":false}}"#;
        let value = parse(text).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.own_keys(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(stringify(&value).unwrap(), text);
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        assert!(matches!(parse("{name:"), Err(ConversionError::Json(_))));
    }

    #[test]
    fn test_stringify_skips_functions_and_undefined() {
        let object = ScriptObject::new();
        object.insert("a", 1);
        object.insert("b", ScriptValue::Undefined);
        object.insert(
            "f",
            crate::script::ScriptFunction::new("f", |_, _| Ok(ScriptValue::Undefined)),
        );
        assert_eq!(stringify(&ScriptValue::Object(object)).unwrap(), r#"{"a":1}"#);
        assert!(stringify(&ScriptValue::Undefined).is_err());
    }
}
