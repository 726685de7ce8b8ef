//! Forgiving field deserializers.
//!
//! Project files are written by many tool versions and by hand. A field of an
//! unexpected type is coerced when it has an obvious reading and dropped
//! otherwise, so one odd value never rejects a whole document. Use with
//! `#[serde(default, deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Loose truthiness of a JSON value: `null`, `false`, `0`, `NaN` and `""`
/// are false, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A flag read by truthiness.
pub fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

/// An optional flag read by truthiness; `null` is unset.
pub fn opt_truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok((!value.is_null()).then(|| is_truthy(&value)))
}

/// Text of a string, number or boolean. Anything else reads as empty.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => {
            log::warn!("Ignoring non-text value {}", other);
            String::new()
        }
    })
}

/// An optional name such as a column. Falsy values are unset, numbers are
/// kept as their text.
pub fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if is_truthy(&value) => Some(n.to_string()),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
        Value::Array(_) | Value::Object(_) => {
            log::warn!("Ignoring non-text value {}", value);
            None
        }
    })
}

/// An optional number, also read from numeric strings.
pub fn opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if number.is_none() {
        log::warn!("Ignoring non-numeric value {}", value);
    }
    Ok(number)
}

/// An optional list index, also read from numeric strings.
pub fn opt_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let index = match &value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_u64().and_then(|i| usize::try_from(i).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if index.is_none() {
        log::warn!("Ignoring invalid index {}", value);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "truthy")]
        flag: bool,
        #[serde(default, deserialize_with = "opt_truthy")]
        maybe: Option<bool>,
        #[serde(default, deserialize_with = "text")]
        label: String,
        #[serde(default, deserialize_with = "opt_text")]
        column: Option<String>,
        #[serde(default, deserialize_with = "opt_number")]
        degrees: Option<f64>,
        #[serde(default, deserialize_with = "opt_index")]
        index: Option<usize>,
    }

    fn parse(value: Value) -> Fields {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_fields_default() {
        let fields = parse(json!({}));
        assert!(!fields.flag);
        assert_eq!(fields.maybe, None);
        assert_eq!(fields.label, "");
        assert_eq!(fields.column, None);
    }

    #[test]
    fn test_flags_by_truthiness() {
        assert!(parse(json!({"flag": 1})).flag);
        assert!(parse(json!({"flag": "yes"})).flag);
        assert!(!parse(json!({"flag": null})).flag);
        assert_eq!(parse(json!({"maybe": 0})).maybe, Some(false));
        assert_eq!(parse(json!({"maybe": null})).maybe, None);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(parse(json!({"label": null})).label, "");
        assert_eq!(parse(json!({"label": 3})).label, "3");
        assert_eq!(parse(json!({"label": [1]})).label, "");
        assert_eq!(parse(json!({"column": 0})).column, None);
        assert_eq!(parse(json!({"column": false})).column, None);
        assert_eq!(parse(json!({"column": 2})).column.as_deref(), Some("2"));
        assert_eq!(parse(json!({"column": ""})).column.as_deref(), Some(""));
    }

    #[test]
    fn test_numbers_from_strings() {
        assert_eq!(parse(json!({"degrees": "90"})).degrees, Some(90.0));
        assert_eq!(parse(json!({"degrees": "left"})).degrees, None);
        assert_eq!(parse(json!({"index": "2"})).index, Some(2));
        assert_eq!(parse(json!({"index": -1})).index, None);
        assert_eq!(parse(json!({"index": 4})).index, Some(4));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!({})));
    }
}
