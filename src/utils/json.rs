//! Field classification for partial-update JSON bodies, where an omitted key, an explicit
//! `null` and a value mean three different things.

use serde_json::Value;

pub enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

/// `None` when omitted, `Some(None)` to clear the column, `Some(Some(_))` to set it.
pub fn nullable_text(body: &Value, field: &str) -> Result<Option<Option<String>>, String> {
    Ok(match classify_nullable(body.get(field)).map_err(|err| format!("{field}: {err}"))? {
        NullableValue::Omitted => None,
        NullableValue::Null => Some(None),
        NullableValue::String(value) => Some(Some(value)),
    })
}

/// Like [`nullable_text`] for columns that cannot be cleared.
pub fn required_text(body: &Value, field: &str) -> Result<Option<String>, String> {
    match classify_nullable(body.get(field)).map_err(|err| format!("{field}: {err}"))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Err(format!("{field} cannot be null")),
        NullableValue::String(value) => Ok(Some(value)),
    }
}

pub fn optional_bool(body: &Value, field: &str) -> Result<Option<bool>, String> {
    match body.get(field) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(other) => Err(format!("{field}: expected boolean, got {other}")),
    }
}
