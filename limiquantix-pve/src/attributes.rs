//! Scalar access over raw form attributes.
//!
//! Form values arrive as strings, numbers, booleans or nulls. A value is
//! *blank* when it is null or a whitespace-only string; blank values are
//! treated as absent everywhere in the translator.

use serde_json::Value;

use crate::error::{Result, ShapeError};
use crate::types::{AttributeMap, ParamValue};

/// Dotted path of `key` inside `group`, used in error messages.
pub(crate) fn field_path(group: &str, key: &str) -> String {
    format!("{}.{}", group, key)
}

/// Text form of a scalar, or `None` when blank.
pub(crate) fn text(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(if *b { "1" } else { "0" }.to_string())),
        Value::Array(_) | Value::Object(_) => Err(ShapeError::NonScalar {
            field: field.to_string(),
        }),
    }
}

/// Integer value of a scalar, or `None` when blank.
pub(crate) fn integer(field: &str, value: &Value) -> Result<Option<i64>> {
    match text(field, value)? {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ShapeError::InvalidNumber {
                field: field.to_string(),
                value: s,
            }),
    }
}

/// Payload value of a scalar: integer when it looks numeric, text otherwise.
pub(crate) fn param(field: &str, value: &Value) -> Result<Option<ParamValue>> {
    Ok(text(field, value)?.map(|s| match s.trim().parse::<i64>() {
        Ok(v) => ParamValue::Int(v),
        Err(_) => ParamValue::Text(s),
    }))
}

/// Look up `key` in `attrs` as text.
pub(crate) fn get_text(attrs: &AttributeMap, group: &str, key: &str) -> Result<Option<String>> {
    match attrs.get(key) {
        Some(value) => text(&field_path(group, key), value),
        None => Ok(None),
    }
}

/// Look up `key` in `attrs` as an integer.
pub(crate) fn get_integer(attrs: &AttributeMap, group: &str, key: &str) -> Result<Option<i64>> {
    match attrs.get(key) {
        Some(value) => integer(&field_path(group, key), value),
        None => Ok(None),
    }
}

/// Look up a required integer.
pub(crate) fn require_integer(attrs: &AttributeMap, group: &str, key: &str) -> Result<i64> {
    get_integer(attrs, group, key)?.ok_or_else(|| ShapeError::MissingField {
        field: field_path(group, key),
    })
}

/// Look up required text.
pub(crate) fn require_text(attrs: &AttributeMap, group: &str, key: &str) -> Result<String> {
    get_text(attrs, group, key)?.ok_or_else(|| ShapeError::MissingField {
        field: field_path(group, key),
    })
}

/// A `0`/`1` form flag. Blank means off.
pub(crate) fn flag(attrs: &AttributeMap, group: &str, key: &str) -> Result<bool> {
    Ok(get_integer(attrs, group, key)? == Some(1))
}
