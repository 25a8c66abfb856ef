//! Recovery of a usable argument object from model-produced requests.
//!
//! Models flatten arguments to the top level, double-encode them as JSON
//! strings, or send empty placeholders. Normalization accepts all of these
//! and rejects anything that does not end up as an object.

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// Normalizes the `args` field of `request`.
///
/// 1. A missing or falsy `args` becomes an empty object.
/// 2. A string `args` is decoded as JSON text.
/// 3. Every top-level key outside `reserved` that is not already present in
///    the arguments is copied into them.
///
/// # Errors
///
/// Returns [`DispatchError::UnparseableArgs`] when a string `args` is not
/// valid JSON, and [`DispatchError::ArgsNotObject`] when the arguments do not
/// form an object.
pub fn normalize_args(
    request: &Map<String, Value>,
    reserved: &[&str],
) -> Result<Map<String, Value>, DispatchError> {
    let mut args = match request.get("args") {
        Some(Value::String(text)) if !text.is_empty() => {
            let decoded: Value =
                serde_json::from_str(text).map_err(|_| DispatchError::UnparseableArgs)?;
            into_object(decoded)?
        }
        Some(value) => into_object(value.clone())?,
        None => Map::new(),
    };

    for (key, value) in request {
        if reserved.contains(&key.as_str()) || args.contains_key(key) {
            continue;
        }
        args.insert(key.clone(), value.clone());
    }

    Ok(args)
}

fn into_object(value: Value) -> Result<Map<String, Value>, DispatchError> {
    match value {
        Value::Object(map) => Ok(map),
        other if is_falsy(&other) => Ok(Map::new()),
        other => Err(DispatchError::ArgsNotObject {
            found: json_type(&other),
        }),
    }
}

/// Mirrors the truthiness rules models are usually trained against.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
