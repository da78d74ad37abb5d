/*
 * json.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! JSON data values paired with templates.
//!
//! Data files are parsed into [`serde_json::Value`], a closed sum type, with
//! object keys kept in document order. Keys keep their original case; lookups
//! made by the merge step are case-insensitive.

use serde_json::Value;

use crate::error::{AssemblerError, AssemblerResult};

/// A parsed JSON object with insertion-ordered keys.
pub type JsonObject = serde_json::Map<String, Value>;

/// Parse a JSON data file, requiring an object at the root.
pub fn parse_json_object(text: &str) -> AssemblerResult<JsonObject> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(AssemblerError::JsonNotObject {
            found: kind_name(&other),
        }),
    }
}

/// Parse a JSON data file the way the merge core consumes it.
///
/// Malformed text or a non-object root produces an empty object. Whitespace-only
/// text is an empty object without a warning.
pub fn parse_json_object_lenient(text: &str) -> JsonObject {
    if text.trim().is_empty() {
        return JsonObject::new();
    }
    match parse_json_object(text) {
        Ok(map) => map,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring malformed JSON data");
            JsonObject::new()
        }
    }
}

/// Render a scalar value as substitution text.
///
/// Null, arrays and objects have no scalar text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Truthiness used by conditional blocks inside array items.
///
/// - Bool: as-is
/// - String: equal to `"true"` ignoring case
/// - Number: non-zero
/// - Everything else is false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

/// Look up a key, trying the exact spelling before a case-insensitive scan.
pub fn get_ignore_case<'a>(object: &'a JsonObject, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
