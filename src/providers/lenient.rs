//! Tolerant field lookups over loosely-shaped provider payloads

use serde_json::Value;

/// First non-blank string among `keys`
pub(crate) fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .filter_map(as_text)
        .next()
}

/// A string, or the `name` of an object such as `{"name": "PolitiFact"}`
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map.get("name").and_then(as_text),
        _ => None,
    }
}

/// The first array found under `keys`, or the value itself when it is an array
pub(crate) fn items<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(items) = value {
        return items;
    }
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
