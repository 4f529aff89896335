//! Helpers for the dynamic values that parameters arrive as.

use serde_json::Value;

/// A set of named parameter values, as supplied by a caller or returned by validation.
pub type Params = serde_json::Map<String, Value>;

/// Short name of a value's kind, for messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Length of anything that has one: strings (in chars), lists, and objects.
pub(crate) fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(vs) => Some(vs.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    #[test]
    fn test_kind_and_length() {
        assert_eq!("integer", kind_name(&json!(5)));
        assert_eq!("float", kind_name(&json!(5.0)));
        assert_eq!("list", kind_name(&json!([1, 2])));
        assert_eq!(Some(3), length_of(&json!("héé")));
        assert_eq!(Some(2), length_of(&json!({"a": 1, "b": 2})));
        assert_eq!(None, length_of(&json!(12)));
    }
}
