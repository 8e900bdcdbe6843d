//! Common utility types.

use std::collections::HashMap;

/// Unique identifier type.
pub type Id = String;

/// Metadata map type.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Author name used for events carrying the caller's input message.
pub const USER_AUTHOR: &str = "user";

/// Render a JSON value the way it should appear inside prompt text.
///
/// Strings are rendered verbatim (without quotes); everything else uses
/// its compact JSON form.
pub fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_string_without_quotes() {
        assert_eq!(render_value(&serde_json::json!("hello")), "hello");
    }

    #[test]
    fn test_render_null_as_empty() {
        assert_eq!(render_value(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_render_structured_value() {
        assert_eq!(render_value(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_value(&serde_json::json!(42)), "42");
        assert_eq!(render_value(&serde_json::json!(true)), "true");
    }
}
