//! Tool execution result types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Metadata;

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful.
    pub success: bool,

    /// Output content.
    pub content: String,

    /// Structured output (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<serde_json::Value>,

    /// Error message if execution failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Additional metadata about the execution.
    #[serde(default)]
    pub metadata: Metadata,
}

impl ToolResult {
    /// Create a successful result with text content.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            structured_output: None,
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a successful result with structured output.
    pub fn success_json(output: serde_json::Value) -> Self {
        Self {
            success: true,
            content: output.to_string(),
            structured_output: Some(output),
            error: None,
            metadata: HashMap::new(),
        }
    }

    /// Create an error result.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: String::new(),
            structured_output: None,
            error: Some(error.into()),
            metadata: HashMap::new(),
        }
    }

    /// The value handed back to the model as the function response.
    pub fn response_value(&self) -> serde_json::Value {
        if let Some(error) = &self.error {
            return serde_json::json!({ "error": error });
        }
        match &self.structured_output {
            Some(output) => output.clone(),
            None => serde_json::json!({ "result": self.content }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response_value() {
        let result = ToolResult::success("done");
        assert!(result.success);
        assert_eq!(result.response_value(), serde_json::json!({"result": "done"}));
    }

    #[test]
    fn test_structured_response_value() {
        let result = ToolResult::success_json(serde_json::json!({"count": 2}));
        assert_eq!(result.response_value()["count"], 2);
        assert_eq!(result.content, r#"{"count":2}"#);
    }

    #[test]
    fn test_error_response_value() {
        let result = ToolResult::error("boom");
        assert!(!result.success);
        assert_eq!(result.response_value(), serde_json::json!({"error": "boom"}));
    }
}
