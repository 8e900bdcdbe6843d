//! Tool trait definition.

use async_trait::async_trait;

use super::{ToolContext, ToolDefinition, ToolResult};
use crate::error::ToolError;

/// Core trait for tools.
///
/// Tools are executable units that leaf nodes invoke when the model asks
/// for them by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition.
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError>;

    /// Validate the arguments before execution.
    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        let definition = self.definition();
        if let Some(schema) = &definition.parameters_schema {
            if schema.get("type") == Some(&serde_json::json!("object")) && !args.is_object() {
                return Err(ToolError::ValidationFailed(
                    "Parameters must be an object".to_string(),
                ));
            }
            if let (Some(required), Some(object)) = (
                schema.get("required").and_then(|r| r.as_array()),
                args.as_object(),
            ) {
                for field in required.iter().filter_map(|f| f.as_str()) {
                    if !object.contains_key(field) {
                        return Err(ToolError::ValidationFailed(format!(
                            "Missing required parameter: {}",
                            field
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
