//! Built-in tools available to every workflow run from the CLI.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use agentflow_protocols::error::ToolError;
use agentflow_protocols::memory::{MemoryStore, NewMemory};
use agentflow_protocols::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use agentflow_protocols::types::Metadata;

/// Every built-in tool. The memory tools share `memory`.
pub(crate) fn builtin_tools(memory: Arc<dyn MemoryStore>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ExitLoopTool::new()),
        Arc::new(CurrentTimeTool::new()),
        Arc::new(EchoTool::new()),
        Arc::new(RememberTool::new(Arc::clone(&memory))),
        Arc::new(RecallTool::new(memory)),
    ]
}

/// Ends the enclosing loop after the current pass.
pub(crate) struct ExitLoopTool {
    definition: ToolDefinition,
}

impl ExitLoopTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                "exit_loop",
                "Call this when the work is complete and no further iterations are needed",
            ),
        }
    }
}

#[async_trait]
impl Tool for ExitLoopTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        _params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        ctx.escalate();
        Ok(ToolResult::success("Loop will stop after this pass"))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentTimeParams {
    /// strftime format; RFC 3339 when absent.
    #[serde(default)]
    format: Option<String>,
}

/// Reports the current UTC time.
pub(crate) struct CurrentTimeTool {
    definition: ToolDefinition,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime-style format, e.g. %Y-%m-%d"
                }
            }
        });

        Self {
            definition: ToolDefinition::new("current_time", "Get the current UTC date and time")
                .with_parameters_schema(schema),
        }
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: CurrentTimeParams = if params.is_null() {
            CurrentTimeParams { format: None }
        } else {
            serde_json::from_value(params)
                .map_err(|e| ToolError::InvalidParameters(e.to_string()))?
        };

        let now = chrono::Utc::now();
        let text = match params.format {
            Some(format) => {
                use std::fmt::Write;
                let mut out = String::new();
                write!(out, "{}", now.format(&format)).map_err(|_| {
                    ToolError::InvalidParameters(format!("invalid time format: {}", format))
                })?;
                out
            }
            None => now.to_rfc3339(),
        };

        Ok(ToolResult::success_json(serde_json::json!({
            "time": text,
            "timestamp": now.timestamp(),
        })))
    }

    fn validate(&self, params: &serde_json::Value) -> Result<(), ToolError> {
        if params.is_null() || params.is_object() {
            Ok(())
        } else {
            Err(ToolError::ValidationFailed(
                "Parameters must be an object".to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct EchoParams {
    text: String,
    /// State key to also store the text under.
    #[serde(default)]
    store_as: Option<String>,
}

/// Returns its input, optionally writing it to session state.
pub(crate) struct EchoTool {
    definition: ToolDefinition,
}

impl EchoTool {
    pub fn new() -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to echo back" },
                "store_as": { "type": "string", "description": "Session state key to store the text under" }
            },
            "required": ["text"]
        });

        Self {
            definition: ToolDefinition::new("echo", "Echo text back to the caller")
                .with_parameters_schema(schema),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: EchoParams = serde_json::from_value(params)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        if let Some(key) = params.store_as {
            ctx.set_state(key, serde_json::Value::String(params.text.clone()));
        }
        Ok(ToolResult::success(params.text))
    }
}

#[derive(Debug, Deserialize)]
struct RememberParams {
    text: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Stores a fact about the current user.
pub(crate) struct RememberTool {
    definition: ToolDefinition,
    memory: Arc<dyn MemoryStore>,
}

impl RememberTool {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Fact to remember" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["text"]
        });

        Self {
            definition: ToolDefinition::new("remember", "Remember a fact about the user")
                .with_parameters_schema(schema),
            memory,
        }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: RememberParams = serde_json::from_value(params)
            .map_err(|e| ToolError::InvalidParameters(e.to_string()))?;

        let memory = NewMemory::new(&ctx.user_id, params.text)
            .with_tags(params.tags)
            .with_metadata("session_id", serde_json::Value::String(ctx.session_id.clone()));
        let record = self.memory.add(memory).await?;

        Ok(ToolResult::success_json(serde_json::json!({
            "id": record.id,
            "tags": record.tags,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct RecallParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_recall_limit")]
    limit: usize,
}

fn default_recall_limit() -> usize {
    5
}

/// Searches the current user's memories.
pub(crate) struct RecallTool {
    definition: ToolDefinition,
    memory: Arc<dyn MemoryStore>,
}

impl RecallTool {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Words to look for" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "limit": { "type": "integer", "description": "Maximum results (default 5)" }
            }
        });

        Self {
            definition: ToolDefinition::new("recall", "Look up remembered facts about the user")
                .with_parameters_schema(schema),
            memory,
        }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let params: RecallParams = if params.is_null() {
            RecallParams {
                query: None,
                tags: Vec::new(),
                limit: default_recall_limit(),
            }
        } else {
            serde_json::from_value(params)
                .map_err(|e| ToolError::InvalidParameters(e.to_string()))?
        };

        let mut filters = Metadata::new();
        if !params.tags.is_empty() {
            filters.insert("tags".to_string(), serde_json::json!(params.tags));
        }
        let results = self
            .memory
            .search(
                Some(&ctx.user_id),
                params.query.as_deref(),
                params.limit,
                Some(&filters),
            )
            .await?;

        let memories: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "text": r.record.content,
                    "tags": r.record.tags,
                    "score": r.score,
                })
            })
            .collect();
        Ok(ToolResult::success_json(serde_json::json!({ "memories": memories })))
    }

    fn validate(&self, params: &serde_json::Value) -> Result<(), ToolError> {
        if params.is_null() || params.is_object() {
            Ok(())
        } else {
            Err(ToolError::ValidationFailed(
                "Parameters must be an object".to_string(),
            ))
        }
    }
}
