//! Events emitted by running task nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Metadata;
use super::content::{Content, ToolCall, ToolResponse};

/// One unit of output from a running node.
///
/// Events are created by the node that emits them and are never mutated
/// by the engine afterwards. A logical turn is zero or more `partial`
/// events followed by exactly one event with `is_final` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    /// Run this event belongs to.
    pub invocation_id: String,
    /// Name of the node that emitted the event.
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// More content for this logical turn follows.
    #[serde(default)]
    pub partial: bool,
    /// Last event of a logical turn.
    #[serde(default)]
    pub is_final: bool,
    /// Session state keys this event wrote.
    #[serde(default)]
    pub state_delta: Metadata,
    /// Request to terminate the enclosing loop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalate: Option<bool>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a complete, non-final event.
    pub fn new(
        invocation_id: impl Into<String>,
        author: impl Into<String>,
        content: Option<Content>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invocation_id: invocation_id.into(),
            author: author.into(),
            content,
            partial: false,
            is_final: false,
            state_delta: Metadata::new(),
            escalate: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn with_state_delta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state_delta.insert(key.into(), value);
        self
    }

    pub fn with_escalate(mut self, escalate: bool) -> Self {
        self.escalate = Some(escalate);
        self
    }

    /// Concatenated text of the content, empty when there is none.
    pub fn text(&self) -> String {
        self.content.as_ref().map(|c| c.text()).unwrap_or_default()
    }

    pub fn function_calls(&self) -> Vec<&ToolCall> {
        self.content
            .as_ref()
            .map(|c| c.function_calls())
            .unwrap_or_default()
    }

    pub fn function_responses(&self) -> Vec<&ToolResponse> {
        self.content
            .as_ref()
            .map(|c| c.function_responses())
            .unwrap_or_default()
    }

    /// Whether this event closes a logical turn.
    pub fn is_final_response(&self) -> bool {
        self.is_final && !self.partial
    }

    pub fn escalates(&self) -> bool {
        self.escalate.unwrap_or(false)
    }
}
