//! Per-run execution context.

use std::sync::Arc;

use agentflow_protocols::model::ModelInvoker;
use agentflow_protocols::types::Content;

use crate::session::Session;

/// Engine limits applied to every node of a run.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Buffer size of each node's event channel.
    pub channel_capacity: usize,
    /// Model/tool round trips one leaf may make in a single turn.
    pub max_tool_rounds: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_tool_rounds: 8,
        }
    }
}

/// Everything a node needs to execute within one run.
///
/// Cheap to clone; clones share the session and the model.
#[derive(Clone)]
pub struct InvocationContext {
    pub invocation_id: String,
    pub session: Arc<Session>,
    /// The caller's input message for this run.
    pub user_content: Content,
    pub model: Arc<dyn ModelInvoker>,
    pub config: ExecutionConfig,
}

impl InvocationContext {
    /// Create a context with a fresh invocation ID.
    pub fn new(session: Arc<Session>, user_content: Content, model: Arc<dyn ModelInvoker>) -> Self {
        Self {
            invocation_id: format!("inv-{}", uuid::Uuid::new_v4()),
            session,
            user_content,
            model,
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invocation_id", &self.invocation_id)
            .field("session", self.session.key())
            .field("model", &self.model.id())
            .field("config", &self.config)
            .finish()
    }
}
