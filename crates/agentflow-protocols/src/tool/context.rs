//! Tool execution context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::types::{Metadata, SessionState};

/// Context handed to a tool for one function call.
///
/// State writes made through [`ToolContext::set_state`] go straight to the
/// shared session state and are also recorded so the leaf can report them
/// in the function-response event's state delta.
#[derive(Clone)]
pub struct ToolContext {
    /// Run the call belongs to.
    pub invocation_id: String,

    /// ID of the function call being answered.
    pub function_call_id: String,

    /// Name of the leaf node executing the tool.
    pub node_name: String,

    pub session_id: String,

    pub user_id: String,

    state: SessionState,
    delta: Arc<Mutex<Metadata>>,
    escalated: Arc<AtomicBool>,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(
        invocation_id: impl Into<String>,
        function_call_id: impl Into<String>,
        node_name: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        state: SessionState,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            function_call_id: function_call_id.into(),
            node_name: node_name.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            state,
            delta: Arc::new(Mutex::new(Metadata::new())),
            escalated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read a session state value.
    pub fn get_state(&self, key: &str) -> Option<serde_json::Value> {
        self.state.get(key)
    }

    /// Write a session state value and record it in the delta.
    pub fn set_state(&self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        self.state.set(key.clone(), value.clone());
        self.delta.lock().insert(key, value);
    }

    /// State keys written through this context so far.
    pub fn state_delta(&self) -> Metadata {
        self.delta.lock().clone()
    }

    /// Ask the enclosing loop to stop after the current pass.
    pub fn escalate(&self) {
        self.escalated.store(true, Ordering::SeqCst);
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("invocation_id", &self.invocation_id)
            .field("function_call_id", &self.function_call_id)
            .field("node_name", &self.node_name)
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("escalated", &self.is_escalated())
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
