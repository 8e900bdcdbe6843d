//! Runtime errors.

use thiserror::Error;

use agentflow_protocols::error::ModelError;

/// Error that ends a node's execution.
///
/// Delivered as the last item of the failing node's [`EventStream`]
/// and forwarded unchanged by every enclosing composite.
///
/// [`EventStream`]: crate::streaming::EventStream
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Model call failed in node '{node}': {source}")]
    Model {
        node: String,
        #[source]
        source: ModelError,
    },

    #[error("Node '{node}' exceeded {limit} tool rounds")]
    ToolRoundsExceeded { node: String, limit: u32 },

    #[error("Event stream closed by consumer")]
    StreamClosed,
}

impl RuntimeError {
    pub fn model(node: impl Into<String>, source: ModelError) -> Self {
        Self::Model {
            node: node.into(),
            source,
        }
    }

    /// Name of the node the error originated in, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Model { node, .. } | Self::ToolRoundsExceeded { node, .. } => Some(node),
            Self::StreamClosed => None,
        }
    }
}
