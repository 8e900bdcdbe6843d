//! Workflow errors.

use thiserror::Error;

use agentflow_protocols::error::RegistryError;
use agentflow_runtime::{RuntimeError, SessionError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The workflow definition is malformed.
    #[error("Invalid workflow configuration: {0}")]
    Configuration(String),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Unknown node '{reference}' referenced by '{node}'")]
    UnknownNode { node: String, reference: String },

    #[error("Node '{node}' references unknown tool '{tool}'")]
    UnknownTool { node: String, tool: String },

    #[error(transparent)]
    SessionUnavailable(#[from] SessionError),

    #[error("Workflow run failed: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to parse workflow file: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the error describes a bad definition rather than a failed run.
    ///
    /// These are raised before any node starts executing.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnknownNode { .. } | Self::UnknownTool { .. }
        )
    }
}

impl From<toml::de::Error> for WorkflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
