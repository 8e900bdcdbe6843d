//! Fluent workflow builder.

use agentflow_runtime::NodeKind;
use tracing::debug;

use crate::definition::{LeafConfig, TaskNodeConfig, WorkflowDefinition};
use crate::error::WorkflowError;

/// Accumulates node configurations and produces a validated
/// [`WorkflowDefinition`].
///
/// Nodes may be added in any order; child references are only checked by
/// [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    name: String,
    description: Option<String>,
    nodes: Vec<TaskNodeConfig>,
    entry_point: Option<String>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            entry_point: None,
        }
    }

    /// Set the workflow description.
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a model-driven leaf node.
    pub fn add_leaf(self, config: LeafConfig) -> Self {
        self.add_node(TaskNodeConfig::Leaf(config))
    }

    /// Add a node running `children` one after another.
    pub fn add_sequential<I, S>(self, name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_node(TaskNodeConfig::sequential(name, children))
    }

    /// Add a node running `children` concurrently.
    pub fn add_parallel<I, S>(self, name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_node(TaskNodeConfig::parallel(name, children))
    }

    /// Add a node repeating `children` up to `max_iterations` passes.
    pub fn add_loop<I, S>(self, name: impl Into<String>, children: I, max_iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_node(TaskNodeConfig::repeat(name, children, max_iterations))
    }

    /// Add an already assembled node configuration.
    pub fn add_node(mut self, config: TaskNodeConfig) -> Self {
        self.nodes.push(config);
        self
    }

    /// Set the node a run starts from.
    pub fn set_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build and validate the definition.
    pub fn build(self) -> Result<WorkflowDefinition, WorkflowError> {
        let Some(entry_point) = self.entry_point else {
            return Err(WorkflowError::configuration(format!(
                "workflow '{}': entry point must be set",
                self.name
            )));
        };

        if !self.nodes.iter().any(|n| n.name() == entry_point) {
            return Err(WorkflowError::configuration(format!(
                "workflow '{}': entry point '{}' not found among added nodes",
                self.name, entry_point
            )));
        }

        let definition = WorkflowDefinition {
            name: self.name,
            description: self.description,
            entry_point,
            nodes: self.nodes,
        };
        definition.validate()?;

        debug!(
            workflow = %definition.name,
            nodes = definition.nodes.len(),
            entry = %definition.entry_point,
            leaves = definition.nodes.iter().filter(|n| n.kind() == NodeKind::Leaf).count(),
            "Built workflow"
        );
        Ok(definition)
    }
}
