//! Resolution of node configurations into executable nodes.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use agentflow_core::ToolRegistry;
use agentflow_protocols::model::GenerationConfig;
use agentflow_protocols::tool::Tool;
use agentflow_runtime::{LeafNode, LoopNode, ParallelNode, SequentialNode, TaskNode};

use crate::definition::{LeafConfig, TaskNodeConfig, WorkflowDefinition};
use crate::error::WorkflowError;

/// Model settings applied to leaves that do not set their own.
#[derive(Debug, Clone)]
pub struct ModelDefaults {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// Builds [`TaskNode`] trees from one workflow definition.
///
/// Every resolved node is cached by name, so a node referenced from
/// several composites is built once and shared. The cache lives as long as
/// the factory.
pub struct NodeFactory {
    definition: Arc<WorkflowDefinition>,
    tools: Arc<ToolRegistry>,
    defaults: ModelDefaults,
    cache: DashMap<String, Arc<TaskNode>>,
}

impl NodeFactory {
    pub fn new(definition: Arc<WorkflowDefinition>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            definition,
            tools,
            defaults: ModelDefaults::default(),
            cache: DashMap::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: ModelDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn definition(&self) -> &Arc<WorkflowDefinition> {
        &self.definition
    }

    /// Resolve the declared node called `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<TaskNode>, WorkflowError> {
        let config = self
            .definition
            .node(name)
            .ok_or_else(|| WorkflowError::UnknownNode {
                node: self.definition.name.clone(),
                reference: name.to_string(),
            })?;
        self.resolve_config(config)
    }

    /// Resolve a node configuration, binding its tools and children.
    ///
    /// Children are looked up among the definition's nodes. If a node with
    /// the same name was already resolved, that instance is returned.
    pub fn resolve_config(&self, config: &TaskNodeConfig) -> Result<Arc<TaskNode>, WorkflowError> {
        let mut path = Vec::new();
        self.resolve_inner(config, &mut path)
    }

    /// Resolve the workflow's entry point.
    pub fn resolve_entry(&self) -> Result<Arc<TaskNode>, WorkflowError> {
        if self.definition.entry_point.is_empty() {
            return Err(WorkflowError::configuration(format!(
                "workflow '{}': entry point must be set",
                self.definition.name
            )));
        }
        self.resolve(&self.definition.entry_point)
    }

    /// Resolve every declared node, in declaration order.
    ///
    /// Surfaces bad tool or node references anywhere in the definition,
    /// including nodes the entry point does not reach.
    pub fn resolve_all(&self) -> Result<Vec<Arc<TaskNode>>, WorkflowError> {
        self.definition
            .nodes
            .iter()
            .map(|config| self.resolve_config(config))
            .collect()
    }

    /// Number of nodes resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn resolve_inner(
        &self,
        config: &TaskNodeConfig,
        path: &mut Vec<String>,
    ) -> Result<Arc<TaskNode>, WorkflowError> {
        let name = config.name();
        if let Some(node) = self.cache.get(name) {
            return Ok(Arc::clone(node.value()));
        }

        if path.iter().any(|n| n == name) {
            path.push(name.to_string());
            return Err(WorkflowError::configuration(format!(
                "workflow '{}': cycle detected: {}",
                self.definition.name,
                path.join(" -> ")
            )));
        }

        path.push(name.to_string());
        let node = match config {
            TaskNodeConfig::Leaf(leaf) => TaskNode::Leaf(self.build_leaf(leaf)?),
            TaskNodeConfig::Sequential(_) => {
                TaskNode::Sequential(SequentialNode::new(name, self.resolve_children(config, path)?))
            }
            TaskNodeConfig::Parallel(_) => {
                TaskNode::Parallel(ParallelNode::new(name, self.resolve_children(config, path)?))
            }
            TaskNodeConfig::Loop(c) => TaskNode::Loop(LoopNode::new(
                name,
                self.resolve_children(config, path)?,
                c.max_iterations,
            )),
        };
        path.pop();

        debug!(node = %name, kind = %node.kind(), "Resolved node");
        let node = self
            .cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(node));
        Ok(Arc::clone(node.value()))
    }

    fn resolve_children(
        &self,
        config: &TaskNodeConfig,
        path: &mut Vec<String>,
    ) -> Result<Vec<Arc<TaskNode>>, WorkflowError> {
        config
            .children()
            .iter()
            .map(|child| {
                let child_config =
                    self.definition
                        .node(child)
                        .ok_or_else(|| WorkflowError::UnknownNode {
                            node: config.name().to_string(),
                            reference: child.clone(),
                        })?;
                self.resolve_inner(child_config, path)
            })
            .collect()
    }

    fn build_leaf(&self, config: &LeafConfig) -> Result<LeafNode, WorkflowError> {
        let tools = config
            .tools
            .iter()
            .map(|tool| {
                self.tools.get(tool).ok_or_else(|| WorkflowError::UnknownTool {
                    node: config.name.clone(),
                    tool: tool.clone(),
                })
            })
            .collect::<Result<Vec<Arc<dyn Tool>>, _>>()?;

        let model = config
            .model
            .clone()
            .unwrap_or_else(|| self.defaults.model.clone());
        let generation = GenerationConfig {
            temperature: config.temperature.or(self.defaults.temperature),
            max_output_tokens: config.max_output_tokens.or(self.defaults.max_output_tokens),
        };

        let mut leaf = LeafNode::new(&config.name, model, &config.instruction)
            .with_tools(tools)
            .with_history_policy(config.history_policy)
            .with_generation(generation);
        if let Some(description) = &config.description {
            leaf = leaf.with_description(description);
        }
        if let Some(key) = &config.output_key {
            leaf = leaf.with_output_key(key);
        }
        Ok(leaf)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
