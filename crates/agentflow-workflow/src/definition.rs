//! Workflow definition types.
//!
//! A workflow is a flat, ordered list of named node configurations. Composite
//! nodes refer to their children by name, so the tree is formed by
//! references rather than nesting. In TOML every node is one `[[nodes]]`
//! table tagged with `type`:
//!
//! ```toml
//! name = "review"
//! entry_point = "pipeline"
//!
//! [[nodes]]
//! type = "leaf"
//! name = "writer"
//! instruction = "Write a draft about {topic}"
//! output_key = "draft"
//!
//! [[nodes]]
//! type = "sequential"
//! name = "pipeline"
//! children = ["writer"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use agentflow_protocols::model::HistoryPolicy;
use agentflow_runtime::NodeKind;

use crate::error::WorkflowError;
use crate::validation::validate_definition;

/// Default pass bound of a loop node.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// Configuration of one node, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskNodeConfig {
    #[serde(alias = "llm", alias = "model")]
    Leaf(LeafConfig),
    Sequential(CompositeConfig),
    Parallel(CompositeConfig),
    Loop(LoopConfig),
}

impl TaskNodeConfig {
    pub fn sequential<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TaskNodeConfig::Sequential(CompositeConfig::new(name, children))
    }

    pub fn parallel<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TaskNodeConfig::Parallel(CompositeConfig::new(name, children))
    }

    pub fn repeat<I, S>(name: impl Into<String>, children: I, max_iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TaskNodeConfig::Loop(LoopConfig::new(name, children, max_iterations))
    }

    pub fn name(&self) -> &str {
        match self {
            TaskNodeConfig::Leaf(c) => &c.name,
            TaskNodeConfig::Sequential(c) | TaskNodeConfig::Parallel(c) => &c.name,
            TaskNodeConfig::Loop(c) => &c.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TaskNodeConfig::Leaf(_) => NodeKind::Leaf,
            TaskNodeConfig::Sequential(_) => NodeKind::Sequential,
            TaskNodeConfig::Parallel(_) => NodeKind::Parallel,
            TaskNodeConfig::Loop(_) => NodeKind::Loop,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TaskNodeConfig::Leaf(c) => c.description.as_deref(),
            TaskNodeConfig::Sequential(c) | TaskNodeConfig::Parallel(c) => c.description.as_deref(),
            TaskNodeConfig::Loop(c) => c.description.as_deref(),
        }
    }

    /// Names of the direct children, empty for a leaf.
    pub fn children(&self) -> &[String] {
        match self {
            TaskNodeConfig::Leaf(_) => &[],
            TaskNodeConfig::Sequential(c) | TaskNodeConfig::Parallel(c) => &c.children,
            TaskNodeConfig::Loop(c) => &c.children,
        }
    }

    /// State key this node itself writes, if any.
    pub fn output_key(&self) -> Option<&str> {
        match self {
            TaskNodeConfig::Leaf(c) => c.output_key.as_deref(),
            _ => None,
        }
    }
}

impl From<LeafConfig> for TaskNodeConfig {
    fn from(config: LeafConfig) -> Self {
        TaskNodeConfig::Leaf(config)
    }
}

/// A model-driven node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Model id; the orchestrator's default model when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Instruction template; `{key}` is replaced with session state.
    pub instruction: String,
    /// Names of registered tools, in order.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Session state key that receives the final output text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(default)]
    pub history_policy: HistoryPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl LeafConfig {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: instruction.into(),
            tools: Vec::new(),
            output_key: None,
            history_policy: HistoryPolicy::default(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.history_policy = policy;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

/// A sequential or parallel node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl CompositeConfig {
    pub fn new<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl LoopConfig {
    pub fn new<I, S>(name: impl Into<String>, children: I, max_iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            children: children.into_iter().map(Into::into).collect(),
            max_iterations,
        }
    }
}

/// A complete, named workflow.
///
/// Built with [`WorkflowBuilder`](crate::WorkflowBuilder) or loaded from a
/// file; both paths validate before handing the definition out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the node a run starts from. Empty means unset.
    #[serde(default)]
    pub entry_point: String,
    #[serde(default)]
    pub nodes: Vec<TaskNodeConfig>,
}

impl WorkflowDefinition {
    /// Parse and validate a TOML definition.
    pub fn from_toml_str(content: &str) -> Result<Self, WorkflowError> {
        let definition: Self = toml::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parse and validate a JSON definition.
    pub fn from_json_str(content: &str) -> Result<Self, WorkflowError> {
        let definition: Self = serde_json::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Load a definition file. `.json` files are read as JSON, everything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn to_toml_string(&self) -> Result<String, WorkflowError> {
        toml::to_string_pretty(self).map_err(|e| WorkflowError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        validate_definition(self)
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&TaskNodeConfig> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    /// Node names in declaration order.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(TaskNodeConfig::name).collect()
    }

    pub fn entry_node(&self) -> Option<&TaskNodeConfig> {
        self.node(&self.entry_point)
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
