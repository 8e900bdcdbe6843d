//! Orchestrator facade.
//!
//! Owns the tool registry, the workflow registry and the session manager,
//! and runs registered workflows by name.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use agentflow_core::ToolRegistry;
use agentflow_protocols::model::ModelInvoker;
use agentflow_protocols::tool::Tool;
use agentflow_runtime::{ExecutionConfig, NodeKind, SessionManager, TaskNode};

use crate::builder::WorkflowBuilder;
use crate::definition::WorkflowDefinition;
use crate::error::WorkflowError;
use crate::executor::{self, RunOutcome, WorkflowExecutor, WorkflowRun};
use crate::factory::{ModelDefaults, NodeFactory};
use crate::registry::WorkflowRegistry;

/// Name and kind of one node, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

fn serialize_kind<S: serde::Serializer>(kind: &NodeKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

/// Summary of a registered workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub description: Option<String>,
    pub entry_point: String,
    pub nodes: Vec<NodeSummary>,
}

impl From<&WorkflowDefinition> for WorkflowInfo {
    fn from(definition: &WorkflowDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            entry_point: definition.entry_point.clone(),
            nodes: definition
                .nodes
                .iter()
                .map(|n| NodeSummary {
                    name: n.name().to_string(),
                    kind: n.kind(),
                    children: n.children().to_vec(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for WorkflowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Workflow: {}", self.name)?;
        if let Some(description) = &self.description {
            writeln!(f, "  {}", description)?;
        }
        writeln!(f, "Entry point: {}", self.entry_point)?;
        writeln!(f, "Nodes:")?;
        for node in &self.nodes {
            write!(f, "  - {} ({})", node.name, node.kind)?;
            if !node.children.is_empty() {
                write!(f, " -> {}", node.children.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Entry point for registering tools and workflows and running them.
pub struct Orchestrator {
    app_name: String,
    tools: Arc<ToolRegistry>,
    workflows: WorkflowRegistry,
    sessions: Arc<SessionManager>,
    executor: WorkflowExecutor,
    defaults: ModelDefaults,
}

impl Orchestrator {
    /// Create an orchestrator with in-memory sessions.
    pub fn new(app_name: impl Into<String>, model: Arc<dyn ModelInvoker>) -> Self {
        let defaults = ModelDefaults {
            model: model.id().to_string(),
            ..ModelDefaults::default()
        };
        Self {
            app_name: app_name.into(),
            tools: Arc::new(ToolRegistry::new()),
            workflows: WorkflowRegistry::new(),
            sessions: Arc::new(SessionManager::in_memory()),
            executor: WorkflowExecutor::new(model),
            defaults,
        }
    }

    pub fn with_session_manager(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_execution_config(mut self, config: ExecutionConfig) -> Self {
        self.executor = self.executor.with_config(config);
        self
    }

    pub fn with_model_defaults(mut self, defaults: ModelDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Register a tool under its definition name. Names are unique.
    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), WorkflowError> {
        let name = tool.definition().name.clone();
        self.tools.register(tool)?;
        info!(tool = %name, "Registered tool");
        Ok(())
    }

    /// Start a builder for a new workflow.
    pub fn workflow_builder(&self, name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Validate and store a workflow, replacing any with the same name.
    pub fn register_workflow(&self, definition: WorkflowDefinition) -> Result<(), WorkflowError> {
        definition.validate()?;
        let name = definition.name.clone();
        let nodes = definition.nodes.len();
        self.workflows.register(definition);
        info!(workflow = %name, nodes, "Registered workflow");
        Ok(())
    }

    pub fn get_workflow(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(name)
    }

    pub fn workflow_exists(&self, name: &str) -> bool {
        self.workflows.exists(name)
    }

    pub fn list_workflows(&self) -> Vec<String> {
        self.workflows.list()
    }

    pub fn deregister_workflow(&self, name: &str) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        let removed = self
            .workflows
            .deregister(name)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))?;
        info!(workflow = %name, "Deregistered workflow");
        Ok(removed)
    }

    pub fn describe_workflow(&self, name: &str) -> Result<WorkflowInfo, WorkflowError> {
        let definition = self.require(name)?;
        Ok(WorkflowInfo::from(definition.as_ref()))
    }

    /// Resolve a registered workflow into its executable root node.
    ///
    /// Every declared node is resolved, so a bad tool or node reference
    /// fails here even if the entry point never reaches it.
    pub fn resolve_workflow(&self, name: &str) -> Result<Arc<TaskNode>, WorkflowError> {
        let definition = self.require(name)?;
        let factory = NodeFactory::new(definition, Arc::clone(&self.tools))
            .with_defaults(self.defaults.clone());
        factory.resolve_all()?;
        let root = factory.resolve_entry()?;
        debug!(workflow = %name, nodes = factory.cached(), "Resolved workflow");
        Ok(root)
    }

    /// Start a workflow and return its live event stream.
    ///
    /// Resolution and session errors are reported before anything runs.
    pub async fn stream_workflow(
        &self,
        name: &str,
        input: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<WorkflowRun, WorkflowError> {
        let root = self.resolve_workflow(name)?;
        let session = self
            .sessions
            .get_or_create(&self.app_name, user_id, session_id)
            .await?;

        info!(workflow = %name, user = %user_id, session = %session.id(), "Running workflow");
        Ok(self.executor.start(&root, session, input))
    }

    /// Run a workflow to completion.
    pub async fn run_workflow(
        &self,
        name: &str,
        input: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<RunOutcome, WorkflowError> {
        let run = self
            .stream_workflow(name, input, user_id, session_id)
            .await?;
        executor::collect(run).await
    }

    fn require(&self, name: &str) -> Result<Arc<WorkflowDefinition>, WorkflowError> {
        self.workflows
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
