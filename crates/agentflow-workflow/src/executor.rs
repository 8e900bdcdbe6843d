//! Running a resolved node tree against a session.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use agentflow_protocols::model::ModelInvoker;
use agentflow_protocols::types::{Content, Event, USER_AUTHOR};
use agentflow_runtime::{EventStream, ExecutionConfig, InvocationContext, Session, TaskNode};

use crate::error::WorkflowError;

/// Result of a run that was consumed to the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Text of the last complete final event, if any.
    pub final_output: Option<String>,
    /// Session state after the run.
    pub session_state: HashMap<String, serde_json::Value>,
    pub session_id: String,
    pub user_id: String,
    /// Every event the run emitted, partials included.
    pub events: Vec<Event>,
}

/// A run in progress.
pub struct WorkflowRun {
    pub session: Arc<Session>,
    pub invocation_id: String,
    /// Events as they are produced. A failure is the last item.
    pub events: EventStream,
}

impl WorkflowRun {
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }
}

/// Starts node trees and drives them to completion.
///
/// Does not retry anything itself; retries belong to the model and memory
/// adapters that make external calls.
#[derive(Clone)]
pub struct WorkflowExecutor {
    model: Arc<dyn ModelInvoker>,
    config: ExecutionConfig,
}

impl WorkflowExecutor {
    pub fn new(model: Arc<dyn ModelInvoker>) -> Self {
        Self {
            model,
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Start `root` on `input` and return its live event stream.
    ///
    /// The input is logged to the session as a `user` event before the
    /// root starts. Must be called from within a tokio runtime.
    pub fn start(&self, root: &Arc<TaskNode>, session: Arc<Session>, input: &str) -> WorkflowRun {
        let user_content = Content::user(input);
        let ctx = InvocationContext::new(
            Arc::clone(&session),
            user_content.clone(),
            Arc::clone(&self.model),
        )
        .with_config(self.config.clone());
        let invocation_id = ctx.invocation_id.clone();

        session.append_event(Event::new(&invocation_id, USER_AUTHOR, Some(user_content)));
        info!(
            root = %root.name(),
            session = %session.key(),
            invocation = %invocation_id,
            "Starting run"
        );

        WorkflowRun {
            events: root.execute(ctx),
            session,
            invocation_id,
        }
    }

    /// Run `root` on `input` and collect everything it emits.
    ///
    /// Fails with the first error the tree reports; events emitted before
    /// it are discarded along with the outcome.
    pub async fn run(
        &self,
        root: &Arc<TaskNode>,
        session: Arc<Session>,
        input: &str,
    ) -> Result<RunOutcome, WorkflowError> {
        let run = self.start(root, session, input);
        collect(run).await
    }
}

/// Drain a run into a [`RunOutcome`].
pub async fn collect(mut run: WorkflowRun) -> Result<RunOutcome, WorkflowError> {
    let mut events = Vec::new();
    let mut final_output = None;

    while let Some(item) = run.events.next().await {
        match item {
            Ok(event) => {
                if event.is_final_response() && event.content.is_some() {
                    final_output = Some(event.text());
                }
                events.push(event);
            }
            Err(e) => {
                warn!(
                    invocation = %run.invocation_id,
                    node = e.node().unwrap_or("-"),
                    events = events.len(),
                    error = %e,
                    "Run failed"
                );
                return Err(e.into());
            }
        }
    }

    info!(
        invocation = %run.invocation_id,
        events = events.len(),
        "Run finished"
    );

    Ok(RunOutcome {
        final_output,
        session_state: run.session.state().snapshot(),
        session_id: run.session.id().to_string(),
        user_id: run.session.user_id().to_string(),
        events,
    })
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
