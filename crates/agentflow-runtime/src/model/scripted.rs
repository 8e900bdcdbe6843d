//! Deterministic model driven by per-node scripts.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;

use agentflow_protocols::error::ModelError;
use agentflow_protocols::model::{ModelInvoker, ModelOutput, ModelRequest, ModelStream};
use agentflow_protocols::types::{Content, Part, Role, ToolCall};

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Stream each chunk as a partial output, then the joined text as the
    /// complete output.
    Text(Vec<String>),
    /// Ask for one tool call.
    Call { name: String, args: serde_json::Value },
    /// Fail the invocation.
    Fail(ModelError),
}

impl ScriptedTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(vec![text.into()])
    }

    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Text(chunks.into_iter().map(Into::into).collect())
    }

    pub fn call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }
}

/// A [`ModelInvoker`] that replays scripted turns per node.
///
/// Each invocation by a node consumes the next turn of that node's script;
/// the last turn repeats once the script runs out. Nodes without a script
/// echo the input back. Every request is recorded.
pub struct ScriptedModel {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedTurn>>>,
    latency: HashMap<String, Duration>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            latency: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a turn to `node`'s script.
    pub fn with_turn(self, node: impl Into<String>, turn: ScriptedTurn) -> Self {
        self.scripts
            .lock()
            .entry(node.into())
            .or_default()
            .push_back(turn);
        self
    }

    /// Append a single-chunk text turn.
    pub fn with_reply(self, node: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_turn(node, ScriptedTurn::text(text))
    }

    /// Delay before each output `node` produces.
    pub fn with_latency(mut self, node: impl Into<String>, latency: Duration) -> Self {
        self.latency.insert(node.into(), latency);
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, node: &str) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.node == node)
            .cloned()
            .collect()
    }

    fn next_turn(&self, request: &ModelRequest) -> ScriptedTurn {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(&request.node) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap_or_else(|| echo(request)),
            Some(script) => script.front().cloned().unwrap_or_else(|| echo(request)),
            None => echo(request),
        }
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

fn echo(request: &ModelRequest) -> ScriptedTurn {
    ScriptedTurn::text(format!("[{}] {}", request.node, request.input.text()))
}

#[async_trait]
impl ModelInvoker for ScriptedModel {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        let turn = self.next_turn(&request);
        let latency = self.latency.get(&request.node).copied();
        self.requests.lock().push(request);

        let outputs: Vec<ModelOutput> = match turn {
            ScriptedTurn::Fail(error) => return Err(error),
            ScriptedTurn::Text(chunks) => {
                let full: String = chunks.concat();
                let mut outputs: Vec<_> = if chunks.len() > 1 {
                    chunks.into_iter().map(ModelOutput::partial).collect()
                } else {
                    Vec::new()
                };
                outputs.push(ModelOutput::complete(Content::model(full)));
                outputs
            }
            ScriptedTurn::Call { name, args } => vec![ModelOutput::complete(Content::new(
                Role::Model,
                vec![Part::FunctionCall(ToolCall::new(name, args))],
            ))],
        };

        let stream = futures::stream::iter(outputs).then(move |output| async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            Ok::<_, ModelError>(output)
        });
        Ok(Box::pin(stream))
    }
}
