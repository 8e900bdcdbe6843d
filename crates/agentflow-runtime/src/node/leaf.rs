//! Leaf node: one model-driven turn, with tool calls.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use agentflow_protocols::error::ToolError;
use agentflow_protocols::model::{GenerationConfig, HistoryPolicy, ModelRequest};
use agentflow_protocols::tool::{Tool, ToolContext, ToolDefinition};
use agentflow_protocols::types::{Content, Event, Metadata, Part, Role, ToolCall, ToolResponse};

use crate::context::InvocationContext;
use crate::error::RuntimeError;
use crate::streaming::{EventSender, TurnAccumulator};
use crate::template::render_instruction;

/// A node that drives the model for one logical turn.
///
/// Partial model output is forwarded as it arrives. When the model asks
/// for tools, the call, each tool response and the follow-up model output
/// are emitted as separate events; the turn ends with exactly one
/// `is_final` event. If `output_key` is set, the final text is written to
/// session state before that event is forwarded.
pub struct LeafNode {
    pub name: String,
    pub description: String,
    pub model: String,
    pub instruction: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub output_key: Option<String>,
    pub history_policy: HistoryPolicy,
    pub generation: GenerationConfig,
}

impl LeafNode {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model: model.into(),
            instruction: instruction.into(),
            tools: Vec::new(),
            output_key: None,
            history_policy: HistoryPolicy::default(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
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

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    pub(crate) async fn run(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
    ) -> Result<(), RuntimeError> {
        let instruction = render_instruction(&self.instruction, ctx.session.state());
        let history = match self.history_policy {
            HistoryPolicy::Default => ctx.session.history(&ctx.invocation_id),
            HistoryPolicy::None => Vec::new(),
        };
        let tools = self.tool_definitions();

        let mut turn: Vec<Content> = Vec::new();
        let mut escalate = false;
        let mut rounds = 0;

        loop {
            let request = ModelRequest::new(
                &self.name,
                &self.model,
                instruction.clone(),
                ctx.user_content.clone(),
            )
            .with_tools(tools.clone())
            .with_history(history.clone())
            .with_turn(turn.clone())
            .with_generation(self.generation.clone());

            let content = self.model_turn(ctx, out, request).await?;

            if !content.has_function_calls() {
                return self.finish(ctx, out, content, escalate).await;
            }

            rounds += 1;
            if rounds > ctx.config.max_tool_rounds {
                return Err(RuntimeError::ToolRoundsExceeded {
                    node: self.name.clone(),
                    limit: ctx.config.max_tool_rounds,
                });
            }

            let calls: Vec<ToolCall> = content.function_calls().into_iter().cloned().collect();
            self.emit(ctx, out, Event::new(&ctx.invocation_id, &self.name, Some(content.clone())))
                .await?;
            turn.push(content);

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let (response, delta, escalated) = self.call_tool(ctx, call).await;
                let mut event = Event::new(
                    &ctx.invocation_id,
                    &self.name,
                    Some(Content::new(Role::Tool, vec![Part::FunctionResponse(response.clone())])),
                );
                event.state_delta = delta;
                if escalated {
                    escalate = true;
                    event = event.with_escalate(true);
                }
                self.emit(ctx, out, event).await?;
                responses.push(Part::FunctionResponse(response));
            }
            turn.push(Content::new(Role::Tool, responses));
        }
    }

    /// Stream one model call, forwarding partials, and return the turn's
    /// complete content.
    async fn model_turn(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
        request: ModelRequest,
    ) -> Result<Content, RuntimeError> {
        let mut stream = ctx
            .model
            .invoke(request)
            .await
            .map_err(|e| RuntimeError::model(&self.name, e))?;
        let mut accumulator = TurnAccumulator::new();

        while let Some(output) = stream.next().await {
            let output = output.map_err(|e| RuntimeError::model(&self.name, e))?;
            if output.partial {
                accumulator.push_partial(&output.content.text());
                let event = Event::new(&ctx.invocation_id, &self.name, Some(output.content))
                    .with_partial(true);
                out.send(event).await?;
            } else {
                return Ok(accumulator.complete(output.content));
            }
        }

        match accumulator.finish() {
            Some(text) => {
                warn!(node = %self.name, "Model stream ended without a complete output, using streamed text");
                Ok(Content::model(text))
            }
            None => Ok(Content::new(Role::Model, Vec::new())),
        }
    }

    async fn finish(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
        content: Content,
        escalate: bool,
    ) -> Result<(), RuntimeError> {
        let text = content.text();
        let mut event = Event::new(&ctx.invocation_id, &self.name, Some(content)).with_final(true);

        if let Some(key) = &self.output_key {
            ctx.session.state().set(key.clone(), Value::String(text.clone()));
            event = event.with_state_delta(key.clone(), Value::String(text));
            debug!(node = %self.name, key = %key, "Stored output in session state");
        }
        if escalate {
            event = event.with_escalate(true);
        }

        self.emit(ctx, out, event).await
    }

    /// Log a completed event to the session and forward it.
    async fn emit(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
        event: Event,
    ) -> Result<(), RuntimeError> {
        ctx.session.append_event(event.clone());
        out.send(event).await
    }

    /// Execute one tool call. Failures become error responses.
    async fn call_tool(
        &self,
        ctx: &InvocationContext,
        call: &ToolCall,
    ) -> (ToolResponse, Metadata, bool) {
        let tool_ctx = ToolContext::new(
            &ctx.invocation_id,
            &call.id,
            &self.name,
            ctx.session.id(),
            ctx.session.user_id(),
            ctx.session.state().clone(),
        );

        let result = match self.find_tool(&call.name) {
            None => Err(ToolError::NotFound(call.name.clone())),
            Some(tool) => match tool.validate(&call.args) {
                Ok(()) => tool.execute(call.args.clone(), tool_ctx.clone()).await,
                Err(e) => Err(e),
            },
        };

        let (response, is_error) = match result {
            Ok(result) => (result.response_value(), !result.success),
            Err(e) => {
                warn!(node = %self.name, tool = %call.name, error = %e, "Tool call failed");
                (serde_json::json!({ "error": e.to_string() }), true)
            }
        };
        debug!(node = %self.name, tool = %call.name, is_error, "Tool call finished");

        (
            ToolResponse {
                id: call.id.clone(),
                name: call.name.clone(),
                response,
                is_error,
            },
            tool_ctx.state_delta(),
            tool_ctx.is_escalated(),
        )
    }
}

impl fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<_> = self.tools.iter().map(|t| t.definition().name.as_str()).collect();
        f.debug_struct("LeafNode")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &tools)
            .field("output_key", &self.output_key)
            .field("history_policy", &self.history_policy)
            .finish()
    }
}
