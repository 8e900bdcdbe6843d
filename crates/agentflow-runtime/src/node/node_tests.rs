use super::*;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Barrier;

use agentflow_protocols::error::{ModelError, ToolError};
use agentflow_protocols::model::{HistoryPolicy, ModelInvoker, ModelOutput, ModelRequest, ModelStream};
use agentflow_protocols::tool::{Tool, ToolContext, ToolDefinition, ToolResult};
use agentflow_protocols::types::{Content, Event, USER_AUTHOR};

use crate::model::{ScriptedModel, ScriptedTurn};
use crate::session::{Session, SessionKey};

struct ExitLoopTool(ToolDefinition);

impl ExitLoopTool {
    fn new() -> Arc<dyn Tool> {
        Arc::new(Self(ToolDefinition::new("exit_loop", "Stop the loop")))
    }
}

#[async_trait]
impl Tool for ExitLoopTool {
    fn definition(&self) -> &ToolDefinition {
        &self.0
    }

    async fn execute(&self, _args: serde_json::Value, ctx: ToolContext) -> Result<ToolResult, ToolError> {
        ctx.escalate();
        Ok(ToolResult::success("loop exited"))
    }
}

struct SetStateTool(ToolDefinition);

impl SetStateTool {
    fn new() -> Arc<dyn Tool> {
        Arc::new(Self(ToolDefinition::new("set_state", "Write a state key")))
    }
}

#[async_trait]
impl Tool for SetStateTool {
    fn definition(&self) -> &ToolDefinition {
        &self.0
    }

    async fn execute(&self, args: serde_json::Value, ctx: ToolContext) -> Result<ToolResult, ToolError> {
        let key = args["key"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidParameters("key".to_string()))?;
        ctx.set_state(key, args["value"].clone());
        Ok(ToolResult::success_json(serde_json::json!({ "stored": key })))
    }
}

struct FailingTool(ToolDefinition);

#[async_trait]
impl Tool for FailingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.0
    }

    async fn execute(&self, _args: serde_json::Value, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        Err(agentflow_protocols::error::MemoryError::ConnectionError("disk full".to_string()).into())
    }
}

fn session() -> Arc<Session> {
    Arc::new(Session::new(SessionKey::new("app", "alice", "s1")))
}

fn ctx_with(session: Arc<Session>, model: Arc<dyn ModelInvoker>) -> InvocationContext {
    InvocationContext::new(session, Content::user("go"), model)
}

fn ctx(model: Arc<dyn ModelInvoker>) -> InvocationContext {
    ctx_with(session(), model)
}

fn leaf(name: &str) -> LeafNode {
    LeafNode::new(name, "scripted", format!("You are {}.", name))
}

fn node(leaf: LeafNode) -> Arc<TaskNode> {
    Arc::new(TaskNode::Leaf(leaf))
}

fn finals(events: &[Event]) -> Vec<&Event> {
    events.iter().filter(|e| e.is_final_response()).collect()
}

#[test]
fn test_node_introspection() {
    let a = node(leaf("a"));
    let b = node(leaf("b"));
    let seq = Arc::new(TaskNode::Sequential(SequentialNode::new("seq", vec![a.clone(), b])));
    let lp = TaskNode::Loop(LoopNode::new("loop", vec![seq.clone()], 3));

    assert_eq!(a.kind(), NodeKind::Leaf);
    assert!(a.children().is_empty());
    assert_eq!(seq.name(), "seq");
    assert_eq!(seq.kind().to_string(), "sequential");
    assert_eq!(seq.children().len(), 2);
    assert!(Arc::ptr_eq(&seq.children()[0], &a));
    assert_eq!(lp.kind(), NodeKind::Loop);
    assert!(format!("{:?}", lp).contains("max_iterations"));
}

#[tokio::test]
async fn test_leaf_emits_single_final_event() {
    let model = Arc::new(ScriptedModel::new().with_reply("writer", "A draft."));
    let ctx = ctx(model);
    let session = ctx.session.clone();

    let events = node(leaf("writer")).execute(ctx).collect_events().await.unwrap();

    assert_eq!(events.len(), 1);
    assert!(events[0].is_final_response());
    assert_eq!(events[0].author, "writer");
    assert_eq!(events[0].text(), "A draft.");
    assert_eq!(session.event_count(), 1);
}

#[tokio::test]
async fn test_leaf_streams_partials_before_final() {
    let model = Arc::new(
        ScriptedModel::new().with_turn("writer", ScriptedTurn::chunks(["Once ", "upon ", "a time"])),
    );
    let ctx = ctx(model);
    let session = ctx.session.clone();

    let events = node(leaf("writer")).execute(ctx).collect_events().await.unwrap();

    assert_eq!(events.len(), 4);
    assert!(events[..3].iter().all(|e| e.partial && !e.is_final));
    assert_eq!(events[3].text(), "Once upon a time");
    assert!(events[3].is_final_response());
    // partials are not logged
    assert_eq!(session.event_count(), 1);
}

#[tokio::test]
async fn test_leaf_output_key_writes_state() {
    let model = Arc::new(ScriptedModel::new().with_reply("writer", "Rust is fast."));
    let ctx = ctx(model);
    let session = ctx.session.clone();

    let events = node(leaf("writer").with_output_key("draft"))
        .execute(ctx)
        .collect_events()
        .await
        .unwrap();

    assert_eq!(session.state().get_str("draft"), Some("Rust is fast.".to_string()));
    assert_eq!(events[0].state_delta["draft"], "Rust is fast.");
}

#[tokio::test]
async fn test_leaf_renders_instruction_from_state() {
    let model = Arc::new(ScriptedModel::new());
    let ctx = ctx(model.clone());
    ctx.session.state().set("topic", serde_json::json!("borrowing"));

    let leaf = LeafNode::new("writer", "scripted", "Write about {topic} and {unknown}.");
    node(leaf).execute(ctx).collect_events().await.unwrap();

    let requests = model.requests_for("writer");
    assert_eq!(requests[0].instruction, "Write about borrowing and {unknown}.");
    assert_eq!(requests[0].input.text(), "go");
}

#[tokio::test]
async fn test_leaf_history_policies() {
    let model = Arc::new(ScriptedModel::new());
    let session = session();
    session.append_event(Event::new("earlier", USER_AUTHOR, Some(Content::user("old question"))));
    session.append_event(Event::new("earlier", "writer", Some(Content::model("old answer"))));

    let ctx = ctx_with(session.clone(), model.clone());
    session.append_event(Event::new(&ctx.invocation_id, USER_AUTHOR, Some(Content::user("go"))));

    node(leaf("with_history")).execute(ctx.clone()).collect_events().await.unwrap();
    node(leaf("no_history").with_history_policy(HistoryPolicy::None))
        .execute(ctx)
        .collect_events()
        .await
        .unwrap();

    let with_history: Vec<_> = model.requests_for("with_history")[0]
        .history
        .iter()
        .map(|c| c.text())
        .collect();
    assert_eq!(with_history, vec!["old question", "old answer"]);
    assert!(model.requests_for("no_history")[0].history.is_empty());
}

#[tokio::test]
async fn test_leaf_tool_round_trip() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_turn(
                "worker",
                ScriptedTurn::call("set_state", serde_json::json!({"key": "status", "value": "done"})),
            )
            .with_reply("worker", "Saved."),
    );
    let ctx = ctx(model.clone());
    let session = ctx.session.clone();

    let events = node(leaf("worker").with_tools(vec![SetStateTool::new()]))
        .execute(ctx)
        .collect_events()
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].function_calls()[0].name, "set_state");
    assert!(!events[0].is_final);

    let response = events[1].function_responses()[0];
    assert!(!response.is_error);
    assert_eq!(response.response["stored"], "status");
    assert_eq!(events[1].state_delta["status"], "done");

    assert!(events[2].is_final_response());
    assert_eq!(events[2].text(), "Saved.");
    assert_eq!(session.state().get_str("status"), Some("done".to_string()));
    assert_eq!(session.event_count(), 3);

    let requests = model.requests_for("worker");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert!(requests[1].has_tool_responses());
}

#[tokio::test]
async fn test_tool_failure_becomes_error_response() {
    let failing: Arc<dyn Tool> = Arc::new(FailingTool(ToolDefinition::new("write_file", "Write")));
    let model = Arc::new(
        ScriptedModel::new()
            .with_turn("worker", ScriptedTurn::call("write_file", serde_json::json!({})))
            .with_turn("worker", ScriptedTurn::call("no_such_tool", serde_json::json!({})))
            .with_reply("worker", "Gave up."),
    );

    let events = node(leaf("worker").with_tools(vec![failing]))
        .execute(ctx(model))
        .collect_events()
        .await
        .unwrap();

    let responses: Vec<_> = events.iter().flat_map(|e| e.function_responses()).collect();
    assert_eq!(responses.len(), 2);
    assert!(responses.iter().all(|r| r.is_error));
    assert!(responses[0].response["error"].as_str().unwrap().contains("disk full"));
    assert!(responses[1].response["error"].as_str().unwrap().contains("no_such_tool"));
    assert_eq!(events.last().unwrap().text(), "Gave up.");
}

#[tokio::test]
async fn test_tool_rounds_exceeded() {
    let model = Arc::new(
        ScriptedModel::new().with_turn("worker", ScriptedTurn::call("set_state", serde_json::json!({"key": "k", "value": 1}))),
    );
    let mut ctx = ctx(model);
    ctx.config.max_tool_rounds = 2;

    let result = node(leaf("worker").with_tools(vec![SetStateTool::new()]))
        .execute(ctx)
        .collect_events()
        .await;

    assert_eq!(
        result,
        Err(RuntimeError::ToolRoundsExceeded {
            node: "worker".to_string(),
            limit: 2
        })
    );
}

#[tokio::test]
async fn test_model_failure_surfaces_after_earlier_events() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply("a", "first")
            .with_turn("b", ScriptedTurn::Fail(ModelError::Network("unreachable".to_string()))),
    );
    let seq = Arc::new(TaskNode::Sequential(SequentialNode::new(
        "seq",
        vec![node(leaf("a")), node(leaf("b")), node(leaf("c"))],
    )));

    let mut stream = seq.execute(ctx(model.clone()));
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.text(), "first");
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.node(), Some("b"));
    assert!(stream.next().await.is_none());
    assert!(model.requests_for("c").is_empty());
}

#[tokio::test]
async fn test_sequential_state_visible_to_next_child() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply("a", "v")
            .with_latency("a", Duration::from_millis(20)),
    );
    let a = leaf("a").with_output_key("k");
    let b = LeafNode::new("b", "scripted", "Saw k={k}");
    let seq = Arc::new(TaskNode::Sequential(SequentialNode::new("seq", vec![node(a), node(b)])));

    let events = seq.execute(ctx(model.clone())).collect_events().await.unwrap();

    let authors: Vec<_> = events.iter().map(|e| e.author.as_str()).collect();
    assert_eq!(authors, vec!["a", "b"]);
    assert_eq!(model.requests_for("b")[0].instruction, "Saw k=v");
    let order: Vec<_> = model.requests().iter().map(|r| r.node.clone()).collect();
    assert_eq!(order, vec!["a", "b"]);
}

/// Model whose invocations only complete once `parties` of them are in flight.
struct RendezvousModel {
    barrier: Barrier,
}

#[async_trait]
impl ModelInvoker for RendezvousModel {
    fn id(&self) -> &str {
        "rendezvous"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        self.barrier.wait().await;
        let output = ModelOutput::complete(Content::model(format!("{} done", request.node)));
        Ok(Box::pin(futures::stream::iter(vec![Ok(output)])))
    }
}

#[tokio::test]
async fn test_parallel_starts_all_branches_without_waiting() {
    let model = Arc::new(RendezvousModel {
        barrier: Barrier::new(3),
    });
    let par = Arc::new(TaskNode::Parallel(ParallelNode::new(
        "par",
        vec![node(leaf("a")), node(leaf("b")), node(leaf("c"))],
    )));

    let events = tokio::time::timeout(
        Duration::from_secs(5),
        par.execute(ctx(model)).collect_events(),
    )
    .await
    .expect("branches did not run concurrently")
    .unwrap();

    assert_eq!(finals(&events).len(), 3);
}

#[tokio::test]
async fn test_parallel_terminates_after_slowest_branch() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_latency("fast", Duration::from_millis(5))
            .with_latency("medium", Duration::from_millis(20))
            .with_latency("slow", Duration::from_millis(60)),
    );
    let par = Arc::new(TaskNode::Parallel(ParallelNode::new(
        "par",
        vec![node(leaf("slow")), node(leaf("fast")), node(leaf("medium"))],
    )));

    let mut stream = par.execute(ctx(model));
    let mut seen = Vec::new();
    while let Some(item) = stream.next().await {
        seen.push(item.unwrap().author);
    }

    assert_eq!(seen.len(), 3);
    assert_eq!(seen.last().map(String::as_str), Some("slow"));
    for name in ["fast", "medium", "slow"] {
        assert_eq!(seen.iter().filter(|a| *a == name).count(), 1);
    }
}

#[tokio::test]
async fn test_parallel_branch_failure_does_not_cancel_siblings() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_turn("broken", ScriptedTurn::Fail(ModelError::Timeout(1)))
            .with_latency("steady", Duration::from_millis(30))
            .with_reply("steady", "still here"),
    );
    let par = Arc::new(TaskNode::Parallel(ParallelNode::new(
        "par",
        vec![node(leaf("broken")), node(leaf("steady"))],
    )));

    let mut stream = par.execute(ctx(model));
    let mut events = Vec::new();
    let mut error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => events.push(event),
            Err(e) => error = Some(e),
        }
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].text(), "still here");
    assert_eq!(error.and_then(|e| e.node().map(str::to_string)), Some("broken".to_string()));
}

#[tokio::test]
async fn test_loop_runs_max_iterations_without_escalate() {
    let model = Arc::new(ScriptedModel::new().with_reply("refiner", "better"));
    let lp = Arc::new(TaskNode::Loop(LoopNode::new("loop", vec![node(leaf("refiner"))], 5)));

    let events = lp.execute(ctx(model.clone())).collect_events().await.unwrap();

    assert_eq!(finals(&events).len(), 5);
    assert_eq!(model.requests_for("refiner").len(), 5);
    assert_eq!(events.last().unwrap().text(), "better");
}

#[tokio::test]
async fn test_loop_stops_after_escalating_pass() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply("writer", "draft")
            .with_reply("critic", "needs work")
            .with_turn("critic", ScriptedTurn::call("exit_loop", serde_json::json!({})))
            .with_reply("critic", "approved"),
    );
    let body = vec![
        node(leaf("writer")),
        node(leaf("critic").with_tools(vec![ExitLoopTool::new()])),
    ];
    let lp = Arc::new(TaskNode::Loop(LoopNode::new("loop", body, 10)));

    let events = lp.execute(ctx(model.clone())).collect_events().await.unwrap();

    assert_eq!(model.requests_for("writer").len(), 2);
    assert_eq!(model.requests_for("critic").len(), 3);
    let last = events.last().unwrap();
    assert_eq!(last.author, "critic");
    assert_eq!(last.text(), "approved");
    assert!(last.is_final_response());
    assert!(last.escalates());
}

#[tokio::test]
async fn test_escalate_before_last_child_does_not_stop_loop() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_turn("critic", ScriptedTurn::call("exit_loop", serde_json::json!({})))
            .with_reply("critic", "ok")
            .with_reply("writer", "rewritten"),
    );
    let body = vec![
        node(leaf("critic").with_tools(vec![ExitLoopTool::new()])),
        node(leaf("writer")),
    ];
    let lp = Arc::new(TaskNode::Loop(LoopNode::new("loop", body, 3)));

    lp.execute(ctx(model.clone())).collect_events().await.unwrap();
    assert_eq!(model.requests_for("writer").len(), 3);
}

#[tokio::test]
async fn test_nested_composites_share_session() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply("pros", "fast")
            .with_reply("cons", "steep learning curve"),
    );
    let par = Arc::new(TaskNode::Parallel(ParallelNode::new(
        "research",
        vec![
            node(leaf("pros").with_output_key("pros")),
            node(leaf("cons").with_output_key("cons")),
        ],
    )));
    let summary = LeafNode::new("summary", "scripted", "Pros: {pros}. Cons: {cons}.");
    let seq = Arc::new(TaskNode::Sequential(SequentialNode::new(
        "pipeline",
        vec![par, node(summary)],
    )));

    let events = seq.execute(ctx(model.clone())).collect_events().await.unwrap();

    assert_eq!(events.last().unwrap().author, "summary");
    assert_eq!(
        model.requests_for("summary")[0].instruction,
        "Pros: fast. Cons: steep learning curve."
    );
}

#[tokio::test]
async fn test_dropping_stream_stops_loop() {
    let model = Arc::new(ScriptedModel::new().with_latency("spin", Duration::from_millis(2)));
    let lp = Arc::new(TaskNode::Loop(LoopNode::new("loop", vec![node(leaf("spin"))], 1_000)));

    let mut stream = lp.execute(ctx(model.clone()));
    stream.next().await.unwrap().unwrap();
    drop(stream);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = model.requests().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(model.requests().len(), settled);
    assert!(settled < 1_000);
}
