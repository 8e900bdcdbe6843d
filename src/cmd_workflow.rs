//! Workflow subcommands: validate, describe and run.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use futures::StreamExt;
use tracing::{debug, info};

use agentflow_config::{Config, ExecutionConfig as ExecutionSettings, RetrySettings};
use agentflow_protocols::memory::MemoryStore;
use agentflow_protocols::model::ModelInvoker;
use agentflow_protocols::types::Event;
use agentflow_runtime::{
    ExecutionConfig, InMemoryMemoryStore, RetryConfig, RetryingMemoryStore, RetryingModel,
    ScriptedModel, TurnAccumulator,
};
use agentflow_workflow::{ModelDefaults, Orchestrator, WorkflowDefinition};

use crate::tools::builtin_tools;

/// Options of the `run` subcommand.
pub(crate) struct RunOptions {
    pub input: String,
    pub user: Option<String>,
    pub session: Option<String>,
    pub stream: bool,
    pub replies: Vec<String>,
    pub json: bool,
}

pub(crate) fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        max_retries: settings.max_retries,
        base_delay: std::time::Duration::from_millis(settings.initial_backoff_ms),
        max_delay: std::time::Duration::from_millis(settings.max_backoff_ms),
        backoff_multiplier: settings.backoff_multiplier,
        jitter: settings.jitter,
    }
}

pub(crate) fn execution_config(settings: &ExecutionSettings) -> ExecutionConfig {
    ExecutionConfig {
        channel_capacity: settings.channel_capacity,
        max_tool_rounds: settings.max_tool_rounds,
    }
}

/// Build an orchestrator with the built-in tools registered.
///
/// The memory tools share one in-process store that retries transient
/// failures per `[retry]`.
pub(crate) fn build_orchestrator(
    config: &Config,
    model: Arc<dyn ModelInvoker>,
) -> anyhow::Result<Orchestrator> {
    let orchestrator = Orchestrator::new(&config.app.name, model)
        .with_execution_config(execution_config(&config.execution))
        .with_model_defaults(ModelDefaults {
            model: config.model.default.clone(),
            temperature: config.model.temperature,
            max_output_tokens: config.model.max_output_tokens,
        });

    let memory: Arc<dyn MemoryStore> = Arc::new(RetryingMemoryStore::new(
        Arc::new(InMemoryMemoryStore::new()),
        retry_config(&config.retry),
    ));
    for tool in builtin_tools(memory) {
        orchestrator.register_tool(tool)?;
    }
    debug!(tools = orchestrator.tools().len(), "Registered built-in tools");
    Ok(orchestrator)
}

/// Scripted model seeded from `NODE=TEXT` replies, in order.
pub(crate) fn scripted_model(replies: &[String]) -> anyhow::Result<ScriptedModel> {
    let mut model = ScriptedModel::new();
    for reply in replies {
        let Some((node, text)) = reply.split_once('=') else {
            bail!("Invalid --reply '{}': expected NODE=TEXT", reply);
        };
        if node.trim().is_empty() {
            bail!("Invalid --reply '{}': node name is empty", reply);
        }
        model = model.with_reply(node.trim(), text);
    }
    Ok(model)
}

fn load_and_register(
    config: &Config,
    file: &Path,
    model: Arc<dyn ModelInvoker>,
) -> anyhow::Result<(Orchestrator, String)> {
    let definition = WorkflowDefinition::load(file)
        .with_context(|| format!("Failed to load workflow {}", file.display()))?;
    let name = definition.name.clone();
    let orchestrator = build_orchestrator(config, model)?;
    orchestrator.register_workflow(definition)?;
    Ok((orchestrator, name))
}

pub(crate) fn validate(config: &Config, file: &Path) -> anyhow::Result<()> {
    let (orchestrator, name) = load_and_register(config, file, Arc::new(ScriptedModel::new()))?;
    let root = orchestrator.resolve_workflow(&name)?;
    let info = orchestrator.describe_workflow(&name)?;

    println!(
        "Workflow '{}' is valid: {} nodes, entry point '{}' ({})",
        name,
        info.nodes.len(),
        info.entry_point,
        root.kind()
    );
    Ok(())
}

pub(crate) fn describe(config: &Config, file: &Path, json: bool) -> anyhow::Result<()> {
    let (orchestrator, name) = load_and_register(config, file, Arc::new(ScriptedModel::new()))?;
    let info = orchestrator.describe_workflow(&name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", info);
    }
    Ok(())
}

pub(crate) async fn run(config: &Config, file: &Path, options: RunOptions) -> anyhow::Result<()> {
    let scripted: Arc<dyn ModelInvoker> = Arc::new(scripted_model(&options.replies)?);
    let model = Arc::new(RetryingModel::new(scripted, retry_config(&config.retry)));
    let (orchestrator, name) = load_and_register(config, file, model)?;

    let user = options
        .user
        .unwrap_or_else(|| config.app.default_user.clone());
    info!(workflow = %name, user = %user, stream = options.stream, "Running workflow");

    if !options.stream {
        let outcome = orchestrator
            .run_workflow(&name, &options.input, &user, options.session.as_deref())
            .await?;
        if options.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!("Session: {} (user {})", outcome.session_id, outcome.user_id);
            println!("Events: {}", outcome.events.len());
            if let Some(output) = &outcome.final_output {
                println!("Final output:\n{}", output);
            }
        }
        return Ok(());
    }

    let mut run = orchestrator
        .stream_workflow(&name, &options.input, &user, options.session.as_deref())
        .await?;
    println!("Session: {} (user {})", run.session_id(), run.user_id());

    let mut printer = EventPrinter::default();
    let mut out = std::io::stdout();
    while let Some(item) = run.events.next().await {
        let event = item?;
        printer.print(&mut out, &event)?;
    }
    printer.finish(&mut out)?;

    let state = run.session.state().snapshot();
    if !state.is_empty() {
        println!("State: {}", serde_json::to_string_pretty(&state)?);
    }
    Ok(())
}

/// Writes a live event stream, joining partial chunks per author.
///
/// Parallel branches interleave their chunks; a new `[author]` header is
/// written whenever the streaming author changes.
#[derive(Default)]
struct EventPrinter {
    turns: HashMap<String, TurnAccumulator>,
    /// Author whose streamed line is currently open.
    open: Option<String>,
}

impl EventPrinter {
    fn print(&mut self, out: &mut impl Write, event: &Event) -> std::io::Result<()> {
        let author = event.author.as_str();

        if event.partial {
            if self.open.as_deref() != Some(author) {
                self.close_line(out)?;
                write!(out, "[{}] ", author)?;
                self.open = Some(author.to_string());
            }
            let text = event.text();
            self.turns
                .entry(author.to_string())
                .or_default()
                .push_partial(&text);
            write!(out, "{}", text)?;
            return out.flush();
        }

        // The complete event repeats the streamed text.
        let streamed = self
            .turns
            .get_mut(author)
            .and_then(TurnAccumulator::finish)
            .is_some();
        if self.open.as_deref() != Some(author) {
            self.close_line(out)?;
        }
        if self.open.as_deref() == Some(author) {
            writeln!(out)?;
            self.open = None;
        } else if !streamed {
            let text = event.text();
            if !text.is_empty() {
                writeln!(out, "[{}] {}", author, text)?;
            }
        }

        for call in event.function_calls() {
            writeln!(out, "  -> {}({})", call.name, call.args)?;
        }
        for response in event.function_responses() {
            let marker = if response.is_error { "error" } else { "ok" };
            writeln!(out, "  <- {} [{}]: {}", response.name, marker, response.response)?;
        }
        if event.escalates() {
            writeln!(out, "  (escalate)")?;
        }
        Ok(())
    }

    fn close_line(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        if self.open.take().is_some() {
            writeln!(out)?;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        self.close_line(out)?;
        self.turns.clear();
        out.flush()
    }
}
