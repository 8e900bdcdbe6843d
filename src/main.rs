//! AgentFlow - composable task orchestration for agent workflows
//!
//! Main entry point for the AgentFlow CLI.

mod cli;
mod cmd_workflow;
mod tools;

use std::sync::OnceLock;

use anyhow::bail;
use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use agentflow_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::{Cli, Commands};
use crate::cmd_workflow::RunOptions;

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console output on stderr, plus a daily rolling file when enabled.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if config.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = if config.file {
        std::fs::create_dir_all(&config.directory)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("agentflow")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&config.directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = GUARD.set(guard);

        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        Some(if config.json { layer.json().boxed() } else { layer.boxed() })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    let result = ConfigValidator::validate(&config);
    if !result.is_valid() {
        let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
        bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }
    for warning in &result.warnings {
        eprintln!("warning: {}: {}", warning.path, warning.message);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;
    debug!(app = %config.app.name, "AgentFlow v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Validate { file } => cmd_workflow::validate(&config, &file),
        Commands::Describe { file, json } => cmd_workflow::describe(&config, &file, json),
        Commands::Run {
            file,
            input,
            user,
            session,
            stream,
            replies,
            json,
        } => {
            let options = RunOptions {
                input,
                user,
                session,
                stream,
                replies,
                json,
            };
            cmd_workflow::run(&config, &file, options).await
        }
    };

    if let Err(e) = &result {
        warn!(error = %e, "Command failed");
    }
    result
}
