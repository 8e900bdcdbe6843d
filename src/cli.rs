//! CLI definitions for AgentFlow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AgentFlow CLI.
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(about = "Composable task-orchestration engine for agent workflows")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.agentflow/config.toml if present)
    #[arg(short, long, global = true, env = "AGENTFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check a workflow file and the tools it references
    Validate {
        /// Workflow file (.toml or .json)
        file: PathBuf,
    },

    /// Print the nodes of a workflow file
    Describe {
        /// Workflow file (.toml or .json)
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run a workflow offline against the scripted model
    Run {
        /// Workflow file (.toml or .json)
        file: PathBuf,

        /// Input message for the run
        #[arg(short, long)]
        input: String,

        /// User ID (defaults to app.default_user)
        #[arg(short, long)]
        user: Option<String>,

        /// Session ID to reuse; a new session is created when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Print events as they arrive
        #[arg(long)]
        stream: bool,

        /// Scripted reply for a node, as NODE=TEXT (repeatable, in order)
        #[arg(long = "reply", value_name = "NODE=TEXT")]
        replies: Vec<String>,

        /// Print the run outcome as JSON
        #[arg(long)]
        json: bool,
    },
}
