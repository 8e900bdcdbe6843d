//! Model request and output types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tool::ToolDefinition;
use crate::types::Content;

/// Which conversation history a leaf hands to its model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPolicy {
    /// Every completed event of the session so far.
    #[default]
    Default,
    /// No history; the model sees only the instruction and the input.
    None,
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "none" => Ok(Self::None),
            other => Err(format!("Unknown history policy: {}", other)),
        }
    }
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Sampling parameters for one model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Request for one model turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Name of the leaf node making the call.
    pub node: String,

    /// Model identifier.
    pub model: String,

    /// Instruction with state placeholders already substituted.
    pub instruction: String,

    /// Tools the model may call.
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,

    /// Prior conversation, oldest first.
    #[serde(default)]
    pub history: Vec<Content>,

    /// The caller's message for this run.
    pub input: Content,

    /// Model turns and tool responses already produced in this leaf turn.
    #[serde(default)]
    pub turn: Vec<Content>,

    #[serde(default)]
    pub generation: GenerationConfig,
}

impl ModelRequest {
    pub fn new(
        node: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
        input: Content,
    ) -> Self {
        Self {
            node: node.into(),
            model: model.into(),
            instruction: instruction.into(),
            tools: Vec::new(),
            history: Vec::new(),
            input,
            turn: Vec::new(),
            generation: GenerationConfig::default(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_history(mut self, history: Vec<Content>) -> Self {
        self.history = history;
        self
    }

    pub fn with_turn(mut self, turn: Vec<Content>) -> Self {
        self.turn = turn;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Whether the model has already seen tool responses this turn.
    pub fn has_tool_responses(&self) -> bool {
        self.turn.iter().any(|c| !c.function_responses().is_empty())
    }
}

/// One item of a model stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub content: Content,

    /// A fragment of a turn that is still being produced.
    #[serde(default)]
    pub partial: bool,
}

impl ModelOutput {
    /// A streamed text fragment.
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            content: Content::model(text),
            partial: true,
        }
    }

    /// A complete output.
    pub fn complete(content: Content) -> Self {
        Self {
            content,
            partial: false,
        }
    }
}
