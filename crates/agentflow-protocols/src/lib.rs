//! # AgentFlow Protocols
//!
//! Core protocol definitions (traits and shared types) for the AgentFlow
//! orchestration engine. Contains only interface definitions - the engine
//! itself lives in `agentflow-runtime`.
//!
//! ## Core Traits
//!
//! - [`Tool`] - A named callable capability bound to leaf nodes
//! - [`ModelInvoker`] - The opaque generative-model capability a leaf drives
//! - [`MemoryStore`] - Long-term memory adapter consumed by tools

pub mod error;
pub mod memory;
pub mod model;
pub mod tool;
pub mod types;

// Re-export core traits
pub use error::{MemoryError, ModelError, RegistryError, ToolError};
pub use memory::{MemoryRecord, MemoryStore, NewMemory, SearchResult};
pub use model::{GenerationConfig, HistoryPolicy, ModelInvoker, ModelOutput, ModelRequest, ModelStream};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolResult};
pub use types::*;
