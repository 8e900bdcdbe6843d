//! # AgentFlow Runtime
//!
//! Executes resolved task trees against a session and streams their events.
//!
//! A resolved tree is made of [`TaskNode`]s. Calling [`TaskNode::execute`]
//! starts the node on the tokio runtime and returns an [`EventStream`];
//! composite nodes consume their children's streams and forward events.

pub mod context;
pub mod error;
pub mod memory_store;
pub mod model;
pub mod node;
pub mod retry;
pub mod session;
pub mod session_manager;
pub mod session_store;
pub mod streaming;
pub mod template;

pub use context::{ExecutionConfig, InvocationContext};
pub use error::RuntimeError;
pub use memory_store::{InMemoryMemoryStore, RetryingMemoryStore};
pub use model::{RetryingModel, ScriptedModel, ScriptedTurn};
pub use node::{LeafNode, LoopNode, NodeKind, ParallelNode, SequentialNode, TaskNode};
pub use retry::{with_retry, with_retry_if, RetryConfig};
pub use session::{Session, SessionKey};
pub use session_manager::{SessionError, SessionManager};
pub use session_store::{MemorySessionStore, SessionStore, SessionStoreError};
pub use streaming::{EventSender, EventStream, TurnAccumulator, TurnState};
