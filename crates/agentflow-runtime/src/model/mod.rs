//! [`ModelInvoker`] implementations shipped with the runtime.
//!
//! [`ModelInvoker`]: agentflow_protocols::model::ModelInvoker

mod retrying;
mod scripted;

pub use retrying::RetryingModel;
pub use scripted::{ScriptedModel, ScriptedTurn};
