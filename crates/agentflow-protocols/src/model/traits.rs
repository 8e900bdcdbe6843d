//! Model invoker trait definition.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::{ModelOutput, ModelRequest};
use crate::error::ModelError;

/// Core trait for model backends.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Returns the invoker ID.
    fn id(&self) -> &str;

    /// Start one model turn.
    ///
    /// The returned stream yields zero or more partial outputs followed by
    /// at most one complete output.
    async fn invoke(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;
}

/// Stream of model outputs.
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelOutput, ModelError>> + Send>>;
