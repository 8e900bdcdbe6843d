//! Model wrapper with retry capability.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use agentflow_protocols::error::ModelError;
use agentflow_protocols::model::{ModelInvoker, ModelRequest, ModelStream};

use crate::retry::{RetryConfig, with_retry_if};

/// Retries starting a model stream on transient errors.
///
/// Only the invocation is retried; an error raised mid-stream reaches the
/// leaf unchanged.
pub struct RetryingModel {
    inner: Arc<dyn ModelInvoker>,
    config: RetryConfig,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn ModelInvoker>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &Arc<dyn ModelInvoker> {
        &self.inner
    }
}

#[async_trait]
impl ModelInvoker for RetryingModel {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        debug!(node = %request.node, model = %request.model, "Invoking model with retry");
        with_retry_if(&self.config, ModelError::is_retryable, || {
            let request = request.clone();
            let inner = self.inner.clone();
            async move { inner.invoke(request).await }
        })
        .await
    }
}
