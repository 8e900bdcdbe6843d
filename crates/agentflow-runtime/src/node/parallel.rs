//! Concurrent fan-out with join.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::select_all;
use tracing::warn;

use super::TaskNode;
use crate::context::InvocationContext;
use crate::error::RuntimeError;
use crate::streaming::EventSender;

/// Runs all children concurrently against the same session.
///
/// Every branch is started before any event is read. Events are forwarded
/// in arrival order; no order across branches is guaranteed. The node
/// terminates once every branch has terminated. A failing branch does not
/// stop its siblings; the first failure is reported after all branches end.
#[derive(Debug)]
pub struct ParallelNode {
    pub name: String,
    pub children: Vec<Arc<TaskNode>>,
}

impl ParallelNode {
    pub fn new(name: impl Into<String>, children: Vec<Arc<TaskNode>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub(crate) async fn run(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
    ) -> Result<(), RuntimeError> {
        let branches: Vec<_> = self
            .children
            .iter()
            .map(|child| child.execute(ctx.clone()))
            .collect();

        let mut merged = select_all(branches);
        let mut first_error = None;

        while let Some(item) = merged.next().await {
            match item {
                Ok(event) => out.send(event).await?,
                Err(e) => {
                    warn!(node = %self.name, error = %e, "Parallel branch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
