//! Sequential composition.

use std::sync::Arc;

use futures::StreamExt;

use super::TaskNode;
use crate::context::InvocationContext;
use crate::error::RuntimeError;
use crate::streaming::EventSender;

/// Runs its children one after another against the same session.
///
/// A child is started only after the previous child's stream is drained,
/// so state written by one child is visible to the next. The node emits
/// no events of its own.
#[derive(Debug)]
pub struct SequentialNode {
    pub name: String,
    pub children: Vec<Arc<TaskNode>>,
}

impl SequentialNode {
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
        run_in_order(&self.children, ctx, out).await.map(|_| ())
    }
}

/// Drain each child's stream in turn, forwarding every event.
///
/// Returns the `escalate` flag of the last event forwarded.
pub(crate) async fn run_in_order(
    children: &[Arc<TaskNode>],
    ctx: &InvocationContext,
    out: &EventSender,
) -> Result<bool, RuntimeError> {
    let mut last_escalates = false;
    for child in children {
        let mut stream = child.execute(ctx.clone());
        while let Some(item) = stream.next().await {
            let event = item?;
            last_escalates = event.escalates();
            out.send(event).await?;
        }
    }
    Ok(last_escalates)
}
