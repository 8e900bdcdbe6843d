//! Bounded loop-until-escalate.

use std::sync::Arc;

use tracing::{debug, info};

use super::TaskNode;
use super::sequential::run_in_order;
use crate::context::InvocationContext;
use crate::error::RuntimeError;
use crate::streaming::EventSender;

/// Repeats its children as a sequential pass up to `max_iterations` times.
///
/// A pass whose last event carries `escalate = true` is the final pass.
/// Reaching `max_iterations` without escalation is normal termination.
#[derive(Debug)]
pub struct LoopNode {
    pub name: String,
    pub children: Vec<Arc<TaskNode>>,
    pub max_iterations: u32,
}

impl LoopNode {
    pub fn new(name: impl Into<String>, children: Vec<Arc<TaskNode>>, max_iterations: u32) -> Self {
        Self {
            name: name.into(),
            children,
            max_iterations,
        }
    }

    pub(crate) async fn run(
        &self,
        ctx: &InvocationContext,
        out: &EventSender,
    ) -> Result<(), RuntimeError> {
        for iteration in 1..=self.max_iterations {
            debug!(node = %self.name, iteration, "Loop pass started");
            let escalated = run_in_order(&self.children, ctx, out).await?;
            if escalated {
                info!(node = %self.name, iteration, "Loop escalated, stopping");
                return Ok(());
            }
        }

        debug!(
            node = %self.name,
            max_iterations = self.max_iterations,
            "Loop reached max iterations"
        );
        Ok(())
    }
}
