//! Executable task nodes.
//!
//! A resolved workflow is a tree of [`TaskNode`]s. Each kind is a variant
//! of one closed enum and execution dispatches on it exhaustively.

mod leaf;
mod loop_node;
mod parallel;
mod sequential;

pub use leaf::LeafNode;
pub use loop_node::LoopNode;
pub use parallel::ParallelNode;
pub use sequential::SequentialNode;

use std::fmt;
use std::sync::Arc;

use tracing::{Instrument, debug, info_span};

use crate::context::InvocationContext;
use crate::error::RuntimeError;
use crate::streaming::{EventSender, EventStream};

/// Kind tag of a [`TaskNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    Sequential,
    Parallel,
    Loop,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Sequential => "sequential",
            NodeKind::Parallel => "parallel",
            NodeKind::Loop => "loop",
        };
        f.write_str(name)
    }
}

/// One executable node of a workflow tree.
#[derive(Debug)]
pub enum TaskNode {
    Leaf(LeafNode),
    Sequential(SequentialNode),
    Parallel(ParallelNode),
    Loop(LoopNode),
}

impl TaskNode {
    pub fn name(&self) -> &str {
        match self {
            TaskNode::Leaf(node) => &node.name,
            TaskNode::Sequential(node) => &node.name,
            TaskNode::Parallel(node) => &node.name,
            TaskNode::Loop(node) => &node.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            TaskNode::Leaf(_) => NodeKind::Leaf,
            TaskNode::Sequential(_) => NodeKind::Sequential,
            TaskNode::Parallel(_) => NodeKind::Parallel,
            TaskNode::Loop(_) => NodeKind::Loop,
        }
    }

    /// Direct children, empty for a leaf.
    pub fn children(&self) -> &[Arc<TaskNode>] {
        match self {
            TaskNode::Leaf(_) => &[],
            TaskNode::Sequential(node) => &node.children,
            TaskNode::Parallel(node) => &node.children,
            TaskNode::Loop(node) => &node.children,
        }
    }

    /// Start executing this node and return its event stream.
    ///
    /// The node runs on its own tokio task and starts immediately. Each
    /// call is a fresh run against `ctx.session`. Must be called from
    /// within a tokio runtime.
    pub fn execute(self: &Arc<Self>, ctx: InvocationContext) -> EventStream {
        let (out, stream) = EventStream::channel(ctx.config.channel_capacity);
        let node = Arc::clone(self);
        let span = info_span!(
            "node",
            name = %node.name(),
            kind = %node.kind(),
            invocation = %ctx.invocation_id
        );

        tokio::spawn(
            async move {
                debug!("Node started");
                match node.run(&ctx, &out).await {
                    Ok(()) => debug!("Node finished"),
                    Err(RuntimeError::StreamClosed) => debug!("Consumer went away, node stopped"),
                    Err(e) => {
                        debug!(error = %e, "Node failed");
                        out.fail(e).await;
                    }
                }
            }
            .instrument(span),
        );

        stream
    }

    async fn run(&self, ctx: &InvocationContext, out: &EventSender) -> Result<(), RuntimeError> {
        match self {
            TaskNode::Leaf(node) => node.run(ctx, out).await,
            TaskNode::Sequential(node) => node.run(ctx, out).await,
            TaskNode::Parallel(node) => node.run(ctx, out).await,
            TaskNode::Loop(node) => node.run(ctx, out).await,
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
