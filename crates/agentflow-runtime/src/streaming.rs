//! Event streams and per-turn output accumulation.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use agentflow_protocols::types::{Content, Event};

use crate::error::RuntimeError;

/// Stream of events produced by one node execution.
///
/// Ends after the node terminates. A failing node delivers its error as
/// the last item. Dropping the stream tells the producer to stop at its
/// next send.
pub struct EventStream {
    receiver: mpsc::Receiver<Result<Event, RuntimeError>>,
}

impl EventStream {
    /// Create a connected sender/stream pair.
    pub fn channel(capacity: usize) -> (EventSender, EventStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSender { tx }, EventStream { receiver: rx })
    }

    /// Drain the stream, stopping at the first error.
    pub async fn collect_events(mut self) -> Result<Vec<Event>, RuntimeError> {
        let mut events = Vec::new();
        while let Some(item) = self.next().await {
            events.push(item?);
        }
        Ok(events)
    }
}

impl Stream for EventStream {
    type Item = Result<Event, RuntimeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Producer half of an [`EventStream`].
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Result<Event, RuntimeError>>,
}

impl EventSender {
    /// Send an event, failing with [`RuntimeError::StreamClosed`] once the
    /// consumer is gone.
    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        self.tx
            .send(Ok(event))
            .await
            .map_err(|_| RuntimeError::StreamClosed)
    }

    /// Deliver a terminal error. Ignored if the consumer is gone.
    pub async fn fail(&self, error: RuntimeError) {
        let _ = self.tx.send(Err(error)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// State of a [`TurnAccumulator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Partial output has been seen and the turn is still open.
    Accumulating { text: String },
    /// No turn is open.
    Flushed,
}

/// Collects the partial text of one logical turn until it is flushed.
///
/// A turn opens on the first partial chunk and is flushed by the turn's
/// complete output ([`complete`](Self::complete)) or, when the producer
/// stops without one, by [`finish`](Self::finish). Flushing an already
/// flushed accumulator is a no-op.
#[derive(Debug, Clone)]
pub struct TurnAccumulator {
    state: TurnState,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self {
            state: TurnState::Flushed,
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, TurnState::Accumulating { .. })
    }

    /// Text buffered for the open turn.
    pub fn buffered(&self) -> &str {
        match &self.state {
            TurnState::Accumulating { text } => text,
            TurnState::Flushed => "",
        }
    }

    /// Append a partial chunk, opening a turn if none is open.
    pub fn push_partial(&mut self, chunk: &str) {
        match &mut self.state {
            TurnState::Accumulating { text } => text.push_str(chunk),
            TurnState::Flushed => {
                self.state = TurnState::Accumulating {
                    text: chunk.to_string(),
                }
            }
        }
    }

    /// Close the turn with its complete output.
    ///
    /// A complete output with neither text nor function calls is replaced
    /// by the buffered text.
    pub fn complete(&mut self, content: Content) -> Content {
        let buffered = self.take();
        match buffered {
            Some(text)
                if !text.is_empty() && content.text().is_empty() && !content.has_function_calls() =>
            {
                Content::model(text)
            }
            _ => content,
        }
    }

    /// Close the turn without a complete output, returning what was
    /// buffered. Returns `None` when no turn was open.
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    /// Drop any open turn.
    pub fn reset(&mut self) {
        self.state = TurnState::Flushed;
    }

    fn take(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, TurnState::Flushed) {
            TurnState::Accumulating { text } => Some(text),
            TurnState::Flushed => None,
        }
    }
}

impl Default for TurnAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
