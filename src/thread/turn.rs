//! Folding a turn's events into one [`Turn`].

use std::ops::ControlFlow;

use tokio_util::sync::CancellationToken;

use crate::cli::{StreamedTurn, ThreadEvent, ThreadItem, Usage};
use crate::error::{Error, Result};

/// Message used when `turn.failed` carries no error payload.
pub const DEFAULT_TURN_FAILURE: &str = "turn failed";

/// Result of a completed turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Turn {
    /// Completed items, in completion order.
    pub items: Vec<ThreadItem>,
    /// Text of the last completed agent message, or empty.
    pub final_response: String,
    /// Token usage, when the turn completed.
    pub usage: Option<Usage>,
}

/// State machine over the events of one turn.
#[derive(Debug, Default)]
pub struct TurnAggregator {
    turn: Turn,
    failure: Option<String>,
}

impl TurnAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event. Breaks on `turn.failed`.
    pub fn observe(&mut self, event: ThreadEvent) -> ControlFlow<()> {
        match event {
            ThreadEvent::ItemCompleted { item: Some(item) } => {
                if let Some(text) = item.agent_text() {
                    self.turn.final_response = text.to_string();
                }
                self.turn.items.push(item);
            }
            ThreadEvent::TurnCompleted { usage } => {
                self.turn.usage = usage;
            }
            ThreadEvent::TurnFailed { error } => {
                let message = error.map_or_else(|| DEFAULT_TURN_FAILURE.to_string(), |e| e.message);
                tracing::debug!(message = %message, "Turn failed");
                self.failure = Some(message);
                return ControlFlow::Break(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    /// The recorded turn failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Combine the folded state with the stream's terminal result.
    ///
    /// A recorded turn failure yields [`Error::TurnFailed`] unless the stream
    /// error is more specific than the cancellation the failure triggered.
    ///
    /// # Errors
    ///
    /// Returns the turn failure or the stream error.
    pub fn finish(self, wait: Result<()>) -> Result<Turn> {
        let Self { turn, failure } = self;
        match (failure, wait) {
            (Some(message), Err(e)) => Err(e.into_specific().unwrap_or(Error::TurnFailed(message))),
            (Some(message), Ok(())) => Err(Error::TurnFailed(message)),
            (None, Err(e)) => Err(e),
            (None, Ok(())) => Ok(turn),
        }
    }

    /// Drain `stream`, cancelling `cancel` on `turn.failed`, then wait for it.
    ///
    /// `cancel` must be the token the stream was started with.
    ///
    /// # Errors
    ///
    /// See [`Self::finish`].
    pub async fn drive(mut self, stream: &mut StreamedTurn, cancel: &CancellationToken) -> Result<Turn> {
        while let Some(event) = stream.next_event().await {
            if self.observe(event).is_break() {
                cancel.cancel();
                break;
            }
        }

        let wait = stream.wait().await;
        self.finish(wait)
    }
}
