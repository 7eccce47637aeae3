//! Structured results of executing an action.

use crate::events::GameEvent;
use serde::{Deserialize, Serialize};

/// How an action execution resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The action happened; a turn was consumed.
    Success,
    /// A precondition was not met; no turn consumed, no mutation.
    Failure,
    /// A collision/occupancy precondition failed; no turn, no mutation.
    Blocked,
    /// The request itself was malformed; never queued to subscribers.
    Invalid,
}

/// The result of one `ActionPipeline::execute` call.
///
/// Immutable once returned: events are additive-only while the pipeline
/// builds the outcome and never removed afterwards.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    pub took_turn: bool,
    pub messages: Vec<String>,
    pub events: Vec<GameEvent>,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            took_turn: true,
            messages: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            took_turn: false,
            messages: vec![message.into()],
            events: Vec::new(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Blocked,
            took_turn: false,
            messages: vec![message.into()],
            events: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Invalid,
            took_turn: false,
            messages: vec![message.into()],
            events: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_event(mut self, event: GameEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_invalid(&self) -> bool {
        self.status == OutcomeStatus::Invalid
    }
}
