//! Typed, append-only facts about what happened.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event type names. All but [`MESSAGE`](event_types::MESSAGE)
/// are emitted by the action pipeline; `message` is published by the
/// embedding driver for UI/system text.
pub mod event_types {
    pub const ACTOR_MOVED: &str = "actor_moved";
    pub const ENTITY_ATTACKED: &str = "entity_attacked";
    pub const ENTITY_DIED: &str = "entity_died";
    pub const ITEM_PICKED_UP: &str = "item_picked_up";
    pub const GATHER_STARTED: &str = "gather_started";
    pub const GATHER_PROGRESS: &str = "gather_progress";
    pub const GATHER_COMPLETED: &str = "gather_completed";
    pub const MESSAGE: &str = "message";
}

/// An immutable record of something that happened on a given turn.
///
/// Events are facts; they are never mutated after creation and an outcome
/// never retroactively removes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub turn: u64,
    /// Wall-clock seconds since the Unix epoch, for diagnostics.
    pub timestamp: f64,
}

impl GameEvent {
    pub fn new(event_type: impl Into<String>, data: Value, turn: u64) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            turn,
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}
