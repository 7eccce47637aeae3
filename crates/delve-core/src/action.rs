//! Actions: immutable requests to change simulation state.
//!
//! An `Action` is created by input handling or by a behavior decision and
//! consumed exactly once by the pipeline. Guest behaviors return actions in
//! a JSON descriptor form (`{"action": "move", "dx": 1, "dy": 0}`) that is
//! parsed through an explicit kind lookup with a mandatory error fallback;
//! there is no open-ended dynamic dispatch on the kind string.

use crate::error::EngineError;
use crate::world::ActorId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The default number of turns a gather action spans when the descriptor
/// does not say otherwise.
pub const DEFAULT_GATHER_TURNS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Move { dx: i32, dy: i32 },
    Attack { target: ActorId },
    Wait,
    Pickup,
    Gather { turns: u32 },
}

/// An immutable request for one actor to do one thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub actor: ActorId,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(actor: ActorId, kind: ActionKind) -> Self {
        Self { actor, kind }
    }

    /// Parse the wire/descriptor form returned by guest behaviors.
    ///
    /// Unknown or malformed descriptors are an error for the caller to
    /// handle (typically by substituting a wait), never a panic.
    pub fn from_descriptor(actor: ActorId, descriptor: &Value) -> Result<Self, EngineError> {
        let kind_name = descriptor
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EngineError::InvalidDescriptor("missing `action` field".to_string())
            })?;

        let kind = match kind_name {
            "move" => {
                let dx = int_field(descriptor, "dx")?;
                let dy = int_field(descriptor, "dy")?;
                ActionKind::Move { dx, dy }
            }
            "attack" => {
                let raw = descriptor
                    .get("target_id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        EngineError::InvalidDescriptor("attack requires `target_id`".to_string())
                    })?;
                ActionKind::Attack {
                    target: ActorId::from_raw(raw),
                }
            }
            "wait" => ActionKind::Wait,
            "pickup" => ActionKind::Pickup,
            "gather" => {
                let turns = descriptor
                    .get("turns")
                    .and_then(Value::as_u64)
                    .map(|t| t as u32)
                    .unwrap_or(DEFAULT_GATHER_TURNS);
                ActionKind::Gather { turns }
            }
            other => {
                return Err(EngineError::InvalidDescriptor(format!(
                    "unknown action kind `{other}`"
                )))
            }
        };

        Ok(Self { actor, kind })
    }
}

fn int_field(descriptor: &Value, field: &str) -> Result<i32, EngineError> {
    descriptor
        .get(field)
        .and_then(Value::as_i64)
        .map(|v| v as i32)
        .ok_or_else(|| EngineError::InvalidDescriptor(format!("missing integer field `{field}`")))
}

/// The descriptor substituted when a behavior fails: do nothing this turn.
pub fn wait_descriptor() -> Value {
    json!({ "action": "wait" })
}
