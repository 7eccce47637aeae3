//! Actors and their per-entity state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable opaque identifier for an actor.
///
/// Ids are allocated by the [`World`](super::World) arena and never reused
/// within a session. All entity relations are expressed as `ActorId`
/// references resolved through the arena, never as direct object pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(u64);

impl ActorId {
    /// Reconstruct an id from its raw value (e.g. one that crossed the
    /// guest boundary as an integer).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer form used at the marshaling boundary.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Combat-relevant stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
}

impl Stats {
    pub fn new(max_hp: i32, attack: i32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            attack,
        }
    }
}

/// Resumable state for an action spanning multiple turns.
///
/// Multi-turn actions are not suspended call stacks; they are this small
/// value stored on the actor, re-looked-up and advanced once per turn by
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngoingAction {
    pub kind: String,
    pub turns_remaining: u32,
}

/// A simulation entity capable of acting or being acted upon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub stats: Stats,
    /// Whether the actor occupies its tile for movement purposes.
    pub blocks: bool,
    pub alive: bool,
    pub inventory: Vec<String>,
    /// Behavior id consulted by the AI driver, if any.
    pub behavior: Option<String>,
    /// In-progress multi-turn action, if any.
    pub ongoing: Option<OngoingAction>,
}

impl Actor {
    pub(super) fn new(id: ActorId, name: impl Into<String>, x: i32, y: i32, stats: Stats) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            stats,
            blocks: true,
            alive: true,
            inventory: Vec::new(),
            behavior: None,
            ongoing: None,
        }
    }

    /// Chebyshev distance to a tile; adjacency means distance <= 1.
    pub fn distance_to(&self, x: i32, y: i32) -> i32 {
        (self.x - x).abs().max((self.y - y).abs())
    }
}
