//! Read-only snapshots handed across the guest boundary.
//!
//! Guest code never receives references into the live [`World`](super::World);
//! it sees a `WorldView` snapshot taken at call time, marshaled as plain
//! values and opaque ids.

use serde::Serialize;

/// Snapshot of one actor, safe to marshal into guest code.
#[derive(Debug, Clone, Serialize)]
pub struct ActorView {
    pub id: u64,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub alive: bool,
    pub blocks: bool,
}

/// Immutable snapshot of the world at the start of a guest call.
#[derive(Debug, Clone, Serialize)]
pub struct WorldView {
    pub turn: u64,
    pub width: i32,
    pub height: i32,
    pub(super) walls: Vec<bool>,
    pub actors: Vec<ActorView>,
}

impl WorldView {
    pub fn actor(&self, id: u64) -> Option<&ActorView> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actors_at(&self, x: i32, y: i32) -> Vec<&ActorView> {
        self.actors.iter().filter(|a| a.x == x && a.y == y).collect()
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        !self.walls[(y * self.width + x) as usize]
    }
}
