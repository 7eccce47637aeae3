//! The authoritative simulation state.
//!
//! The `World` owns every actor in an arena keyed by [`ActorId`]. It is
//! mutated exclusively by the turn driver and the action pipeline; guest
//! code reads it through [`WorldView`] snapshots and writes to it only via
//! queued [`MutationRequest`]s applied after a completed call.

mod actor;
mod mutation;
mod view;

pub use actor::{Actor, ActorId, OngoingAction, Stats};
pub use mutation::{apply_mutations, MutationRequest};
pub use view::{ActorView, WorldView};

use std::collections::HashMap;

/// The entity arena plus the tile grid.
#[derive(Debug, Clone)]
pub struct World {
    width: i32,
    height: i32,
    /// Row-major wall mask; `true` means the tile is not walkable.
    walls: Vec<bool>,
    /// Loose items on the floor, keyed by tile.
    items: HashMap<(i32, i32), Vec<String>>,
    actors: HashMap<ActorId, Actor>,
    next_id: u64,
    turn: u64,
    /// Messages queued for the UI layer; drained by the driver.
    messages: Vec<String>,
}

impl World {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "world dimensions must be positive");
        Self {
            width,
            height,
            walls: vec![false; (width * height) as usize],
            items: HashMap::new(),
            actors: HashMap::new(),
            next_id: 1,
            turn: 0,
            messages: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn advance_turn(&mut self) {
        self.turn += 1;
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn set_wall(&mut self, x: i32, y: i32, wall: bool) {
        if self.in_bounds(x, y) {
            self.walls[(y * self.width + x) as usize] = wall;
        }
    }

    /// Whether the tile itself admits movement. Does not consider actors;
    /// occupancy is a separate check (`blocking_actor_at`).
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.walls[(y * self.width + x) as usize]
    }

    /// Add an actor to the arena and return its id.
    pub fn spawn(&mut self, name: impl Into<String>, x: i32, y: i32, stats: Stats) -> ActorId {
        let id = ActorId::from_raw(self.next_id);
        self.next_id += 1;
        self.actors.insert(id, Actor::new(id, name, x, y, stats));
        id
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn actors_at(&self, x: i32, y: i32) -> Vec<ActorId> {
        let mut ids: Vec<ActorId> = self
            .actors
            .values()
            .filter(|a| a.x == x && a.y == y)
            .map(|a| a.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn blocking_actor_at(&self, x: i32, y: i32) -> Option<ActorId> {
        self.actors
            .values()
            .filter(|a| a.x == x && a.y == y && a.blocks)
            .map(|a| a.id)
            .min()
    }

    pub fn place_item(&mut self, x: i32, y: i32, item: impl Into<String>) {
        self.items.entry((x, y)).or_default().push(item.into());
    }

    pub fn items_at(&self, x: i32, y: i32) -> &[String] {
        self.items.get(&(x, y)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_items(&mut self, x: i32, y: i32) -> Vec<String> {
        self.items.remove(&(x, y)).unwrap_or_default()
    }

    pub fn push_message(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    pub fn drain_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    /// Take a read-only snapshot for a guest call.
    pub fn snapshot(&self) -> WorldView {
        let mut actors: Vec<ActorView> = self
            .actors
            .values()
            .map(|a| ActorView {
                id: a.id.raw(),
                name: a.name.clone(),
                x: a.x,
                y: a.y,
                hp: a.stats.hp,
                max_hp: a.stats.max_hp,
                attack: a.stats.attack,
                alive: a.alive,
                blocks: a.blocks,
            })
            .collect();
        actors.sort_by_key(|a| a.id);
        WorldView {
            turn: self.turn,
            width: self.width,
            height: self.height,
            walls: self.walls.clone(),
            actors,
        }
    }
}
