//! Mutation requests queued by guest code.
//!
//! Guest calls never touch the world directly. The host API records the
//! requests a script makes and the runtime applies them here, synchronously,
//! only after the call has completed. A timed-out or errored call discards
//! its queue wholesale, so partial mutation cannot occur.

use super::{ActorId, Stats, World};
use tracing::debug;

/// A single mutation a guest call asked the host to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    DealDamage { target: ActorId, amount: i32 },
    Heal { target: ActorId, amount: i32 },
    EmitMessage { text: String },
    SpawnRequest { name: String, x: i32, y: i32 },
}

/// Apply a completed call's mutation queue to the world.
///
/// Requests against missing or dead actors are dropped with a debug log;
/// a stale id is not an error from the guest's point of view.
pub fn apply_mutations(world: &mut World, requests: Vec<MutationRequest>) {
    for request in requests {
        match request {
            MutationRequest::DealDamage { target, amount } => {
                let Some(actor) = world.actor_mut(target) else {
                    debug!(%target, "dropping damage request for unknown actor");
                    continue;
                };
                if !actor.alive {
                    continue;
                }
                actor.stats.hp -= amount.max(0);
                if actor.stats.hp <= 0 {
                    actor.stats.hp = 0;
                    actor.alive = false;
                    actor.blocks = false;
                    let name = actor.name.clone();
                    world.push_message(format!("{name} dies."));
                }
            }
            MutationRequest::Heal { target, amount } => {
                let Some(actor) = world.actor_mut(target) else {
                    debug!(%target, "dropping heal request for unknown actor");
                    continue;
                };
                if !actor.alive {
                    continue;
                }
                actor.stats.hp = (actor.stats.hp + amount.max(0)).min(actor.stats.max_hp);
            }
            MutationRequest::EmitMessage { text } => {
                world.push_message(text);
            }
            MutationRequest::SpawnRequest { name, x, y } => {
                if !world.is_walkable(x, y) || world.blocking_actor_at(x, y).is_some() {
                    debug!(name, x, y, "dropping spawn request for occupied tile");
                    continue;
                }
                let id = world.spawn(name, x, y, Stats::new(1, 0));
                debug!(%id, "spawned actor from guest request");
            }
        }
    }
}
