//! Validation and execution of actions.
//!
//! `validate` is side-effect-free; `execute` is the sole mutation point for
//! authoritative state. Validation failures come back as outcomes, never as
//! errors, so the turn driver and AI callers share one code path.

use crate::action::{Action, ActionKind};
use crate::events::{event_types, GameEvent};
use crate::outcome::ActionOutcome;
use crate::world::{ActorId, OngoingAction, World};
use serde_json::json;
use tracing::debug;

/// Stateless executor for one action at a time.
#[derive(Debug, Default)]
pub struct ActionPipeline;

impl ActionPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Precondition check. Must not mutate state; an action that validates
    /// will not execute to `Invalid`.
    pub fn validate(&self, action: &Action, world: &World) -> bool {
        let Some(actor) = world.actor(action.actor) else {
            return false;
        };
        if !actor.alive {
            return false;
        }

        match &action.kind {
            ActionKind::Move { dx, dy } => {
                if !is_step(*dx, *dy) {
                    return false;
                }
                let (nx, ny) = (actor.x + dx, actor.y + dy);
                world.is_walkable(nx, ny) && world.blocking_actor_at(nx, ny).is_none()
            }
            ActionKind::Attack { target } => {
                let Some(target) = world.actor(*target) else {
                    return false;
                };
                target.id != actor.id && target.alive && actor.distance_to(target.x, target.y) <= 1
            }
            ActionKind::Wait => true,
            ActionKind::Pickup => !world.items_at(actor.x, actor.y).is_empty(),
            ActionKind::Gather { turns } => *turns > 0 && actor.ongoing.is_none(),
        }
    }

    /// Execute the action against the world and classify the result.
    pub fn execute(&self, action: &Action, world: &mut World) -> ActionOutcome {
        let Some(actor) = world.actor(action.actor) else {
            return ActionOutcome::invalid(format!("unknown actor {}", action.actor));
        };
        if !actor.alive {
            return ActionOutcome::invalid(format!("actor {} is dead", action.actor));
        }

        match action.kind.clone() {
            ActionKind::Move { dx, dy } => self.execute_move(action.actor, dx, dy, world),
            ActionKind::Attack { target } => self.execute_attack(action.actor, target, world),
            ActionKind::Wait => ActionOutcome::success(),
            ActionKind::Pickup => self.execute_pickup(action.actor, world),
            ActionKind::Gather { turns } => self.execute_gather(action.actor, turns, world),
        }
    }

    fn execute_move(&self, id: ActorId, dx: i32, dy: i32, world: &mut World) -> ActionOutcome {
        if !is_step(dx, dy) {
            return ActionOutcome::invalid(format!("malformed move delta ({dx}, {dy})"));
        }
        let Some((from_x, from_y)) = world.actor(id).map(|a| (a.x, a.y)) else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        let (to_x, to_y) = (from_x + dx, from_y + dy);

        if !world.is_walkable(to_x, to_y) {
            return ActionOutcome::blocked("The way is blocked.");
        }
        if let Some(occupant) = world.blocking_actor_at(to_x, to_y) {
            let name = world
                .actor(occupant)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "something".to_string());
            return ActionOutcome::blocked(format!("blocked by {name}"));
        }

        let turn = world.turn();
        let Some(actor) = world.actor_mut(id) else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        actor.x = to_x;
        actor.y = to_y;
        debug!(actor = %id, to_x, to_y, "actor moved");

        ActionOutcome::success().with_event(GameEvent::new(
            event_types::ACTOR_MOVED,
            json!({
                "actor_id": id.raw(),
                "from_x": from_x,
                "from_y": from_y,
                "to_x": to_x,
                "to_y": to_y,
            }),
            turn,
        ))
    }

    fn execute_attack(&self, id: ActorId, target_id: ActorId, world: &mut World) -> ActionOutcome {
        if id == target_id {
            return ActionOutcome::invalid("an actor cannot attack itself");
        }
        let Some((attacker_name, attack, ax, ay)) = world
            .actor(id)
            .map(|a| (a.name.clone(), a.stats.attack, a.x, a.y))
        else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        let Some(target) = world.actor(target_id) else {
            return ActionOutcome::failure("There is nothing there to attack.");
        };
        if !target.alive {
            return ActionOutcome::failure(format!("{} is already dead.", target.name));
        }
        if target.distance_to(ax, ay) > 1 {
            return ActionOutcome::failure(format!("{} is out of reach.", target.name));
        }

        let turn = world.turn();
        let damage = attack.max(0);
        let Some(target) = world.actor_mut(target_id) else {
            return ActionOutcome::failure("There is nothing there to attack.");
        };
        target.stats.hp -= damage;
        let target_name = target.name.clone();
        let died = target.stats.hp <= 0;
        if died {
            target.stats.hp = 0;
            target.alive = false;
            target.blocks = false;
        }

        let mut outcome = ActionOutcome::success()
            .with_message(format!("{attacker_name} hits {target_name} for {damage}."))
            .with_event(GameEvent::new(
                event_types::ENTITY_ATTACKED,
                json!({
                    "attacker_id": id.raw(),
                    "target_id": target_id.raw(),
                    "damage": damage,
                }),
                turn,
            ));

        if died {
            outcome = outcome
                .with_message(format!("{target_name} dies."))
                .with_event(GameEvent::new(
                    event_types::ENTITY_DIED,
                    json!({
                        "entity_id": target_id.raw(),
                        "killer_id": id.raw(),
                    }),
                    turn,
                ));
        }
        outcome
    }

    fn execute_pickup(&self, id: ActorId, world: &mut World) -> ActionOutcome {
        let Some((x, y)) = world.actor(id).map(|a| (a.x, a.y)) else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        let items = world.take_items(x, y);
        if items.is_empty() {
            return ActionOutcome::failure("There is nothing here to pick up.");
        }

        let turn = world.turn();
        let listing = items.join(", ");
        let Some(actor) = world.actor_mut(id) else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        let name = actor.name.clone();
        actor.inventory.extend(items.iter().cloned());

        ActionOutcome::success()
            .with_message(format!("{name} picks up: {listing}."))
            .with_event(GameEvent::new(
                event_types::ITEM_PICKED_UP,
                json!({ "actor_id": id.raw(), "items": items }),
                turn,
            ))
    }

    fn execute_gather(&self, id: ActorId, turns: u32, world: &mut World) -> ActionOutcome {
        if turns == 0 {
            return ActionOutcome::invalid("gather requires at least one turn");
        }
        let turn = world.turn();
        let Some(actor) = world.actor_mut(id) else {
            return ActionOutcome::invalid(format!("unknown actor {id}"));
        };
        if actor.ongoing.is_some() {
            return ActionOutcome::failure(format!("{} is already busy.", actor.name));
        }
        actor.ongoing = Some(OngoingAction {
            kind: "gather".to_string(),
            turns_remaining: turns,
        });

        ActionOutcome::success().with_event(GameEvent::new(
            event_types::GATHER_STARTED,
            json!({ "actor_id": id.raw(), "turns": turns }),
            turn,
        ))
    }

    /// Advance an actor's multi-turn action by one turn, if one is in
    /// progress. Returns `None` when the actor has nothing ongoing (or no
    /// longer exists), letting the driver fall through to normal decision
    /// making.
    pub fn resume_ongoing(&self, id: ActorId, world: &mut World) -> Option<ActionOutcome> {
        let turn = world.turn();
        let actor = world.actor_mut(id)?;
        if !actor.alive {
            actor.ongoing = None;
            return None;
        }
        let mut ongoing = actor.ongoing.take()?;
        ongoing.turns_remaining -= 1;

        if ongoing.turns_remaining == 0 {
            let name = actor.name.clone();
            let kind = ongoing.kind.clone();
            return Some(
                ActionOutcome::success()
                    .with_message(format!("{name} finishes {kind}ing."))
                    .with_event(GameEvent::new(
                        event_types::GATHER_COMPLETED,
                        json!({ "actor_id": id.raw(), "kind": kind }),
                        turn,
                    )),
            );
        }

        let remaining = ongoing.turns_remaining;
        let kind = ongoing.kind.clone();
        actor.ongoing = Some(ongoing);
        Some(ActionOutcome::success().with_event(GameEvent::new(
            event_types::GATHER_PROGRESS,
            json!({ "actor_id": id.raw(), "kind": kind, "turns_remaining": remaining }),
            turn,
        )))
    }
}

fn is_step(dx: i32, dy: i32) -> bool {
    dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeStatus;
    use crate::world::Stats;

    fn fixture() -> (World, ActorId, ActorId) {
        let mut world = World::new(8, 8);
        let player = world.spawn("player", 1, 1, Stats::new(20, 5));
        let goblin = world.spawn("goblin", 2, 1, Stats::new(5, 2));
        (world, player, goblin)
    }

    #[test]
    fn move_into_open_tile_succeeds_and_emits_event() {
        let (mut world, player, _) = fixture();
        let action = Action::new(player, ActionKind::Move { dx: 0, dy: 1 });
        let pipeline = ActionPipeline::new();
        assert!(pipeline.validate(&action, &world));

        let outcome = pipeline.execute(&action, &mut world);
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.took_turn);
        assert_eq!(outcome.events[0].event_type, "actor_moved");
        let actor = world.actor(player).unwrap();
        assert_eq!((actor.x, actor.y), (1, 2));
    }

    #[test]
    fn move_into_blocking_entity_is_blocked_without_mutation() {
        // S5: destination occupied by a non-living blocking entity.
        let (mut world, player, _) = fixture();
        let boulder = world.spawn("boulder", 1, 2, Stats::new(1, 0));
        world.actor_mut(boulder).unwrap().alive = false;

        let action = Action::new(player, ActionKind::Move { dx: 0, dy: 1 });
        let pipeline = ActionPipeline::new();
        let outcome = pipeline.execute(&action, &mut world);

        assert_eq!(outcome.status, OutcomeStatus::Blocked);
        assert!(!outcome.took_turn);
        assert!(outcome.messages[0].contains("blocked"));
        let actor = world.actor(player).unwrap();
        assert_eq!((actor.x, actor.y), (1, 1));
    }

    #[test]
    fn move_into_wall_is_blocked() {
        let (mut world, player, _) = fixture();
        world.set_wall(0, 1, true);
        let action = Action::new(player, ActionKind::Move { dx: -1, dy: 0 });
        let outcome = ActionPipeline::new().execute(&action, &mut world);
        assert_eq!(outcome.status, OutcomeStatus::Blocked);
    }

    #[test]
    fn oversized_move_delta_is_invalid() {
        let (mut world, player, _) = fixture();
        let action = Action::new(player, ActionKind::Move { dx: 5, dy: 0 });
        let pipeline = ActionPipeline::new();
        assert!(!pipeline.validate(&action, &world));
        assert_eq!(
            pipeline.execute(&action, &mut world).status,
            OutcomeStatus::Invalid
        );
    }

    #[test]
    fn unknown_actor_is_invalid() {
        let (mut world, _, _) = fixture();
        let action = Action::new(ActorId::from_raw(999), ActionKind::Wait);
        let outcome = ActionPipeline::new().execute(&action, &mut world);
        assert!(outcome.is_invalid());
    }

    #[test]
    fn attack_deals_damage_and_kill_emits_entity_died() {
        let (mut world, player, goblin) = fixture();
        let pipeline = ActionPipeline::new();
        let action = Action::new(player, ActionKind::Attack { target: goblin });
        assert!(pipeline.validate(&action, &world));

        let outcome = pipeline.execute(&action, &mut world);
        assert!(outcome.is_success());
        let types: Vec<&str> = outcome.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["entity_attacked", "entity_died"]);
        assert_eq!(outcome.events[1].data["killer_id"], player.raw());

        let goblin = world.actor(goblin).unwrap();
        assert!(!goblin.alive);
        assert!(!goblin.blocks);
    }

    #[test]
    fn attack_out_of_reach_fails_without_turn() {
        let (mut world, player, goblin) = fixture();
        world.actor_mut(goblin).unwrap().x = 6;
        let action = Action::new(player, ActionKind::Attack { target: goblin });
        let pipeline = ActionPipeline::new();
        assert!(!pipeline.validate(&action, &world));
        let outcome = pipeline.execute(&action, &mut world);
        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert!(!outcome.took_turn);
        assert_eq!(world.actor(goblin).unwrap().stats.hp, 5);
    }

    #[test]
    fn wait_consumes_turn_without_mutation() {
        let (mut world, player, _) = fixture();
        let before = world.actor(player).unwrap().clone();
        let outcome =
            ActionPipeline::new().execute(&Action::new(player, ActionKind::Wait), &mut world);
        assert!(outcome.is_success());
        assert!(outcome.took_turn);
        let after = world.actor(player).unwrap();
        assert_eq!((before.x, before.y, before.stats.hp), (after.x, after.y, after.stats.hp));
    }

    #[test]
    fn pickup_moves_items_to_inventory() {
        let (mut world, player, _) = fixture();
        world.place_item(1, 1, "potion");
        let pipeline = ActionPipeline::new();
        let action = Action::new(player, ActionKind::Pickup);
        assert!(pipeline.validate(&action, &world));

        let outcome = pipeline.execute(&action, &mut world);
        assert!(outcome.is_success());
        assert_eq!(outcome.events[0].event_type, "item_picked_up");
        assert_eq!(world.actor(player).unwrap().inventory, vec!["potion"]);
        assert!(world.items_at(1, 1).is_empty());

        // Second pickup finds nothing.
        let outcome = pipeline.execute(&action, &mut world);
        assert_eq!(outcome.status, OutcomeStatus::Failure);
    }

    #[test]
    fn gather_spans_turns_via_resumable_state() {
        let (mut world, player, _) = fixture();
        let pipeline = ActionPipeline::new();
        let action = Action::new(player, ActionKind::Gather { turns: 2 });

        let outcome = pipeline.execute(&action, &mut world);
        assert_eq!(outcome.events[0].event_type, "gather_started");
        assert!(world.actor(player).unwrap().ongoing.is_some());

        // Starting another action while busy is a plain failure.
        let outcome = pipeline.execute(&action, &mut world);
        assert_eq!(outcome.status, OutcomeStatus::Failure);

        let progress = pipeline.resume_ongoing(player, &mut world).unwrap();
        assert_eq!(progress.events[0].event_type, "gather_progress");

        let done = pipeline.resume_ongoing(player, &mut world).unwrap();
        assert_eq!(done.events[0].event_type, "gather_completed");
        assert!(world.actor(player).unwrap().ongoing.is_none());
        assert!(pipeline.resume_ongoing(player, &mut world).is_none());
    }

    #[test]
    fn validate_implies_execute_is_never_invalid() {
        // P1: for every action that validates, execute never classifies it
        // as invalid.
        let (_, player, goblin) = fixture();
        let candidates = vec![
            Action::new(player, ActionKind::Move { dx: 1, dy: 0 }),
            Action::new(player, ActionKind::Move { dx: -1, dy: -1 }),
            Action::new(player, ActionKind::Move { dx: 2, dy: 0 }),
            Action::new(player, ActionKind::Attack { target: goblin }),
            Action::new(player, ActionKind::Attack { target: player }),
            Action::new(player, ActionKind::Wait),
            Action::new(player, ActionKind::Pickup),
            Action::new(player, ActionKind::Gather { turns: 0 }),
            Action::new(player, ActionKind::Gather { turns: 2 }),
            Action::new(ActorId::from_raw(42), ActionKind::Wait),
        ];

        let pipeline = ActionPipeline::new();
        for action in candidates {
            let (mut world, _, _) = fixture();
            if pipeline.validate(&action, &world) {
                let outcome = pipeline.execute(&action, &mut world);
                assert!(
                    !outcome.is_invalid(),
                    "validated action executed to invalid: {action:?}"
                );
            }
        }
    }
}
