//! Behavior resolution: string id to a native or script-backed decision
//! function, with a guaranteed fallback.
//!
//! A behavior decides what one actor does this turn and answers with an
//! action descriptor (`{"action": "...", ...}`). Script failures of any
//! class substitute the configured default for that turn only; the binding
//! stays registered so transient failures self-heal on the next turn.

use crate::action::wait_descriptor;
use crate::guest::{CallOutcome, GuestRuntime};
use crate::world::{ActorId, World};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Host-native decision function.
pub type NativeBehavior = fn(ActorId, &World) -> Value;

/// What a behavior id is bound to.
pub enum BehaviorBinding {
    Native(NativeBehavior),
    Script {
        path: String,
        entry_point: String,
    },
}

impl std::fmt::Debug for BehaviorBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(_) => f.write_str("Native(..)"),
            Self::Script { path, entry_point } => f
                .debug_struct("Script")
                .field("path", path)
                .field("entry_point", entry_point)
                .finish(),
        }
    }
}

/// Maps behavior ids to implementations; one binding per id.
#[derive(Debug)]
pub struct BehaviorRegistry {
    bindings: HashMap<String, BehaviorBinding>,
    default_descriptor: Value,
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            default_descriptor: wait_descriptor(),
        }
    }

    /// Registry pre-populated with the built-in native behaviors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_native("wander", builtin_wander);
        registry.register_native("aggressive", builtin_aggressive);
        registry
    }

    /// Override the descriptor substituted when a behavior fails.
    pub fn with_default_descriptor(mut self, descriptor: Value) -> Self {
        self.default_descriptor = descriptor;
        self
    }

    pub fn register_native(&mut self, id: impl Into<String>, behavior: NativeBehavior) {
        let id = id.into();
        debug!(behavior = %id, "registered native behavior");
        self.bindings.insert(id, BehaviorBinding::Native(behavior));
    }

    pub fn register_script(
        &mut self,
        id: impl Into<String>,
        path: impl Into<String>,
        entry_point: impl Into<String>,
    ) {
        let id = id.into();
        let path = path.into();
        let entry_point = entry_point.into();
        debug!(behavior = %id, script = %path, entry = %entry_point, "registered script behavior");
        self.bindings
            .insert(id, BehaviorBinding::Script { path, entry_point });
    }

    pub fn resolve(&self, id: &str) -> Option<&BehaviorBinding> {
        self.bindings.get(id)
    }

    /// Decide an action descriptor for `actor` using the behavior bound to
    /// `id`. Always returns a usable descriptor: unknown ids and failed
    /// guest calls substitute the default (with a warning) rather than
    /// propagating an error into the turn loop.
    pub fn decide(
        &self,
        id: &str,
        actor: ActorId,
        world: &mut World,
        guest: &mut dyn GuestRuntime,
    ) -> Value {
        match self.bindings.get(id) {
            None => {
                warn!(behavior = %id, "unknown behavior id; substituting default");
                self.default_descriptor.clone()
            }
            Some(BehaviorBinding::Native(behavior)) => behavior(actor, world),
            Some(BehaviorBinding::Script { path, entry_point }) => {
                let args = serde_json::json!({ "actor_id": actor.raw() });
                match guest.call(path, entry_point, args, world) {
                    CallOutcome::Completed(value) if is_descriptor(&value) => value,
                    CallOutcome::Completed(value) => {
                        warn!(
                            behavior = %id,
                            script = %path,
                            returned = %value,
                            "script behavior returned a non-descriptor; substituting default"
                        );
                        self.default_descriptor.clone()
                    }
                    outcome => {
                        warn!(
                            behavior = %id,
                            script = %path,
                            entry = %entry_point,
                            outcome = outcome.label(),
                            "script behavior failed; substituting default"
                        );
                        self.default_descriptor.clone()
                    }
                }
            }
        }
    }
}

fn is_descriptor(value: &Value) -> bool {
    value.get("action").map(Value::is_string).unwrap_or(false)
}

/// Step through the four cardinal directions in turn order, waiting when
/// the preferred tile is taken. Deterministic on purpose.
fn builtin_wander(actor: ActorId, world: &World) -> Value {
    const STEPS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
    let Some(me) = world.actor(actor) else {
        return wait_descriptor();
    };
    let (dx, dy) = STEPS[(world.turn() % 4) as usize];
    let (nx, ny) = (me.x + dx, me.y + dy);
    if world.is_walkable(nx, ny) && world.blocking_actor_at(nx, ny).is_none() {
        serde_json::json!({ "action": "move", "dx": dx, "dy": dy })
    } else {
        wait_descriptor()
    }
}

/// Close on the nearest living actor and attack when adjacent.
fn builtin_aggressive(actor: ActorId, world: &World) -> Value {
    let Some(me) = world.actor(actor) else {
        return wait_descriptor();
    };
    let target = world
        .actors()
        .filter(|a| a.id != actor && a.alive)
        .min_by_key(|a| (a.distance_to(me.x, me.y), a.id));
    let Some(target) = target else {
        return wait_descriptor();
    };

    if me.distance_to(target.x, target.y) <= 1 {
        return serde_json::json!({ "action": "attack", "target_id": target.id.raw() });
    }

    let dx = (target.x - me.x).signum();
    let dy = (target.y - me.y).signum();
    let (nx, ny) = (me.x + dx, me.y + dy);
    if world.is_walkable(nx, ny) && world.blocking_actor_at(nx, ny).is_none() {
        serde_json::json!({ "action": "move", "dx": dx, "dy": dy })
    } else {
        wait_descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::NoScripting;
    use crate::world::Stats;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FailingGuest {
        calls: Rc<Cell<usize>>,
        outcome: fn() -> CallOutcome,
    }

    impl GuestRuntime for FailingGuest {
        fn call(&mut self, _: &str, _: &str, _: Value, _: &mut World) -> CallOutcome {
            self.calls.set(self.calls.get() + 1);
            (self.outcome)()
        }
    }

    fn world() -> (World, ActorId) {
        let mut world = World::new(6, 6);
        let id = world.spawn("npc", 2, 2, Stats::new(10, 2));
        (world, id)
    }

    #[test]
    fn native_behavior_is_invoked() {
        let (mut world, id) = world();
        let mut registry = BehaviorRegistry::new();
        registry.register_native("always_wait", |_, _| wait_descriptor());
        let descriptor = registry.decide("always_wait", id, &mut world, &mut NoScripting);
        assert_eq!(descriptor, json!({"action": "wait"}));
    }

    #[test]
    fn unknown_behavior_substitutes_default() {
        let (mut world, id) = world();
        let registry = BehaviorRegistry::new();
        let descriptor = registry.decide("missing", id, &mut world, &mut NoScripting);
        assert_eq!(descriptor, wait_descriptor());
    }

    #[test]
    fn script_failure_substitutes_default_and_binding_survives() {
        // P6: the fallback fires per call and the binding stays registered.
        let (mut world, id) = world();
        let mut registry = BehaviorRegistry::new();
        registry.register_script("ai_aggressive", "broken.lua", "decide");

        let calls = Rc::new(Cell::new(0));
        let mut guest = FailingGuest {
            calls: calls.clone(),
            outcome: || CallOutcome::RuntimeError("undefined field".into()),
        };

        let descriptor = registry.decide("ai_aggressive", id, &mut world, &mut guest);
        assert_eq!(descriptor, wait_descriptor());
        assert!(registry.resolve("ai_aggressive").is_some());

        // Still consulted on the next turn.
        registry.decide("ai_aggressive", id, &mut world, &mut guest);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn non_descriptor_return_substitutes_default() {
        let (mut world, id) = world();
        let mut registry = BehaviorRegistry::new();
        registry.register_script("odd", "odd.lua", "decide");
        let mut guest = FailingGuest {
            calls: Rc::new(Cell::new(0)),
            outcome: || CallOutcome::Completed(json!(42)),
        };
        let descriptor = registry.decide("odd", id, &mut world, &mut guest);
        assert_eq!(descriptor, wait_descriptor());
    }

    #[test]
    fn custom_default_descriptor_is_used() {
        let (mut world, id) = world();
        let registry =
            BehaviorRegistry::new().with_default_descriptor(json!({"action": "pickup"}));
        let descriptor = registry.decide("missing", id, &mut world, &mut NoScripting);
        assert_eq!(descriptor["action"], "pickup");
    }

    #[test]
    fn aggressive_attacks_adjacent_and_approaches_distant() {
        let (mut world, id) = world();
        let prey = world.spawn("prey", 3, 2, Stats::new(5, 0));
        let registry = BehaviorRegistry::with_builtins();

        let descriptor = registry.decide("aggressive", id, &mut world, &mut NoScripting);
        assert_eq!(descriptor["action"], "attack");
        assert_eq!(descriptor["target_id"], prey.raw());

        world.actor_mut(prey).unwrap().x = 5;
        let descriptor = registry.decide("aggressive", id, &mut world, &mut NoScripting);
        assert_eq!(descriptor["action"], "move");
        assert_eq!(descriptor["dx"], 1);
    }

    #[test]
    fn wander_yields_parseable_descriptors() {
        let (mut world, id) = world();
        let registry = BehaviorRegistry::with_builtins();
        for _ in 0..4 {
            let descriptor = registry.decide("wander", id, &mut world, &mut NoScripting);
            assert!(crate::action::Action::from_descriptor(id, &descriptor).is_ok());
            world.advance_turn();
        }
    }
}
