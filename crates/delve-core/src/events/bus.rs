//! Typed publish/subscribe dispatch.
//!
//! One event fans out to host-native subscribers first, then to script
//! subscribers, each group in registration order. A failing subscriber is
//! logged and never stops delivery to the rest of the event or to later
//! events in the same batch.

use super::GameEvent;
use crate::error::EngineError;
use crate::guest::{CallOutcome, GuestRuntime};
use crate::world::World;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Host-native subscriber. An `Err` is contained by the bus: logged,
/// delivery continues.
pub type HostHandler = Box<dyn FnMut(&GameEvent, &mut World) -> Result<(), EngineError>>;

struct HostSubscription {
    event_type: String,
    name: String,
    handler: HostHandler,
}

/// A script-backed subscription. Uniqueness is keyed on the whole triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSubscription {
    pub event_type: String,
    pub script_path: String,
    pub entry_point: String,
}

struct EventHistory {
    buffer: VecDeque<GameEvent>,
    capacity: usize,
}

impl EventHistory {
    fn record(&mut self, event: &GameEvent) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event.clone());
    }
}

/// The pub/sub hub for [`GameEvent`]s.
pub struct EventBus {
    host: Vec<HostSubscription>,
    script: Vec<ScriptSubscription>,
    history: Option<EventHistory>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            host: Vec::new(),
            script: Vec::new(),
            history: None,
        }
    }

    /// A bus configured per [`EngineConfig`](crate::EngineConfig):
    /// history enabled when `event_history` is non-zero.
    pub fn from_config(config: &crate::EngineConfig) -> Self {
        Self::new().with_history(config.event_history)
    }

    /// Enable the bounded diagnostic history ring. Never affects dispatch.
    pub fn with_history(mut self, capacity: usize) -> Self {
        if capacity > 0 {
            self.history = Some(EventHistory {
                buffer: VecDeque::with_capacity(capacity),
                capacity,
            });
        }
        self
    }

    /// Register a host-native subscriber for one event type.
    pub fn subscribe(
        &mut self,
        event_type: impl Into<String>,
        name: impl Into<String>,
        handler: HostHandler,
    ) {
        let subscription = HostSubscription {
            event_type: event_type.into(),
            name: name.into(),
            handler,
        };
        debug!(
            event_type = %subscription.event_type,
            name = %subscription.name,
            "registered host subscriber"
        );
        self.host.push(subscription);
    }

    /// Register a script-backed subscriber.
    ///
    /// Returns `false` when the `(event_type, script_path, entry_point)`
    /// triple is already registered; the duplicate is ignored, making
    /// re-scans idempotent.
    pub fn subscribe_script(
        &mut self,
        event_type: impl Into<String>,
        script_path: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> bool {
        let subscription = ScriptSubscription {
            event_type: event_type.into(),
            script_path: script_path.into(),
            entry_point: entry_point.into(),
        };
        if self.script.contains(&subscription) {
            debug!(
                event_type = %subscription.event_type,
                script = %subscription.script_path,
                entry = %subscription.entry_point,
                "duplicate script subscription ignored"
            );
            return false;
        }
        debug!(
            event_type = %subscription.event_type,
            script = %subscription.script_path,
            entry = %subscription.entry_point,
            "registered script subscriber"
        );
        self.script.push(subscription);
        true
    }

    /// Remove every subscription owned by `script_path`. Returns how many
    /// were removed.
    pub fn unsubscribe_script(&mut self, script_path: &str) -> usize {
        let before = self.script.len();
        self.script.retain(|s| s.script_path != script_path);
        before - self.script.len()
    }

    pub fn script_subscriptions(&self) -> &[ScriptSubscription] {
        &self.script
    }

    /// Recent events, oldest first, when history is enabled.
    pub fn history(&self) -> Vec<&GameEvent> {
        self.history
            .as_ref()
            .map(|h| h.buffer.iter().collect())
            .unwrap_or_default()
    }

    /// Dispatch one event: host subscribers in registration order, then
    /// script subscribers in registration order.
    pub fn publish(&mut self, event: &GameEvent, world: &mut World, guest: &mut dyn GuestRuntime) {
        if let Some(history) = self.history.as_mut() {
            history.record(event);
        }

        for subscription in self
            .host
            .iter_mut()
            .filter(|s| s.event_type == event.event_type)
        {
            if let Err(err) = (subscription.handler)(event, world) {
                warn!(
                    subscriber = %subscription.name,
                    event_type = %event.event_type,
                    %err,
                    "host subscriber failed; continuing delivery"
                );
            }
        }

        // Borrow-split: guest calls need the subscription list immutably
        // while the runtime mutates the world.
        let script_targets: Vec<ScriptSubscription> = self
            .script
            .iter()
            .filter(|s| s.event_type == event.event_type)
            .cloned()
            .collect();

        if script_targets.is_empty() {
            return;
        }
        // Marshal once; a clone per subscriber is cheaper than re-serializing
        // and keeps a marshaling failure from cutting the loop short.
        let args = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(err) => {
                warn!(
                    event_type = %event.event_type,
                    %err,
                    "failed to marshal event; skipping script dispatch for it"
                );
                return;
            }
        };

        for subscription in script_targets {
            match guest.call(
                &subscription.script_path,
                &subscription.entry_point,
                args.clone(),
                world,
            ) {
                CallOutcome::Completed(_) => {}
                outcome @ CallOutcome::TimedOut => {
                    warn!(
                        script = %subscription.script_path,
                        entry = %subscription.entry_point,
                        event_type = %event.event_type,
                        outcome = outcome.label(),
                        "script subscriber timed out; continuing delivery"
                    );
                }
                CallOutcome::RuntimeError(message) | CallOutcome::LoadError(message) => {
                    warn!(
                        script = %subscription.script_path,
                        entry = %subscription.entry_point,
                        event_type = %event.event_type,
                        %message,
                        "script subscriber failed; continuing delivery"
                    );
                }
            }
        }
    }

    /// Dispatch a batch in array order; a failure in one event never stops
    /// delivery of later events.
    pub fn publish_all(
        &mut self,
        events: &[GameEvent],
        world: &mut World,
        guest: &mut dyn GuestRuntime,
    ) {
        for event in events {
            self.publish(event, world, guest);
        }
    }
}
