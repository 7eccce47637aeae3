//! Game events and their dispatch.

mod bus;
mod event;

pub use bus::{EventBus, HostHandler, ScriptSubscription};
pub use event::{event_types, GameEvent};
