//! Core of the delve turn-based simulation engine.
//!
//! This crate owns the authoritative data model and the host side of the
//! execution engine:
//!
//! - [`world`]: the entity arena, tile grid, read-only guest views, and the
//!   queued mutation requests guests use instead of direct writes
//! - [`pipeline`]: validation and execution of [`Action`]s into
//!   [`ActionOutcome`]s
//! - [`events`]: typed [`GameEvent`]s and the [`EventBus`] that dispatches
//!   them host-first, then to script subscribers
//! - [`behavior`]: the [`BehaviorRegistry`] resolving behavior ids with a
//!   guaranteed fallback
//! - [`guest`]: the [`GuestRuntime`] trait the scripting crate implements
//!
//! Core deliberately knows nothing about Lua. The guest boundary is the
//! `GuestRuntime` trait plus `serde_json::Value` payloads and opaque ids,
//! so a different runtime can be slotted in without touching the engine.

pub mod action;
pub mod behavior;
pub mod config;
pub mod error;
pub mod events;
pub mod guest;
pub mod outcome;
pub mod pipeline;
pub mod world;

pub use action::{wait_descriptor, Action, ActionKind};
pub use behavior::{BehaviorBinding, BehaviorRegistry, NativeBehavior};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use events::{event_types, EventBus, GameEvent, HostHandler, ScriptSubscription};
pub use guest::{CallOutcome, GuestRuntime, NoScripting};
pub use outcome::{ActionOutcome, OutcomeStatus};
pub use pipeline::ActionPipeline;
pub use world::{
    apply_mutations, Actor, ActorId, ActorView, MutationRequest, OngoingAction, Stats, World,
    WorldView,
};
