//! Lua 5.4 guest runtime for the delve engine.
//!
//! Implements [`delve_core::GuestRuntime`] on top of sandboxed, per-script
//! [`mlua`] states:
//!
//! - [`sandbox`]: strips ambient authority from each Lua state
//! - [`runtime`]: script loading, per-call budgets, the guest call path
//! - [`host_api`]: the `game` table (snapshot queries + mutation queue)
//! - [`manifest`]: `-- subscribe:` / `-- handler:` header parsing
//! - [`handlers`]: directory discovery wiring manifests into the event bus

pub mod error;
pub mod handlers;
pub mod host_api;
pub mod manifest;
pub mod runtime;
pub mod sandbox;

pub use error::{LuaResult, LuaRuntimeError};
pub use handlers::EventHandlerRegistry;
pub use manifest::{HandlerPair, ManifestParser};
pub use runtime::{ScriptHandle, ScriptRuntime};
pub use sandbox::sandboxed_lua;
