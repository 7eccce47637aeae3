//! The guest execution boundary.
//!
//! Core never links against a scripting runtime. It defines the trait a
//! runtime must implement and the outcome taxonomy for a single guest call;
//! the `delve-lua` crate provides the Lua implementation. Everything that
//! crosses this boundary is a `serde_json::Value` or an opaque id.

use crate::world::World;
use serde_json::Value;

/// How a single guest call ended.
///
/// Guest-originating failures never propagate as host errors past the
/// runtime boundary; callers convert non-completed outcomes into logged
/// diagnostics plus a safe default.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Completed(Value),
    TimedOut,
    RuntimeError(String),
    LoadError(String),
}

impl CallOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// The returned value, if the call completed.
    pub fn value(self) -> Option<Value> {
        match self {
            Self::Completed(v) => Some(v),
            _ => None,
        }
    }

    /// Short label for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::TimedOut => "timed_out",
            Self::RuntimeError(_) => "runtime_error",
            Self::LoadError(_) => "load_error",
        }
    }
}

/// A runtime capable of executing one guest function call under the
/// engine's isolation rules: bounded wall-clock budget, no direct state
/// access, mutation via queued requests applied only after a completed
/// return.
pub trait GuestRuntime {
    /// Invoke `entry_point` in the script unit at `script_path` with `args`
    /// marshaled into the guest. The world is passed mutably so the runtime
    /// can apply the call's mutation queue after a completed return; an
    /// aborted call must leave it untouched.
    fn call(
        &mut self,
        script_path: &str,
        entry_point: &str,
        args: Value,
        world: &mut World,
    ) -> CallOutcome;
}

/// A `GuestRuntime` for hosts that run without a scripting layer; every
/// call reports a load error.
#[derive(Debug, Default)]
pub struct NoScripting;

impl GuestRuntime for NoScripting {
    fn call(&mut self, script_path: &str, _: &str, _: Value, _: &mut World) -> CallOutcome {
        CallOutcome::LoadError(format!("no guest runtime configured (wanted {script_path})"))
    }
}
