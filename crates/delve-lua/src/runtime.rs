//! Lua script loading and budgeted guest calls.
//!
//! One [`ScriptRuntime`] owns every loaded script. Each script gets its own
//! sandboxed [`Lua`] state, so globals in one script are invisible to every
//! other script and survive between calls into the same script. Calls run
//! under a wall-clock budget enforced by a debug hook that fires every N
//! instructions and aborts the VM once the budget is spent.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use delve_core::{
    apply_mutations, CallOutcome, EngineConfig, GuestRuntime, World,
};
use mlua::{Function, HookTriggers, Lua, LuaSerdeExt, Value as LuaValue, VmState};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::host_api;
use crate::sandbox;

/// A loaded (or failed-to-load) script unit.
pub struct ScriptHandle {
    path: PathBuf,
    state: HandleState,
}

enum HandleState {
    Ready {
        lua: Lua,
        entry_points: HashSet<String>,
    },
    /// Load failed; the error is replayed on every call until a reload.
    Failed(String),
}

impl ScriptHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready { .. })
    }

    pub fn load_error(&self) -> Option<&str> {
        match &self.state {
            HandleState::Failed(msg) => Some(msg),
            HandleState::Ready { .. } => None,
        }
    }

    /// Global functions callable as entry points, when the script loaded.
    pub fn entry_points(&self) -> Option<&HashSet<String>> {
        match &self.state {
            HandleState::Ready { entry_points, .. } => Some(entry_points),
            HandleState::Failed(_) => None,
        }
    }
}

/// Owns loaded scripts and executes budgeted calls into them.
pub struct ScriptRuntime {
    handles: HashMap<PathBuf, ScriptHandle>,
    budget: Duration,
    instruction_interval: u32,
}

impl ScriptRuntime {
    pub fn new(budget: Duration, instruction_interval: u32) -> Self {
        Self {
            handles: HashMap::new(),
            budget,
            instruction_interval: instruction_interval.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Duration::from_millis(config.guest_budget_ms),
            config.watchdog_instruction_interval,
        )
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Load the script at `path` if it is not already loaded.
    ///
    /// A failed load is cached as a failed handle; callers see the same
    /// load error until [`reload`](Self::reload) is used.
    pub fn load(&mut self, path: &Path) -> &ScriptHandle {
        if !self.handles.contains_key(path) {
            let handle = load_handle(path);
            self.handles.insert(path.to_path_buf(), handle);
        }
        // just inserted above when absent
        &self.handles[path]
    }

    /// Drop any cached state for `path` and load it fresh.
    pub fn reload(&mut self, path: &Path) -> &ScriptHandle {
        self.handles.remove(path);
        self.load(path)
    }

    pub fn unload(&mut self, path: &Path) -> bool {
        self.handles.remove(path).is_some()
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.handles.get(path).is_some_and(ScriptHandle::is_ready)
    }

    pub fn handle(&self, path: &Path) -> Option<&ScriptHandle> {
        self.handles.get(path)
    }
}

impl GuestRuntime for ScriptRuntime {
    fn call(
        &mut self,
        script_path: &str,
        entry_point: &str,
        args: JsonValue,
        world: &mut World,
    ) -> CallOutcome {
        let budget = self.budget;
        let interval = self.instruction_interval;
        let path = PathBuf::from(script_path);
        let handle = self.load(&path);

        let (lua, entry_points) = match &handle.state {
            HandleState::Failed(msg) => return CallOutcome::LoadError(msg.clone()),
            HandleState::Ready { lua, entry_points } => (lua, entry_points),
        };
        if !entry_points.contains(entry_point) {
            return CallOutcome::LoadError(format!(
                "no entry point `{entry_point}` in {script_path}"
            ));
        }

        // Guests see a snapshot; their writes go through the queue and are
        // applied only after a completed call.
        let view = world.snapshot();
        let (game, queue) = match host_api::install(lua, view) {
            Ok(pair) => pair,
            Err(err) => return CallOutcome::RuntimeError(err.to_string()),
        };
        let func: Function = match lua.globals().get(entry_point) {
            Ok(f) => f,
            Err(err) => return CallOutcome::LoadError(err.to_string()),
        };
        let lua_args = match lua.to_value(&args) {
            Ok(v) => v,
            Err(err) => return CallOutcome::RuntimeError(err.to_string()),
        };

        let (result, timed_out) = call_with_budget(lua, budget, interval, || {
            func.call::<LuaValue>((lua_args, game))
        });

        // The watchdog's verdict wins over whatever the guest returned: a
        // script can catch the abort error with pcall and come back with a
        // normal value, but an over-budget call is timed out and its queued
        // mutations are discarded regardless.
        if timed_out {
            queue.borrow_mut().clear();
            warn!(
                script = script_path,
                entry = entry_point,
                budget_ms = budget.as_millis() as u64,
                "aborted guest call over budget"
            );
            return CallOutcome::TimedOut;
        }

        match result {
            Ok(value) => {
                let requests = std::mem::take(&mut *queue.borrow_mut());
                if !requests.is_empty() {
                    debug!(
                        script = script_path,
                        entry = entry_point,
                        count = requests.len(),
                        "applying guest mutation requests"
                    );
                    apply_mutations(world, requests);
                }
                let json = lua.from_value::<JsonValue>(value).unwrap_or_else(|err| {
                    debug!(script = script_path, %err, "return value not marshalable, treating as null");
                    JsonValue::Null
                });
                CallOutcome::Completed(json)
            }
            Err(err) => CallOutcome::RuntimeError(err.to_string()),
        }
    }
}

fn load_handle(path: &Path) -> ScriptHandle {
    let state = match try_load(path) {
        Ok((lua, entry_points)) => {
            info!(script = %path.display(), entries = entry_points.len(), "loaded script");
            HandleState::Ready { lua, entry_points }
        }
        Err(msg) => {
            warn!(script = %path.display(), error = %msg, "script failed to load");
            HandleState::Failed(msg)
        }
    };
    ScriptHandle { path: path.to_path_buf(), state }
}

fn try_load(path: &Path) -> Result<(Lua, HashSet<String>), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|err| format!("read {}: {err}", path.display()))?;
    let lua = sandbox::sandboxed_lua().map_err(|err| err.to_string())?;
    lua.load(&source)
        .set_name(path.display().to_string())
        .exec()
        .map_err(|err| err.to_string())?;

    let mut entry_points = HashSet::new();
    for pair in lua.globals().pairs::<LuaValue, LuaValue>() {
        let (key, value) = pair.map_err(|err| err.to_string())?;
        if let (LuaValue::String(name), LuaValue::Function(_)) = (key, value) {
            entry_points.insert(name.to_string_lossy());
        }
    }
    Ok((lua, entry_points))
}

/// Run `call` with the VM's instruction hook armed as a wall-clock watchdog.
///
/// The hook fires every `instruction_interval` VM instructions; once the
/// budget is spent it raises a Lua error, unwinding the guest. The flag
/// distinguishes that abort from an ordinary script error.
fn call_with_budget<F>(
    lua: &Lua,
    budget: Duration,
    instruction_interval: u32,
    call: F,
) -> (mlua::Result<LuaValue>, bool)
where
    F: FnOnce() -> mlua::Result<LuaValue>,
{
    let started = Instant::now();
    let timed_out = Rc::new(Cell::new(false));
    let flag = Rc::clone(&timed_out);
    let budget_ms = budget.as_millis() as u64;
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(instruction_interval),
        move |_lua, _debug| {
            if started.elapsed() >= budget {
                flag.set(true);
                return Err(mlua::Error::RuntimeError(format!(
                    "execution budget exceeded ({budget_ms}ms)"
                )));
            }
            Ok(VmState::Continue)
        },
    );
    let result = call();
    lua.remove_hook();
    (result, timed_out.get())
}
