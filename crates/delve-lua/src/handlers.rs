//! Manifest-driven discovery of script event handlers.
//!
//! Scans a directory of `.lua` files, parses each file's manifest header,
//! loads the script, and wires the declared pairs into the [`EventBus`].
//! One bad script never aborts discovery; it is logged and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use delve_core::EventBus;
use tracing::{debug, info, warn};

use crate::error::{LuaResult, LuaRuntimeError};
use crate::manifest::{HandlerPair, ManifestParser};
use crate::runtime::ScriptRuntime;

/// Tracks which scripts contributed which event subscriptions.
pub struct EventHandlerRegistry {
    parser: ManifestParser,
    scripts: HashMap<PathBuf, Vec<HandlerPair>>,
}

impl Default for EventHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandlerRegistry {
    pub fn new() -> Self {
        Self {
            parser: ManifestParser::new(),
            scripts: HashMap::new(),
        }
    }

    /// Discover every `.lua` script under `dir` and register its handlers.
    ///
    /// Files are visited in path order so registration order is stable.
    /// Returns the number of subscriptions added; scripts that fail to
    /// parse or load are skipped with a warning.
    pub fn discover_from(
        &mut self,
        dir: &Path,
        bus: &mut EventBus,
        runtime: &mut ScriptRuntime,
    ) -> LuaResult<usize> {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "handler directory missing, nothing to discover");
            return Ok(0);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "lua"))
            .collect();
        paths.sort();

        let mut registered = 0;
        for path in paths {
            match self.register_script(&path, bus, runtime) {
                Ok(count) => registered += count,
                Err(err) => {
                    warn!(script = %path.display(), error = %err, "skipping script");
                }
            }
        }
        Ok(registered)
    }

    /// Run discovery over every directory named in the engine config.
    pub fn discover_configured(
        &mut self,
        config: &delve_core::EngineConfig,
        bus: &mut EventBus,
        runtime: &mut ScriptRuntime,
    ) -> LuaResult<usize> {
        let mut registered = 0;
        for dir in &config.script_dirs {
            registered += self.discover_from(dir, bus, runtime)?;
        }
        Ok(registered)
    }

    /// Register one script's manifest pairs with the bus.
    ///
    /// Re-registering the same script is idempotent; already-present
    /// (event, script, entry) triples are left alone by the bus.
    pub fn register_script(
        &mut self,
        path: &Path,
        bus: &mut EventBus,
        runtime: &mut ScriptRuntime,
    ) -> LuaResult<usize> {
        let source = std::fs::read_to_string(path)?;
        let pairs = self.parser.parse(&source)?;
        if pairs.is_empty() {
            debug!(script = %path.display(), "no manifest header");
            return Ok(0);
        }

        let declared = self.parser.declared_functions(&source);
        for pair in &pairs {
            if !declared.contains(&pair.entry_point) {
                return Err(LuaRuntimeError::Manifest(format!(
                    "manifest names `{}` but the script defines no such function",
                    pair.entry_point
                )));
            }
        }

        let load_error = {
            let handle = runtime.load(path);
            handle.load_error().map(str::to_owned)
        };
        if let Some(err) = load_error {
            return Err(LuaRuntimeError::Load(err));
        }

        let path_str = path.to_string_lossy();
        let mut added = 0;
        for pair in &pairs {
            if bus.subscribe_script(pair.event_type.as_str(), path_str.as_ref(), pair.entry_point.as_str()) {
                added += 1;
            }
        }
        info!(script = %path.display(), subscriptions = added, "registered script handlers");
        self.scripts.insert(path.to_path_buf(), pairs);
        Ok(added)
    }

    /// Remove every subscription a script contributed and drop its VM.
    pub fn unload(
        &mut self,
        path: &Path,
        bus: &mut EventBus,
        runtime: &mut ScriptRuntime,
    ) -> usize {
        let removed = bus.unsubscribe_script(&path.to_string_lossy());
        runtime.unload(path);
        self.scripts.remove(path);
        removed
    }

    pub fn pairs_for(&self, path: &Path) -> Option<&[HandlerPair]> {
        self.scripts.get(path).map(Vec::as_slice)
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn deps() -> (EventBus, ScriptRuntime) {
        (EventBus::new(), ScriptRuntime::new(Duration::from_millis(200), 1000))
    }

    #[test]
    fn discovery_registers_manifest_pairs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("deaths.lua"),
            "-- subscribe: entity_died\n-- handler: on_death\nfunction on_death(event, game) end\n",
        )
        .unwrap();
        let (mut bus, mut runtime) = deps();
        let mut registry = EventHandlerRegistry::new();
        let added = registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        assert_eq!(added, 1);
        assert_eq!(bus.script_subscriptions().len(), 1);
        assert_eq!(registry.script_count(), 1);
    }

    #[test]
    fn rediscovery_is_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("deaths.lua"),
            "-- subscribe: entity_died\n-- handler: on_death\nfunction on_death(event, game) end\n",
        )
        .unwrap();
        let (mut bus, mut runtime) = deps();
        let mut registry = EventHandlerRegistry::new();
        registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        let second = registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        assert_eq!(second, 0);
        assert_eq!(bus.script_subscriptions().len(), 1);
    }

    #[test]
    fn undeclared_handler_function_skips_the_script() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("typo.lua"),
            "-- subscribe: entity_died\n-- handler: on_detah\nfunction on_death(event, game) end\n",
        )
        .unwrap();
        let (mut bus, mut runtime) = deps();
        let mut registry = EventHandlerRegistry::new();
        let added = registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        assert_eq!(added, 0);
        assert!(bus.script_subscriptions().is_empty());
    }

    #[test]
    fn one_bad_script_does_not_block_the_rest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a_bad.lua"), "-- subscribe: x\n-- handler: f, g\n").unwrap();
        std::fs::write(
            dir.path().join("b_good.lua"),
            "-- subscribe: message\n-- handler: on_msg\nfunction on_msg(event, game) end\n",
        )
        .unwrap();
        let (mut bus, mut runtime) = deps();
        let mut registry = EventHandlerRegistry::new();
        let added = registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn discovery_follows_configured_script_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("msg.lua"),
            "-- subscribe: message\n-- handler: on_msg\nfunction on_msg(e, g) end\n",
        )
        .unwrap();
        let toml = format!(
            "guest_budget_ms = 100\nscript_dirs = [{:?}, \"/nonexistent/handlers\"]\n",
            dir.path()
        );
        let config = delve_core::EngineConfig::from_toml_str(&toml).unwrap();

        let mut bus = EventBus::new();
        let mut runtime = ScriptRuntime::from_config(&config);
        let mut registry = EventHandlerRegistry::new();
        let added = registry.discover_configured(&config, &mut bus, &mut runtime).unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn unload_removes_all_contributed_subscriptions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("multi.lua");
        std::fs::write(
            &path,
            "-- subscribe: entity_died, message\n-- handler: on_death, on_msg\n\
             function on_death(e, g) end\nfunction on_msg(e, g) end\n",
        )
        .unwrap();
        let (mut bus, mut runtime) = deps();
        let mut registry = EventHandlerRegistry::new();
        registry.discover_from(dir.path(), &mut bus, &mut runtime).unwrap();
        assert_eq!(bus.script_subscriptions().len(), 2);

        let removed = registry.unload(&path, &mut bus, &mut runtime);
        assert_eq!(removed, 2);
        assert!(bus.script_subscriptions().is_empty());
        assert!(!runtime.is_loaded(&path));
    }
}
