//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for the engine and the guest sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget for a single guest call, in milliseconds.
    pub guest_budget_ms: u64,
    /// How many VM instructions run between watchdog checks.
    pub watchdog_instruction_interval: u32,
    /// Capacity of the diagnostic event history ring; 0 disables it.
    pub event_history: usize,
    /// Directories scanned for script handler units.
    pub script_dirs: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guest_budget_ms: 3_000,
            watchdog_instruction_interval: 1_000,
            event_history: 0,
            script_dirs: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.guest_budget_ms, 3_000);
        assert_eq!(config.event_history, 0);
        assert!(config.script_dirs.is_empty());
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            guest_budget_ms = 250
            script_dirs = ["scripts", "mods/handlers"]
            "#,
        )
        .unwrap();
        assert_eq!(config.guest_budget_ms, 250);
        assert_eq!(config.watchdog_instruction_interval, 1_000);
        assert_eq!(config.script_dirs.len(), 2);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("guest_budget_ms = \"soon\"").is_err());
    }
}
