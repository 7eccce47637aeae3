//! Error types for the Lua guest runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LuaRuntimeError {
    /// Script could not be read or its chunk failed to execute.
    #[error("script load error: {0}")]
    Load(String),

    /// Guest call exceeded its wall-clock budget and was aborted.
    #[error("script exceeded {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },

    /// Guest code raised an error after loading successfully.
    #[error("script runtime error: {0}")]
    Runtime(String),

    /// Handler manifest header is malformed.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

pub type LuaResult<T> = std::result::Result<T, LuaRuntimeError>;
