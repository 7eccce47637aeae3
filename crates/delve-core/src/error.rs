//! Engine error types.

use crate::world::ActorId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown behavior id: {0}")]
    UnknownBehavior(String),

    #[error("invalid action descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("subscriber `{name}` failed: {message}")]
    Subscriber { name: String, message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
