//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, configuration loading and
//! rejected scheduler requests so clients can bubble them up with
//! consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use skirmish_core::{RequestError, ScriptError};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("frame worker command channel closed")]
    CommandChannelClosed,

    #[error("frame worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("frame worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("scheduler rejected the request")]
    Rejected(#[from] RequestError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime requires an area or scenario before building")]
    MissingArea,
}

impl RuntimeError {
    /// The scheduler's rejection, if this is one.
    pub fn as_rejection(&self) -> Option<&RequestError> {
        match self {
            RuntimeError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}
