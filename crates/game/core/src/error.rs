//! Common error infrastructure for skirmish-core.
//!
//! Requests that arrive at the scheduler from input handlers or AI scripts
//! are frequently stale (the target died between selection and execution,
//! the turn already moved on). Such requests are rejected without touching
//! any state and reported through [`RequestError`] so callers may log or
//! ignore them.

use crate::state::EntityId;

/// Severity level of an error, used for categorization and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Expected race with the UI or an AI script; retrying later may succeed.
    Recoverable,

    /// The request can never succeed as issued.
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all skirmish-core errors.
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Static identifier for this error variant, used in log fields.
    fn error_code(&self) -> &'static str;
}

/// Why a move, attack or turn request was turned down.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("creature {0} does not exist")]
    UnknownCreature(EntityId),

    #[error("creature {0} is dead, dying or helpless")]
    Incapacitated(EntityId),

    #[error("creature {0} is already moving")]
    AlreadyMoving(EntityId),

    #[error("no path supplied")]
    EmptyPath,

    #[error("path of {len} cells exceeds the limit of {max}")]
    PathTooLong { len: usize, max: usize },

    #[error("creature {creature} needs {cost} action points")]
    InsufficientActionPoints { creature: EntityId, cost: u32 },

    #[error("target {target} cannot be attacked by {attacker}")]
    InvalidTarget { attacker: EntityId, target: EntityId },

    #[error("creature {provided} is not the active combatant (active: {active:?})")]
    NotCurrentActor {
        provided: EntityId,
        active: Option<EntityId>,
    },

    #[error("no combat is in progress")]
    NotInCombat,

    #[error("creature {0} has already waited this round")]
    AlreadyWaited(EntityId),

    #[error("reactive targeting session {0} is not open")]
    UnknownSession(u64),

    #[error("mover {0} is not registered")]
    UnknownMover(u64),
}

impl GameError for RequestError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownCreature(_)
            | Self::Incapacitated(_)
            | Self::AlreadyMoving(_)
            | Self::InsufficientActionPoints { .. }
            | Self::InvalidTarget { .. }
            | Self::NotCurrentActor { .. }
            | Self::NotInCombat
            | Self::UnknownSession(_)
            | Self::UnknownMover(_) => ErrorSeverity::Recoverable,
            Self::EmptyPath | Self::PathTooLong { .. } | Self::AlreadyWaited(_) => {
                ErrorSeverity::Validation
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCreature(_) => "UNKNOWN_CREATURE",
            Self::Incapacitated(_) => "INCAPACITATED",
            Self::AlreadyMoving(_) => "ALREADY_MOVING",
            Self::EmptyPath => "EMPTY_PATH",
            Self::PathTooLong { .. } => "PATH_TOO_LONG",
            Self::InsufficientActionPoints { .. } => "INSUFFICIENT_AP",
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::NotCurrentActor { .. } => "NOT_CURRENT_ACTOR",
            Self::NotInCombat => "NOT_IN_COMBAT",
            Self::AlreadyWaited(_) => "ALREADY_WAITED",
            Self::UnknownSession(_) => "UNKNOWN_SESSION",
            Self::UnknownMover(_) => "UNKNOWN_MOVER",
        }
    }
}

/// Failure to start an AI turn function.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("no script named '{0}' is registered")]
    UnknownScript(String),

    #[error("creature {0} has no turn script")]
    MissingScript(EntityId),

    #[error("script runner unavailable: {0}")]
    RunnerUnavailable(String),
}

impl GameError for ScriptError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownScript(_) | Self::MissingScript(_) => ErrorSeverity::Validation,
            Self::RunnerUnavailable(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownScript(_) => "UNKNOWN_SCRIPT",
            Self::MissingScript(_) => "MISSING_SCRIPT",
            Self::RunnerUnavailable(_) => "RUNNER_UNAVAILABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_errors_classify_stale_requests_as_recoverable() {
        let stale = RequestError::Incapacitated(EntityId(3));
        assert!(stale.severity().is_recoverable());
        assert_eq!(stale.error_code(), "INCAPACITATED");

        let bad = RequestError::PathTooLong { len: 90, max: 64 };
        assert_eq!(bad.severity(), ErrorSeverity::Validation);
        assert_eq!(bad.to_string(), "path of 90 cells exceeds the limit of 64");
    }
}
