use crate::state::{EntityId, Position};

/// Presentation record produced by the scheduler. Rendering consumes these;
/// the core only decides when they start and how long they last.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationCue {
    Step {
        creature: EntityId,
        from: Position,
        to: Position,
        duration_ms: u64,
    },
    /// Snap-back after a rollback, bridging the rendered and true positions.
    Correction {
        creature: EntityId,
        from: Position,
        to: Position,
        duration_ms: u64,
    },
    Attack {
        attacker: EntityId,
        target: EntityId,
        duration_ms: u64,
    },
    /// Free-form animation requested by a caller.
    Named {
        owner: Option<EntityId>,
        name: String,
        duration_ms: u64,
    },
}

impl AnimationCue {
    pub fn duration_ms(&self) -> u64 {
        match self {
            AnimationCue::Step { duration_ms, .. }
            | AnimationCue::Correction { duration_ms, .. }
            | AnimationCue::Attack { duration_ms, .. }
            | AnimationCue::Named { duration_ms, .. } => *duration_ms,
        }
    }
}
