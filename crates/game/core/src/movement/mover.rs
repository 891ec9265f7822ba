use std::fmt;

use crate::lock::Completion;
use crate::state::{EntityId, Millis, Position};

/// Handle returned by [`MovementCoordinator::add_move`](super::MovementCoordinator::add_move).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoverId(pub u64);

impl fmt::Display for MoverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mover-{}", self.0)
    }
}

/// A request to walk `creature` along `path`.
///
/// The path is supplied by an external path provider and excludes the
/// creature's current cell; a leading copy of it is tolerated and dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub creature: EntityId,
    pub path: Vec<Position>,
    /// Whether leaving threatened cells provokes reactive attacks.
    pub provokes: bool,
    /// Background moves neither lock the interface nor block lock polling.
    pub background: bool,
}

impl MoveRequest {
    pub fn new(creature: EntityId, path: Vec<Position>) -> Self {
        Self {
            creature,
            path,
            provokes: true,
            background: false,
        }
    }

    #[must_use]
    pub fn without_provoking(mut self) -> Self {
        self.provokes = false;
        self
    }

    #[must_use]
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }
}

/// One creature walking a path, one cell per elapsed increment.
#[derive(Debug)]
pub struct Mover {
    pub(super) id: MoverId,
    pub(super) creature: EntityId,
    /// Remaining cells, reversed so the next cell sits at the end.
    pub(super) path: Vec<Position>,
    pub(super) traversed: Vec<Position>,
    pub(super) origin: Position,
    pub(super) last_step: Millis,
    pub(super) increment: u64,
    pub(super) pause: u32,
    /// Set while paused; the first step after the pause clears uses the
    /// longer resume increment.
    pub(super) resuming: bool,
    pub(super) background: bool,
    pub(super) provokes: bool,
    pub(super) interrupted: bool,
    pub(super) completions: Vec<Completion>,
}

impl Mover {
    pub fn id(&self) -> MoverId {
        self.id
    }

    pub fn creature(&self) -> EntityId {
        self.creature
    }

    pub fn pause_count(&self) -> u32 {
        self.pause
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Cells not yet entered, in travel order.
    pub fn remaining(&self) -> impl Iterator<Item = Position> + '_ {
        self.path.iter().rev().copied()
    }

    pub fn traversed(&self) -> &[Position] {
        &self.traversed
    }

    pub(super) fn next_cell(&self) -> Option<Position> {
        self.path.last().copied()
    }

    pub(super) fn is_ready(&self, now: Millis) -> bool {
        self.pause == 0 && now.saturating_since(self.last_step) >= self.increment
    }

    pub(super) fn add_pauses(&mut self, count: u32) {
        if count > 0 {
            self.pause += count;
            self.resuming = true;
        }
    }
}
