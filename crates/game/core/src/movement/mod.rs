//! Tile-by-tile movement of creatures along precomputed paths.
//!
//! The [`MovementCoordinator`] owns every in-flight [`Mover`]. Each update a
//! mover whose pause count is zero and whose step increment has elapsed
//! enters its next cell. Reactive attacks raise the pause count, and the
//! mover stands still until every attack opportunity has been resolved.
//!
//! When a mover finishes, for whatever reason, the creature is snapped back
//! to the nearest free cell it has already walked through.
mod cue;
mod mover;

pub use cue::AnimationCue;
pub use mover::{MoveRequest, Mover, MoverId};

use tracing::{debug, trace};

use crate::config::SchedulerConfig;
use crate::env::VisibilityOracle;
use crate::error::RequestError;
use crate::lock::{Completion, Lock, LockPriority};
use crate::state::{Area, CreatureFlags, EntityId, Millis, Position};

/// Computes reactive attacks provoked by a mover about to leave `from` for
/// `to`.
///
/// Returns how many attack opportunities now wait on a player decision. The
/// coordinator raises the mover's pause count by that amount; each decision
/// must be answered with one [`MovementCoordinator::resume`].
pub trait ReactiveCheck {
    fn check(
        &mut self,
        area: &mut Area,
        locks: &mut Vec<Lock>,
        mover: MoverId,
        creature: EntityId,
        from: Position,
        to: Position,
    ) -> u32;
}

/// Never provokes anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReactions;

impl ReactiveCheck for NoReactions {
    fn check(
        &mut self,
        _area: &mut Area,
        _locks: &mut Vec<Lock>,
        _mover: MoverId,
        _creature: EntityId,
        _from: Position,
        _to: Position,
    ) -> u32 {
        0
    }
}

/// Everything a mover touches while stepping.
pub struct StepContext<'a> {
    pub area: &'a mut Area,
    pub config: &'a SchedulerConfig,
    /// Action points are only charged in turn-based mode.
    pub turn_based: bool,
    pub visibility: &'a dyn VisibilityOracle,
    pub reactive: &'a mut dyn ReactiveCheck,
    /// Locks created while stepping; admitted by the registry next tick.
    pub locks: &'a mut Vec<Lock>,
}

/// A mover removed during [`MovementCoordinator::update`].
#[derive(Debug)]
pub struct FinishedMove {
    pub mover: MoverId,
    pub creature: EntityId,
    pub position: Position,
    pub interrupted: bool,
    pub rolled_back: bool,
    pub completions: Vec<Completion>,
}

#[derive(Debug, Default)]
pub struct MovementReport {
    pub steps: usize,
    pub finished: Vec<FinishedMove>,
    /// `(observer, hostile)` pairs newly detected by party members on the
    /// move. Non-empty means combat may need to start.
    pub spotted: Vec<(EntityId, EntityId)>,
}

impl MovementReport {
    pub fn spotted_hostile(&self) -> bool {
        !self.spotted.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MovementCoordinator {
    movers: Vec<Mover>,
    next_id: u64,
    cues: Vec<AnimationCue>,
}

impl MovementCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the request, marks the creature as moving and runs the
    /// reactive-attack check for the first cell before any step is taken.
    pub fn add_move(
        &mut self,
        request: MoveRequest,
        now: Millis,
        ctx: &mut StepContext<'_>,
    ) -> Result<MoverId, RequestError> {
        let MoveRequest {
            creature: id,
            mut path,
            provokes,
            background,
        } = request;

        let creature = ctx.area.creature(id).ok_or(RequestError::UnknownCreature(id))?;
        if creature.is_incapacitated() {
            return Err(RequestError::Incapacitated(id));
        }
        if creature.is_moving() || self.mover_for(id).is_some() {
            return Err(RequestError::AlreadyMoving(id));
        }

        let origin = creature.position;
        if path.first() == Some(&origin) {
            path.remove(0);
        }
        let first = *path.first().ok_or(RequestError::EmptyPath)?;
        if path.len() > ctx.config.max_path_len {
            return Err(RequestError::PathTooLong {
                len: path.len(),
                max: ctx.config.max_path_len,
            });
        }
        let cost = ctx.area.entry_cost(first);
        if ctx.turn_based && !creature.timer.can_perform_action(cost) {
            return Err(RequestError::InsufficientActionPoints { creature: id, cost });
        }

        if let Some(walker) = ctx.area.creature_mut(id) {
            walker.flags.insert(CreatureFlags::MOVING);
        }

        let mover_id = MoverId(self.next_id);
        self.next_id += 1;
        path.reverse();

        let mut mover = Mover {
            id: mover_id,
            creature: id,
            path,
            traversed: Vec::new(),
            origin,
            last_step: now,
            increment: ctx.config.step_ms,
            pause: 0,
            resuming: false,
            background,
            provokes,
            interrupted: false,
            completions: Vec::new(),
        };

        if provokes {
            let pending = ctx
                .reactive
                .check(ctx.area, ctx.locks, mover_id, id, origin, first);
            mover.add_pauses(pending);
        }

        debug!(
            target: "skirmish::movement",
            mover = %mover_id,
            creature = %id,
            cells = mover.path.len(),
            background,
            pause = mover.pause,
            "move started"
        );

        self.movers.push(mover);
        Ok(mover_id)
    }

    /// Advances every mover by at most one cell.
    pub fn update(&mut self, now: Millis, ctx: &mut StepContext<'_>) -> MovementReport {
        let mut report = MovementReport::default();

        let mut index = 0;
        while index < self.movers.len() {
            let finished =
                Self::advance(&mut self.movers[index], now, ctx, &mut self.cues, &mut report);
            if finished {
                let mover = self.movers.remove(index);
                let done = self.finish(mover, now, ctx);
                report.finished.push(done);
            } else {
                index += 1;
            }
        }

        report
    }

    /// Marks every mover for removal. Takes effect on the next
    /// [`update`](Self::update).
    pub fn interrupt(&mut self) {
        for mover in &mut self.movers {
            mover.interrupted = true;
        }
    }

    pub fn interrupt_creature(&mut self, creature: EntityId) -> bool {
        match self.movers.iter_mut().find(|m| m.creature == creature) {
            Some(mover) => {
                mover.interrupted = true;
                true
            }
            None => false,
        }
    }

    /// Raises the pause count. Returns the new count.
    pub fn pause(&mut self, id: MoverId) -> Result<u32, RequestError> {
        let mover = self.mover_mut(id)?;
        mover.add_pauses(1);
        Ok(mover.pause)
    }

    /// Lowers the pause count, never below zero. Returns the new count.
    pub fn resume(&mut self, id: MoverId) -> Result<u32, RequestError> {
        let mover = self.mover_mut(id)?;
        mover.pause = mover.pause.saturating_sub(1);
        trace!(target: "skirmish::movement", mover = %id, pause = mover.pause, "mover resumed");
        Ok(mover.pause)
    }

    pub fn pause_count(&self, id: MoverId) -> Option<u32> {
        self.mover(id).map(Mover::pause_count)
    }

    /// Attaches a completion fired when the mover finishes.
    pub fn on_complete(&mut self, id: MoverId, completion: Completion) -> Result<(), RequestError> {
        self.mover_mut(id)?.completions.push(completion);
        Ok(())
    }

    pub fn mover(&self, id: MoverId) -> Option<&Mover> {
        self.movers.iter().find(|m| m.id == id)
    }

    pub fn mover_for(&self, creature: EntityId) -> Option<MoverId> {
        self.movers.iter().find(|m| m.creature == creature).map(Mover::id)
    }

    pub fn movers(&self) -> &[Mover] {
        &self.movers
    }

    /// Whether any foreground mover is in flight.
    pub fn has_blocking_moves(&self) -> bool {
        self.movers.iter().any(|m| !m.background)
    }

    pub fn len(&self) -> usize {
        self.movers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movers.is_empty()
    }

    pub fn drain_cues(&mut self) -> Vec<AnimationCue> {
        std::mem::take(&mut self.cues)
    }

    fn mover_mut(&mut self, id: MoverId) -> Result<&mut Mover, RequestError> {
        self.movers
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RequestError::UnknownMover(id.0))
    }

    /// Returns true once the mover is ready to be finished.
    fn advance(
        mover: &mut Mover,
        now: Millis,
        ctx: &mut StepContext<'_>,
        cues: &mut Vec<AnimationCue>,
        report: &mut MovementReport,
    ) -> bool {
        let Some(creature) = ctx.area.creature(mover.creature) else {
            return true;
        };
        if creature.is_incapacitated() && !ctx.turn_based {
            return true;
        }
        if mover.interrupted {
            return true;
        }
        if mover.pause > 0 {
            return false;
        }
        if mover.resuming {
            mover.resuming = false;
            mover.last_step = now;
            mover.increment = ctx.config.resume_step_ms();
            return false;
        }
        if !mover.is_ready(now) {
            return false;
        }
        let Some(next) = mover.next_cell() else {
            return true;
        };
        if creature.is_incapacitated() {
            return true;
        }

        let from = creature.position;
        let party_member = creature.is_party_member();

        if ctx.turn_based {
            let cost = ctx.area.entry_cost(next);
            let paid = ctx
                .area
                .creature_mut(mover.creature)
                .is_some_and(|walker| walker.timer.spend_move(cost));
            if !paid {
                debug!(
                    target: "skirmish::movement",
                    mover = %mover.id,
                    creature = %mover.creature,
                    cost,
                    "out of action points"
                );
                mover.interrupted = true;
                return false;
            }
        }

        mover.path.pop();
        mover.traversed.push(from);
        ctx.area.relocate(mover.creature, next);
        mover.last_step = now;
        mover.increment = ctx.config.step_ms;
        cues.push(AnimationCue::Step {
            creature: mover.creature,
            from,
            to: next,
            duration_ms: ctx.config.step_ms,
        });
        report.steps += 1;

        if party_member {
            let spotted = ctx.area.spot_hostiles(mover.creature, ctx.visibility);
            if !spotted.is_empty() {
                debug!(
                    target: "skirmish::movement",
                    creature = %mover.creature,
                    count = spotted.len(),
                    "hostiles spotted while moving"
                );
                mover.interrupted = true;
                report
                    .spotted
                    .extend(spotted.into_iter().map(|hostile| (mover.creature, hostile)));
            }
        }

        if !mover.interrupted && mover.provokes {
            if let Some(after) = mover.next_cell() {
                let pending =
                    ctx.reactive
                        .check(ctx.area, ctx.locks, mover.id, mover.creature, next, after);
                mover.add_pauses(pending);
            }
        }

        false
    }

    fn finish(&mut self, mut mover: Mover, now: Millis, ctx: &mut StepContext<'_>) -> FinishedMove {
        let id = mover.creature;
        let current = match ctx.area.creature_mut(id) {
            Some(walker) => {
                walker.flags.remove(CreatureFlags::MOVING);
                Some(walker.position)
            }
            None => None,
        };

        let mut position = current.unwrap_or(mover.origin);
        let mut rolled_back = false;

        if let Some(current) = current {
            let target = std::iter::once(current)
                .chain(mover.traversed.iter().rev().copied())
                .chain(std::iter::once(mover.origin))
                .find(|cell| !ctx.area.is_blocked(*cell, id))
                .unwrap_or(current);

            if target != current {
                ctx.area.relocate(id, target);
                self.cues.push(AnimationCue::Correction {
                    creature: id,
                    from: current,
                    to: target,
                    duration_ms: ctx.config.correction_ms,
                });
                ctx.locks.push(
                    Lock::timed(now, ctx.config.correction_ms)
                        .with_priority(LockPriority::COSMETIC)
                        .with_owner(id),
                );
                position = target;
                rolled_back = true;
            }
        }

        debug!(
            target: "skirmish::movement",
            mover = %mover.id,
            creature = %id,
            position = %position,
            interrupted = mover.interrupted,
            rolled_back,
            "move finished"
        );

        FinishedMove {
            mover: mover.id,
            creature: id,
            position,
            interrupted: mover.interrupted,
            rolled_back,
            completions: std::mem::take(&mut mover.completions),
        }
    }
}
