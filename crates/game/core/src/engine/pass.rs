//! Per-tick borrowing adapter between the lock registry and the subsystems
//! it drives.

use tracing::debug;

use crate::combat::{
    CombatPhase, CombatScheduler, Provocation, ReactiveContext, TurnContext, TurnOutcome,
};
use crate::config::SchedulerConfig;
use crate::env::{
    AttackResolver, Notice, NotificationSink, RngOracle, ScriptRunner, VisibilityOracle,
};
use crate::lock::{Completion, Lock, LockContext, TickDriver};
use crate::movement::{
    AnimationCue, MovementCoordinator, MovementReport, MoverId, ReactiveCheck, StepContext,
};
use crate::state::{Area, EntityId, Millis, Position};

/// Disjoint mutable views of the engine's fields for one tick.
pub(super) struct FramePass<'a> {
    pub now: Millis,
    pub area: &'a mut Area,
    pub config: &'a SchedulerConfig,
    pub movement: &'a mut MovementCoordinator,
    pub combat: &'a mut CombatScheduler,
    pub rng: &'a dyn RngOracle,
    pub scripts: &'a mut dyn ScriptRunner,
    pub resolver: &'a mut dyn AttackResolver,
    pub notices: &'a mut dyn NotificationSink,
    pub visibility: &'a dyn VisibilityOracle,
    pub animations: &'a mut Vec<AnimationCue>,
    pub outcomes: Vec<TurnOutcome>,
}

impl FramePass<'_> {
    fn dispatch(&mut self, completion: Completion, owner: Option<EntityId>, queue: &mut Vec<Lock>) {
        match completion {
            Completion::AdvanceCombat => {
                let mut ctx = TurnContext {
                    now: self.now,
                    area: &mut *self.area,
                    config: self.config,
                    rng: self.rng,
                    scripts: &mut *self.scripts,
                    notices: &mut *self.notices,
                    locks: queue,
                };
                let outcome = self.combat.advance(&mut ctx);
                self.outcomes.push(outcome);
                release_abandoned(&mut *self.combat, &mut *self.movement);
            }
            Completion::QueueCombatAdvance => {
                // Only the creature still holding the turn may hand it on.
                if owner.is_none() || owner == self.combat.current_actor() {
                    self.combat.queue_advance(self.now, self.config, queue);
                }
            }
            Completion::ResolveAttack { attacker, target } => {
                let cost = attack_cost(&*self.combat, self.config);
                let mut ctx = ReactiveContext {
                    now: self.now,
                    area: &mut *self.area,
                    config: self.config,
                    resolver: &mut *self.resolver,
                    notices: &mut *self.notices,
                    locks: queue,
                    cues: &mut *self.animations,
                };
                perform_attack(&mut ctx, attacker, target, cost);
            }
            Completion::Notify(notice) => self.notices.notify(notice),
            Completion::Call(callback) => callback(),
        }
    }

    fn handle_movement(&mut self, report: MovementReport, queue: &mut Vec<Lock>) {
        for (observer, hostile) in report.spotted {
            self.notices.notify(Notice::HostileSpotted { observer, hostile });
            match self.combat.phase() {
                CombatPhase::OutOfCombat => {
                    self.combat.initiate(self.now, self.config, queue);
                }
                CombatPhase::Active => {
                    self.combat.enlist(self.area, hostile);
                }
                CombatPhase::Initiating | CombatPhase::Ending => {}
            }
        }

        for done in report.finished {
            if done.interrupted {
                self.notices.notify(Notice::MovementInterrupted {
                    creature: done.creature,
                    at: done.position,
                });
            }
            for completion in done.completions {
                self.dispatch(completion, Some(done.creature), queue);
            }
        }
    }
}

impl TickDriver for FramePass<'_> {
    fn blocking_moves(&self) -> bool {
        self.movement.has_blocking_moves()
    }

    fn lock_context(&self) -> LockContext {
        LockContext {
            open_reactive_sessions: self.combat.sessions().len(),
        }
    }

    fn on_lock_finished(&mut self, mut lock: Lock, queue: &mut Vec<Lock>) {
        let owner = lock.owner();
        for completion in lock.take_completions() {
            self.dispatch(completion, owner, queue);
        }
    }

    fn advance_movement(&mut self, now: Millis, queue: &mut Vec<Lock>) {
        let turn_based = self.combat.is_turn_based();
        let report = {
            let mut bridge = ReactiveBridge {
                now,
                config: self.config,
                combat: &mut *self.combat,
                resolver: &mut *self.resolver,
                notices: &mut *self.notices,
                cues: &mut *self.animations,
            };
            let mut ctx = StepContext {
                area: &mut *self.area,
                config: self.config,
                turn_based,
                visibility: self.visibility,
                reactive: &mut bridge,
                locks: &mut *queue,
            };
            self.movement.update(now, &mut ctx)
        };
        self.animations.extend(self.movement.drain_cues());
        self.handle_movement(report, queue);
    }
}

/// Routes movement-triggered reactive checks into the combat scheduler.
pub(super) struct ReactiveBridge<'a> {
    pub now: Millis,
    pub config: &'a SchedulerConfig,
    pub combat: &'a mut CombatScheduler,
    pub resolver: &'a mut dyn AttackResolver,
    pub notices: &'a mut dyn NotificationSink,
    pub cues: &'a mut Vec<AnimationCue>,
}

impl ReactiveCheck for ReactiveBridge<'_> {
    fn check(
        &mut self,
        area: &mut Area,
        locks: &mut Vec<Lock>,
        mover: MoverId,
        creature: EntityId,
        from: Position,
        to: Position,
    ) -> u32 {
        let mut ctx = ReactiveContext {
            now: self.now,
            area,
            config: self.config,
            resolver: &mut *self.resolver,
            notices: &mut *self.notices,
            locks,
            cues: &mut *self.cues,
        };
        self.combat.provoke_attacks_of_opportunity(
            &mut ctx,
            Provocation::leaving(creature, from, to, mover),
        )
    }
}

/// Action points a regular attack costs right now.
pub(super) fn attack_cost(combat: &CombatScheduler, config: &SchedulerConfig) -> u32 {
    if combat.is_turn_based() {
        config.attack_cost
    } else {
        0
    }
}

/// Resumes the movers held by sessions that ended with combat instead of
/// a player decision.
pub(super) fn release_abandoned(combat: &mut CombatScheduler, movement: &mut MovementCoordinator) {
    for session in combat.take_abandoned_sessions() {
        if let Some(mover) = session.mover {
            // The mover may already have finished, e.g. after an interrupt.
            let _ = movement.resume(mover);
        }
    }
}

/// Carries out a regular attack after re-validating both sides, charging
/// `cost` action points only when it lands. Returns whether the attack
/// happened.
pub(super) fn perform_attack(
    ctx: &mut ReactiveContext<'_>,
    attacker: EntityId,
    target: EntityId,
    cost: u32,
) -> bool {
    let attacker_ready = ctx
        .area
        .creature(attacker)
        .is_some_and(|c| !c.is_incapacitated() && c.timer.can_perform_action(cost));
    let target_valid = ctx.area.creature(target).is_some_and(|c| !c.is_dead());
    if !attacker_ready || !target_valid {
        debug!(
            target: "skirmish::engine",
            attacker = %attacker,
            victim = %target,
            "attack dropped"
        );
        return false;
    }

    if let Some(striker) = ctx.area.creature_mut(attacker) {
        striker.timer.spend(cost);
    }
    ctx.resolver.resolve_attack(ctx.area, attacker, target);
    ctx.cues.push(AnimationCue::Attack {
        attacker,
        target,
        duration_ms: ctx.config.attack_animation_ms,
    });
    ctx.locks
        .push(Lock::timed(ctx.now, ctx.config.attack_animation_ms).with_owner(attacker));
    true
}
