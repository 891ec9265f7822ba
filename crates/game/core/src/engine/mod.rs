//! The explicitly owned scheduler facade.
//!
//! [`Engine`] owns the area, the lock registry, the movement coordinator,
//! the combat scheduler and the injected collaborators. A frame driver calls
//! [`Engine::tick`] once per rendered frame; input handlers and AI scripts
//! call the request methods between ticks. Requests only ever add locks or
//! movers, mutating active scheduler state is left to the tick.
mod pass;

use tracing::{debug, info};

use crate::combat::{CombatScheduler, Provocation, ReactiveContext, TurnContext, TurnOutcome};
use crate::config::SchedulerConfig;
use crate::env::{
    AttackResolver, FlatDamage, ImmediateScripts, NotificationSink, NullSink, PcgRng, RngOracle,
    ScriptRunner, SightRadius, VisibilityOracle,
};
use crate::error::{GameError, RequestError};
use crate::lock::{Completion, Lock, LockContext, LockId, LockPriority, LockRegistry, TickReport};
use crate::movement::{AnimationCue, MoveRequest, MovementCoordinator, MoverId};
use crate::state::{Area, EntityId, Millis};

use pass::{FramePass, ReactiveBridge, attack_cost, perform_attack, release_abandoned};

/// How an attack is delivered. Ranged attacks from inside an enemy's reach
/// provoke reactive attacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AttackStyle {
    #[default]
    Melee,
    Ranged,
}

/// What became of an accepted attack request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackResolution {
    Resolved,
    /// Waiting for reactive targeting sessions against the attacker.
    Deferred,
    /// A reactive attack took the attacker out first.
    Interrupted,
}

/// Everything one [`Engine::tick`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub now: Millis,
    pub locks: TickReport,
    pub outcomes: Vec<TurnOutcome>,
    pub settled: bool,
}

impl FrameReport {
    pub fn is_locked(&self) -> bool {
        self.locks.locked
    }
}

pub struct Engine {
    area: Area,
    config: SchedulerConfig,
    locks: LockRegistry,
    movement: MovementCoordinator,
    combat: CombatScheduler,
    rng: Box<dyn RngOracle>,
    scripts: Box<dyn ScriptRunner + Send>,
    resolver: Box<dyn AttackResolver + Send>,
    notices: Box<dyn NotificationSink + Send>,
    visibility: Box<dyn VisibilityOracle + Send + Sync>,
    animations: Vec<AnimationCue>,
    now: Millis,
}

impl Engine {
    pub fn builder(area: Area) -> EngineBuilder {
        EngineBuilder::new(area)
    }

    /// One scheduling step at wall-clock time `now`.
    ///
    /// Time never runs backward: an earlier `now` is treated as the last
    /// seen time.
    pub fn tick(&mut self, now: Millis) -> FrameReport {
        let now = now.max(self.now);
        self.now = now;

        let mut pass = FramePass {
            now,
            area: &mut self.area,
            config: &self.config,
            movement: &mut self.movement,
            combat: &mut self.combat,
            rng: &*self.rng,
            scripts: &mut *self.scripts,
            resolver: &mut *self.resolver,
            notices: &mut *self.notices,
            visibility: &*self.visibility,
            animations: &mut self.animations,
            outcomes: Vec::new(),
        };
        let locks = self.locks.tick(now, &mut pass);
        let outcomes = pass.outcomes;

        for outcome in &outcomes {
            debug!(target: "skirmish::engine", now = %now, outcome = ?outcome, "turn loop");
        }

        FrameReport {
            now,
            locks,
            outcomes,
            settled: self.is_settled(),
        }
    }

    /// Starts a move for `request.creature`. During combat only the active
    /// creature may make a foreground move.
    pub fn request_move(&mut self, request: MoveRequest) -> Result<MoverId, RequestError> {
        let creature = request.creature;
        let background = request.background;
        if !background {
            self.ensure_may_act(creature).inspect_err(|err| Self::log_rejected(err))?;
        }

        let turn_based = self.combat.is_turn_based();
        let mut bridge = ReactiveBridge {
            now: self.now,
            config: &self.config,
            combat: &mut self.combat,
            resolver: &mut *self.resolver,
            notices: &mut *self.notices,
            cues: &mut self.animations,
        };
        let mut ctx = crate::movement::StepContext {
            area: &mut self.area,
            config: &self.config,
            turn_based,
            visibility: &*self.visibility,
            reactive: &mut bridge,
            locks: self.locks.queue_mut(),
        };
        let result = self.movement.add_move(request, self.now, &mut ctx);
        self.animations.extend(self.movement.drain_cues());

        let id = result.inspect_err(|err| Self::log_rejected(err))?;
        if !background {
            self.locks.mark_locked();
        }
        Ok(id)
    }

    /// Attacks `target`. Melee attacks need the target within reach; in
    /// combat only the active creature may attack, and the action points
    /// are charged when the attack lands, which for a deferred ranged
    /// attack is after the reactive decisions.
    pub fn request_attack(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        style: AttackStyle,
    ) -> Result<AttackResolution, RequestError> {
        self.validate_attack(attacker, target, style)
            .inspect_err(|err| Self::log_rejected(err))?;

        let turn_based = self.combat.is_turn_based();
        let cost = attack_cost(&self.combat, &self.config);
        let mut ctx = ReactiveContext {
            now: self.now,
            area: &mut self.area,
            config: &self.config,
            resolver: &mut *self.resolver,
            notices: &mut *self.notices,
            locks: self.locks.queue_mut(),
            cues: &mut self.animations,
        };

        if style == AttackStyle::Ranged {
            let at = ctx.area.creature(attacker).map(|c| c.position).unwrap_or_default();
            let opened = self
                .combat
                .provoke_attacks_of_opportunity(&mut ctx, Provocation::standing(attacker, at));
            if opened > 0 {
                ctx.locks.push(
                    Lock::reactive_targeting(self.now, self.config.reactive_extension_ms)
                        .with_owner(attacker)
                        .then(Completion::ResolveAttack { attacker, target }),
                );
                return Ok(AttackResolution::Deferred);
            }
        }

        let resolution = if perform_attack(&mut ctx, attacker, target, cost) {
            AttackResolution::Resolved
        } else {
            AttackResolution::Interrupted
        };

        let hostile = match (self.area.creature(attacker), self.area.creature(target)) {
            (Some(a), Some(t)) => a.is_hostile_to(t),
            _ => false,
        };
        if !turn_based && hostile {
            self.combat.initiate(self.now, &self.config, self.locks.queue_mut());
        }
        Ok(resolution)
    }

    fn validate_attack(
        &self,
        attacker: EntityId,
        target: EntityId,
        style: AttackStyle,
    ) -> Result<(), RequestError> {
        let striker = self
            .area
            .creature(attacker)
            .ok_or(RequestError::UnknownCreature(attacker))?;
        let victim = self.area.creature(target).ok_or(RequestError::UnknownCreature(target))?;
        if striker.is_incapacitated() {
            return Err(RequestError::Incapacitated(attacker));
        }
        if attacker == target || victim.is_dead() {
            return Err(RequestError::InvalidTarget { attacker, target });
        }
        if style == AttackStyle::Melee && !striker.threatens(victim.position) {
            return Err(RequestError::InvalidTarget { attacker, target });
        }
        self.ensure_may_act(attacker)?;

        let cost = self.config.attack_cost;
        if self.combat.is_turn_based() && !striker.timer.can_perform_action(cost) {
            return Err(RequestError::InsufficientActionPoints { creature: attacker, cost });
        }
        Ok(())
    }

    /// Ends the active creature's combat turn.
    pub fn end_turn(&mut self, creature: EntityId) -> Result<(), RequestError> {
        self.combat
            .end_player_turn(creature, self.now, &self.config, self.locks.queue_mut())
            .inspect_err(|err| Self::log_rejected(err))
    }

    /// Postpones the active creature behind the `slots`-th eligible
    /// combatant after it.
    pub fn wait_turn(&mut self, creature: EntityId, slots: usize) -> Result<(), RequestError> {
        let mut ctx = TurnContext {
            now: self.now,
            area: &mut self.area,
            config: &self.config,
            rng: &*self.rng,
            scripts: &mut *self.scripts,
            notices: &mut *self.notices,
            locks: self.locks.queue_mut(),
        };
        let waited = self
            .combat
            .active_creature_wait(creature, slots, &mut ctx)
            .inspect_err(|err| Self::log_rejected(err));
        release_abandoned(&mut self.combat, &mut self.movement);
        waited
    }

    pub fn accept_reactive_attack(&mut self, session: u64) -> Result<(), RequestError> {
        let mut ctx = ReactiveContext {
            now: self.now,
            area: &mut self.area,
            config: &self.config,
            resolver: &mut *self.resolver,
            notices: &mut *self.notices,
            locks: self.locks.queue_mut(),
            cues: &mut self.animations,
        };
        let closed = self
            .combat
            .accept_reactive_attack(session, &mut ctx)
            .inspect_err(|err| Self::log_rejected(err))?;
        self.release_mover(closed.mover);
        Ok(())
    }

    pub fn cancel_reactive_attack(&mut self, session: u64) -> Result<(), RequestError> {
        let closed = self
            .combat
            .cancel_reactive_attack(session)
            .inspect_err(|err| Self::log_rejected(err))?;
        self.release_mover(closed.mover);
        Ok(())
    }

    fn release_mover(&mut self, mover: Option<MoverId>) {
        if let Some(mover) = mover {
            // The mover may already have finished, e.g. after an interrupt.
            let _ = self.movement.resume(mover);
        }
    }

    /// Stops every mover on the next tick.
    pub fn interrupt_movement(&mut self) {
        self.movement.interrupt();
    }

    /// Plays a named animation under a callback lock.
    pub fn play_animation(
        &mut self,
        owner: Option<EntityId>,
        name: impl Into<String>,
        duration_ms: u64,
        priority: LockPriority,
        completions: Vec<Completion>,
    ) -> LockId {
        self.animations.push(AnimationCue::Named {
            owner,
            name: name.into(),
            duration_ms,
        });
        let mut lock = Lock::callback(self.now, duration_ms, completions).with_priority(priority);
        if let Some(owner) = owner {
            lock = lock.with_owner(owner);
        }
        self.locks.enqueue(lock)
    }

    pub fn enqueue_lock(&mut self, lock: Lock) -> LockId {
        self.locks.enqueue(lock)
    }

    /// Runs hostile detection for every party member. Newly spotted
    /// hostiles start combat.
    pub fn scan_for_hostiles(&mut self) -> Vec<(EntityId, EntityId)> {
        let party: Vec<EntityId> = self
            .area
            .party()
            .filter(|c| !c.is_incapacitated())
            .map(|c| c.id)
            .collect();

        let mut spotted = Vec::new();
        for observer in party {
            for hostile in self.area.spot_hostiles(observer, &*self.visibility) {
                self.notices.notify(crate::env::Notice::HostileSpotted { observer, hostile });
                spotted.push((observer, hostile));
            }
        }
        if !spotted.is_empty() {
            self.start_combat_now();
        }
        spotted
    }

    /// Begins combat initiation regardless of visibility.
    pub fn start_combat_now(&mut self) -> bool {
        let started = self
            .combat
            .initiate(self.now, &self.config, self.locks.queue_mut());
        if started {
            info!(target: "skirmish::engine", now = %self.now, "combat requested");
        }
        started
    }

    pub fn is_locked(&self) -> bool {
        self.locks.is_locked()
    }

    /// Nothing left to wait for except AI scripts. Scripts poll this to
    /// know their last request has played out.
    pub fn is_settled(&self) -> bool {
        self.locks
            .is_settled(self.now, &self.lock_context(), self.movement.has_blocking_moves())
    }

    pub fn wait_for_unlock(&mut self, waiter: impl FnOnce() + Send + 'static) {
        self.locks.wait_for_unlock(waiter);
    }

    pub fn drain_animations(&mut self) -> Vec<AnimationCue> {
        std::mem::take(&mut self.animations)
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn area_mut(&mut self) -> &mut Area {
        &mut self.area
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn movement(&self) -> &MovementCoordinator {
        &self.movement
    }

    pub fn combat(&self) -> &CombatScheduler {
        &self.combat
    }

    fn lock_context(&self) -> LockContext {
        LockContext {
            open_reactive_sessions: self.combat.sessions().len(),
        }
    }

    fn ensure_may_act(&self, creature: EntityId) -> Result<(), RequestError> {
        if !self.combat.is_turn_based() {
            return Ok(());
        }
        let active = self.combat.current_actor();
        if active != Some(creature) || self.combat.is_advance_pending() {
            return Err(RequestError::NotCurrentActor {
                provided: creature,
                active,
            });
        }
        Ok(())
    }

    fn log_rejected(err: &RequestError) {
        debug!(
            target: "skirmish::engine",
            code = err.error_code(),
            severity = err.severity().as_str(),
            error = %err,
            "request rejected"
        );
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.now)
            .field("phase", &self.combat.phase())
            .field("locks", &self.locks)
            .field("movers", &self.movement.len())
            .finish_non_exhaustive()
    }
}

/// Wires an [`Engine`] with its collaborators. Anything not supplied falls
/// back to a headless default.
pub struct EngineBuilder {
    area: Area,
    config: SchedulerConfig,
    rng: Box<dyn RngOracle>,
    scripts: Box<dyn ScriptRunner + Send>,
    resolver: Box<dyn AttackResolver + Send>,
    notices: Box<dyn NotificationSink + Send>,
    visibility: Box<dyn VisibilityOracle + Send + Sync>,
}

impl EngineBuilder {
    pub fn new(area: Area) -> Self {
        Self {
            area,
            config: SchedulerConfig::default(),
            rng: Box::new(PcgRng),
            scripts: Box::new(ImmediateScripts::new()),
            resolver: Box::new(FlatDamage::default()),
            notices: Box::new(NullSink),
            visibility: Box::new(SightRadius),
        }
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rng(mut self, rng: impl RngOracle + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn scripts(mut self, scripts: impl ScriptRunner + Send + 'static) -> Self {
        self.scripts = Box::new(scripts);
        self
    }

    pub fn resolver(mut self, resolver: impl AttackResolver + Send + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn notices(mut self, notices: impl NotificationSink + Send + 'static) -> Self {
        self.notices = Box::new(notices);
        self
    }

    pub fn visibility(mut self, visibility: impl VisibilityOracle + Send + Sync + 'static) -> Self {
        self.visibility = Box::new(visibility);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            area: self.area,
            config: self.config,
            locks: LockRegistry::new(),
            movement: MovementCoordinator::new(),
            combat: CombatScheduler::new(),
            rng: self.rng,
            scripts: self.scripts,
            resolver: self.resolver,
            notices: self.notices,
            visibility: self.visibility,
            animations: Vec::new(),
            now: Millis::ZERO,
        }
    }
}
