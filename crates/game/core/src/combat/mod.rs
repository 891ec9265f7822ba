//! Combat turn scheduling.
//!
//! The [`CombatScheduler`] owns the turn queue and walks it one turn at a
//! time. It never loops on its own: every turn ends by handing control to
//! the player or by registering a lock whose completion re-enters
//! [`CombatScheduler::advance`] on a later tick.
//!
//! ```text
//! OutOfCombat --initiate--> Initiating --advance--> Active --run_turn--> Ending
//!      ^                                                                   |
//!      +-------------------------------exit_combat-------------------------+
//! ```
mod initiative;
mod queue;
mod reactive;

pub use initiative::{InitiativeRoll, roll_initiative};
pub use queue::TurnQueue;
pub use reactive::{
    Provocation, ReactiveContext, ReactiveSession, ReactiveSessions, reactive_attackers,
};

use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::env::{Notice, NotificationSink, RngOracle, ScriptLiveness, ScriptRunner, TurnRequest};
use crate::error::{GameError, RequestError, ScriptError};
use crate::lock::Lock;
use crate::state::{Area, EntityId, LifeState, Millis};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    OutOfCombat,
    /// A hostile was spotted; the start delay lock is running.
    Initiating,
    Active,
    Ending,
}

/// Where a call into the turn loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnOutcome {
    /// Nothing to do in the current phase.
    Idle,
    AwaitingPlayer(EntityId),
    /// An AI script was started and its liveness lock registered.
    AiDispatched(EntityId),
    CombatEnded { rounds: u32 },
    /// Every party member is down; no cleanup ran.
    GameOver,
}

/// Collaborators used while running turns.
pub struct TurnContext<'a> {
    pub now: Millis,
    pub area: &'a mut Area,
    pub config: &'a SchedulerConfig,
    pub rng: &'a dyn RngOracle,
    pub scripts: &'a mut dyn ScriptRunner,
    pub notices: &'a mut dyn NotificationSink,
    /// Locks created by the turn loop; admitted on the next tick.
    pub locks: &'a mut Vec<Lock>,
}

#[derive(Debug, Default)]
pub struct CombatScheduler {
    phase: CombatPhase,
    queue: TurnQueue,
    start_round: u32,
    /// Creature whose turn is running. Cleared when it waits.
    acting: Option<EntityId>,
    /// A combat-advance lock is queued or active.
    advance_pending: bool,
    sessions: ReactiveSessions,
    /// Sessions closed by the end of combat whose movers still need
    /// resuming.
    abandoned: Vec<ReactiveSession>,
}

impl CombatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    /// Action points are only charged while this holds.
    pub fn is_turn_based(&self) -> bool {
        self.phase == CombatPhase::Active
    }

    pub fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    pub fn current_actor(&self) -> Option<EntityId> {
        self.acting
    }

    pub fn start_round(&self) -> u32 {
        self.start_round
    }

    pub fn sessions(&self) -> &ReactiveSessions {
        &self.sessions
    }

    /// Hands over the sessions the last combat exit closed undecided.
    pub fn take_abandoned_sessions(&mut self) -> Vec<ReactiveSession> {
        std::mem::take(&mut self.abandoned)
    }

    pub fn is_advance_pending(&self) -> bool {
        self.advance_pending
    }

    /// Starts the grace period before initiative is rolled. Only valid out
    /// of combat; returns whether combat is now initiating.
    pub fn initiate(
        &mut self,
        now: Millis,
        config: &SchedulerConfig,
        locks: &mut Vec<Lock>,
    ) -> bool {
        if self.phase != CombatPhase::OutOfCombat {
            return false;
        }

        self.phase = CombatPhase::Initiating;
        self.advance_pending = true;
        locks.push(Lock::combat_advance(now, config.combat_start_delay_ms));
        info!(target: "skirmish::combat", now = %now, "combat initiating");
        true
    }

    /// Queues a combat-advance lock for the next turn. Does nothing if one
    /// is already pending or combat is not running.
    pub fn queue_advance(
        &mut self,
        now: Millis,
        config: &SchedulerConfig,
        locks: &mut Vec<Lock>,
    ) -> bool {
        if self.advance_pending || self.phase != CombatPhase::Active {
            return false;
        }
        self.advance_pending = true;
        locks.push(Lock::combat_advance(now, config.turn_advance_ms));
        true
    }

    /// Entry point for a finished combat-advance lock.
    pub fn advance(&mut self, ctx: &mut TurnContext<'_>) -> TurnOutcome {
        self.advance_pending = false;
        match self.phase {
            CombatPhase::Initiating => {
                self.begin(ctx);
                self.run_turn(ctx)
            }
            CombatPhase::Active => self.run_turn(ctx),
            CombatPhase::OutOfCombat | CombatPhase::Ending => TurnOutcome::Idle,
        }
    }

    fn begin(&mut self, ctx: &mut TurnContext<'_>) {
        let rolls =
            roll_initiative(ctx.area, ctx.rng, ctx.config.rng_seed, ctx.config.initiative_die);
        let order: Vec<EntityId> = rolls.iter().map(|roll| roll.creature).collect();

        for creature in ctx.area.creatures_mut() {
            creature.timer.reset();
        }
        for id in &order {
            Self::mark_participated(ctx.area, *id);
        }

        self.queue = TurnQueue::new(order);
        self.start_round = ctx.area.round;
        self.acting = None;
        self.phase = CombatPhase::Active;

        info!(
            target: "skirmish::combat",
            round = self.start_round,
            combatants = self.queue.len(),
            "combat started"
        );
        ctx.notices.notify(Notice::CombatStarted {
            round: self.start_round,
            combatants: self.queue.len(),
        });
    }

    /// Runs the turn loop until a turn is handed out or combat stops.
    ///
    /// Ineligible creatures are skipped without consuming a turn. A player
    /// turn returns immediately. An AI turn starts its script and registers
    /// the liveness lock, whose completion queues the next advance.
    pub fn run_turn(&mut self, ctx: &mut TurnContext<'_>) -> TurnOutcome {
        if self.phase != CombatPhase::Active {
            return TurnOutcome::Idle;
        }
        if self.is_party_defeated(ctx.area) {
            return self.defeat(ctx);
        }
        if !Self::should_continue(ctx.area) {
            let rounds = self.exit_combat(ctx.area, ctx.notices);
            return TurnOutcome::CombatEnded { rounds };
        }

        let Some(next) = self.next_eligible(ctx) else {
            let rounds = self.exit_combat(ctx.area, ctx.notices);
            return TurnOutcome::CombatEnded { rounds };
        };

        if let Some(previous) = self.acting.take() {
            if let Some(creature) = ctx.area.creature_mut(previous) {
                creature.timer.end_turn();
            }
        }
        self.acting = Some(next);
        ctx.notices.notify(Notice::TurnStarted {
            creature: next,
            round: ctx.area.round,
        });

        let Some(creature) = ctx.area.creature(next) else {
            return TurnOutcome::Idle;
        };
        if creature.is_player_controlled() {
            debug!(
                target: "skirmish::combat",
                creature = %next,
                round = ctx.area.round,
                "player turn"
            );
            return TurnOutcome::AwaitingPlayer(next);
        }

        let request = creature
            .script
            .clone()
            .ok_or(ScriptError::MissingScript(next))
            .map(|script| TurnRequest {
                creature: next,
                script,
                round: ctx.area.round,
                snapshot: ctx.area.clone(),
            });
        let liveness = match request.and_then(|request| ctx.scripts.start_async(request)) {
            Ok(liveness) => liveness,
            Err(err) => {
                warn!(
                    target: "skirmish::combat",
                    creature = %next,
                    error = %err,
                    code = err.error_code(),
                    "AI turn failed to start; passing"
                );
                ScriptLiveness::finished()
            }
        };

        ctx.locks.push(
            Lock::ai_liveness(ctx.now, liveness, ctx.config.ai_grace_ms).with_owner(next),
        );
        debug!(
            target: "skirmish::combat",
            creature = %next,
            round = ctx.area.round,
            "AI turn dispatched"
        );
        TurnOutcome::AiDispatched(next)
    }

    /// Advances through the queue to the next eligible creature, bumping
    /// the round counter on every wrap. Gives up after one full pass.
    fn next_eligible(&mut self, ctx: &mut TurnContext<'_>) -> Option<EntityId> {
        for _ in 0..self.queue.len() {
            let (id, wrapped) = self.queue.advance()?;
            if wrapped {
                let round = ctx.area.advance_round();
                debug!(target: "skirmish::combat", round, "round started");
                ctx.notices.notify(Notice::RoundStarted { round });
            }
            if ctx.area.creature(id).is_some_and(|c| c.is_combat_eligible()) {
                return Some(id);
            }
        }
        None
    }

    fn defeat(&mut self, ctx: &mut TurnContext<'_>) -> TurnOutcome {
        self.phase = CombatPhase::Ending;
        self.acting = None;
        warn!(target: "skirmish::combat", round = ctx.area.round, "party defeated");
        ctx.notices.notify(Notice::GameOver);
        TurnOutcome::GameOver
    }

    /// Ends the active player creature's turn.
    pub fn end_player_turn(
        &mut self,
        creature: EntityId,
        now: Millis,
        config: &SchedulerConfig,
        locks: &mut Vec<Lock>,
    ) -> Result<(), RequestError> {
        self.ensure_acting(creature)?;
        self.queue_advance(now, config, locks);
        Ok(())
    }

    /// Postpones the active creature behind the `slots`-th eligible
    /// creature after it. A creature may wait once per turn cycle.
    pub fn active_creature_wait(
        &mut self,
        creature: EntityId,
        slots: usize,
        ctx: &mut TurnContext<'_>,
    ) -> Result<(), RequestError> {
        self.ensure_acting(creature)?;
        let waiter = ctx.area.creature(creature).ok_or(RequestError::UnknownCreature(creature))?;
        if waiter.is_incapacitated() {
            return Err(RequestError::Incapacitated(creature));
        }
        if waiter.timer.is_waited_once() {
            return Err(RequestError::AlreadyWaited(creature));
        }

        let area = &*ctx.area;
        let anchor = self.queue.postpone(creature, slots, |id| {
            area.creature(id).is_some_and(|c| c.is_combat_eligible())
        });

        if let Some(waiter) = ctx.area.creature_mut(creature) {
            waiter.timer.wait_turn();
        }
        self.acting = None;
        self.queue_advance(ctx.now, ctx.config, ctx.locks);

        debug!(
            target: "skirmish::combat",
            creature = %creature,
            behind = ?anchor,
            "creature waits"
        );
        Ok(())
    }

    fn ensure_acting(&self, creature: EntityId) -> Result<(), RequestError> {
        if self.phase != CombatPhase::Active {
            return Err(RequestError::NotInCombat);
        }
        if self.acting != Some(creature) || self.advance_pending {
            return Err(RequestError::NotCurrentActor {
                provided: creature,
                active: self.acting,
            });
        }
        Ok(())
    }

    /// Adds a creature that entered the fight after initiative was rolled.
    pub fn enlist(&mut self, area: &mut Area, creature: EntityId) -> bool {
        if self.phase != CombatPhase::Active || self.queue.contains(creature) {
            return false;
        }
        if !area.creature(creature).is_some_and(|c| !c.is_dead()) {
            return false;
        }
        self.queue.push(creature);
        Self::mark_participated(area, creature);
        debug!(target: "skirmish::combat", creature = %creature, "late joiner enlisted");
        true
    }

    /// Combat goes on while two eligible creatures are hostile to each other.
    pub fn should_continue(area: &Area) -> bool {
        let fighters: Vec<_> = area.creatures().filter(|c| c.is_combat_eligible()).collect();
        fighters
            .iter()
            .enumerate()
            .any(|(i, a)| fighters[i + 1..].iter().any(|b| a.is_hostile_to(b)))
    }

    /// Pure query; see [`Area::is_party_defeated`].
    pub fn is_party_defeated(&self, area: &Area) -> bool {
        area.is_party_defeated()
    }

    /// Leaves turn-based mode and tidies up after the fight. Returns the
    /// number of rounds the fight lasted.
    pub fn exit_combat(&mut self, area: &mut Area, notices: &mut dyn NotificationSink) -> u32 {
        self.phase = CombatPhase::Ending;
        let rounds = area.round.saturating_sub(self.start_round);

        for creature in area.creatures_mut() {
            if creature.is_dead() {
                creature.effects.clear();
            } else if creature.is_dying() && creature.is_party_member() {
                creature.life = LifeState::Alive;
                creature.hit_points = 0;
            }
            creature.timer.reset();
        }

        let award: u32 = area
            .encounters()
            .iter()
            .filter(|encounter| encounter.participated)
            .map(|encounter| encounter.award(rounds))
            .sum();
        for encounter in area.encounters_mut() {
            encounter.participated = false;
        }
        if award > 0 {
            let members: Vec<EntityId> =
                area.party().filter(|c| c.is_alive()).map(|c| c.id).collect();
            for id in members {
                if let Some(member) = area.creature_mut(id) {
                    member.experience += award;
                }
                notices.notify(Notice::ExperienceAwarded {
                    creature: id,
                    amount: award,
                });
            }
        }

        let undecided = self.sessions.drain();
        if !undecided.is_empty() {
            debug!(
                target: "skirmish::combat",
                sessions = undecided.len(),
                "reactive sessions closed with combat"
            );
            self.abandoned.extend(undecided);
        }

        area.forget_spotted();
        self.queue.clear();
        self.acting = None;
        self.advance_pending = false;
        self.phase = CombatPhase::OutOfCombat;

        info!(target: "skirmish::combat", rounds, experience = award, "combat ended");
        notices.notify(Notice::CombatEnded { rounds });
        rounds
    }

    /// Offers reactive attacks against a creature. Only provokes while
    /// combat is active. Returns how many player sessions were opened; the
    /// caller must wait until they close.
    pub fn provoke_attacks_of_opportunity(
        &mut self,
        ctx: &mut ReactiveContext<'_>,
        provocation: Provocation,
    ) -> u32 {
        if self.phase != CombatPhase::Active {
            return 0;
        }
        reactive::provoke(&mut self.sessions, ctx, provocation)
    }

    /// Carries out the attack offered by `session`, if the attacker can
    /// still make it. The closed session is returned so a paused mover can
    /// be resumed.
    pub fn accept_reactive_attack(
        &mut self,
        session: u64,
        ctx: &mut ReactiveContext<'_>,
    ) -> Result<ReactiveSession, RequestError> {
        let closed = self.sessions.close(session)?;
        let valid = ctx.area.creature(closed.attacker).is_some_and(|a| !a.is_incapacitated())
            && ctx.area.creature(closed.target).is_some_and(|t| !t.is_dead());
        if valid {
            reactive::strike(ctx, closed.attacker, closed.target);
        }
        Ok(closed)
    }

    pub fn cancel_reactive_attack(
        &mut self,
        session: u64,
    ) -> Result<ReactiveSession, RequestError> {
        let closed = self.sessions.close(session)?;
        debug!(target: "skirmish::combat", session, "reactive attack declined");
        Ok(closed)
    }

    fn mark_participated(area: &mut Area, creature: EntityId) {
        let Some(encounter) = area.creature(creature).and_then(|c| c.encounter) else {
            return;
        };
        if let Some(group) = area.encounters_mut().iter_mut().find(|e| e.id == encounter) {
            group.participated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{ImmediateScripts, PcgRng};
    use crate::state::{
        Controller, Creature, CreatureFlags, Encounter, EncounterId, Faction, LingeringEffect,
        Position,
    };
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    struct Fixture {
        area: Area,
        config: SchedulerConfig,
        scripts: ImmediateScripts,
        notices: Vec<Notice>,
        locks: Vec<Lock>,
    }

    impl Fixture {
        fn new(area: Area) -> Self {
            Self {
                area,
                config: SchedulerConfig::default(),
                scripts: ImmediateScripts::new(),
                notices: Vec::new(),
                locks: Vec::new(),
            }
        }

        fn ctx(&mut self) -> TurnContext<'_> {
            TurnContext {
                now: Millis(0),
                area: &mut self.area,
                config: &self.config,
                rng: &PcgRng,
                scripts: &mut self.scripts,
                notices: &mut self.notices,
                locks: &mut self.locks,
            }
        }
    }

    fn pc(id: u32, initiative: i32) -> Creature {
        Creature::new(
            EntityId(id),
            "pc",
            Faction::Player,
            Controller::Player,
            Position::new(0, id as i32),
        )
        .with_initiative(initiative)
    }

    fn goblin(id: u32, initiative: i32) -> Creature {
        Creature::new(
            EntityId(id),
            "goblin",
            Faction::GoblinClan,
            Controller::Ai,
            Position::new(5, id as i32),
        )
        .with_initiative(initiative)
            .with_script("idle")
    }

    fn started(fx: &mut Fixture, scheduler: &mut CombatScheduler) -> TurnOutcome {
        assert!(scheduler.initiate(Millis(0), &fx.config, &mut fx.locks));
        fx.locks.clear();
        scheduler.advance(&mut fx.ctx())
    }

    #[test]
    fn highest_initiative_goes_first() {
        let mut fx =
            Fixture::new(Area::new().with_creature(pc(1, 100)).with_creature(goblin(2, 0)));
        let mut scheduler = CombatScheduler::new();

        assert_eq!(started(&mut fx, &mut scheduler), TurnOutcome::AwaitingPlayer(EntityId(1)));
        assert_eq!(scheduler.phase(), CombatPhase::Active);
        assert_eq!(scheduler.current_actor(), Some(EntityId(1)));
        assert!(matches!(fx.notices[0], Notice::CombatStarted { combatants: 2, .. }));
    }

    #[test]
    fn initiate_only_from_out_of_combat() {
        let mut fx = Fixture::new(Area::new().with_creature(pc(1, 0)));
        let mut scheduler = CombatScheduler::new();
        assert!(scheduler.initiate(Millis(0), &fx.config, &mut fx.locks));
        assert!(!scheduler.initiate(Millis(0), &fx.config, &mut fx.locks));
        assert_eq!(fx.locks.len(), 1);
        assert_eq!(fx.locks[0].unlock_at(), Millis(fx.config.combat_start_delay_ms));
    }

    #[test]
    fn ai_turn_registers_liveness_lock_and_stops() {
        let mut fx = Fixture::new(
            Area::new()
                .with_creature(pc(1, 100))
                .with_creature(goblin(2, 50))
                .with_creature(goblin(3, 0)),
        );
        let mut scheduler = CombatScheduler::new();
        started(&mut fx, &mut scheduler);

        scheduler
            .end_player_turn(EntityId(1), Millis(0), &fx.config, &mut fx.locks)
            .unwrap();
        assert!(matches!(fx.locks.pop(), Some(lock) if lock.kind().as_str() == "combat_advance"));

        assert_eq!(scheduler.advance(&mut fx.ctx()), TurnOutcome::AiDispatched(EntityId(2)));
        assert_eq!(fx.scripts.started(), &[EntityId(2)]);
        assert_eq!(fx.locks.len(), 1);
        assert!(fx.locks[0].is_ai_liveness());
        assert_eq!(fx.locks[0].owner(), Some(EntityId(2)));
    }

    #[test]
    fn missing_script_still_yields_a_liveness_lock() {
        let mut area = Area::new().with_creature(pc(1, 0));
        let mute = Creature::new(
            EntityId(2),
            "mute",
            Faction::Hostile,
            Controller::Ai,
            Position::new(3, 3),
        );
        area.insert(mute.with_initiative(100));
        let mut fx = Fixture::new(area);
        let mut scheduler = CombatScheduler::new();

        assert_eq!(started(&mut fx, &mut scheduler), TurnOutcome::AiDispatched(EntityId(2)));
        assert!(fx.scripts.started().is_empty());
        assert!(fx.locks[0].is_expired(Millis(fx.config.ai_grace_ms), &Default::default()));
    }

    #[test]
    fn only_the_active_creature_may_end_its_turn() {
        let mut fx =
            Fixture::new(Area::new().with_creature(pc(1, 100)).with_creature(goblin(2, 0)));
        let mut scheduler = CombatScheduler::new();
        assert_eq!(
            scheduler.end_player_turn(EntityId(1), Millis(0), &fx.config, &mut fx.locks),
            Err(RequestError::NotInCombat)
        );
        started(&mut fx, &mut scheduler);

        let err = scheduler
            .end_player_turn(EntityId(2), Millis(0), &fx.config, &mut fx.locks)
            .unwrap_err();
        assert!(matches!(err, RequestError::NotCurrentActor { .. }));

        scheduler
            .end_player_turn(EntityId(1), Millis(0), &fx.config, &mut fx.locks)
            .unwrap();
        assert!(
            scheduler
                .end_player_turn(EntityId(1), Millis(0), &fx.config, &mut fx.locks)
                .is_err()
        );
        assert_eq!(fx.locks.len(), 1);
    }

    #[test]
    fn combat_ends_when_no_hostile_pair_remains() {
        let mut area = Area::new()
            .with_creature(pc(1, 100))
            .with_creature(goblin(2, 0).with_encounter(EncounterId(7)));
        area.add_encounter(Encounter::new(EncounterId(7), 30));
        let mut fx = Fixture::new(area);
        let mut scheduler = CombatScheduler::new();
        started(&mut fx, &mut scheduler);
        assert!(fx.area.encounters()[0].participated);

        fx.area.creature_mut(EntityId(2)).unwrap().kill();
        scheduler
            .end_player_turn(EntityId(1), Millis(0), &fx.config, &mut fx.locks)
            .unwrap();
        assert_eq!(scheduler.advance(&mut fx.ctx()), TurnOutcome::CombatEnded { rounds: 0 });
        assert_eq!(scheduler.phase(), CombatPhase::OutOfCombat);
        assert_eq!(fx.area.creature(EntityId(1)).unwrap().experience, 30);
        assert!(!fx.area.encounters()[0].participated);
        assert!(matches!(fx.notices.last(), Some(Notice::CombatEnded { rounds: 0 })));
    }

    #[test]
    fn exit_heals_dying_party_members_only() {
        let mut area = Area::new()
            .with_creature(pc(1, 0))
            .with_creature(pc(2, 0))
            .with_creature(goblin(3, 0));
        {
            let dying = area.creature_mut(EntityId(1)).unwrap();
            dying.life = LifeState::Dying;
            dying.hit_points = -3;
        }
        area.creature_mut(EntityId(3)).unwrap().life = LifeState::Dying;
        area.creature_mut(EntityId(2)).unwrap().kill();
        area.creature_mut(EntityId(2)).unwrap().effects.push(LingeringEffect {
            name: "burning".into(),
            expires_round: 9,
        });

        let mut scheduler = CombatScheduler::new();
        let mut notices: Vec<Notice> = Vec::new();
        scheduler.exit_combat(&mut area, &mut notices);

        let healed = area.creature(EntityId(1)).unwrap();
        assert_eq!((healed.life, healed.hit_points), (LifeState::Alive, 0));
        assert!(area.creature(EntityId(2)).unwrap().effects.is_empty());
        assert!(area.creature(EntityId(2)).unwrap().is_dead());
        assert!(area.creature(EntityId(3)).unwrap().is_dying());
    }

    #[test]
    fn defeat_reports_game_over_without_cleanup() {
        let mut fx =
            Fixture::new(Area::new().with_creature(pc(1, 100)).with_creature(goblin(2, 0)));
        let mut scheduler = CombatScheduler::new();
        started(&mut fx, &mut scheduler);

        fx.area.creature_mut(EntityId(1)).unwrap().life = LifeState::Dying;
        assert!(scheduler.is_party_defeated(&fx.area));
        assert!(scheduler.is_party_defeated(&fx.area));

        assert_eq!(scheduler.run_turn(&mut fx.ctx()), TurnOutcome::GameOver);
        assert_eq!(scheduler.phase(), CombatPhase::Ending);
        assert!(fx.area.creature(EntityId(1)).unwrap().is_dying());
        assert_eq!(fx.notices.last(), Some(&Notice::GameOver));
        assert_eq!(scheduler.advance(&mut fx.ctx()), TurnOutcome::Idle);
    }

    #[test]
    fn waiting_hands_the_turn_on_once_per_cycle() {
        let mut fx = Fixture::new(
            Area::new()
                .with_creature(pc(1, 100))
                .with_creature(pc(2, 50))
                .with_creature(goblin(3, 0)),
        );
        let mut scheduler = CombatScheduler::new();
        started(&mut fx, &mut scheduler);

        scheduler.active_creature_wait(EntityId(1), 1, &mut fx.ctx()).unwrap();
        assert_eq!(scheduler.queue().order(), &[EntityId(2), EntityId(1), EntityId(3)]);
        assert_eq!(scheduler.current_actor(), None);
        fx.locks.clear();

        assert_eq!(scheduler.advance(&mut fx.ctx()), TurnOutcome::AwaitingPlayer(EntityId(2)));
        scheduler.end_player_turn(EntityId(2), Millis(0), &fx.config, &mut fx.locks).unwrap();
        fx.locks.clear();
        assert_eq!(scheduler.advance(&mut fx.ctx()), TurnOutcome::AwaitingPlayer(EntityId(1)));

        assert_eq!(
            scheduler.active_creature_wait(EntityId(1), 1, &mut fx.ctx()),
            Err(RequestError::AlreadyWaited(EntityId(1)))
        );
    }

    #[test]
    fn late_joiner_is_appended() {
        let mut fx =
            Fixture::new(Area::new().with_creature(pc(1, 100)).with_creature(goblin(2, 0)));
        let mut scheduler = CombatScheduler::new();
        started(&mut fx, &mut scheduler);

        fx.area.insert(goblin(3, 99));
        assert!(scheduler.enlist(&mut fx.area, EntityId(3)));
        assert!(!scheduler.enlist(&mut fx.area, EntityId(3)));
        assert_eq!(scheduler.queue().order().last(), Some(&EntityId(3)));
    }

    proptest! {
        /// Starting from the first slot of combat, every eligible combatant
        /// acts before the round counter moves on.
        #[test]
        fn every_eligible_combatant_acts_each_round(
            stats in prop::collection::vec((any::<bool>(), any::<bool>(), -5i32..5), 1..8),
            seed in any::<u64>(),
        ) {
            let mut area = Area::new()
                .with_creature(
                    Creature::new(
                        EntityId(100),
                        "ward",
                        Faction::Player,
                        Controller::Ai,
                        Position::ORIGIN,
                    )
                    .with_script("idle"),
                )
                .with_creature(goblin(99, 0));
            for (i, (helpless, dead, initiative)) in stats.iter().enumerate() {
                let mut creature = goblin(i as u32 + 1, *initiative);
                if *helpless {
                    creature.flags.insert(CreatureFlags::HELPLESS);
                }
                if *dead {
                    creature.kill();
                }
                area.insert(creature);
            }

            let mut fx = Fixture::new(area);
            fx.config.rng_seed = seed;
            let eligible: BTreeSet<EntityId> = fx
                .area
                .creatures()
                .filter(|c| c.is_combat_eligible())
                .map(|c| c.id)
                .collect();

            let mut scheduler = CombatScheduler::new();
            let start = fx.area.round;
            let mut seen = BTreeSet::new();
            let mut outcome = started(&mut fx, &mut scheduler);
            loop {
                let id = match outcome {
                    TurnOutcome::AiDispatched(id) => id,
                    other => {
                        return Err(TestCaseError::fail(format!("unexpected outcome {other:?}")));
                    }
                };
                if fx.area.round != start {
                    break;
                }
                seen.insert(id);
                fx.locks.clear();
                outcome = scheduler.advance(&mut fx.ctx());
            }
            prop_assert_eq!(fx.area.round, start + 1);
            prop_assert_eq!(seen, eligible);
        }
    }
}
