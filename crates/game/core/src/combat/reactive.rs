//! Attacks of opportunity.
//!
//! A creature that leaves a cell threatened by a hostile, or attacks from
//! inside its reach with a ranged weapon, may be attacked out of turn. AI
//! attackers decide and strike immediately. Player attackers get a targeting
//! session, and everything that provoked it waits until the player accepts
//! or cancels.

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::env::{AttackResolver, Notice, NotificationSink};
use crate::error::RequestError;
use crate::lock::Lock;
use crate::movement::{AnimationCue, MoverId};
use crate::state::{Area, Creature, EntityId, Millis, Position};

/// An open player decision about one reactive attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReactiveSession {
    pub id: u64,
    pub attacker: EntityId,
    pub target: EntityId,
    /// Mover paused by this session, resumed when it closes.
    pub mover: Option<MoverId>,
}

#[derive(Clone, Debug, Default)]
pub struct ReactiveSessions {
    open: Vec<ReactiveSession>,
    next_id: u64,
}

impl ReactiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReactiveSession> {
        self.open.iter()
    }

    pub fn get(&self, id: u64) -> Option<&ReactiveSession> {
        self.open.iter().find(|session| session.id == id)
    }

    pub fn has_attacker(&self, attacker: EntityId) -> bool {
        self.open.iter().any(|session| session.attacker == attacker)
    }

    fn open(
        &mut self,
        attacker: EntityId,
        target: EntityId,
        mover: Option<MoverId>,
    ) -> ReactiveSession {
        let session = ReactiveSession {
            id: self.next_id,
            attacker,
            target,
            mover,
        };
        self.next_id += 1;
        self.open.push(session);
        session
    }

    pub fn close(&mut self, id: u64) -> Result<ReactiveSession, RequestError> {
        let index = self
            .open
            .iter()
            .position(|session| session.id == id)
            .ok_or(RequestError::UnknownSession(id))?;
        Ok(self.open.remove(index))
    }

    /// Closes every open session at once.
    pub fn drain(&mut self) -> Vec<ReactiveSession> {
        std::mem::take(&mut self.open)
    }
}

/// Everything a reactive attack may touch.
pub struct ReactiveContext<'a> {
    pub now: Millis,
    pub area: &'a mut Area,
    pub config: &'a SchedulerConfig,
    pub resolver: &'a mut dyn AttackResolver,
    pub notices: &'a mut dyn NotificationSink,
    pub locks: &'a mut Vec<Lock>,
    pub cues: &'a mut Vec<AnimationCue>,
}

/// Where the provoking creature is and, for movement, where it is going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provocation {
    pub target: EntityId,
    pub from: Position,
    /// Attackers that still reach this cell gain nothing by striking now.
    pub to: Option<Position>,
    pub mover: Option<MoverId>,
}

impl Provocation {
    pub fn leaving(target: EntityId, from: Position, to: Position, mover: MoverId) -> Self {
        Self {
            target,
            from,
            to: Some(to),
            mover: Some(mover),
        }
    }

    pub fn standing(target: EntityId, at: Position) -> Self {
        Self {
            target,
            from: at,
            to: None,
            mover: None,
        }
    }
}

/// Creatures able to take a reactive attack against `provocation.target`,
/// in id order.
pub fn reactive_attackers(
    area: &Area,
    sessions: &ReactiveSessions,
    provocation: &Provocation,
) -> Vec<EntityId> {
    let Some(target) = area.creature(provocation.target) else {
        return Vec::new();
    };
    if target.is_hidden() || target.is_dead() {
        return Vec::new();
    }

    area.creatures()
        .filter(|attacker| can_react(attacker, target, sessions))
        .filter(|attacker| attacker.threatens(provocation.from))
        .filter(|attacker| provocation.to.is_none_or(|to| !attacker.threatens(to)))
        .map(|attacker| attacker.id)
        .collect()
}

fn can_react(attacker: &Creature, target: &Creature, sessions: &ReactiveSessions) -> bool {
    attacker.id != target.id
        && attacker.is_alive()
        && !attacker.is_helpless()
        && attacker.is_hostile_to(target)
        && attacker.timer.has_reaction()
        && !sessions.has_attacker(attacker.id)
}

/// Resolves one reactive attack: spends the attacker's reaction, applies the
/// attack and plays it.
pub(crate) fn strike(ctx: &mut ReactiveContext<'_>, attacker: EntityId, target: EntityId) -> bool {
    let spent = ctx
        .area
        .creature_mut(attacker)
        .is_some_and(|creature| creature.timer.consume_reaction());
    if !spent {
        return false;
    }

    ctx.resolver.resolve_attack(ctx.area, attacker, target);
    ctx.notices.notify(Notice::ReactiveAttack { attacker, target });
    ctx.cues.push(AnimationCue::Attack {
        attacker,
        target,
        duration_ms: ctx.config.attack_animation_ms,
    });
    ctx.locks.push(Lock::timed(ctx.now, ctx.config.attack_animation_ms).with_owner(attacker));

    debug!(
        target: "skirmish::combat",
        attacker = %attacker,
        victim = %target,
        "reactive attack resolved"
    );
    true
}

/// Offers every eligible attacker its reactive attack. Returns how many
/// player sessions were opened.
pub(crate) fn provoke(
    sessions: &mut ReactiveSessions,
    ctx: &mut ReactiveContext<'_>,
    provocation: Provocation,
) -> u32 {
    let attackers = reactive_attackers(ctx.area, sessions, &provocation);
    let target = provocation.target;
    let mut opened = 0;

    for attacker in attackers {
        let still_standing = ctx
            .area
            .creature(target)
            .is_some_and(|victim| !victim.is_dead() && !victim.is_dying());
        if !still_standing {
            break;
        }
        let Some(controller) = ctx
            .area
            .creature(attacker)
            .map(Creature::is_player_controlled)
        else {
            continue;
        };

        if controller {
            let session = sessions.open(attacker, target, provocation.mover);
            ctx.notices.notify(Notice::ReactiveAttackOffered {
                session: session.id,
                attacker,
                target,
            });
            ctx.locks.push(
                Lock::reactive_targeting(ctx.now, ctx.config.reactive_extension_ms)
                    .with_owner(attacker),
            );
            debug!(
                target: "skirmish::combat",
                session = session.id,
                attacker = %attacker,
                victim = %target,
                "reactive targeting session opened"
            );
            opened += 1;
        } else if ctx.resolver.wants_reactive_attack(ctx.area, attacker, target) {
            strike(ctx, attacker, target);
        }
    }

    opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::RecordingResolver;
    use crate::state::{Controller, CreatureFlags, Faction};

    fn creature(id: u32, faction: Faction, controller: Controller, at: Position) -> Creature {
        Creature::new(EntityId(id), "c", faction, controller, at)
    }

    /// The goblin at (0, 1) threatens (1, 0) but not (2, 0); the one at
    /// (2, 1) threatens both.
    fn area() -> Area {
        Area::new()
            .with_creature(creature(1, Faction::Player, Controller::Player, Position::new(1, 0)))
            .with_creature(creature(2, Faction::GoblinClan, Controller::Ai, Position::new(0, 1)))
            .with_creature(creature(3, Faction::GoblinClan, Controller::Ai, Position::new(2, 1)))
    }

    #[test]
    fn only_attackers_losing_reach_provoke() {
        let area = area();
        let leaving =
            Provocation::leaving(EntityId(1), Position::new(1, 0), Position::new(2, 0), MoverId(0));
        assert_eq!(
            reactive_attackers(&area, &ReactiveSessions::new(), &leaving),
            vec![EntityId(2)]
        );

        let standing = Provocation::standing(EntityId(1), Position::new(1, 0));
        assert_eq!(
            reactive_attackers(&area, &ReactiveSessions::new(), &standing),
            vec![EntityId(2), EntityId(3)]
        );
    }

    #[test]
    fn hidden_or_spent_creatures_are_left_alone() {
        let mut area = area();
        let standing = Provocation::standing(EntityId(1), Position::new(1, 0));

        area.creature_mut(EntityId(2)).unwrap().timer.consume_reaction();
        assert_eq!(
            reactive_attackers(&area, &ReactiveSessions::new(), &standing),
            vec![EntityId(3)]
        );

        area.creature_mut(EntityId(1)).unwrap().flags.insert(CreatureFlags::HIDDEN);
        assert!(reactive_attackers(&area, &ReactiveSessions::new(), &standing).is_empty());
    }

    #[test]
    fn ai_attackers_strike_and_players_get_sessions() {
        let mut area = Area::new()
            .with_creature(creature(1, Faction::OrcHorde, Controller::Ai, Position::new(1, 0)))
            .with_creature(creature(2, Faction::Player, Controller::Player, Position::new(1, 1)))
            .with_creature(creature(3, Faction::Hostile, Controller::Ai, Position::new(0, 1)));
        // Monster factions other than goblins and orcs leave each other alone.
        let config = SchedulerConfig::default();
        let mut resolver = RecordingResolver::default();
        let mut notices: Vec<Notice> = Vec::new();
        let mut locks = Vec::new();
        let mut cues = Vec::new();
        let mut sessions = ReactiveSessions::new();

        let mut ctx = ReactiveContext {
            now: Millis(0),
            area: &mut area,
            config: &config,
            resolver: &mut resolver,
            notices: &mut notices,
            locks: &mut locks,
            cues: &mut cues,
        };
        let opened = provoke(
            &mut sessions,
            &mut ctx,
            Provocation::standing(EntityId(1), Position::new(1, 0)),
        );

        assert_eq!(opened, 1);
        assert_eq!(sessions.len(), 1);
        assert!(resolver.attacks.is_empty());
        assert!(matches!(notices[0], Notice::ReactiveAttackOffered { attacker: EntityId(2), .. }));
        assert!(sessions.close(0).is_ok());
        assert_eq!(sessions.close(0), Err(RequestError::UnknownSession(0)));
    }
}
