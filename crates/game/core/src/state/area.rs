//! The area a skirmish takes place in: creatures, terrain costs, encounters,
//! and the round counter.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Creature, EncounterId, EntityId, Position};
use crate::env::VisibilityOracle;

/// Encounter group spawned together; rewards the party when it fought.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Encounter {
    pub id: EncounterId,
    pub experience_per_round: u32,
    /// Set when a member of the group joined the turn queue.
    pub participated: bool,
}

impl Encounter {
    pub fn new(id: EncounterId, experience_per_round: u32) -> Self {
        Self {
            id,
            experience_per_round,
            participated: false,
        }
    }

    /// Experience granted for a fight that lasted `rounds` rounds.
    pub fn award(&self, rounds: u32) -> u32 {
        self.experience_per_round.saturating_mul(rounds.max(1))
    }
}

/// Authoritative world data the scheduler reads and mutates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Area {
    creatures: BTreeMap<EntityId, Creature>,
    entry_costs: HashMap<Position, u32>,
    encounters: Vec<Encounter>,
    /// Hostiles already reported to the party.
    spotted: BTreeSet<EntityId>,
    /// Global round counter, advanced whenever the turn queue wraps.
    pub round: u32,
}

impl Area {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a creature.
    pub fn insert(&mut self, creature: Creature) {
        self.creatures.insert(creature.id, creature);
    }

    #[must_use]
    pub fn with_creature(mut self, creature: Creature) -> Self {
        self.insert(creature);
        self
    }

    pub fn add_encounter(&mut self, encounter: Encounter) {
        self.encounters.push(encounter);
    }

    pub fn creature(&self, id: EntityId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    pub fn creature_mut(&mut self, id: EntityId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    /// Creatures in ascending id order.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    pub fn creatures_mut(&mut self) -> impl Iterator<Item = &mut Creature> {
        self.creatures.values_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.creatures.keys().copied().collect()
    }

    pub fn party(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values().filter(|c| c.is_party_member())
    }

    pub fn encounters(&self) -> &[Encounter] {
        &self.encounters
    }

    pub fn encounters_mut(&mut self) -> &mut [Encounter] {
        &mut self.encounters
    }

    pub fn set_entry_cost(&mut self, cell: Position, cost: u32) {
        self.entry_costs.insert(cell, cost);
    }

    /// Action points needed to step into `cell`; open ground costs 1.
    pub fn entry_cost(&self, cell: Position) -> u32 {
        self.entry_costs.get(&cell).copied().unwrap_or(1)
    }

    /// Moves a creature to `cell`. Returns false if the creature is unknown.
    pub fn relocate(&mut self, id: EntityId, cell: Position) -> bool {
        match self.creatures.get_mut(&id) {
            Some(creature) => {
                creature.position = cell;
                true
            }
            None => false,
        }
    }

    /// Whether a non-moving creature other than `except` stands on `cell`.
    ///
    /// Dead bodies do not block.
    pub fn is_blocked(&self, cell: Position, except: EntityId) -> bool {
        self.creatures.values().any(|c| {
            c.id != except && c.position == cell && !c.is_moving() && !c.is_dead()
        })
    }

    /// Runs hostile-visibility detection for `observer` and returns hostiles
    /// that were not reported before. Only creatures that could take a turn
    /// count; downed or inactive hostiles never start a fight.
    pub fn spot_hostiles(
        &mut self,
        observer: EntityId,
        oracle: &dyn VisibilityOracle,
    ) -> Vec<EntityId> {
        let Some(watcher) = self.creatures.get(&observer) else {
            return Vec::new();
        };

        let fresh: Vec<EntityId> = self
            .creatures
            .values()
            .filter(|other| {
                other.id != watcher.id
                    && other.is_combat_eligible()
                    && !other.is_hidden()
                    && other.is_hostile_to(watcher)
                    && !self.spotted.contains(&other.id)
                    && oracle.can_see(self, watcher, other)
            })
            .map(|other| other.id)
            .collect();

        self.spotted.extend(fresh.iter().copied());
        fresh
    }

    pub fn forget_spotted(&mut self) {
        self.spotted.clear();
    }

    /// Increments the round counter, expiring lingering effects and
    /// restoring reactive-attack allowances.
    pub fn advance_round(&mut self) -> u32 {
        self.round += 1;
        let round = self.round;

        for creature in self.creatures.values_mut() {
            creature.effects.retain(|effect| effect.expires_round > round);
            creature.timer.refresh_reactions();
        }

        round
    }

    /// True if every party member is dead or dying. An empty party is never
    /// considered defeated.
    pub fn is_party_defeated(&self) -> bool {
        let mut party = self.party().peekable();
        party.peek().is_some() && party.all(|c| c.is_dead() || c.is_dying())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SightRadius;
    use crate::state::{Controller, CreatureFlags, Faction, LifeState, LingeringEffect};

    fn pc(id: u32, at: Position) -> Creature {
        Creature::new(EntityId(id), "pc", Faction::Player, Controller::Player, at)
    }

    fn goblin(id: u32, at: Position) -> Creature {
        Creature::new(EntityId(id), "goblin", Faction::GoblinClan, Controller::Ai, at)
    }

    #[test]
    fn spotting_reports_each_hostile_once() {
        let mut area = Area::new()
            .with_creature(pc(1, Position::ORIGIN).with_sight(3))
            .with_creature(goblin(2, Position::new(2, 0)))
            .with_creature(goblin(3, Position::new(9, 0)));

        let first = area.spot_hostiles(EntityId(1), &SightRadius);
        assert_eq!(first, vec![EntityId(2)]);

        let again = area.spot_hostiles(EntityId(1), &SightRadius);
        assert!(again.is_empty());
    }

    #[test]
    fn downed_hostiles_go_unnoticed() {
        let mut dying = goblin(2, Position::new(1, 0));
        dying.hit_points = 0;
        dying.life = LifeState::Dying;
        let mut area = Area::new()
            .with_creature(pc(1, Position::ORIGIN).with_sight(5))
            .with_creature(dying)
            .with_creature(goblin(3, Position::new(2, 0)).with_flags(CreatureFlags::HELPLESS));

        for _ in 0..3 {
            assert!(area.spot_hostiles(EntityId(1), &SightRadius).is_empty());
            area.forget_spotted();
        }

        area.creature_mut(EntityId(2)).unwrap().life = LifeState::Alive;
        assert_eq!(area.spot_hostiles(EntityId(1), &SightRadius), vec![EntityId(2)]);
    }

    #[test]
    fn moving_and_dead_creatures_do_not_block() {
        let mut area = Area::new().with_creature(goblin(2, Position::new(1, 1)));
        assert!(area.is_blocked(Position::new(1, 1), EntityId(1)));
        assert!(!area.is_blocked(Position::new(1, 1), EntityId(2)));

        area.creature_mut(EntityId(2)).unwrap().kill();
        assert!(!area.is_blocked(Position::new(1, 1), EntityId(1)));
    }

    #[test]
    fn advance_round_expires_effects() {
        let mut creature = pc(1, Position::ORIGIN);
        creature.effects.push(LingeringEffect {
            name: "bless".into(),
            expires_round: 2,
        });
        let mut area = Area::new().with_creature(creature);

        area.advance_round();
        assert_eq!(area.creature(EntityId(1)).unwrap().effects.len(), 1);
        area.advance_round();
        assert!(area.creature(EntityId(1)).unwrap().effects.is_empty());
    }

    #[test]
    fn party_defeat_requires_every_member_down() {
        let mut area = Area::new()
            .with_creature(pc(1, Position::ORIGIN))
            .with_creature(pc(2, Position::new(1, 0)));
        assert!(!area.is_party_defeated());

        area.creature_mut(EntityId(1)).unwrap().life = LifeState::Dead;
        assert!(!area.is_party_defeated());

        area.creature_mut(EntityId(2)).unwrap().life = LifeState::Dying;
        assert!(area.is_party_defeated());
        assert!(area.is_party_defeated());

        assert!(!Area::new().is_party_defeated());
    }

    #[test]
    fn encounter_award_counts_at_least_one_round() {
        let encounter = Encounter::new(EncounterId(1), 25);
        assert_eq!(encounter.award(0), 25);
        assert_eq!(encounter.award(3), 75);
    }
}
