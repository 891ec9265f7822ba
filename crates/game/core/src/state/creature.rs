//! Creatures taking part in scheduling: identity, allegiance and condition.

use super::{ActionTimer, EntityId, Position};

/// Allegiance used for hostility checks.
///
/// Faction can change during play (charm, betrayal), so hostility is always
/// evaluated at query time rather than cached.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Faction {
    /// Bystanders that never fight.
    #[default]
    None,
    /// The player's party.
    Player,
    /// Allied to the party, never targeted by it.
    Friendly,
    /// Won't start fights.
    Neutral,
    /// Generic enemies of the party.
    Hostile,
    GoblinClan,
    OrcHorde,
    UndeadLegion,
}

impl Faction {
    /// Check if this faction is hostile to another faction.
    pub fn is_hostile_to(&self, other: &Faction) -> bool {
        if self == other {
            return false;
        }

        match (self, other) {
            (Faction::None | Faction::Neutral, _) | (_, Faction::None | Faction::Neutral) => false,

            // Party and allies against every monster faction
            (Faction::Player | Faction::Friendly, monsters)
            | (monsters, Faction::Player | Faction::Friendly) => monsters.is_monster(),

            // Inter-faction feud
            (Faction::GoblinClan, Faction::OrcHorde) | (Faction::OrcHorde, Faction::GoblinClan) => {
                true
            }

            _ => false,
        }
    }

    fn is_monster(&self) -> bool {
        matches!(
            self,
            Faction::Hostile | Faction::GoblinClan | Faction::OrcHorde | Faction::UndeadLegion
        )
    }
}

/// Who decides what the creature does on its turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Controller {
    Player,
    Ai,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LifeState {
    #[default]
    Alive,
    /// Below zero hit points but not yet dead.
    Dying,
    Dead,
}

bitflags::bitflags! {
    /// Transient condition bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CreatureFlags: u8 {
        /// Unseen by others; cannot be targeted reactively.
        const HIDDEN = 0b0000_0001;
        /// Paralysed, asleep or otherwise unable to act.
        const HELPLESS = 0b0000_0010;
        /// A mover currently owns this creature's position.
        const MOVING = 0b0000_0100;
        /// AI participates in combat. Cleared for ambient NPCs.
        const AI_ACTIVE = 0b0000_1000;
    }
}

/// A timed effect that expires at a given round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LingeringEffect {
    pub name: String,
    /// Round at which the effect wears off.
    pub expires_round: u32,
}

/// Identifier of the encounter group a creature was spawned with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncounterId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Creature {
    pub id: EntityId,
    pub name: String,
    pub faction: Faction,
    pub controller: Controller,
    pub position: Position,
    pub hit_points: i32,
    pub life: LifeState,
    pub flags: CreatureFlags,
    /// Base initiative bonus added to the initiative roll.
    pub initiative: i32,
    /// Radius in cells within which hostiles are spotted.
    pub sight: u32,
    /// Radius in cells the creature threatens for reactive attacks.
    pub reach: u32,
    /// Name of the AI turn function.
    pub script: Option<String>,
    pub encounter: Option<EncounterId>,
    pub experience: u32,
    pub effects: Vec<LingeringEffect>,
    pub timer: ActionTimer,
}

impl Creature {
    /// Creates an alive, visible creature with default stats.
    ///
    /// AI-controlled creatures start with [`CreatureFlags::AI_ACTIVE`].
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        faction: Faction,
        controller: Controller,
        position: Position,
    ) -> Self {
        let flags = match controller {
            Controller::Ai => CreatureFlags::AI_ACTIVE,
            Controller::Player => CreatureFlags::empty(),
        };

        Self {
            id,
            name: name.into(),
            faction,
            controller,
            position,
            hit_points: 10,
            life: LifeState::Alive,
            flags,
            initiative: 0,
            sight: 8,
            reach: 1,
            script: None,
            encounter: None,
            experience: 0,
            effects: Vec::new(),
            timer: ActionTimer::default(),
        }
    }

    #[must_use]
    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = initiative;
        self
    }

    #[must_use]
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    #[must_use]
    pub fn with_sight(mut self, sight: u32) -> Self {
        self.sight = sight;
        self
    }

    #[must_use]
    pub fn with_reach(mut self, reach: u32) -> Self {
        self.reach = reach;
        self
    }

    #[must_use]
    pub fn with_timer(mut self, timer: ActionTimer) -> Self {
        self.timer = timer;
        self
    }

    #[must_use]
    pub fn with_encounter(mut self, encounter: EncounterId) -> Self {
        self.encounter = Some(encounter);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: CreatureFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_player_controlled(&self) -> bool {
        self.controller == Controller::Player
    }

    pub fn is_party_member(&self) -> bool {
        self.faction == Faction::Player
    }

    pub fn is_dead(&self) -> bool {
        self.life == LifeState::Dead
    }

    pub fn is_dying(&self) -> bool {
        self.life == LifeState::Dying
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(CreatureFlags::HIDDEN)
    }

    pub fn is_helpless(&self) -> bool {
        self.flags.contains(CreatureFlags::HELPLESS)
    }

    pub fn is_moving(&self) -> bool {
        self.flags.contains(CreatureFlags::MOVING)
    }

    /// Dead, dying or helpless creatures cannot act.
    pub fn is_incapacitated(&self) -> bool {
        !self.is_alive() || self.is_helpless()
    }

    /// Alive, not helpless, and either player-controlled or AI-active.
    pub fn is_combat_eligible(&self) -> bool {
        !self.is_incapacitated()
            && (self.is_player_controlled() || self.flags.contains(CreatureFlags::AI_ACTIVE))
    }

    pub fn is_hostile_to(&self, other: &Creature) -> bool {
        self.faction.is_hostile_to(&other.faction)
    }

    /// Whether the creature can reach `cell` with a melee attack.
    pub fn threatens(&self, cell: Position) -> bool {
        self.position.distance(cell) <= self.reach
    }

    pub fn kill(&mut self) {
        self.hit_points = self.hit_points.min(0);
        self.life = LifeState::Dead;
    }
}
