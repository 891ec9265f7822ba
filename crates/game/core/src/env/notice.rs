//! Fire-and-forget notifications for the message log and UI.

use crate::state::{EntityId, Position};

/// Something the player should be told about.
#[derive(Clone, Debug, PartialEq, Eq, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Notice {
    HostileSpotted {
        observer: EntityId,
        hostile: EntityId,
    },
    CombatStarted {
        round: u32,
        combatants: usize,
    },
    RoundStarted {
        round: u32,
    },
    TurnStarted {
        creature: EntityId,
        round: u32,
    },
    /// A player-controlled creature may take a reactive attack.
    ReactiveAttackOffered {
        session: u64,
        attacker: EntityId,
        target: EntityId,
    },
    ReactiveAttack {
        attacker: EntityId,
        target: EntityId,
    },
    MovementInterrupted {
        creature: EntityId,
        at: Position,
    },
    ExperienceAwarded {
        creature: EntityId,
        amount: u32,
    },
    CombatEnded {
        rounds: u32,
    },
    GameOver,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::HostileSpotted { hostile, .. } => {
                write!(f, "Hostile creature spotted: {hostile}")
            }
            Notice::CombatStarted { .. } => write!(f, "Combat has started"),
            Notice::RoundStarted { round } => write!(f, "Round {round}"),
            Notice::TurnStarted { creature, .. } => write!(f, "{creature} takes its turn"),
            Notice::ReactiveAttackOffered { attacker, target, .. } => {
                write!(f, "{attacker} may attack {target} reactively")
            }
            Notice::ReactiveAttack { attacker, target } => {
                write!(f, "{attacker} makes an attack of opportunity against {target}")
            }
            Notice::MovementInterrupted { creature, at } => {
                write!(f, "{creature} stops at {at}")
            }
            Notice::ExperienceAwarded { creature, amount } => {
                write!(f, "{creature} gains {amount} experience")
            }
            Notice::CombatEnded { .. } => write!(f, "Combat has ended"),
            Notice::GameOver => write!(f, "The party has fallen"),
        }
    }
}

/// One-way notification channel. No acknowledgment is expected.
pub trait NotificationSink {
    fn notify(&mut self, notice: Notice);
}

impl NotificationSink for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

/// Discards every notice.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notice: Notice) {}
}
