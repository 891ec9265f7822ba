//! Initiative rolls.
//!
//! Every living creature rolls its initiative stat plus one die. The order
//! is by score, then by stat, then by a second independent roll, all
//! descending. Entity id settles anything left.

use std::cmp::Reverse;

use crate::env::{RngOracle, compute_seed};
use crate::state::{Area, EntityId};

const ROLL_CONTEXT: u32 = 0;
const TIE_BREAK_CONTEXT: u32 = 1;

/// One creature's initiative result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitiativeRoll {
    pub creature: EntityId,
    pub stat: i32,
    pub roll: u32,
    pub tie_break: u32,
}

impl InitiativeRoll {
    pub fn score(&self) -> i64 {
        i64::from(self.stat) + i64::from(self.roll)
    }
}

/// Rolls initiative for every creature that is not dead and returns the
/// rolls sorted into turn order.
pub fn roll_initiative(
    area: &Area,
    rng: &dyn RngOracle,
    game_seed: u64,
    die: u32,
) -> Vec<InitiativeRoll> {
    let round = area.round;
    let mut rolls: Vec<InitiativeRoll> = area
        .creatures()
        .filter(|creature| !creature.is_dead())
        .map(|creature| InitiativeRoll {
            creature: creature.id,
            stat: creature.initiative,
            roll: rng.roll_die(compute_seed(game_seed, round, creature.id.0, ROLL_CONTEXT), die),
            tie_break: rng.next_u32(compute_seed(
                game_seed,
                round,
                creature.id.0,
                TIE_BREAK_CONTEXT,
            )),
        })
        .collect();

    rolls.sort_by_key(|roll| {
        (
            Reverse(roll.score()),
            Reverse(roll.stat),
            Reverse(roll.tie_break),
            roll.creature,
        )
    });
    rolls
}
