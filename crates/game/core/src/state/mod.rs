//! World data the scheduler operates on.
//!
//! The scheduler never owns game rules such as damage or pathing; it reads
//! and updates creature positions, conditions, timers and the round counter
//! kept here.
mod area;
mod common;
mod creature;
mod timer;

pub use area::{Area, Encounter};
pub use common::{EntityId, Millis, Position};
pub use creature::{
    Controller, Creature, CreatureFlags, EncounterId, Faction, LifeState, LingeringEffect,
};
pub use timer::ActionTimer;
