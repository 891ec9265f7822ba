//! Topic-based event bus for runtime events.
//!
//! The frame worker publishes what the engine reports each tick; consumers
//! subscribe only to the topics they need.

mod bus;

pub use bus::{BusSink, CombatEvent, Event, EventBus, InterfaceEvent, Topic};
