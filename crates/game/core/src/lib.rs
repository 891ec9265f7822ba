//! Turn and animation scheduling for tile-based tactical games.
//!
//! `skirmish-core` decides when the player may act. It sequences creature
//! movement one tile at a time, pauses movers for attacks of opportunity,
//! and walks the combat turn queue between real-time exploration and
//! turn-based fights. Everything runs on the caller's clock: an outer loop
//! calls [`Engine::tick`] once per frame and everything else is a request
//! between ticks.
//!
//! Game rules (damage, sight, path finding, AI decisions) are supplied
//! through the traits in [`env`].
pub mod combat;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod lock;
pub mod movement;
pub mod state;

pub use combat::{CombatPhase, CombatScheduler, ReactiveSession, TurnOutcome, TurnQueue};
pub use config::SchedulerConfig;
pub use engine::{AttackResolution, AttackStyle, Engine, EngineBuilder, FrameReport};
pub use env::{
    AttackResolver, NotificationSink, Notice, RngOracle, ScriptLiveness, ScriptRunner,
    TurnRequest, VisibilityOracle,
};
pub use error::{ErrorSeverity, GameError, RequestError, ScriptError};
pub use lock::{Completion, Lock, LockId, LockKind, LockPriority, LockRegistry, TickReport};
pub use movement::{AnimationCue, MoveRequest, MovementCoordinator, MoverId};
pub use state::{
    ActionTimer, Area, Controller, Creature, CreatureFlags, Encounter, EncounterId, EntityId,
    Faction, LifeState, Millis, Position,
};
