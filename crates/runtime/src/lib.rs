//! Async runtime for the skirmish scheduler.
//!
//! This crate drives a [`skirmish_core::Engine`] from a tokio frame loop,
//! runs AI turn functions as tasks, and streams what happens to subscribers.
//! Consumers embed [`Runtime`] and interact with the area through
//! [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`scripts`] holds the AI script library and its tokio runner
//! - [`scenario`] and [`config`] load areas and settings from disk
//! - `workers` keeps the frame loop internal to the crate
pub mod api;
pub mod config;
pub mod events;
pub mod runtime;
pub mod scenario;
pub mod scripts;

mod workers;

pub use api::{Result, RuntimeError, RuntimeHandle, Status};
pub use config::{RuntimeConfig, load_scheduler_config};
pub use events::{BusSink, CombatEvent, Event, EventBus, InterfaceEvent, Topic};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scenario::{CreaturePlacement, EncounterSpec, Scenario, TerrainCost};
pub use scripts::{
    AiScript, ChargeScript, IdleScript, ScriptContext, ScriptFault, ScriptLibrary,
    TokioScriptRunner,
};
pub use workers::FrameStatus;
