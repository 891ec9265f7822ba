//! High-level runtime orchestrator.
//!
//! The runtime owns the frame worker, wires up command/event channels, and
//! exposes a builder-based API for clients to drive a skirmish.

use std::path::Path;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use skirmish_core::{Area, AttackResolver, Engine, VisibilityOracle};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::config::RuntimeConfig;
use crate::events::{BusSink, EventBus};
use crate::scenario::Scenario;
use crate::scripts::{ScriptLibrary, TokioScriptRunner};
use crate::workers::{Command, FrameStatus, FrameWorker};

/// Main runtime driving one area.
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<Engine>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Stop the frame worker and return the final area.
    pub async fn shutdown(self) -> Result<Area> {
        // The worker may already be gone; joining reports why.
        let _ = self.shutdown.send(());
        let engine = self.worker.await.map_err(RuntimeError::WorkerJoin)?;
        tracing::info!(target: "runtime::worker", now = %engine.now(), "runtime shut down");
        Ok(engine.area().clone())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    area: Option<Area>,
    library: ScriptLibrary,
    resolver: Option<Box<dyn AttackResolver + Send>>,
    visibility: Option<Box<dyn VisibilityOracle + Send + Sync>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            area: None,
            library: ScriptLibrary::with_builtins(),
            resolver: None,
            visibility: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn area(mut self, area: Area) -> Self {
        self.area = Some(area);
        self
    }

    pub fn scenario(self, scenario: Scenario) -> Result<Self> {
        let area = scenario.into_area()?;
        Ok(self.area(area))
    }

    pub fn scenario_file(self, path: &Path) -> Result<Self> {
        self.scenario(Scenario::load_from_file(path)?)
    }

    /// Replace the script library. Defaults to the built-in scripts.
    pub fn scripts(mut self, library: ScriptLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn resolver(mut self, resolver: impl AttackResolver + Send + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn visibility(mut self, visibility: impl VisibilityOracle + Send + Sync + 'static) -> Self {
        self.visibility = Some(Box::new(visibility));
        self
    }

    /// Build the runtime and spawn the frame worker.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<Runtime> {
        let area = self.area.ok_or(RuntimeError::MissingArea)?;

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let (frames_tx, frames_rx) = watch::channel(FrameStatus::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = RuntimeHandle::new(command_tx, event_bus.clone(), frames_rx);
        let runner = TokioScriptRunner::new(
            tokio::runtime::Handle::current(),
            self.library,
            handle.clone(),
        );

        let mut engine = Engine::builder(area)
            .config(self.config.scheduler.clone())
            .scripts(runner)
            .notices(BusSink::new(event_bus.clone()));
        if let Some(resolver) = self.resolver {
            engine = engine.resolver(resolver);
        }
        if let Some(visibility) = self.visibility {
            engine = engine.visibility(visibility);
        }

        let worker = FrameWorker::new(
            engine.build(),
            command_rx,
            event_bus,
            frames_tx,
            self.config.frame_interval,
            self.config.auto_scan,
        );
        let worker = tokio::spawn(worker.run(shutdown_rx));

        Ok(Runtime {
            handle,
            shutdown: shutdown_tx,
            worker,
        })
    }
}
