//! AI turn functions executed on the tokio runtime.
//!
//! The engine dispatches an AI turn through [`ScriptRunner::start_async`].
//! [`TokioScriptRunner`] looks the creature's script up in a
//! [`ScriptLibrary`] and spawns it. The spawned task holds the liveness
//! guard, so the engine sees the script as finished once the task ends,
//! whether it returned, failed or panicked.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

use skirmish_core::{Area, EntityId, ScriptError, ScriptLiveness, ScriptRunner, TurnRequest};

use crate::api::{RuntimeError, RuntimeHandle};

pub use builtin::{ChargeScript, IdleScript};

/// Why a script gave up on its turn.
#[derive(Debug, Error)]
pub enum ScriptFault {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("script aborted: {0}")]
    Aborted(String),
}

/// What a running script sees and acts through.
#[derive(Clone, Debug)]
pub struct ScriptContext {
    pub creature: EntityId,
    pub round: u32,
    /// Copy of the area taken when the turn was dispatched.
    pub snapshot: Area,
    pub handle: RuntimeHandle,
}

/// A turn function. Runs once per turn.
#[async_trait]
pub trait AiScript: Send + Sync {
    async fn run(&self, ctx: ScriptContext) -> Result<(), ScriptFault>;
}

/// Named turn functions available to AI creatures.
#[derive(Clone, Default)]
pub struct ScriptLibrary {
    scripts: HashMap<String, Arc<dyn AiScript>>,
}

impl ScriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding `idle` and `charge`.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_script("idle", IdleScript)
            .with_script("charge", ChargeScript)
    }

    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, script: impl AiScript + 'static) -> Self {
        self.register(name, script);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, script: impl AiScript + 'static) {
        self.scripts.insert(name.into(), Arc::new(script));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AiScript>> {
        self.scripts.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ScriptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ScriptLibrary").field("scripts", &names).finish()
    }
}

/// Runs turn functions as tokio tasks.
pub struct TokioScriptRunner {
    runtime: tokio::runtime::Handle,
    library: ScriptLibrary,
    handle: RuntimeHandle,
}

impl TokioScriptRunner {
    pub fn new(
        runtime: tokio::runtime::Handle,
        library: ScriptLibrary,
        handle: RuntimeHandle,
    ) -> Self {
        Self {
            runtime,
            library,
            handle,
        }
    }
}

impl ScriptRunner for TokioScriptRunner {
    fn start_async(&mut self, request: TurnRequest) -> Result<ScriptLiveness, ScriptError> {
        let script = self
            .library
            .get(&request.script)
            .ok_or_else(|| ScriptError::UnknownScript(request.script.clone()))?;

        let (liveness, guard) = ScriptLiveness::pair();
        let creature = request.creature;
        let name = request.script;
        let ctx = ScriptContext {
            creature,
            round: request.round,
            snapshot: request.snapshot,
            handle: self.handle.clone(),
        };

        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            let _guard = guard;
            let turn = runtime.spawn(async move { script.run(ctx).await });
            match turn.await {
                Ok(Ok(())) => {
                    debug!(target: "runtime::scripts", %creature, script = %name, "turn finished");
                }
                Ok(Err(fault)) => {
                    warn!(
                        target: "runtime::scripts",
                        %creature,
                        script = %name,
                        error = %fault,
                        "turn ended early"
                    );
                }
                Err(join) if join.is_panic() => {
                    error!(
                        target: "runtime::scripts",
                        %creature,
                        script = %name,
                        "turn function panicked"
                    );
                }
                Err(join) => {
                    warn!(
                        target: "runtime::scripts",
                        %creature,
                        script = %name,
                        error = %join,
                        "turn cancelled"
                    );
                }
            }
        });

        Ok(liveness)
    }
}
