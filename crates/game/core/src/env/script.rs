//! Contract with the asynchronous AI script runner.
//!
//! A dispatched AI turn executes on another thread. The only state shared
//! with the scheduler is the liveness flag below; everything else the script
//! does reaches the engine as ordinary move or attack requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ScriptError;
use crate::state::{Area, EntityId};

/// Everything a turn function receives when it is started.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub creature: EntityId,
    /// Name of the turn function to run.
    pub script: String,
    pub round: u32,
    /// Copy of the area at dispatch time.
    pub snapshot: Area,
}

/// Read side of a running script's liveness flag.
///
/// Cloning shares the flag. Reads never block.
#[derive(Clone, Debug)]
pub struct ScriptLiveness {
    alive: Arc<AtomicBool>,
}

impl ScriptLiveness {
    /// Creates a live flag together with the guard that clears it.
    pub fn pair() -> (ScriptLiveness, LivenessGuard) {
        let alive = Arc::new(AtomicBool::new(true));
        (
            ScriptLiveness {
                alive: Arc::clone(&alive),
            },
            LivenessGuard { alive },
        )
    }

    /// A flag that already reports completion. Used when a script failed to
    /// start.
    pub fn finished() -> ScriptLiveness {
        ScriptLiveness {
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Held by the script task; reports completion when dropped, including
/// during a panic unwind.
#[derive(Debug)]
pub struct LivenessGuard {
    alive: Arc<AtomicBool>,
}

impl LivenessGuard {
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Starts AI turn functions off the main tick.
pub trait ScriptRunner {
    fn start_async(&mut self, request: TurnRequest) -> Result<ScriptLiveness, ScriptError>;
}

/// Runner whose scripts finish the moment they start. Useful for headless
/// simulations and tests where AI creatures simply pass.
#[derive(Clone, Debug, Default)]
pub struct ImmediateScripts {
    started: Vec<EntityId>,
}

impl ImmediateScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creatures whose turns were dispatched, in order.
    pub fn started(&self) -> &[EntityId] {
        &self.started
    }
}

impl ScriptRunner for ImmediateScripts {
    fn start_async(&mut self, request: TurnRequest) -> Result<ScriptLiveness, ScriptError> {
        self.started.push(request.creature);
        Ok(ScriptLiveness::finished())
    }
}
