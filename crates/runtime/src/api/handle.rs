//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! requesting moves and attacks, answering reactive prompts, or streaming
//! events from specific topics. AI scripts drive their creatures through the
//! same handle the player's input does.
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use skirmish_core::{
    Area, AttackResolution, AttackStyle, CombatPhase, EntityId, LockId, LockPriority, Millis,
    MoveRequest, MoverId, Position,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, FrameStatus};

/// Point-in-time view of the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub frame: u64,
    pub now: Millis,
    pub phase: CombatPhase,
    pub current_actor: Option<EntityId>,
    pub round: u32,
    pub locked: bool,
    pub settled: bool,
    /// Reactive targeting sessions awaiting a decision.
    pub open_sessions: Vec<u64>,
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    frames: watch::Receiver<FrameStatus>,
}

impl RuntimeHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        frames: watch::Receiver<FrameStatus>,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            frames,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Walk `creature` along `path`. The path excludes its current cell.
    pub async fn request_move(&self, creature: EntityId, path: Vec<Position>) -> Result<MoverId> {
        self.submit_move(MoveRequest::new(creature, path)).await
    }

    pub async fn submit_move(&self, request: MoveRequest) -> Result<MoverId> {
        self.request(|reply| Command::Move { request, reply }).await?
    }

    pub async fn request_attack(
        &self,
        attacker: EntityId,
        target: EntityId,
        style: AttackStyle,
    ) -> Result<AttackResolution> {
        self.request(|reply| Command::Attack {
            attacker,
            target,
            style,
            reply,
        })
        .await?
    }

    pub async fn end_turn(&self, creature: EntityId) -> Result<()> {
        self.request(|reply| Command::EndTurn { creature, reply })
            .await?
    }

    /// Postpone the active creature's turn by `slots` places in the queue.
    pub async fn wait_turn(&self, creature: EntityId, slots: usize) -> Result<()> {
        self.request(|reply| Command::WaitTurn {
            creature,
            slots,
            reply,
        })
        .await?
    }

    pub async fn accept_reactive(&self, session: u64) -> Result<()> {
        self.request(|reply| Command::AcceptReactive { session, reply })
            .await?
    }

    pub async fn cancel_reactive(&self, session: u64) -> Result<()> {
        self.request(|reply| Command::CancelReactive { session, reply })
            .await?
    }

    /// Stop every blocking move at its next cell boundary.
    pub async fn interrupt(&self) -> Result<()> {
        self.request(|reply| Command::Interrupt { reply }).await
    }

    /// Begin combat regardless of visibility. False if already in combat.
    pub async fn start_combat(&self) -> Result<bool> {
        self.request(|reply| Command::StartCombat { reply }).await
    }

    pub async fn play_animation(
        &self,
        owner: Option<EntityId>,
        name: impl Into<String>,
        duration_ms: u64,
        priority: LockPriority,
    ) -> Result<LockId> {
        let name = name.into();
        self.request(|reply| Command::PlayAnimation {
            owner,
            name,
            duration_ms,
            priority,
            reply,
        })
        .await
    }

    /// Resolves once the interface lock is clear.
    pub async fn wait_for_unlock(&self) -> Result<()> {
        self.request(|reply| Command::WaitForUnlock { reply })
            .await
    }

    /// Waits for at least one more frame, then until a frame reports that
    /// nothing but AI scripts remains to play out.
    pub async fn wait_settled(&self) -> Result<FrameStatus> {
        let mut frames = self.frames.clone();
        frames.borrow_and_update();
        loop {
            frames
                .changed()
                .await
                .map_err(|_| RuntimeError::CommandChannelClosed)?;
            let status = *frames.borrow_and_update();
            if status.settled {
                return Ok(status);
            }
        }
    }

    /// Latest frame published by the worker.
    pub fn frame(&self) -> FrameStatus {
        *self.frames.borrow()
    }

    pub async fn status(&self) -> Result<Status> {
        self.request(|reply| Command::QueryStatus { reply }).await
    }

    /// Query a copy of the area (read-only snapshot)
    pub async fn snapshot(&self) -> Result<Area> {
        self.request(|reply| Command::QueryArea { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Combat` - Notices and turn outcomes
    /// - `Topic::Interface` - Lock transitions and animation cues
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use skirmish_runtime::Topic;
    ///
    /// let mut combat_rx = handle.subscribe(Topic::Combat);
    /// while let Ok(event) = combat_rx.recv().await {
    ///     // Handle combat events
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("frame", &*self.frames.borrow())
            .finish_non_exhaustive()
    }
}
