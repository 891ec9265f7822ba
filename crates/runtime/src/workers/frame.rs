//! Frame worker that owns the authoritative [`Engine`].
//!
//! Ticks the engine on a fixed interval, executes commands from
//! [`RuntimeHandle`](crate::RuntimeHandle) between ticks, and publishes what
//! each tick produced to the [`EventBus`].

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use skirmish_core::{
    Area, AttackResolution, AttackStyle, CombatPhase, Engine, EntityId, FrameReport, LockId,
    LockPriority, Millis, MoveRequest, MoverId,
};

use crate::api::{Result, Status};
use crate::events::{CombatEvent, Event, EventBus, InterfaceEvent};

/// Commands that can be sent to the frame worker
pub enum Command {
    Move {
        request: MoveRequest,
        reply: oneshot::Sender<Result<MoverId>>,
    },
    Attack {
        attacker: EntityId,
        target: EntityId,
        style: AttackStyle,
        reply: oneshot::Sender<Result<AttackResolution>>,
    },
    EndTurn {
        creature: EntityId,
        reply: oneshot::Sender<Result<()>>,
    },
    WaitTurn {
        creature: EntityId,
        slots: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    AcceptReactive {
        session: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    CancelReactive {
        session: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    Interrupt {
        reply: oneshot::Sender<()>,
    },
    StartCombat {
        reply: oneshot::Sender<bool>,
    },
    PlayAnimation {
        owner: Option<EntityId>,
        name: String,
        duration_ms: u64,
        priority: LockPriority,
        reply: oneshot::Sender<LockId>,
    },
    /// Replies once the interface lock clears, immediately if it is clear.
    WaitForUnlock {
        reply: oneshot::Sender<()>,
    },
    QueryStatus {
        reply: oneshot::Sender<Status>,
    },
    QueryArea {
        reply: oneshot::Sender<Area>,
    },
}

/// Published on a watch channel after every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStatus {
    pub frame: u64,
    pub now: Millis,
    pub locked: bool,
    pub settled: bool,
}

/// Background task that ticks the engine and processes commands.
pub struct FrameWorker {
    engine: Engine,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    frames: watch::Sender<FrameStatus>,
    interval: Duration,
    /// Scan for hostiles every frame while out of combat.
    auto_scan: bool,
    frame: u64,
    was_locked: bool,
}

impl FrameWorker {
    pub fn new(
        engine: Engine,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        frames: watch::Sender<FrameStatus>,
        interval: Duration,
        auto_scan: bool,
    ) -> Self {
        tracing::info!(
            target: "runtime::worker",
            creatures = engine.area().creatures().count(),
            interval_ms = interval.as_millis() as u64,
            "FrameWorker initialized"
        );

        Self {
            engine,
            command_rx,
            event_bus,
            frames,
            interval,
            auto_scan,
            frame: 0,
            was_locked: false,
        }
    }

    /// Main worker loop. Ends on `shutdown` or when every command sender is
    /// dropped, returning the engine.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Engine {
        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let now = Millis(started.elapsed().as_millis() as u64);
                    self.on_frame(now);
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        self.handle_command(cmd);
                        self.publish_interface();
                    }
                    None => break,
                },
            }
        }

        debug!(target: "runtime::worker", frames = self.frame, "FrameWorker stopped");
        self.engine
    }

    fn on_frame(&mut self, now: Millis) {
        if self.auto_scan && self.engine.combat().phase() == CombatPhase::OutOfCombat {
            self.engine.scan_for_hostiles();
        }

        let report = self.engine.tick(now);
        self.frame += 1;
        trace!(
            target: "runtime::worker",
            frame = self.frame,
            now = %report.now,
            polled = ?report.locks.polled_tier,
            resolved = report.locks.resolved,
            "frame"
        );

        self.publish_report(&report);
        self.publish_interface();

        self.frames.send_replace(FrameStatus {
            frame: self.frame,
            now: report.now,
            locked: report.is_locked(),
            settled: report.settled,
        });
    }

    fn publish_report(&self, report: &FrameReport) {
        for outcome in &report.outcomes {
            self.event_bus
                .publish(Event::Combat(CombatEvent::Turn(outcome.clone())));
        }
    }

    /// Emits animation cues and lock transitions since the last call.
    fn publish_interface(&mut self) {
        for cue in self.engine.drain_animations() {
            self.event_bus
                .publish(Event::Interface(InterfaceEvent::Animation(cue)));
        }

        let locked = self.engine.is_locked();
        if locked != self.was_locked {
            let now = self.engine.now();
            let event = if locked {
                InterfaceEvent::Locked { now }
            } else {
                InterfaceEvent::Unlocked { now }
            };
            self.event_bus.publish(Event::Interface(event));
            self.was_locked = locked;
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Move { request, reply } => {
                let result = self.engine.request_move(request).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("Move reply channel closed (caller dropped)");
                }
            }
            Command::Attack {
                attacker,
                target,
                style,
                reply,
            } => {
                let result = self
                    .engine
                    .request_attack(attacker, target, style)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("Attack reply channel closed (caller dropped)");
                }
            }
            Command::EndTurn { creature, reply } => {
                let result = self.engine.end_turn(creature).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("EndTurn reply channel closed (caller dropped)");
                }
            }
            Command::WaitTurn {
                creature,
                slots,
                reply,
            } => {
                let result = self.engine.wait_turn(creature, slots).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("WaitTurn reply channel closed (caller dropped)");
                }
            }
            Command::AcceptReactive { session, reply } => {
                let result = self
                    .engine
                    .accept_reactive_attack(session)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("AcceptReactive reply channel closed (caller dropped)");
                }
            }
            Command::CancelReactive { session, reply } => {
                let result = self
                    .engine
                    .cancel_reactive_attack(session)
                    .map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("CancelReactive reply channel closed (caller dropped)");
                }
            }
            Command::Interrupt { reply } => {
                self.engine.interrupt_movement();
                let _ = reply.send(());
            }
            Command::StartCombat { reply } => {
                let started = self.engine.start_combat_now();
                let _ = reply.send(started);
            }
            Command::PlayAnimation {
                owner,
                name,
                duration_ms,
                priority,
                reply,
            } => {
                let id = self
                    .engine
                    .play_animation(owner, name, duration_ms, priority, Vec::new());
                let _ = reply.send(id);
            }
            Command::WaitForUnlock { reply } => {
                if self.engine.is_locked() {
                    self.engine.wait_for_unlock(move || {
                        let _ = reply.send(());
                    });
                } else {
                    let _ = reply.send(());
                }
            }
            Command::QueryStatus { reply } => {
                if reply.send(self.status()).is_err() {
                    debug!("QueryStatus reply channel closed (caller dropped)");
                }
            }
            Command::QueryArea { reply } => {
                if reply.send(self.engine.area().clone()).is_err() {
                    debug!("QueryArea reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn status(&self) -> Status {
        let combat = self.engine.combat();
        Status {
            frame: self.frame,
            now: self.engine.now(),
            phase: combat.phase(),
            current_actor: combat.current_actor(),
            round: self.engine.area().round,
            locked: self.engine.is_locked(),
            settled: self.engine.is_settled(),
            open_sessions: combat.sessions().iter().map(|s| s.id).collect(),
        }
    }
}
