//! Interface locks.
//!
//! A [`Lock`] is a time- or condition-bounded claim that suppresses player
//! input until it resolves. Locks are created by events (a move starting, an
//! animation, an AI turn, a reactive targeting prompt), handed to the
//! [`LockRegistry`] and polled once per tick while they sit in the lowest
//! priority tier.
//!
//! Every variant guarantees forward progress: timed locks have a strictly
//! positive duration, and condition-driven locks push their unlock time to
//! `now + extension` while their condition holds, never backward. There is
//! no generic force-unlock.
mod registry;

pub use registry::{LockRegistry, TickDriver, TickReport};

use std::fmt;

use crate::env::{Notice, ScriptLiveness};
use crate::state::{EntityId, Millis};

/// Identity assigned by the registry in enqueue order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(pub u64);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock-{}", self.0)
    }
}

/// Resolution order: lower numbers resolve first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockPriority(pub u32);

impl LockPriority {
    /// Turn advancement. Always resolved before anything else.
    pub const COMBAT_ADVANCE: Self = Self(0);
    pub const REACTIVE: Self = Self(10);
    pub const SCRIPT: Self = Self(20);
    pub const ACTION: Self = Self(50);
    /// Fades, snap-back animations and other eye candy.
    pub const COSMETIC: Self = Self(100);
}

impl Default for LockPriority {
    fn default() -> Self {
        Self::ACTION
    }
}

impl fmt::Display for LockPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work performed when a lock (or mover) finishes, in attachment order.
pub enum Completion {
    /// Re-enter the combat scheduler's turn loop.
    AdvanceCombat,
    /// Queue a combat-advance lock, so the next turn starts on a later tick.
    QueueCombatAdvance,
    /// Carry out an attack that was waiting on reactive attacks against its
    /// attacker. The attack is re-validated first.
    ResolveAttack { attacker: EntityId, target: EntityId },
    Notify(Notice),
    /// Presentation-side hook, e.g. starting a sound once a fade ends.
    Call(Box<dyn FnOnce() + Send>),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::AdvanceCombat => f.write_str("AdvanceCombat"),
            Completion::QueueCombatAdvance => f.write_str("QueueCombatAdvance"),
            Completion::ResolveAttack { attacker, target } => f
                .debug_struct("ResolveAttack")
                .field("attacker", attacker)
                .field("target", target)
                .finish(),
            Completion::Notify(notice) => f.debug_tuple("Notify").field(notice).finish(),
            Completion::Call(_) => f.write_str("Call(..)"),
        }
    }
}

/// State consulted by condition-driven locks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockContext {
    pub open_reactive_sessions: usize,
}

#[derive(Clone, Debug)]
pub enum LockKind {
    Timed,
    /// Timed; finishing it advances the combat turn queue.
    CombatAdvance,
    /// Held while an asynchronous AI script runs.
    AiLiveness { liveness: ScriptLiveness, grace: u64 },
    /// Held while any reactive targeting session is open.
    ReactiveTargeting { extension: u64 },
    /// Timed, carrying completion callbacks.
    Callback,
}

impl LockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockKind::Timed => "timed",
            LockKind::CombatAdvance => "combat_advance",
            LockKind::AiLiveness { .. } => "ai_liveness",
            LockKind::ReactiveTargeting { .. } => "reactive_targeting",
            LockKind::Callback => "callback",
        }
    }
}

#[derive(Debug)]
pub struct Lock {
    id: LockId,
    owner: Option<EntityId>,
    priority: LockPriority,
    unlock_at: Millis,
    kind: LockKind,
    completions: Vec<Completion>,
}

impl Lock {
    fn with_kind(kind: LockKind, priority: LockPriority, unlock_at: Millis) -> Self {
        Self {
            id: LockId::default(),
            owner: None,
            priority,
            unlock_at,
            kind,
            completions: Vec::new(),
        }
    }

    /// Finishes `duration_ms` after `now`. Zero durations are raised to 1ms.
    pub fn timed(now: Millis, duration_ms: u64) -> Self {
        Self::with_kind(LockKind::Timed, LockPriority::default(), now + duration_ms.max(1))
    }

    /// Timed lock in the highest priority class that advances the turn queue.
    pub fn combat_advance(now: Millis, delay_ms: u64) -> Self {
        Self::with_kind(
            LockKind::CombatAdvance,
            LockPriority::COMBAT_ADVANCE,
            now + delay_ms.max(1),
        )
        .then(Completion::AdvanceCombat)
    }

    /// Tracks an AI script; once it resolves a combat-advance lock is queued.
    pub fn ai_liveness(now: Millis, liveness: ScriptLiveness, grace_ms: u64) -> Self {
        let grace = grace_ms.max(1);
        Self::with_kind(
            LockKind::AiLiveness { liveness, grace },
            LockPriority::SCRIPT,
            now + grace,
        )
        .then(Completion::QueueCombatAdvance)
    }

    pub fn reactive_targeting(now: Millis, extension_ms: u64) -> Self {
        let extension = extension_ms.max(1);
        Self::with_kind(
            LockKind::ReactiveTargeting { extension },
            LockPriority::REACTIVE,
            now + extension,
        )
    }

    pub fn callback(now: Millis, duration_ms: u64, completions: Vec<Completion>) -> Self {
        let mut lock = Self::with_kind(
            LockKind::Callback,
            LockPriority::default(),
            now + duration_ms.max(1),
        );
        lock.completions = completions;
        lock
    }

    #[must_use]
    pub fn with_priority(mut self, priority: LockPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Appends a completion callback.
    #[must_use]
    pub fn then(mut self, completion: Completion) -> Self {
        self.completions.push(completion);
        self
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: LockId) {
        self.id = id;
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn priority(&self) -> LockPriority {
        self.priority
    }

    pub fn unlock_at(&self) -> Millis {
        self.unlock_at
    }

    pub fn kind(&self) -> &LockKind {
        &self.kind
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn take_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    /// The lock's finished predicate, evaluated once per poll.
    ///
    /// Condition-driven variants extend their unlock time while their
    /// condition holds. The unlock time never decreases.
    pub fn check(&mut self, now: Millis, ctx: &LockContext) -> bool {
        match &self.kind {
            LockKind::Timed | LockKind::CombatAdvance | LockKind::Callback => now >= self.unlock_at,
            LockKind::AiLiveness { liveness, grace } => {
                if liveness.is_alive() {
                    self.unlock_at = self.unlock_at.max(now + *grace);
                    false
                } else {
                    now >= self.unlock_at
                }
            }
            LockKind::ReactiveTargeting { extension } => {
                if ctx.open_reactive_sessions > 0 {
                    self.unlock_at = self.unlock_at.max(now + *extension);
                    false
                } else {
                    now >= self.unlock_at
                }
            }
        }
    }

    /// Side-effect free view of whether the lock has nothing left to wait
    /// for besides being polled.
    pub fn is_expired(&self, now: Millis, ctx: &LockContext) -> bool {
        match &self.kind {
            LockKind::AiLiveness { liveness, .. } if liveness.is_alive() => false,
            LockKind::ReactiveTargeting { .. } if ctx.open_reactive_sessions > 0 => false,
            _ => now >= self.unlock_at,
        }
    }

    pub fn is_ai_liveness(&self) -> bool {
        matches!(self.kind, LockKind::AiLiveness { .. })
    }
}
