//! Priority-ordered registry of active interface locks.

use tracing::{debug, trace};

use super::{Lock, LockContext, LockId, LockPriority};
use crate::state::Millis;

/// The registry's view of the systems it drives during a tick.
///
/// The engine implements this over the movement coordinator and combat
/// scheduler, so the registry can keep the tick ordering without owning
/// either.
pub trait TickDriver {
    /// Whether any in-flight move blocks lock polling this tick.
    fn blocking_moves(&self) -> bool;

    fn lock_context(&self) -> LockContext;

    /// Called for every lock removed during the poll pass, in removal order.
    /// Locks enqueued here are admitted on the next tick.
    fn on_lock_finished(&mut self, lock: Lock, queue: &mut Vec<Lock>);

    /// Advances the movement subsystem; may enqueue locks.
    fn advance_movement(&mut self, now: Millis, queue: &mut Vec<Lock>);
}

/// What happened during one [`LockRegistry::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub admitted: usize,
    /// Priority tier that was polled, if polling happened.
    pub polled_tier: Option<LockPriority>,
    pub resolved: usize,
    /// The aggregate lock cleared on this tick.
    pub unlocked: bool,
    /// Aggregate state after the tick.
    pub locked: bool,
}

type Waiter = Box<dyn FnOnce() + Send>;

/// Holds active locks, admits queued ones on tick boundaries and resolves
/// them one priority tier at a time.
///
/// Locks of equal priority are polled in enqueue order.
#[derive(Default)]
pub struct LockRegistry {
    active: Vec<Lock>,
    queue: Vec<Lock>,
    locked: bool,
    next_id: u64,
    waiters: Vec<Waiter>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a lock. It stays invisible to polling until the next tick.
    pub fn enqueue(&mut self, mut lock: Lock) -> LockId {
        let id = self.next_lock_id();
        lock.assign_id(id);

        trace!(
            target: "skirmish::lock",
            lock = %id,
            kind = lock.kind().as_str(),
            priority = %lock.priority(),
            unlock_at = %lock.unlock_at(),
            "lock queued"
        );

        self.queue.push(lock);
        id
    }

    /// Marks the interface locked because a move was admitted.
    pub fn mark_locked(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn active(&self) -> &[Lock] {
        &self.active
    }

    pub fn queued(&self) -> &[Lock] {
        &self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.queue.is_empty()
    }

    /// Runs `waiter` once the interface unlocks, or right away if it is
    /// not locked and nothing is queued.
    pub fn wait_for_unlock(&mut self, waiter: impl FnOnce() + Send + 'static) {
        if !self.locked && self.queue.is_empty() {
            waiter();
        } else {
            self.waiters.push(Box::new(waiter));
        }
    }

    /// Grants direct queue access so locks can be enqueued while other
    /// registry state is borrowed.
    pub(crate) fn queue_mut(&mut self) -> &mut Vec<Lock> {
        &mut self.queue
    }

    /// One scheduling step:
    ///
    /// 1. admit every queued lock;
    /// 2. unless a blocking move is in flight, poll the locks sharing the
    ///    lowest priority number and remove the finished ones;
    /// 3. advance movement;
    /// 4. clear the aggregate flag once no lock, queued lock or blocking
    ///    move remains, and wake the waiters.
    pub fn tick<D: TickDriver>(&mut self, now: Millis, driver: &mut D) -> TickReport {
        let mut report = TickReport::default();

        self.assign_queued_ids();
        if !self.queue.is_empty() {
            report.admitted = self.queue.len();
            self.active.append(&mut self.queue);
            self.locked = true;
        }

        if !driver.blocking_moves() {
            self.poll_lowest_tier(now, driver, &mut report);
        }

        driver.advance_movement(now, &mut self.queue);
        self.assign_queued_ids();

        if self.active.is_empty() && self.queue.is_empty() && !driver.blocking_moves() {
            if self.locked {
                self.locked = false;
                report.unlocked = true;
                debug!(target: "skirmish::lock", now = %now, "interface unlocked");
                for waiter in self.waiters.drain(..) {
                    waiter();
                }
            }
        }

        report.locked = self.locked;
        report
    }

    /// Pure query: nothing is moving and every active lock is either an AI
    /// liveness lock or already expired.
    pub fn is_settled(&self, now: Millis, ctx: &LockContext, blocking_moves: bool) -> bool {
        !blocking_moves
            && self.queue.is_empty()
            && self
                .active
                .iter()
                .all(|lock| lock.is_ai_liveness() || lock.is_expired(now, ctx))
    }

    fn poll_lowest_tier<D: TickDriver>(
        &mut self,
        now: Millis,
        driver: &mut D,
        report: &mut TickReport,
    ) {
        let Some(tier) = self.active.iter().map(Lock::priority).min() else {
            return;
        };
        report.polled_tier = Some(tier);

        let ctx = driver.lock_context();
        let mut finished = Vec::new();
        for mut lock in std::mem::take(&mut self.active) {
            if lock.priority() == tier && lock.check(now, &ctx) {
                finished.push(lock);
            } else {
                self.active.push(lock);
            }
        }

        for lock in finished {
            debug!(
                target: "skirmish::lock",
                lock = %lock.id(),
                kind = lock.kind().as_str(),
                priority = %tier,
                now = %now,
                "lock resolved"
            );
            report.resolved += 1;
            driver.on_lock_finished(lock, &mut self.queue);
        }
        self.assign_queued_ids();
    }

    /// Locks pushed straight into the queue by the driver get ids here.
    fn assign_queued_ids(&mut self) {
        for index in 0..self.queue.len() {
            if self.queue[index].id() == LockId::default() {
                let id = self.next_lock_id();
                self.queue[index].assign_id(id);
            }
        }
    }

    /// Ids start at 1; `LockId::default()` marks a lock not yet registered.
    fn next_lock_id(&mut self) -> LockId {
        self.next_id += 1;
        LockId(self.next_id)
    }
}

impl std::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRegistry")
            .field("active", &self.active)
            .field("queue", &self.queue)
            .field("locked", &self.locked)
            .field("waiters", &self.waiters.len())
            .finish()
    }
}
