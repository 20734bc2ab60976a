//! One-shot timer scheduling port
//!
//! The scheduler core never talks to the runtime directly; it schedules and
//! cancels one-shot callbacks through a [`TimerDriver`]. Production code
//! uses [`TokioDriver`]; tests (both this crate's and downstream users')
//! use [`ManualDriver`], which fires callbacks deterministically as a
//! [`ManualClock`] is advanced.
//!
//! The only contract a driver must honor: cancelling a handle before its
//! callback has started guarantees the callback never runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::clock::{Clock, ManualClock};
use crate::error::Error;

/// Callback fired when a scheduled timer expires.
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// Identity of a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Create a handle from a driver-chosen identifier. Only meaningful to
    /// the [`TimerDriver`] that issued it.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

/// Capability to schedule and cancel one-shot callbacks.
pub trait TimerDriver: Send + Sync {
    /// Schedule `callback` to run once, `delay` from now.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a previously scheduled timer. Cancelling an already-fired or
    /// unknown handle is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

/// Production driver backed by a Tokio runtime.
///
/// Each scheduled timer is one spawned task (`sleep` then callback).
/// Outstanding tasks are tracked so `cancel` can abort them mid-sleep.
pub struct TokioDriver {
    runtime: Handle,
    tasks: Arc<DashMap<u64, AbortHandle>>,
    next_id: AtomicU64,
}

impl TokioDriver {
    /// Create a driver on the ambient runtime.
    pub fn current() -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::new(runtime))
    }

    /// Create a driver on an explicit runtime handle.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl TimerDriver for TokioDriver {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let tasks = Arc::clone(&self.tasks);

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Deregister before firing so a concurrent cancel of a timer
            // that already started running stays a no-op.
            tasks.remove(&id);
            callback();
        });
        self.tasks.insert(id, task.abort_handle());

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((_, abort)) = self.tasks.remove(&handle.0) {
            trace!("cancelling timer {:?}", handle);
            abort.abort();
        }
    }
}

struct PendingTimer {
    id: u64,
    due: Duration,
    callback: TimerCallback,
}

/// Deterministic driver for tests.
///
/// Owns a [`ManualClock`]; [`advance`](ManualDriver::advance) steps the
/// clock and fires due callbacks in deadline order, jumping the clock to
/// each deadline before firing so callbacks observe the time they were
/// scheduled for. Callbacks may schedule further timers; those fire too if
/// they fall within the advance window.
#[derive(Default)]
pub struct ManualDriver {
    clock: ManualClock,
    queue: Mutex<Vec<PendingTimer>>,
    next_id: AtomicU64,
}

impl ManualDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to this driver's clock. Pass it to the controller under test
    /// so both see the same time.
    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    /// Number of timers currently scheduled.
    pub fn scheduled(&self) -> usize {
        self.queue.lock().len()
    }

    /// Advance the clock by `delta`, firing every timer that falls due.
    pub fn advance(&self, delta: Duration) {
        let target = self.clock.now() + delta;

        loop {
            let next = {
                let mut queue = self.queue.lock();
                let due_index = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.id))
                    .map(|(i, _)| i);
                due_index.map(|i| queue.remove(i))
            };

            let Some(timer) = next else { break };

            let now = self.clock.now();
            if timer.due > now {
                self.clock.advance(timer.due - now);
            }
            // Queue lock released: the callback may schedule or cancel.
            (timer.callback)();
        }

        let now = self.clock.now();
        if target > now {
            self.clock.advance(target - now);
        }
    }
}

impl TimerDriver for ManualDriver {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let due = self.clock.now() + delay;
        self.queue.lock().push(PendingTimer { id, due, callback });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.queue.lock().retain(|t| t.id != handle.0);
    }
}
