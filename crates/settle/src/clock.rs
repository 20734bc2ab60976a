//! Time sources for the invocation scheduler
//!
//! The scheduler never reads the wall clock directly; it asks a [`Clock`]
//! for the elapsed time since that clock's (arbitrary) epoch. Production
//! code uses [`SystemClock`]; tests drive [`ManualClock`] by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic-enough time.
///
/// Readings are durations since an arbitrary per-clock epoch. Nothing in
/// the scheduler assumes the epoch is meaningful; only differences between
/// readings matter.
pub trait Clock: Send + Sync {
    /// Current reading of this clock.
    fn now(&self) -> Duration;
}

/// Monotonic system clock anchored at construction time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose epoch is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for deterministic tests.
///
/// Cloning yields a handle to the same underlying time cell, so a test can
/// keep one handle while the scheduler holds another. `rewind` exists to
/// exercise the scheduler's clock-rollback path; real clocks never go
/// backward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Move the clock backward by `delta`, saturating at zero.
    pub fn rewind(&self, delta: Duration) {
        let delta = delta.as_nanos() as u64;
        let mut current = self.nanos.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_sub(delta);
            match self.nanos.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
