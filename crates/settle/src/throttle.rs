//! Throttled invocation policy
//!
//! A throttle is a debounce with `max_wait` pinned to `wait`: triggers
//! landing inside an active window always force an invocation at the
//! window boundary, so the callable runs at most (and, while triggers keep
//! coming, at least) once per `wait` interval. This module is purely a
//! configuration adapter over [`DebounceBuilder`]; there is no second
//! engine.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::debounce::{DebounceBuilder, Debounced};
use crate::error::Error;
use crate::timer::TimerDriver;

/// Builder for throttled controllers.
///
/// Defaults differ from debounce: leading invocation is **on**, so the
/// first trigger of a window runs immediately. There is no `max_wait`
/// knob; it is what defines throttling and is always `wait`.
pub struct ThrottleBuilder {
    wait: Duration,
    leading: bool,
    trailing: bool,
    clock: Option<Arc<dyn Clock>>,
    driver: Option<Arc<dyn TimerDriver>>,
}

impl ThrottleBuilder {
    /// Start a builder with the given window length.
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            leading: true,
            trailing: true,
            clock: None,
            driver: None,
        }
    }

    /// Invoke on the first trigger of a window (default: true).
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Invoke at the window boundary for triggers that landed inside it
    /// (default: true).
    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    /// Override the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the timer driver.
    pub fn driver(mut self, driver: Arc<dyn TimerDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Wrap `func` with the configured policy.
    pub fn build<A, R, F>(self, func: F) -> Result<Debounced<A, R>, Error>
    where
        A: Send + 'static,
        R: Clone + Send + 'static,
        F: FnMut(A) -> R + Send + 'static,
    {
        let mut builder = DebounceBuilder::new(self.wait)
            .leading(self.leading)
            .trailing(self.trailing)
            .max_wait(self.wait);
        if let Some(clock) = self.clock {
            builder = builder.clock(clock);
        }
        if let Some(driver) = self.driver {
            builder = builder.driver(driver);
        }
        builder.build(func)
    }
}
