//! Debounced invocation scheduler
//!
//! Wraps a callable and coalesces bursts of triggers into leading and/or
//! trailing invocations, with an optional `max_wait` ceiling that forces
//! periodic invocation under continuous triggering.
//!
//! All state lives behind one mutex; `call`, `cancel`, `flush` and the
//! timer-expiry path each take it for their whole critical section, so the
//! fields are always read and written together.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::timer::{TimerDriver, TimerHandle, TokioDriver};

/// Mutable scheduler state, guarded by [`Shared::state`].
struct State<A, R> {
    func: Box<dyn FnMut(A) -> R + Send>,
    wait: Duration,
    max_wait: Option<Duration>,
    leading: bool,
    trailing: bool,
    /// Most recent trigger's arguments; `Some` iff a trigger occurred since
    /// the last invocation or cancellation.
    last_args: Option<A>,
    /// Result of the most recent actual invocation.
    last_result: Option<R>,
    /// Clock reading of the most recent trigger; `None` before the first.
    last_call: Option<Duration>,
    /// Clock reading of the most recent invocation; zero means "never".
    last_invoke: Duration,
    /// `Some` iff a trailing/max-wait timer is scheduled.
    timer: Option<TimerHandle>,
    /// Generation counter; a timer callback carries the epoch it was armed
    /// under and is ignored on mismatch, so a cancelled timer whose task
    /// already dequeued can never act.
    epoch: u64,
}

impl<A, R: Clone> State<A, R> {
    /// Whether a trigger or timer fire at `now` should invoke: first call
    /// ever, quiet for `wait`, clock moved backward, or past `max_wait`
    /// since the last invocation.
    fn should_invoke(&self, now: Duration) -> bool {
        let Some(last_call) = self.last_call else {
            return true;
        };
        match now.checked_sub(last_call) {
            // Clock went backward; treat as a trailing condition.
            None => true,
            Some(since_call) => {
                if since_call >= self.wait {
                    return true;
                }
                match self.max_wait {
                    Some(max_wait) => now
                        .checked_sub(self.last_invoke)
                        .is_some_and(|since_invoke| since_invoke >= max_wait),
                    None => false,
                }
            }
        }
    }

    /// Delay to re-arm for when a timer fires before we are ready.
    fn remaining_wait(&self, now: Duration) -> Duration {
        let since_call = now.saturating_sub(self.last_call.unwrap_or_default());
        let wait_left = self.wait.saturating_sub(since_call);
        match self.max_wait {
            Some(max_wait) => {
                let since_invoke = now.saturating_sub(self.last_invoke);
                wait_left.min(max_wait.saturating_sub(since_invoke))
            }
            None => wait_left,
        }
    }

    /// Invoke the wrapped callable with the pending arguments, if any.
    fn invoke(&mut self, now: Duration) -> Option<R> {
        let args = self.last_args.take()?;
        self.last_invoke = now;
        let result = (self.func)(args);
        self.last_result = Some(result.clone());
        Some(result)
    }
}

/// State plus the injected time source and timer driver.
struct Shared<A, R> {
    clock: Arc<dyn Clock>,
    driver: Arc<dyn TimerDriver>,
    state: Mutex<State<A, R>>,
}

impl<A, R> Shared<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Arm the trailing timer for `delay` from now, superseding any epoch
    /// the previous timer was armed under.
    fn arm_timer(this: &Arc<Self>, state: &mut State<A, R>, delay: Duration) {
        state.epoch = state.epoch.wrapping_add(1);
        let epoch = state.epoch;
        let weak: Weak<Self> = Arc::downgrade(this);

        let handle = this.driver.schedule(
            delay,
            Box::new(move || {
                // Every controller handle gone means nobody is waiting for
                // the trailing edge anymore.
                if let Some(shared) = weak.upgrade() {
                    Self::on_timer_expired(&shared, epoch);
                }
            }),
        );
        state.timer = Some(handle);
    }

    /// Timer callback: trailing edge if ready, otherwise re-arm for the
    /// remaining wait.
    fn on_timer_expired(this: &Arc<Self>, epoch: u64) {
        let mut state = this.state.lock();
        if state.epoch != epoch {
            trace!("ignoring stale timer (epoch {} superseded)", epoch);
            return;
        }

        let now = this.clock.now();
        if state.should_invoke(now) {
            this.trailing_edge(&mut state, now);
        } else {
            let delay = state.remaining_wait(now);
            trace!("timer fired early, re-arming for {:?}", delay);
            Self::arm_timer(this, &mut state, delay);
        }
    }

    /// Trailing edge: invoke with the pending arguments if trailing
    /// invocation is enabled and a trigger is outstanding.
    fn trailing_edge(&self, state: &mut State<A, R>, now: Duration) -> Option<R> {
        state.timer = None;
        if state.trailing && state.last_args.is_some() {
            trace!("trailing edge invoke at {:?}", now);
            return state.invoke(now);
        }
        state.last_args = None;
        state.last_result.clone()
    }
}

/// A debounced (or, via [`ThrottleBuilder`](crate::ThrottleBuilder),
/// throttled) wrapper around a callable.
///
/// Cloning is cheap and yields a handle to the same controller; dropping
/// every handle disarms any outstanding trailing invocation.
///
/// Built with [`DebounceBuilder`] or the [`debounce`](crate::debounce)
/// shorthand.
pub struct Debounced<A, R> {
    shared: Arc<Shared<A, R>>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A, R> fmt::Debug for Debounced<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Debounced")
            .field("wait", &state.wait)
            .field("max_wait", &state.max_wait)
            .field("leading", &state.leading)
            .field("trailing", &state.trailing)
            .field("pending", &state.timer.is_some())
            .finish()
    }
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// Trigger the controller with a fresh set of arguments.
    ///
    /// Invokes the callable on a leading or forced edge; otherwise records
    /// the arguments for a later trailing invocation and returns a clone of
    /// the most recent result (`None` if the callable has never run).
    pub fn call(&self, args: A) -> Option<R> {
        let mut state = self.shared.state.lock();
        let now = self.shared.clock.now();
        let is_ready = state.should_invoke(now);

        state.last_args = Some(args);
        state.last_call = Some(now);

        if is_ready {
            if state.timer.is_none() {
                return self.leading_edge(&mut state, now);
            }
            if state.max_wait.is_some() {
                return self.forced_invoke(&mut state, now);
            }
        }
        if state.timer.is_none() {
            let wait = state.wait;
            Shared::arm_timer(&self.shared, &mut state, wait);
        }
        state.last_result.clone()
    }

    /// Leading edge: first trigger of a burst. Arms the trailing timer and
    /// invokes immediately when leading invocation is enabled.
    fn leading_edge(&self, state: &mut State<A, R>, now: Duration) -> Option<R> {
        // Resets max_wait accounting even when leading invocation is off.
        state.last_invoke = now;
        let wait = state.wait;
        Shared::arm_timer(&self.shared, state, wait);

        if state.leading {
            trace!("leading edge invoke at {:?}", now);
            return state.invoke(now);
        }
        state.last_result.clone()
    }

    /// Forced edge: a timer is already live but `max_wait` has elapsed
    /// under continuous triggering. Re-arms the trailing timer and invokes
    /// immediately so the callable keeps running at least once per
    /// `max_wait` interval.
    fn forced_invoke(&self, state: &mut State<A, R>, now: Duration) -> Option<R> {
        if let Some(handle) = state.timer.take() {
            self.shared.driver.cancel(handle);
        }
        let wait = state.wait;
        Shared::arm_timer(&self.shared, state, wait);

        trace!("forced invoke at {:?} (max_wait elapsed)", now);
        state.invoke(now)
    }

    /// Cancel any outstanding trailing invocation and forget the pending
    /// arguments. The last result is kept. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        if let Some(handle) = state.timer.take() {
            self.shared.driver.cancel(handle);
        }
        state.epoch = state.epoch.wrapping_add(1);
        state.last_args = None;
        state.last_invoke = Duration::ZERO;
        state.last_call = None;
        trace!("cancelled");
    }

    /// Run the trailing edge now instead of waiting for the timer.
    ///
    /// With no timer outstanding this is a no-op returning the last result.
    pub fn flush(&self) -> Option<R> {
        let mut state = self.shared.state.lock();
        match state.timer.take() {
            None => state.last_result.clone(),
            Some(handle) => {
                self.shared.driver.cancel(handle);
                state.epoch = state.epoch.wrapping_add(1);
                let now = self.shared.clock.now();
                self.shared.trailing_edge(&mut state, now)
            }
        }
    }

    /// Whether a trailing invocation is currently scheduled.
    pub fn pending(&self) -> bool {
        self.shared.state.lock().timer.is_some()
    }

    /// The quiet period between the last trigger and a trailing invocation.
    pub fn wait(&self) -> Duration {
        self.shared.state.lock().wait
    }

    /// The forced-invocation ceiling, if configured.
    pub fn max_wait(&self) -> Option<Duration> {
        self.shared.state.lock().max_wait
    }
}

/// Builder for [`Debounced`] controllers.
///
/// Defaults: trailing invocation on, leading invocation off, no `max_wait`,
/// [`SystemClock`], and a [`TokioDriver`] on the ambient runtime.
pub struct DebounceBuilder {
    wait: Duration,
    leading: bool,
    trailing: bool,
    max_wait: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
    driver: Option<Arc<dyn TimerDriver>>,
}

impl DebounceBuilder {
    /// Start a builder with the given quiet period.
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            leading: false,
            trailing: true,
            max_wait: None,
            clock: None,
            driver: None,
        }
    }

    /// Invoke on the leading edge of a burst (default: false).
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Invoke on the trailing edge of a burst (default: true).
    pub fn trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    /// Force an invocation at least every `max_wait` under continuous
    /// triggering. Values below `wait` are clamped up to `wait`.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Override the time source (tests use [`ManualClock`](crate::ManualClock)).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the timer driver (tests use [`ManualDriver`](crate::ManualDriver)).
    pub fn driver(mut self, driver: Arc<dyn TimerDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Wrap `func` with the configured policy.
    ///
    /// Fails with [`Error::NoRuntime`] when no driver was injected and no
    /// Tokio runtime is ambient. The callable runs while the controller's
    /// internal lock is held, so it must not call back into the same
    /// controller.
    pub fn build<A, R, F>(self, func: F) -> Result<Debounced<A, R>, Error>
    where
        A: Send + 'static,
        R: Clone + Send + 'static,
        F: FnMut(A) -> R + Send + 'static,
    {
        let driver = match self.driver {
            Some(driver) => driver,
            None => Arc::new(TokioDriver::current()?),
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let max_wait = self.max_wait.map(|max_wait| max_wait.max(self.wait));

        Ok(Debounced {
            shared: Arc::new(Shared {
                clock,
                driver,
                state: Mutex::new(State {
                    func: Box::new(func),
                    wait: self.wait,
                    max_wait,
                    leading: self.leading,
                    trailing: self.trailing,
                    last_args: None,
                    last_result: None,
                    last_call: None,
                    last_invoke: Duration::ZERO,
                    timer: None,
                    epoch: 0,
                }),
            }),
        })
    }
}
