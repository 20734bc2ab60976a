//! Settle - debounce and throttle wrappers for callables
//!
//! This crate rate-limits how often a wrapped callable actually runs in
//! response to a stream of triggers:
//! - **Debounce**: coalesce bursts into leading and/or trailing invocations,
//!   with an optional `max_wait` ceiling forcing periodic invocation under
//!   continuous triggering
//! - **Throttle**: at most one invocation per `wait` window (a debounce
//!   with `max_wait` pinned to `wait`)
//! - **Injectable time**: a [`Clock`] and a [`TimerDriver`] port, so tests
//!   run deterministically against [`ManualClock`]/[`ManualDriver`] instead
//!   of wall-clock waits
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), settle::Error> {
//! # let rt = tokio::runtime::Builder::new_current_thread()
//! #     .enable_time()
//! #     .build()
//! #     .unwrap();
//! # let _guard = rt.enter();
//! // Save at most once per 300ms of quiet, no matter how fast edits come.
//! let save = settle::debounce(|doc: String| doc.len(), Duration::from_millis(300))?;
//!
//! save.call("draft 1".into());
//! save.call("draft 2".into()); // coalesced; only "draft 2" is saved
//!
//! assert!(save.pending());
//! save.flush(); // or let the trailing timer fire
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod debounce;
pub mod error;
pub mod throttle;
pub mod timer;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::{DebounceBuilder, Debounced};
pub use error::Error;
pub use throttle::ThrottleBuilder;
pub use timer::{ManualDriver, TimerCallback, TimerDriver, TimerHandle, TokioDriver};

use std::time::Duration;

/// Debounce `func` with default policy: trailing invocation only, no
/// `max_wait`. Needs an ambient Tokio runtime; use [`DebounceBuilder`] to
/// set edges, a ceiling, or a custom clock/driver.
pub fn debounce<A, R, F>(func: F, wait: Duration) -> Result<Debounced<A, R>, Error>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    F: FnMut(A) -> R + Send + 'static,
{
    DebounceBuilder::new(wait).build(func)
}

/// Throttle `func` to at most one invocation per `wait` window, invoking on
/// both the leading edge and the window boundary. Needs an ambient Tokio
/// runtime; use [`ThrottleBuilder`] to change edges or inject a
/// clock/driver.
pub fn throttle<A, R, F>(func: F, wait: Duration) -> Result<Debounced<A, R>, Error>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
    F: FnMut(A) -> R + Send + 'static,
{
    ThrottleBuilder::new(wait).build(func)
}
