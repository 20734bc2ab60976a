//! End-to-end debounce scenarios driven through the public API

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use settle::{DebounceBuilder, Debounced, ManualDriver, TimerDriver};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Build a controller that records every invocation's argument.
fn recording(
    builder: DebounceBuilder,
) -> (Debounced<&'static str, usize>, Arc<ManualDriver>, Arc<Mutex<Vec<&'static str>>>) {
    let driver = Arc::new(ManualDriver::new());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let debounced = builder
        .clock(Arc::new(driver.clock()))
        .driver(Arc::clone(&driver) as Arc<dyn TimerDriver>)
        .build(move |s: &'static str| {
            sink.lock().push(s);
            sink.lock().len()
        })
        .unwrap();
    (debounced, driver, calls)
}

#[test]
fn test_burst_produces_single_trailing_call_with_last_args() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    debounced.call("t0");
    driver.advance(ms(30));
    debounced.call("t30");
    driver.advance(ms(30));
    debounced.call("t60");

    driver.advance(ms(300));
    assert_eq!(*calls.lock(), vec!["t60"]);
}

#[test]
fn test_separated_bursts_each_invoke_once() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    debounced.call("a1");
    driver.advance(ms(50));
    debounced.call("a2");
    driver.advance(ms(200)); // burst one settles

    debounced.call("b1");
    driver.advance(ms(200)); // burst two settles

    assert_eq!(*calls.lock(), vec!["a2", "b1"]);
}

#[test]
fn test_max_wait_forces_call_under_continuous_triggering() {
    let (debounced, driver, calls) =
        recording(DebounceBuilder::new(ms(100)).max_wait(ms(150)));

    // Trigger every 20ms from t=0; quiet time never reaches 100ms.
    debounced.call("t0");
    let labels = [
        "t20", "t40", "t60", "t80", "t100", "t120", "t140", "t160", "t180", "t200",
    ];
    for label in labels {
        driver.advance(ms(20));
        debounced.call(label);
    }

    // First forced call lands at t=150, within the max_wait ceiling.
    assert!(!calls.lock().is_empty());
    assert_eq!(calls.lock()[0], "t140");
}

#[test]
fn test_leading_only_burst_invokes_at_start() {
    let (debounced, driver, calls) =
        recording(DebounceBuilder::new(ms(100)).leading(true).trailing(false));

    debounced.call("first");
    driver.advance(ms(40));
    debounced.call("second");
    driver.advance(ms(40));
    debounced.call("third");
    driver.advance(ms(500));

    assert_eq!(*calls.lock(), vec!["first"]);
}

#[test]
fn test_cancel_clears_pending_and_suppresses_fire() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    debounced.call("doomed");
    assert!(debounced.pending());

    debounced.cancel();
    assert!(!debounced.pending());

    driver.advance(ms(1000));
    assert!(calls.lock().is_empty());
}

#[test]
fn test_flush_idle_returns_last_result_without_invoking() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    debounced.call("only");
    driver.advance(ms(100));
    assert_eq!(calls.lock().len(), 1);

    // Idle: flush must not re-invoke.
    assert_eq!(debounced.flush(), Some(1));
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn test_flush_pending_invokes_synchronously() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    debounced.call("flushed");
    assert_eq!(debounced.flush(), Some(1));
    assert_eq!(*calls.lock(), vec!["flushed"]);

    driver.advance(ms(1000));
    assert_eq!(calls.lock().len(), 1);
}

#[test]
fn test_clock_rollback_forces_trailing_readiness() {
    let (debounced, driver, calls) = recording(DebounceBuilder::new(ms(100)));

    driver.advance(ms(1000));
    debounced.call("before-skew");
    driver.clock().rewind(ms(400));
    debounced.call("after-skew");

    driver.advance(ms(2000));
    assert_eq!(*calls.lock(), vec!["after-skew"]);
}

#[tokio::test]
async fn test_default_driver_end_to_end() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let debounced = settle::debounce(
        move |n: u32| {
            sink.lock().push(n);
            n
        },
        ms(50),
    )
    .unwrap();

    debounced.call(1);
    debounced.call(2);

    // Generous margin; real sleep, not a paused clock.
    tokio::time::sleep(ms(400)).await;
    assert_eq!(*calls.lock(), vec![2]);
    assert!(!debounced.pending());
}

#[test]
fn test_build_outside_runtime_fails() {
    let result = settle::debounce(|n: u32| n, ms(10));
    assert!(matches!(result, Err(settle::Error::NoRuntime)));
}
