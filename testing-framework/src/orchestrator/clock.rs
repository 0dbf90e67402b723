// File: testing-framework/src/orchestrator/clock.rs
//
// Clock Abstraction
//
// The sandbox readiness poll is driven by time. This module lets it read time
// and sleep through a trait, so the polling logic can be exercised with
// tokio's paused clock instead of real waiting. Shutdown escalation waits on
// the child process itself and uses tokio timeouts directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};

/// Clock abstraction trait - polling code depends on this trait
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tokio::time::Duration;
/// use near_testing_framework::orchestrator::clock::{Clock, SystemClock};
///
/// #[tokio::main]
/// async fn main() {
///     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
///     let start = clock.now();
///     clock.sleep(Duration::from_millis(10)).await;
///     assert!(clock.now() - start >= Duration::from_millis(10));
/// }
/// ```
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration
    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// System real-time clock
///
/// Default clock of every sandbox.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

/// Paused clock for deterministic tests
///
/// Works with tokio's `time::pause()`: time only moves when advanced, or
/// automatically when every task is idle waiting on a timer.
///
/// # Important Notes
///
/// 1. `new()` pauses time; use a plain `#[tokio::test]`
/// 2. Requires a current-thread runtime (the `tokio::test` default)
/// 3. Do not combine with real child processes: their I/O does not advance
///    paused time
#[derive(Debug)]
pub struct PausedClock;

impl PausedClock {
    /// Creates a new PausedClock and pauses tokio time
    ///
    /// Do not combine with `start_paused = true`: tokio panics when time is
    /// paused twice.
    pub fn new() -> Self {
        time::pause();
        Self
    }

    /// Advance time by the specified duration, waking expired sleeps
    pub async fn advance(&self, d: Duration) {
        time::advance(d).await
    }
}

impl Clock for PausedClock {
    fn now(&self) -> Instant {
        time::Instant::now()
    }

    fn sleep(&self, d: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(time::sleep(d))
    }
}

impl Default for PausedClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Point in time after which a bounded wait gives up
///
/// # Example
///
/// ```rust,ignore
/// let deadline = Deadline::after(clock.clone(), Duration::from_secs(30));
/// while !deadline.expired() {
///     if probe().await {
///         return Ok(());
///     }
///     deadline.tick(Duration::from_millis(500)).await;
/// }
/// ```
#[derive(Clone)]
pub struct Deadline {
    clock: Arc<dyn Clock>,
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let at = clock.now() + timeout;
        Self { clock, at }
    }

    /// True once the deadline has passed
    pub fn expired(&self) -> bool {
        self.clock.now() >= self.at
    }

    /// Time left before the deadline (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(self.clock.now())
    }

    /// Sleep for `interval`, but never past the deadline
    pub async fn tick(&self, interval: Duration) {
        let d = interval.min(self.remaining());
        if !d.is_zero() {
            self.clock.sleep(d).await;
        }
    }
}
