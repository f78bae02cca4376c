//! Bounded polling.
//!
//! [`PollLoop`] is the one waiting primitive in the harness: screen waits,
//! pane-capture retries and artifact existence checks all go through it.
//! It is synchronous and blocking; the only exits are predicate success
//! and timeout expiry.

use std::time::{Duration, Instant};

/// The poll loop gave up. Carries the last produced value for diagnostics.
#[derive(Debug)]
pub struct Elapsed<V> {
    /// The value produced by the final attempt.
    pub last: V,
    /// Time spent polling.
    pub elapsed: Duration,
    /// Number of times the producer ran.
    pub attempts: u32,
}

/// Retry a producer on a fixed interval until a predicate holds or the
/// timeout passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLoop {
    interval: Duration,
    timeout: Duration,
}

impl PollLoop {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A copy of this loop with a different timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll until `predicate(&produce())` holds.
    ///
    /// Each attempt sleeps `interval` first, then produces a fresh value.
    /// The producer always runs at least once, even with a zero timeout.
    pub fn wait<V, F, P>(&self, produce: F, predicate: P) -> Result<V, Elapsed<V>>
    where
        F: FnMut() -> V,
        P: FnMut(&V) -> bool,
    {
        self.wait_or_else(produce, predicate, |_| {})
    }

    /// Like [`wait`](Self::wait), but calls `on_timeout` with the last
    /// value before reporting the timeout.
    pub fn wait_or_else<V, F, P, T>(
        &self,
        mut produce: F,
        mut predicate: P,
        on_timeout: T,
    ) -> Result<V, Elapsed<V>>
    where
        F: FnMut() -> V,
        P: FnMut(&V) -> bool,
        T: FnOnce(&V),
    {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            std::thread::sleep(self.interval);
            let value = produce();
            attempts += 1;
            if predicate(&value) {
                return Ok(value);
            }
            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                on_timeout(&value);
                return Err(Elapsed {
                    last: value,
                    elapsed,
                    attempts,
                });
            }
        }
    }
}
