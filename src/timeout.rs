//! Bounded condition polling
//!
//! Replaces fixed sleeps around browser automation: a probe is called every
//! `interval` until it yields a value, the overall timeout expires, or the
//! cancel token is set.

use std::thread;
use std::time::{Duration, Instant};

use crate::signal::CancelToken;

/// Polling bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn from_millis_and_secs(interval_ms: u64, timeout_seconds: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_secs(timeout_seconds),
        )
    }
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value
    Ready(T),
    /// Timeout elapsed before the condition held
    TimedOut { elapsed: Duration, attempts: u32 },
    /// Cancel token was set
    Cancelled,
}

/// Wall-clock deadline
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.limit
    }
}

/// Call `probe` until it returns `Ok(Some(_))`.
///
/// The probe always runs at least once. Errors from the probe abort the
/// poll and are returned as-is. Sleeps never overshoot the deadline.
pub fn poll_until<T, E, F>(
    config: PollConfig,
    cancel: &CancelToken,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Result<Option<T>, E>,
{
    let deadline = Deadline::after(config.timeout);
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled);
        }

        attempts += 1;
        if let Some(value) = probe()? {
            return Ok(PollOutcome::Ready(value));
        }

        if deadline.is_expired() {
            return Ok(PollOutcome::TimedOut {
                elapsed: deadline.elapsed(),
                attempts,
            });
        }

        thread::sleep(config.interval.min(deadline.remaining()));
    }
}
