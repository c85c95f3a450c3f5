#![forbid(unsafe_code)]

//! Time sources for driving sequencers.
//!
//! The engines never read time themselves; every call takes `now_ms`. A
//! [`StepClock`] hands out a deterministic staircase of timestamps so a whole
//! animation run is reproducible down to the tick, while [`WallClock`]
//! produces real elapsed milliseconds for smoke tests and demos.

use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic, hand-advanced clock. Interior mutability keeps the driver
/// API `&self`, so closures and helpers can share one clock.
#[derive(Debug)]
pub struct StepClock {
    step_ms: u64,
    now_ms: AtomicU64,
}

impl StepClock {
    /// A clock starting at zero that advances `step_ms` per tick.
    #[must_use]
    pub fn new(step_ms: u64) -> Self {
        Self::starting_at(0, step_ms)
    }

    /// A clock starting at an arbitrary timestamp.
    #[must_use]
    pub fn starting_at(start_ms: u64, step_ms: u64) -> Self {
        Self {
            step_ms: step_ms.max(1),
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Current timestamp without advancing.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }

    /// The configured step width.
    #[must_use]
    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// Advance one step and return the new timestamp.
    pub fn tick(&self) -> u64 {
        self.now_ms.fetch_add(self.step_ms, Ordering::Relaxed) + self.step_ms
    }

    /// Advance by an arbitrary amount and return the new timestamp.
    pub fn advance_by(&self, delta_ms: u64) -> u64 {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed) + delta_ms
    }

    /// Move forward to `target_ms`. Time never runs backwards; an earlier
    /// target leaves the clock where it is.
    pub fn jump_to(&self, target_ms: u64) -> u64 {
        self.now_ms.fetch_max(target_ms, Ordering::Relaxed);
        self.now_ms()
    }
}

/// Real elapsed time since construction, in milliseconds.
#[derive(Debug)]
pub struct WallClock {
    start: web_time::Instant,
}

impl WallClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: web_time::Instant::now(),
        }
    }

    /// Milliseconds elapsed since [`start`](Self::start).
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
