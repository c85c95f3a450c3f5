#![forbid(unsafe_code)]

//! Animation clock: wall-clock milliseconds in, normalized progress out.
//!
//! The clock never reads time itself. Every method that depends on "now"
//! takes an explicit `now_ms`, so the whole thing is a pure function of its
//! inputs and drives identically under a real clock or a hand-stepped test
//! clock.
//!
//! Progress is `clamp(((now − virtual_start) × speed) / duration, 0, 1)`.
//! Pausing freezes the effective now; resuming shifts the virtual start
//! forward by the length of the pause, so progress continues exactly where
//! it stopped. Changing speed re-derives the virtual start so that the
//! already-elapsed progress is unchanged and only the remaining real time
//! rescales.
//!
//! # Invariants
//!
//! - Progress is always within `[0, 1]`.
//! - Under non-decreasing `now_ms`, progress never decreases; a pause/resume
//!   cycle continues from the pre-pause value, never resets.
//! - Speed is strictly positive.

use std::time::Duration;

use crate::error::{EngineError, Result};

/// Where the clock is in its run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockState {
    /// Not started, or stopped. Progress reads 0.
    #[default]
    Idle,
    /// Started and accruing progress.
    Running,
    /// Started but frozen; progress holds its pre-pause value.
    Paused,
}

/// Per-operation progress clock.
///
/// One lives inside each [`Sequencer`](crate::sequencer::Sequencer); it is
/// restarted for every operation with that operation's duration.
#[derive(Debug, Clone)]
pub struct AnimationClock {
    state: ClockState,
    /// Start instant, shifted forward across pauses and speed changes.
    virtual_start_ms: f64,
    /// Effective "now" while paused.
    paused_at_ms: f64,
    /// Sum of all pause gaps since `start`, informational.
    paused_total_ms: f64,
    duration_ms: f64,
    speed: f64,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            virtual_start_ms: 0.0,
            paused_at_ms: 0.0,
            paused_total_ms: 0.0,
            duration_ms: 0.0,
            speed: 1.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ClockState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Total time spent paused since the last `start`.
    #[inline]
    #[must_use]
    pub fn paused_total(&self) -> Duration {
        Duration::from_secs_f64(self.paused_total_ms.max(0.0) / 1000.0)
    }

    /// Begin a fresh run at `now_ms` for `duration`. A zero duration is
    /// clamped to a hair above zero, which makes progress read 1.0 on the
    /// first advance rather than dividing by zero.
    pub fn start(&mut self, now_ms: u64, duration: Duration) {
        self.state = ClockState::Running;
        self.virtual_start_ms = now_ms as f64;
        self.paused_at_ms = 0.0;
        self.paused_total_ms = 0.0;
        self.duration_ms = (duration.as_secs_f64() * 1000.0).max(1e-6);
    }

    /// Return to `Idle`; progress reads 0 until the next `start`.
    pub fn stop(&mut self) {
        self.state = ClockState::Idle;
        self.virtual_start_ms = 0.0;
        self.paused_at_ms = 0.0;
        self.paused_total_ms = 0.0;
        self.duration_ms = 0.0;
    }

    /// Freeze progress. No-op unless running.
    pub fn pause(&mut self, now_ms: u64) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
            self.paused_at_ms = now_ms as f64;
        }
    }

    /// Continue from the frozen progress. No-op unless paused.
    pub fn resume(&mut self, now_ms: u64) {
        if self.state == ClockState::Paused {
            let gap = (now_ms as f64 - self.paused_at_ms).max(0.0);
            self.virtual_start_ms += gap;
            self.paused_total_ms += gap;
            self.state = ClockState::Running;
        }
    }

    /// Change the speed multiplier from this instant on. Elapsed progress is
    /// untouched; only the remaining real time rescales.
    pub fn set_speed(&mut self, now_ms: u64, multiplier: f64) -> Result<()> {
        if multiplier <= 0.0 || !multiplier.is_finite() {
            return Err(EngineError::invalid_config(format!(
                "speed multiplier must be finite and > 0, got {multiplier}"
            )));
        }
        if self.state != ClockState::Idle {
            let eff_now = if self.state == ClockState::Paused {
                self.paused_at_ms
            } else {
                now_ms as f64
            };
            let elapsed = (eff_now - self.virtual_start_ms).max(0.0);
            // Same progress under the new speed: elapsed' = elapsed * old / new.
            self.virtual_start_ms = eff_now - elapsed * self.speed / multiplier;
        }
        self.speed = multiplier;
        Ok(())
    }

    /// Normalized progress at `now_ms`, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress_at(&self, now_ms: u64) -> f64 {
        match self.state {
            ClockState::Idle => 0.0,
            ClockState::Running | ClockState::Paused => {
                let eff_now = if self.state == ClockState::Paused {
                    self.paused_at_ms
                } else {
                    now_ms as f64
                };
                let elapsed = (eff_now - self.virtual_start_ms).max(0.0);
                (elapsed * self.speed / self.duration_ms).clamp(0.0, 1.0)
            }
        }
    }
}
