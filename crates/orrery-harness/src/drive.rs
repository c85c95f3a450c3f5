#![forbid(unsafe_code)]

//! Batch drivers: run a sequencer until everything queued has committed.

use orrery_core::sequencer::{Animated, Sequencer};
use tracing::debug;

use crate::clock::StepClock;

/// Outcome of one [`run_to_settled`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveReport {
    /// Ticks consumed (advance calls made).
    pub ticks: u64,
    /// Clock reading after the last advance.
    pub end_ms: u64,
    /// Progress returned by the last advance.
    pub final_progress: f64,
    /// False when `max_ticks` ran out first.
    pub settled: bool,
}

/// Advance `seq` one clock step at a time until it settles or `max_ticks`
/// is exhausted. The cap keeps a paused or misconfigured run from spinning
/// forever; report `settled == false` rather than hanging the suite.
pub fn run_to_settled<E: Animated>(
    seq: &mut Sequencer<E>,
    clock: &StepClock,
    max_ticks: u64,
) -> DriveReport {
    let mut ticks = 0;
    let mut final_progress = 0.0;
    while !seq.is_settled() && ticks < max_ticks {
        final_progress = seq.advance(clock.tick());
        ticks += 1;
    }
    let report = DriveReport {
        ticks,
        end_ms: clock.now_ms(),
        final_progress,
        settled: seq.is_settled(),
    };
    debug!(
        target: "orrery::harness",
        ticks = report.ticks,
        end_ms = report.end_ms,
        settled = report.settled,
        "drive finished"
    );
    report
}

/// Advance exactly `ticks` steps, collecting the progress value after each.
/// Useful for asserting monotonicity or freezing shape mid-flight.
pub fn progress_trace<E: Animated>(
    seq: &mut Sequencer<E>,
    clock: &StepClock,
    ticks: u64,
) -> Vec<f64> {
    let mut trace = Vec::with_capacity(usize::try_from(ticks).unwrap_or(0));
    for _ in 0..ticks {
        trace.push(seq.advance(clock.tick()));
    }
    trace
}
