#![forbid(unsafe_code)]

//! Per-structure timing controller: one clock, one engine, one FIFO batch
//! queue, drained strictly sequentially.
//!
//! The sequencer owns the only mutation path. Each `advance(now_ms)` call
//! converts elapsed wall time into progress, pushes it into the engine, and
//! commits exactly once when progress first reaches 1.0. Only after the
//! engine is observed idle again does the next queued request begin, on the
//! same `advance` call. Requests are never interleaved.
//!
//! Every structure instance gets its own sequencer; two sequencers never
//! share a clock or a queue, so independent structures animate concurrently
//! without coordination.
//!
//! # Example
//!
//! ```ignore
//! let mut seq = Sequencer::new(tree);
//! seq.enqueue(BstRequest::Insert(50));
//! seq.enqueue(BstRequest::Insert(30));
//! loop {
//!     let p = seq.advance(now_ms());
//!     if seq.is_settled() { break; }
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::clock::{AnimationClock, ClockState};
use crate::error::Result;

/// Coarse request classification used to pick a default duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Structural change (insert, delete).
    Mutate,
    /// Search animation.
    Search,
    /// Traversal animation.
    Traverse,
    /// One Huffman merge round.
    Merge,
}

/// The lifecycle seam between the sequencer and an engine.
///
/// `begin` parks a pending operation (or completes immediately for domain
/// no-ops), `set_progress` pushes clock progress in, `commit` applies the
/// real mutation exactly once, `cancel` discards the pending operation.
/// Nothing here blocks and nothing reads a clock.
pub trait Animated {
    type Request;

    /// Park a pending operation for `request`. A domain no-op (duplicate
    /// insert) returns `Ok` while leaving the engine idle.
    fn begin(&mut self, request: Self::Request) -> Result<()>;

    /// Which duration class `request` belongs to.
    fn classify(request: &Self::Request) -> OpKind;

    /// Push the current progress value, clamped to `[0, 1]` by the engine.
    fn set_progress(&mut self, progress: f64);

    /// Apply the deferred mutation. Idempotent when nothing is in flight.
    fn commit(&mut self);

    /// Discard the pending operation without mutating. Idempotent.
    fn cancel(&mut self);

    /// True when a new request may begin.
    fn is_idle(&self) -> bool;
}

/// Per-kind animation durations.
///
/// Defaults keep the classic pacing: mutations at 1 s, searches and
/// traversals at 2 s, each Huffman merge round at 2 s.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    pub mutate_duration: Duration,
    pub search_duration: Duration,
    pub traverse_duration: Duration,
    pub merge_duration: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            mutate_duration: Duration::from_millis(1000),
            search_duration: Duration::from_millis(2000),
            traverse_duration: Duration::from_millis(2000),
            merge_duration: Duration::from_millis(2000),
        }
    }
}

impl SequencerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same duration for every request kind. Handy in tests.
    #[must_use]
    pub fn uniform(duration: Duration) -> Self {
        Self {
            mutate_duration: duration,
            search_duration: duration,
            traverse_duration: duration,
            merge_duration: duration,
        }
    }

    #[must_use]
    pub fn mutate_duration(mut self, duration: Duration) -> Self {
        self.mutate_duration = duration;
        self
    }

    #[must_use]
    pub fn search_duration(mut self, duration: Duration) -> Self {
        self.search_duration = duration;
        self
    }

    #[must_use]
    pub fn traverse_duration(mut self, duration: Duration) -> Self {
        self.traverse_duration = duration;
        self
    }

    #[must_use]
    pub fn merge_duration(mut self, duration: Duration) -> Self {
        self.merge_duration = duration;
        self
    }

    #[must_use]
    pub fn duration_for(&self, kind: OpKind) -> Duration {
        match kind {
            OpKind::Mutate => self.mutate_duration,
            OpKind::Search => self.search_duration,
            OpKind::Traverse => self.traverse_duration,
            OpKind::Merge => self.merge_duration,
        }
    }
}

/// Counters for monitoring and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencerStats {
    /// Requests that opened an animation window.
    pub begun: u64,
    /// Commits applied.
    pub committed: u64,
    /// Requests that completed immediately as domain no-ops.
    pub noops: u64,
    /// In-flight operations discarded by `cancel`.
    pub cancelled: u64,
    /// Queued requests dropped because `begin` refused them.
    pub rejected: u64,
}

/// Drives one engine: clock in, progress out, commit at 1.0, queue drained
/// one request at a time.
#[derive(Debug)]
pub struct Sequencer<E: Animated> {
    engine: E,
    clock: AnimationClock,
    queue: VecDeque<(E::Request, Option<Duration>)>,
    config: SequencerConfig,
    stats: SequencerStats,
}

impl<E: Animated> Sequencer<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SequencerConfig::default())
    }

    #[must_use]
    pub fn with_config(engine: E, config: SequencerConfig) -> Self {
        Self {
            engine,
            clock: AnimationClock::new(),
            queue: VecDeque::new(),
            config,
            stats: SequencerStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access for setup (activation, loading a record).
    /// Driving the engine's lifecycle directly while the sequencer has an
    /// operation in flight voids the sequencing guarantees.
    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[inline]
    #[must_use]
    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> SequencerStats {
        self.stats
    }

    /// Requests waiting in the batch queue (not counting the in-flight one).
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Engine idle, clock idle and queue empty: everything has been played.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.engine.is_idle()
            && !self.clock.is_running()
            && !self.clock.is_paused()
            && self.queue.is_empty()
    }

    /// Begin `request` immediately. Fails fast (queue and engine untouched)
    /// when an operation is already in flight.
    pub fn request(&mut self, now_ms: u64, request: E::Request) -> Result<()> {
        let kind = E::classify(&request);
        self.engine.begin(request)?;
        if self.engine.is_idle() {
            // Domain no-op: nothing to animate.
            self.stats.noops += 1;
            return Ok(());
        }
        self.stats.begun += 1;
        self.clock.start(now_ms, self.config.duration_for(kind));
        Ok(())
    }

    /// Defer `request` until the engine is next observed idle.
    pub fn enqueue(&mut self, request: E::Request) {
        self.queue.push_back((request, None));
    }

    /// Defer `request` with an explicit duration override.
    pub fn enqueue_timed(&mut self, request: E::Request, duration: Duration) {
        self.queue.push_back((request, Some(duration)));
    }

    /// Drop all queued (not yet begun) requests.
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Push time forward. Computes progress at `now_ms`, feeds it to the
    /// engine, commits exactly once when it first reaches 1.0, then starts
    /// the next queued request (engine observed idle) on this same call.
    /// Returns the progress of the operation current at call time, or 0.0
    /// when nothing is running.
    pub fn advance(&mut self, now_ms: u64) -> f64 {
        if self.clock.state() == ClockState::Idle {
            self.start_next(now_ms);
        }
        if self.clock.state() == ClockState::Idle {
            return 0.0;
        }
        let progress = self.clock.progress_at(now_ms);
        self.engine.set_progress(progress);
        if progress >= 1.0 && self.clock.is_running() {
            self.engine.commit();
            self.stats.committed += 1;
            self.clock.stop();
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "orrery::sequencer", queued = self.queue.len(), "committed");
            self.start_next(now_ms);
        }
        progress
    }

    fn start_next(&mut self, now_ms: u64) {
        while self.engine.is_idle() {
            let Some((request, override_duration)) = self.queue.pop_front() else {
                return;
            };
            let kind = E::classify(&request);
            match self.engine.begin(request) {
                Ok(()) => {
                    if self.engine.is_idle() {
                        // Domain no-op; move on to the next queued request.
                        self.stats.noops += 1;
                        continue;
                    }
                    let duration =
                        override_duration.unwrap_or_else(|| self.config.duration_for(kind));
                    self.stats.begun += 1;
                    self.clock.start(now_ms, duration);
                    return;
                }
                Err(_error) => {
                    // Refused (e.g. structure deactivated underneath us).
                    // Drop the request and stop draining.
                    self.stats.rejected += 1;
                    #[cfg(feature = "tracing")]
                    tracing::warn!(target: "orrery::sequencer", error = %_error, "queued request refused");
                    return;
                }
            }
        }
    }

    /// Freeze the in-flight animation.
    pub fn pause(&mut self, now_ms: u64) {
        self.clock.pause(now_ms);
    }

    /// Continue a frozen animation from its pre-pause progress.
    pub fn resume(&mut self, now_ms: u64) {
        self.clock.resume(now_ms);
    }

    /// Change playback speed from this instant; elapsed progress holds.
    pub fn set_speed(&mut self, now_ms: u64, multiplier: f64) -> Result<()> {
        self.clock.set_speed(now_ms, multiplier)
    }

    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    /// Discard the in-flight operation. The tree was never touched, so there
    /// is nothing to roll back; queued requests stay put.
    pub fn cancel(&mut self) {
        if !self.engine.is_idle() {
            self.stats.cancelled += 1;
        }
        self.engine.cancel();
        self.clock.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bst::{BstEngine, BstRequest};
    use crate::error::EngineError;
    use crate::node::TraversalOrder;
    use crate::pending::PendingOp;

    const STEP: u64 = 100;

    fn bst_sequencer() -> Sequencer<BstEngine<i32>> {
        let mut engine = BstEngine::new();
        engine.activate();
        Sequencer::with_config(engine, SequencerConfig::uniform(Duration::from_millis(1000)))
    }

    fn run_until_settled(seq: &mut Sequencer<BstEngine<i32>>, start: u64) -> u64 {
        let mut now = start;
        while !seq.is_settled() {
            now += STEP;
            seq.advance(now);
            assert!(now < start + 1_000_000, "sequencer never settled");
        }
        now
    }

    // ── Sequential batch drain ──────────────────────────────────────────

    #[test]
    fn batch_runs_strictly_sequentially() {
        let mut seq = bst_sequencer();
        for v in [50, 30, 70] {
            seq.enqueue(BstRequest::Insert(v));
        }
        assert_eq!(seq.queued(), 3);

        // First advance starts the first insert only.
        seq.advance(0);
        assert_eq!(seq.queued(), 2);
        assert!(!seq.engine().is_idle());
        assert!(seq.engine().is_empty());

        let end = run_until_settled(&mut seq, 0);
        assert_eq!(
            seq.engine().traversal(TraversalOrder::Inorder),
            vec![30, 50, 70]
        );
        assert_eq!(seq.stats().committed, 3);
        // Three 1 s operations back to back.
        assert!(end >= 3000);
    }

    #[test]
    fn next_request_starts_on_the_same_advance_that_commits() {
        let mut seq = bst_sequencer();
        seq.enqueue(BstRequest::Insert(1));
        seq.enqueue(BstRequest::Insert(2));
        seq.advance(0);
        // Commit of the first insert and begin of the second in one call.
        seq.advance(1000);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![1]);
        assert!(matches!(
            seq.engine().pending(),
            PendingOp::Inserting { value: 2, .. }
        ));
    }

    #[test]
    fn request_fails_fast_while_busy() {
        let mut seq = bst_sequencer();
        seq.request(0, BstRequest::Insert(10)).unwrap();
        let err = seq.request(100, BstRequest::Insert(20)).unwrap_err();
        assert!(matches!(err, EngineError::Busy { .. }));
        // The refused request left nothing behind.
        assert_eq!(seq.queued(), 0);
        run_until_settled(&mut seq, 100);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![10]);
    }

    // ── Domain no-ops in a batch ────────────────────────────────────────

    #[test]
    fn duplicate_in_batch_is_skipped_without_a_clock_cycle() {
        let mut seq = bst_sequencer();
        seq.enqueue(BstRequest::Insert(5));
        seq.enqueue(BstRequest::Insert(5));
        seq.enqueue(BstRequest::Insert(9));
        let end = run_until_settled(&mut seq, 0);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![5, 9]);
        assert_eq!(seq.stats().noops, 1);
        assert_eq!(seq.stats().committed, 2);
        // Two animated operations, not three.
        assert!(end <= 2200);
    }

    // ── Pause, resume, speed ────────────────────────────────────────────

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut seq = bst_sequencer();
        seq.request(0, BstRequest::Insert(42)).unwrap();
        assert!((seq.advance(500) - 0.5).abs() < 1e-9);
        seq.pause(500);
        // Time passes; progress holds; no commit.
        assert!((seq.advance(5000) - 0.5).abs() < 1e-9);
        assert!(seq.engine().is_empty());
        seq.resume(5000);
        assert!((seq.advance(5250) - 0.75).abs() < 1e-9);
        seq.advance(5500);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![42]);
    }

    #[test]
    fn speed_multiplier_shortens_remaining_time() {
        let mut seq = bst_sequencer();
        seq.request(0, BstRequest::Insert(7)).unwrap();
        seq.advance(500);
        seq.set_speed(500, 5.0).unwrap();
        // Remaining half finishes in 100 ms instead of 500.
        seq.advance(600);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![7]);
    }

    // ── Cancel ──────────────────────────────────────────────────────────

    #[test]
    fn cancel_discards_in_flight_and_keeps_the_queue() {
        let mut seq = bst_sequencer();
        seq.enqueue(BstRequest::Insert(1));
        seq.enqueue(BstRequest::Insert(2));
        seq.advance(0);
        seq.advance(300);
        seq.cancel();
        assert!(seq.engine().is_idle());
        assert!(seq.engine().is_empty());
        assert_eq!(seq.queued(), 1);
        // The queued insert still runs.
        run_until_settled(&mut seq, 300);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![2]);
        assert_eq!(seq.stats().cancelled, 1);
    }

    // ── Refused queued requests ─────────────────────────────────────────

    #[test]
    fn refused_queued_request_is_dropped_and_draining_stops() {
        let mut engine: BstEngine<i32> = BstEngine::new();
        engine.activate();
        let mut seq =
            Sequencer::with_config(engine, SequencerConfig::uniform(Duration::from_millis(100)));
        seq.enqueue(BstRequest::Insert(1));
        seq.enqueue(BstRequest::Insert(2));
        seq.engine_mut().deactivate().unwrap();
        seq.advance(0);
        assert_eq!(seq.stats().rejected, 1);
        assert_eq!(seq.queued(), 1);
        assert!(seq.engine().is_empty());
    }

    // ── Timed overrides ─────────────────────────────────────────────────

    #[test]
    fn enqueue_timed_overrides_the_default_duration() {
        let mut seq = bst_sequencer();
        seq.enqueue_timed(BstRequest::Insert(3), Duration::from_millis(200));
        seq.advance(0);
        let p = seq.advance(100);
        assert!((p - 0.5).abs() < 1e-9);
        seq.advance(200);
        assert_eq!(seq.engine().traversal(TraversalOrder::Inorder), vec![3]);
    }

    #[test]
    fn settled_sequencer_reports_zero_progress() {
        let mut seq = bst_sequencer();
        assert!(seq.advance(1234).abs() < 1e-9);
        assert!(seq.is_settled());
    }
}
