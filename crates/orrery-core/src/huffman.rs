#![forbid(unsafe_code)]

//! Huffman merge engine: priority-queue tree construction decomposed into
//! animatable rounds.
//!
//! Construction starts from one leaf fragment per symbol and repeats a
//! four-phase round (select, move, merge, return) until a single fragment
//! remains. Each requested round picks the two lowest-frequency fragments,
//! previews their parent, and only splices the queue at commit; `Select`,
//! `Move` and `Merge` never mutate, so cancellation needs no rollback.
//!
//! Ordering is total and deterministic: fragments compare by frequency and
//! then by insertion sequence, and a merged parent takes the next sequence
//! number, so it lands *after* existing fragments of equal frequency. Equal
//! inputs therefore always build the same tree and the same code table.
//!
//! Once one fragment remains the engine is done and exposes the code table
//! from a left=0 / right=1 walk, plus `encode`/`decode` over it. A lone
//! symbol gets the code `"0"`; an empty alphabet yields an empty table.

use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::sequencer::{Animated, OpKind};

/// A node in the (eventual) Huffman tree. Leaves carry a symbol; internal
/// nodes carry only the combined frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeNode {
    pub(crate) freq: u64,
    pub(crate) symbol: Option<char>,
    pub(crate) left: Option<Box<CodeNode>>,
    pub(crate) right: Option<Box<CodeNode>>,
}

impl CodeNode {
    fn leaf(symbol: char, freq: u64) -> Self {
        Self {
            freq,
            symbol: Some(symbol),
            left: None,
            right: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn freq(&self) -> u64 {
        self.freq
    }

    #[inline]
    #[must_use]
    pub fn symbol(&self) -> Option<char> {
        self.symbol
    }

    #[inline]
    #[must_use]
    pub fn left(&self) -> Option<&CodeNode> {
        self.left.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> Option<&CodeNode> {
        self.right.as_deref()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    #[cfg(feature = "state-persistence")]
    pub(crate) fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.left.as_deref().map_or(0, CodeNode::leaf_count)
                + self.right.as_deref().map_or(0, CodeNode::leaf_count)
        }
    }

    fn fill_codes(&self, prefix: &mut String, table: &mut BTreeMap<char, String>) {
        if let Some(symbol) = self.symbol {
            table.insert(symbol, prefix.clone());
            return;
        }
        if let Some(left) = self.left.as_deref() {
            prefix.push('0');
            left.fill_codes(prefix, table);
            prefix.pop();
        }
        if let Some(right) = self.right.as_deref() {
            prefix.push('1');
            right.fill_codes(prefix, table);
            prefix.pop();
        }
    }
}

/// Queue entry: a tree fragment plus the sequence number that breaks
/// frequency ties (smaller = inserted earlier = wins the tie).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment {
    seq: u64,
    node: Box<CodeNode>,
}

impl Fragment {
    fn view(&self) -> FragmentView {
        FragmentView {
            seq: self.seq,
            freq: self.node.freq,
            symbol: self.node.symbol,
        }
    }
}

/// Render-facing summary of one queue fragment. `symbol` is `None` for
/// merged (internal) fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentView {
    pub seq: u64,
    pub freq: u64,
    pub symbol: Option<char>,
}

/// Phase of the merge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePhase {
    Select,
    Move,
    Merge,
    Return,
    Done,
}

/// Progress boundaries for the first three phases of a round; `Return` runs
/// from `merge_end` to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePhaseConfig {
    pub select_end: f64,
    pub move_end: f64,
    pub merge_end: f64,
}

impl Default for MergePhaseConfig {
    fn default() -> Self {
        Self {
            select_end: 0.25,
            move_end: 0.5,
            merge_end: 0.75,
        }
    }
}

impl MergePhaseConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select_end(mut self, boundary: f64) -> Self {
        self.select_end = boundary;
        self
    }

    #[must_use]
    pub fn move_end(mut self, boundary: f64) -> Self {
        self.move_end = boundary;
        self
    }

    #[must_use]
    pub fn merge_end(mut self, boundary: f64) -> Self {
        self.merge_end = boundary;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ascending = 0.0 < self.select_end
            && self.select_end < self.move_end
            && self.move_end < self.merge_end
            && self.merge_end <= 1.0;
        if ascending {
            Ok(())
        } else {
            Err(EngineError::invalid_config(format!(
                "phase boundaries must ascend within (0, 1]: {:?} < {:?} < {:?}",
                self.select_end, self.move_end, self.merge_end
            )))
        }
    }

    #[must_use]
    pub fn phase_at(&self, progress: f64) -> MergePhase {
        if progress < self.select_end {
            MergePhase::Select
        } else if progress < self.move_end {
            MergePhase::Move
        } else if progress < self.merge_end {
            MergePhase::Merge
        } else {
            MergePhase::Return
        }
    }
}

/// Aggregate read surface for one round, shaped for the rendering layer.
/// `queue_after` previews the post-commit queue; while idle it equals
/// `queue_before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeView {
    pub phase: MergePhase,
    pub queue_before: Vec<FragmentView>,
    pub queue_after: Vec<FragmentView>,
    pub current_pair: Option<(FragmentView, FragmentView)>,
    pub parent_candidate: Option<FragmentView>,
}

/// One animatable Huffman operation: a single merge round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanRequest {
    MergeStep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMerge {
    left_seq: u64,
    right_seq: u64,
    parent_freq: u64,
    parent_seq: u64,
}

/// Huffman construction with request/commit animation semantics.
///
/// The queue is kept sorted by `(freq, seq)`, so the round's pair is always
/// the first two entries.
#[derive(Debug, Clone)]
pub struct HuffmanEngine {
    queue: Vec<Fragment>,
    pending: Option<PendingMerge>,
    next_seq: u64,
    rounds_done: usize,
    rounds_total: usize,
    phases: MergePhaseConfig,
    progress: f64,
    active: bool,
}

impl Default for HuffmanEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanEngine {
    /// A fresh, empty, deactivated engine with default phase boundaries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            pending: None,
            next_seq: 0,
            rounds_done: 0,
            rounds_total: 0,
            phases: MergePhaseConfig::default(),
            progress: 0.0,
            active: false,
        }
    }

    /// A fresh engine with custom phase boundaries.
    pub fn with_phases(phases: MergePhaseConfig) -> Result<Self> {
        phases.validate()?;
        let mut engine = Self::new();
        engine.phases = phases;
        Ok(engine)
    }

    /// Adopt an already-validated finished tree, idle and deactivated.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn from_finished_root(root: Option<Box<CodeNode>>) -> Self {
        let mut engine = Self::new();
        if let Some(node) = root {
            let leaves = node.leaf_count();
            let nodes = 2 * leaves as u64 - 1;
            engine.queue = vec![Fragment { seq: nodes - 1, node }];
            engine.next_seq = nodes;
            engine.rounds_done = leaves - 1;
            engine.rounds_total = leaves - 1;
        }
        engine
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[inline]
    #[must_use]
    pub fn phases(&self) -> &MergePhaseConfig {
        &self.phases
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn rounds_done(&self) -> usize {
        self.rounds_done
    }

    #[must_use]
    pub fn rounds_total(&self) -> usize {
        self.rounds_total
    }

    /// Sum of all fragment frequencies; conserved by every round.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.queue.iter().map(|f| f.node.freq).sum()
    }

    /// Construction is finished when at most one fragment remains and no
    /// round is in flight.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.queue.len() <= 1 && self.pending.is_none()
    }

    /// The finished Huffman tree root. `None` while rounds remain or for an
    /// empty alphabet.
    #[must_use]
    pub fn root(&self) -> Option<&CodeNode> {
        if self.is_done() {
            self.queue.first().map(|f| &*f.node)
        } else {
            None
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.active {
            return Err(EngineError::NotActivated);
        }
        if self.pending.is_some() {
            return Err(EngineError::busy("merging"));
        }
        Ok(())
    }

    /// Replace the alphabet. Frequencies must be positive and symbols
    /// unique; sequence numbers follow the given order, fixing all future
    /// tie-breaks.
    pub fn load_symbols(&mut self, weights: &[(char, u64)]) -> Result<()> {
        self.ensure_ready()?;
        let mut seen = std::collections::BTreeSet::new();
        for &(symbol, freq) in weights {
            if freq == 0 {
                return Err(EngineError::ZeroFrequency { symbol });
            }
            if !seen.insert(symbol) {
                return Err(EngineError::DuplicateSymbol { symbol });
            }
        }
        self.queue = weights
            .iter()
            .enumerate()
            .map(|(i, &(symbol, freq))| Fragment {
                seq: i as u64,
                node: Box::new(CodeNode::leaf(symbol, freq)),
            })
            .collect();
        self.queue.sort_by_key(|f| (f.node.freq, f.seq));
        self.next_seq = weights.len() as u64;
        self.rounds_done = 0;
        self.rounds_total = weights.len().saturating_sub(1);
        self.progress = 0.0;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "orrery::huffman",
            symbols = weights.len(),
            rounds = self.rounds_total,
            "alphabet loaded"
        );
        Ok(())
    }

    /// Count frequencies over `text` (sequence numbers follow first
    /// appearance) and load the result.
    pub fn load_text(&mut self, text: &str) -> Result<()> {
        let mut weights: Vec<(char, u64)> = Vec::new();
        for ch in text.chars() {
            match weights.iter_mut().find(|(symbol, _)| *symbol == ch) {
                Some((_, freq)) => *freq += 1,
                None => weights.push((ch, 1)),
            }
        }
        self.load_symbols(&weights)
    }

    /// Drop the alphabet and all construction state. Requires nothing in
    /// flight.
    pub fn clear(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(EngineError::PendingInFlight { action: "clear" });
        }
        self.queue.clear();
        self.next_seq = 0;
        self.rounds_done = 0;
        self.rounds_total = 0;
        self.progress = 0.0;
        Ok(())
    }

    /// Refuse further operations. Requires nothing in flight.
    pub fn deactivate(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(EngineError::PendingInFlight { action: "deactivate" });
        }
        self.active = false;
        self.progress = 0.0;
        Ok(())
    }

    /// Request one merge round. A no-op once a single fragment (or none)
    /// remains.
    pub fn merge_step(&mut self) -> Result<()> {
        self.ensure_ready()?;
        if self.queue.len() < 2 {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "orrery::huffman", "construction done; merge ignored");
            return Ok(());
        }
        self.progress = 0.0;
        let left = &self.queue[0];
        let right = &self.queue[1];
        self.pending = Some(PendingMerge {
            left_seq: left.seq,
            right_seq: right.seq,
            parent_freq: left.node.freq + right.node.freq,
            parent_seq: self.next_seq,
        });
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "orrery::huffman",
            round = self.rounds_done + 1,
            of = self.rounds_total,
            pair = ?(left.node.freq, right.node.freq),
            "merge round requested"
        );
        Ok(())
    }

    /// Complete all remaining rounds synchronously, without animation.
    pub fn fast_forward(&mut self) -> Result<()> {
        self.ensure_ready()?;
        while self.queue.len() > 1 {
            self.splice_round();
            self.rounds_done += 1;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "orrery::huffman", rounds = self.rounds_done, "fast-forwarded");
        Ok(())
    }

    /// Phase of the merge cycle. While idle this reports `Select` (next
    /// round not yet requested) or `Done`.
    #[must_use]
    pub fn phase(&self) -> MergePhase {
        if self.pending.is_some() {
            self.phases.phase_at(self.progress)
        } else if self.queue.len() <= 1 {
            MergePhase::Done
        } else {
            MergePhase::Select
        }
    }

    /// The round's pair, lowest frequency first. `None` while idle.
    #[must_use]
    pub fn current_pair(&self) -> Option<(FragmentView, FragmentView)> {
        self.pending.as_ref().map(|_| {
            // The queue is sorted and frozen for the round's duration.
            (self.queue[0].view(), self.queue[1].view())
        })
    }

    /// Preview of the parent the commit will splice in. `None` while idle.
    #[must_use]
    pub fn parent_candidate(&self) -> Option<FragmentView> {
        self.pending.as_ref().map(|p| FragmentView {
            seq: p.parent_seq,
            freq: p.parent_freq,
            symbol: None,
        })
    }

    /// Aggregate view for the rendering layer.
    #[must_use]
    pub fn merge_view(&self) -> MergeView {
        let queue_before: Vec<FragmentView> = self.queue.iter().map(Fragment::view).collect();
        let queue_after = match self.pending.as_ref() {
            None => queue_before.clone(),
            Some(p) => {
                let parent = FragmentView {
                    seq: p.parent_seq,
                    freq: p.parent_freq,
                    symbol: None,
                };
                let mut after: Vec<FragmentView> = queue_before[2..].to_vec();
                let at = after.partition_point(|f| f.freq <= parent.freq);
                after.insert(at, parent);
                after
            }
        };
        MergeView {
            phase: self.phase(),
            queue_before,
            queue_after,
            current_pair: self.current_pair(),
            parent_candidate: self.parent_candidate(),
        }
    }

    fn ensure_done(&self) -> Result<()> {
        if self.is_done() {
            Ok(())
        } else {
            Err(EngineError::CodecNotReady {
                remaining: self.rounds_total - self.rounds_done,
            })
        }
    }

    /// Symbol-to-bitstring table for the finished tree.
    pub fn code_table(&self) -> Result<BTreeMap<char, String>> {
        self.ensure_done()?;
        let mut table = BTreeMap::new();
        let Some(root) = self.root() else {
            // Empty alphabet, empty table.
            return Ok(table);
        };
        if let Some(symbol) = root.symbol {
            // Single-symbol alphabet: the lone code is "0".
            table.insert(symbol, String::from("0"));
        } else {
            let mut prefix = String::new();
            root.fill_codes(&mut prefix, &mut table);
        }
        Ok(table)
    }

    /// Encode `text` with the finished code table.
    pub fn encode(&self, text: &str) -> Result<String> {
        let table = self.code_table()?;
        let mut bits = String::new();
        for symbol in text.chars() {
            match table.get(&symbol) {
                Some(code) => bits.push_str(code),
                None => return Err(EngineError::UnknownSymbol { symbol }),
            }
        }
        Ok(bits)
    }

    /// Decode a bitstring produced by [`encode`](Self::encode).
    pub fn decode(&self, bits: &str) -> Result<String> {
        self.ensure_done()?;
        let Some(root) = self.root() else {
            // Empty alphabet decodes only the empty string.
            return if bits.is_empty() {
                Ok(String::new())
            } else {
                Err(EngineError::CorruptBits { offset: 0 })
            };
        };
        let mut out = String::new();
        if let Some(symbol) = root.symbol {
            for (offset, bit) in bits.char_indices() {
                if bit != '0' {
                    return Err(EngineError::CorruptBits { offset });
                }
                out.push(symbol);
            }
            return Ok(out);
        }
        let mut cursor = root;
        for (offset, bit) in bits.char_indices() {
            let next = match bit {
                '0' => cursor.left.as_deref(),
                '1' => cursor.right.as_deref(),
                _ => None,
            };
            let Some(node) = next else {
                return Err(EngineError::CorruptBits { offset });
            };
            if let Some(symbol) = node.symbol {
                out.push(symbol);
                cursor = root;
            } else {
                cursor = node;
            }
        }
        if std::ptr::eq(cursor, root) {
            Ok(out)
        } else {
            // Dangling prefix: the bitstring ended mid-code.
            Err(EngineError::CorruptBits { offset: bits.len() })
        }
    }

    /// Remove the round's pair and splice their parent back in frequency
    /// order, after any existing equal-frequency fragments.
    fn splice_round(&mut self) {
        if self.queue.len() < 2 {
            return;
        }
        let left = self.queue.remove(0);
        let right = self.queue.remove(0);
        let freq = left.node.freq + right.node.freq;
        let parent = Fragment {
            seq: self.next_seq,
            node: Box::new(CodeNode {
                freq,
                symbol: None,
                left: Some(left.node),
                right: Some(right.node),
            }),
        };
        self.next_seq += 1;
        // Existing fragments all have older sequence numbers, so placing the
        // parent after every fragment of equal or lower frequency keeps the
        // queue sorted by (freq, seq).
        let at = self.queue.partition_point(|f| f.node.freq <= freq);
        self.queue.insert(at, parent);
    }
}

impl Animated for HuffmanEngine {
    type Request = HuffmanRequest;

    fn begin(&mut self, request: HuffmanRequest) -> Result<()> {
        match request {
            HuffmanRequest::MergeStep => self.merge_step(),
        }
    }

    fn classify(_request: &HuffmanRequest) -> OpKind {
        OpKind::Merge
    }

    fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
    }

    fn commit(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        debug_assert_eq!(pending.left_seq, self.queue[0].seq);
        debug_assert_eq!(pending.right_seq, self.queue[1].seq);
        self.splice_round();
        self.rounds_done += 1;
        self.progress = 0.0;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "orrery::huffman",
            round = self.rounds_done,
            of = self.rounds_total,
            remaining = self.queue.len(),
            "merge committed"
        );
    }

    fn cancel(&mut self) {
        #[cfg(feature = "tracing")]
        if self.pending.is_some() {
            tracing::debug!(target: "orrery::huffman", "merge round cancelled");
        }
        self.pending = None;
        self.progress = 0.0;
    }

    fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLRS_WEIGHTS: &[(char, u64)] = &[
        ('a', 5),
        ('b', 9),
        ('c', 12),
        ('d', 13),
        ('e', 16),
        ('f', 45),
    ];

    fn loaded(weights: &[(char, u64)]) -> HuffmanEngine {
        let mut e = HuffmanEngine::new();
        e.activate();
        e.load_symbols(weights).unwrap();
        e
    }

    fn run_round(e: &mut HuffmanEngine) {
        e.merge_step().unwrap();
        e.set_progress(1.0);
        e.commit();
    }

    // ── Loading and validation ──────────────────────────────────────────

    #[test]
    fn load_sorts_by_frequency_then_arrival() {
        let e = loaded(&[('x', 3), ('y', 1), ('z', 3)]);
        let freqs: Vec<(u64, Option<char>)> = e
            .merge_view()
            .queue_before
            .iter()
            .map(|f| (f.freq, f.symbol))
            .collect();
        assert_eq!(
            freqs,
            vec![(1, Some('y')), (3, Some('x')), (3, Some('z'))]
        );
        assert_eq!(e.rounds_total(), 2);
        assert_eq!(e.rounds_done(), 0);
    }

    #[test]
    fn zero_frequency_and_duplicate_symbols_are_rejected() {
        let mut e = HuffmanEngine::new();
        e.activate();
        assert!(matches!(
            e.load_symbols(&[('a', 1), ('b', 0)]),
            Err(EngineError::ZeroFrequency { symbol: 'b' })
        ));
        assert!(matches!(
            e.load_symbols(&[('a', 1), ('a', 2)]),
            Err(EngineError::DuplicateSymbol { symbol: 'a' })
        ));
        // Failed loads leave the engine empty and usable.
        assert_eq!(e.queue_len(), 0);
        assert!(e.load_symbols(&[('a', 1), ('b', 2)]).is_ok());
    }

    #[test]
    fn load_text_counts_in_first_appearance_order() {
        let mut e = HuffmanEngine::new();
        e.activate();
        e.load_text("abracadabra").unwrap();
        // a:5 b:2 r:2 c:1 d:1; arrival order a, b, r, c, d.
        let before = e.merge_view().queue_before;
        let freqs: Vec<(u64, Option<char>)> =
            before.iter().map(|f| (f.freq, f.symbol)).collect();
        assert_eq!(
            freqs,
            vec![
                (1, Some('c')),
                (1, Some('d')),
                (2, Some('b')),
                (2, Some('r')),
                (5, Some('a')),
            ]
        );
    }

    #[test]
    fn operations_require_activation() {
        let mut e = HuffmanEngine::new();
        assert!(matches!(
            e.load_symbols(&[('a', 1)]),
            Err(EngineError::NotActivated)
        ));
        assert!(matches!(e.merge_step(), Err(EngineError::NotActivated)));
    }

    // ── Round animation ─────────────────────────────────────────────────

    #[test]
    fn round_exposes_pair_and_parent_without_touching_the_queue() {
        let mut e = loaded(&[('a', 5), ('b', 9), ('c', 12)]);
        let before = e.merge_view().queue_before;
        e.merge_step().unwrap();
        let (lo, hi) = e.current_pair().expect("pair");
        assert_eq!((lo.symbol, lo.freq), (Some('a'), 5));
        assert_eq!((hi.symbol, hi.freq), (Some('b'), 9));
        let parent = e.parent_candidate().expect("parent preview");
        assert_eq!(parent.freq, 14);
        assert_eq!(parent.symbol, None);
        for step in 0..10 {
            e.set_progress(f64::from(step) / 10.0);
            assert_eq!(e.merge_view().queue_before, before);
            assert_eq!(e.queue_len(), 3);
        }
        e.set_progress(1.0);
        e.commit();
        let after = e.merge_view().queue_before;
        let freqs: Vec<u64> = after.iter().map(|f| f.freq).collect();
        assert_eq!(freqs, vec![12, 14]);
        assert_eq!(e.rounds_done(), 1);
    }

    #[test]
    fn phases_follow_the_quarter_boundaries() {
        let mut e = loaded(&[('a', 1), ('b', 2)]);
        assert_eq!(e.phase(), MergePhase::Select);
        e.merge_step().unwrap();
        e.set_progress(0.1);
        assert_eq!(e.phase(), MergePhase::Select);
        e.set_progress(0.25);
        assert_eq!(e.phase(), MergePhase::Move);
        e.set_progress(0.5);
        assert_eq!(e.phase(), MergePhase::Merge);
        e.set_progress(0.75);
        assert_eq!(e.phase(), MergePhase::Return);
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.phase(), MergePhase::Done);
    }

    #[test]
    fn queue_after_preview_matches_the_committed_queue() {
        let mut e = loaded(CLRS_WEIGHTS);
        e.merge_step().unwrap();
        let preview = e.merge_view().queue_after;
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.merge_view().queue_before, preview);
    }

    #[test]
    fn merged_parent_lands_after_equal_frequency_fragments() {
        // a+b make 2, which must sit after the existing 2.
        let mut e = loaded(&[('a', 1), ('b', 1), ('c', 2), ('d', 3)]);
        run_round(&mut e);
        let freqs: Vec<(u64, Option<char>)> = e
            .merge_view()
            .queue_before
            .iter()
            .map(|f| (f.freq, f.symbol))
            .collect();
        assert_eq!(freqs, vec![(2, Some('c')), (2, None), (3, Some('d'))]);
    }

    #[test]
    fn each_round_shrinks_the_queue_and_conserves_weight() {
        let mut e = loaded(CLRS_WEIGHTS);
        let weight = e.total_weight();
        let mut remaining = e.queue_len();
        while !e.is_done() {
            run_round(&mut e);
            remaining -= 1;
            assert_eq!(e.queue_len(), remaining);
            assert_eq!(e.total_weight(), weight);
        }
        assert_eq!(e.rounds_done(), e.rounds_total());
        assert_eq!(e.queue_len(), 1);
    }

    #[test]
    fn busy_round_rejects_further_requests() {
        let mut e = loaded(&[('a', 1), ('b', 2)]);
        e.merge_step().unwrap();
        assert!(matches!(
            e.merge_step(),
            Err(EngineError::Busy { pending: "merging" })
        ));
        assert!(matches!(
            e.load_symbols(&[('z', 1)]),
            Err(EngineError::Busy { .. })
        ));
        assert!(matches!(
            e.clear(),
            Err(EngineError::PendingInFlight { action: "clear" })
        ));
    }

    #[test]
    fn cancel_discards_the_round_and_replays_identically() {
        let mut e = loaded(CLRS_WEIGHTS);
        e.merge_step().unwrap();
        let first = e.merge_view();
        e.set_progress(0.6);
        e.cancel();
        assert!(e.is_idle());
        assert_eq!(e.queue_len(), 6);
        assert_eq!(e.rounds_done(), 0);
        e.merge_step().unwrap();
        assert_eq!(e.merge_view(), first);
    }

    #[test]
    fn merge_step_when_done_is_a_noop() {
        let mut e = loaded(&[('a', 1), ('b', 2)]);
        run_round(&mut e);
        assert!(e.is_done());
        assert!(e.merge_step().is_ok());
        assert!(e.is_idle());
        assert_eq!(e.queue_len(), 1);
    }

    // ── Determinism and the finished codec ──────────────────────────────

    #[test]
    fn textbook_frequencies_build_the_textbook_code_lengths() {
        let mut e = loaded(CLRS_WEIGHTS);
        e.fast_forward().unwrap();
        let table = e.code_table().unwrap();
        let lengths: Vec<(char, usize)> =
            table.iter().map(|(s, code)| (*s, code.len())).collect();
        assert_eq!(
            lengths,
            vec![('a', 4), ('b', 4), ('c', 3), ('d', 3), ('e', 3), ('f', 1)]
        );
        assert_eq!(table[&'f'], "0");
    }

    #[test]
    fn repeated_builds_are_identical() {
        let mut animated = loaded(CLRS_WEIGHTS);
        while !animated.is_done() {
            run_round(&mut animated);
        }
        let mut skipped = loaded(CLRS_WEIGHTS);
        skipped.fast_forward().unwrap();
        assert_eq!(animated.code_table().unwrap(), skipped.code_table().unwrap());
        assert_eq!(animated.root(), skipped.root());
    }

    #[test]
    fn all_equal_frequencies_resolve_ties_by_arrival() {
        let mut e = loaded(&[('a', 1), ('b', 1), ('c', 1), ('d', 1)]);
        e.fast_forward().unwrap();
        let table = e.code_table().unwrap();
        assert_eq!(table[&'a'], "00");
        assert_eq!(table[&'b'], "01");
        assert_eq!(table[&'c'], "10");
        assert_eq!(table[&'d'], "11");
    }

    #[test]
    fn empty_alphabet_is_done_with_no_root() {
        let mut e = HuffmanEngine::new();
        e.activate();
        e.load_symbols(&[]).unwrap();
        assert!(e.is_done());
        assert_eq!(e.phase(), MergePhase::Done);
        assert!(e.root().is_none());
        assert!(e.code_table().unwrap().is_empty());
        assert_eq!(e.decode("").unwrap(), "");
        assert!(matches!(
            e.decode("0"),
            Err(EngineError::CorruptBits { offset: 0 })
        ));
    }

    #[test]
    fn single_symbol_codes_as_zero() {
        let e = loaded(&[('z', 7)]);
        assert!(e.is_done());
        assert_eq!(e.rounds_total(), 0);
        let table = e.code_table().unwrap();
        assert_eq!(table[&'z'], "0");
        assert_eq!(e.encode("zzz").unwrap(), "000");
        assert_eq!(e.decode("00").unwrap(), "zz");
        assert!(matches!(
            e.decode("01"),
            Err(EngineError::CorruptBits { offset: 1 })
        ));
    }

    #[test]
    fn encode_decode_round_trips_over_the_finished_tree() {
        let mut e = loaded(CLRS_WEIGHTS);
        e.fast_forward().unwrap();
        let bits = e.encode("decafbad").unwrap();
        assert_eq!(e.decode(&bits).unwrap(), "decafbad");
        assert!(matches!(
            e.encode("decaf!"),
            Err(EngineError::UnknownSymbol { symbol: '!' })
        ));
    }

    #[test]
    fn decode_flags_dangling_and_malformed_bits() {
        let mut e = loaded(CLRS_WEIGHTS);
        e.fast_forward().unwrap();
        // "a" encodes to four bits; truncating leaves a dangling prefix.
        let bits = e.encode("a").unwrap();
        let truncated = &bits[..bits.len() - 1];
        assert!(matches!(
            e.decode(truncated),
            Err(EngineError::CorruptBits { offset }) if offset == truncated.len()
        ));
        assert!(matches!(
            e.decode("0x"),
            Err(EngineError::CorruptBits { offset: 1 })
        ));
    }

    #[test]
    fn codec_is_unavailable_mid_construction() {
        let mut e = loaded(CLRS_WEIGHTS);
        run_round(&mut e);
        assert!(matches!(
            e.code_table(),
            Err(EngineError::CodecNotReady { remaining: 4 })
        ));
        assert!(e.root().is_none());
    }
}
