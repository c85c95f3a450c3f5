//! Determinism of Huffman construction: the animated path, the fast
//! forward path and a cancel-and-replay round must all produce identical
//! trees, bit for bit.

use std::time::Duration;

use orrery_core::sequencer::{Sequencer, SequencerConfig};
use orrery_core::{Animated, HuffmanEngine, HuffmanRequest, MergePhase};
use orrery_harness::{StepClock, fingerprint_value, huffman_queue, run_to_settled};

const CLRS_WEIGHTS: [(char, u64); 6] = [
    ('a', 5),
    ('b', 9),
    ('c', 12),
    ('d', 13),
    ('e', 16),
    ('f', 45),
];

fn loaded(weights: &[(char, u64)]) -> HuffmanEngine {
    let mut engine = HuffmanEngine::new();
    engine.activate();
    engine.load_symbols(weights).unwrap();
    engine
}

// ===========================================================================
// Animated vs fast-forward
// ===========================================================================

#[test]
fn animated_rounds_equal_fast_forward() {
    let mut twin = loaded(&CLRS_WEIGHTS);
    twin.fast_forward().unwrap();

    let engine = loaded(&CLRS_WEIGHTS);
    let rounds = engine.rounds_total();
    let mut seq = Sequencer::with_config(
        engine,
        SequencerConfig::uniform(Duration::from_millis(200)),
    );
    for _ in 0..rounds {
        seq.enqueue(HuffmanRequest::MergeStep);
    }
    let clock = StepClock::new(40);
    let report = run_to_settled(&mut seq, &clock, 10_000);

    assert!(report.settled);
    assert_eq!(huffman_queue(seq.engine()), huffman_queue(&twin));
    assert_eq!(
        seq.engine().code_table().unwrap(),
        twin.code_table().unwrap()
    );
    assert_eq!(
        fingerprint_value(&seq.engine().to_record().unwrap()),
        fingerprint_value(&twin.to_record().unwrap())
    );
}

#[test]
fn equal_frequency_ties_replay_identically() {
    // Every frequency equal: ordering is carried entirely by arrival order.
    let weights: Vec<(char, u64)> = ('a'..='h').map(|c| (c, 7)).collect();

    let mut first = loaded(&weights);
    first.fast_forward().unwrap();
    let mut second = loaded(&weights);
    second.fast_forward().unwrap();

    assert_eq!(huffman_queue(&first), huffman_queue(&second));
    assert_eq!(first.code_table().unwrap(), second.code_table().unwrap());
}

// ===========================================================================
// Cancel and replay
// ===========================================================================

#[test]
fn cancelled_round_replays_byte_identically() {
    let mut engine = loaded(&CLRS_WEIGHTS);

    engine.merge_step().unwrap();
    engine.set_progress(0.8);
    let first_view = engine.merge_view();
    assert_eq!(first_view.phase, MergePhase::Return);

    engine.cancel();
    assert!(engine.current_pair().is_none());

    engine.merge_step().unwrap();
    engine.set_progress(0.8);
    assert_eq!(engine.merge_view(), first_view);

    // Committing after the replay still splices the same parent the
    // preview promised.
    let promised = first_view.parent_candidate.unwrap();
    engine.set_progress(1.0);
    engine.commit();
    let queue = engine.merge_view().queue_before;
    assert!(
        queue
            .iter()
            .any(|f| f.seq == promised.seq && f.freq == promised.freq),
        "promised parent {promised:?} missing from {queue:?}"
    );
}

#[test]
fn cancel_through_the_sequencer_leaves_the_build_resumable() {
    let engine = loaded(&CLRS_WEIGHTS);
    let rounds = engine.rounds_total();
    let mut seq = Sequencer::with_config(
        engine,
        SequencerConfig::uniform(Duration::from_millis(100)),
    );
    for _ in 0..rounds {
        seq.enqueue(HuffmanRequest::MergeStep);
    }

    let clock = StepClock::new(20);
    // Begin the first round and get partway through it.
    seq.advance(clock.tick());
    seq.advance(clock.tick());
    seq.cancel();
    assert_eq!(seq.stats().cancelled, 1);

    // The queued rounds drain, but the cancelled merge never happened, so
    // the build ends one round short.
    let report = run_to_settled(&mut seq, &clock, 10_000);
    assert!(report.settled);
    assert!(!seq.engine().is_done());
    assert_eq!(seq.engine().queue_len(), 2);
    assert_eq!(seq.stats().committed, rounds as u64 - 1);

    // Requesting the missing round finishes the identical tree.
    seq.enqueue(HuffmanRequest::MergeStep);
    assert!(run_to_settled(&mut seq, &clock, 10_000).settled);
    assert!(seq.engine().is_done());
    assert_eq!(seq.stats().committed, rounds as u64);

    let mut twin = loaded(&CLRS_WEIGHTS);
    twin.fast_forward().unwrap();
    assert_eq!(huffman_queue(seq.engine()), huffman_queue(&twin));
    assert_eq!(
        seq.engine().code_table().unwrap(),
        twin.code_table().unwrap()
    );
}

// ===========================================================================
// Codec round trips
// ===========================================================================

#[test]
fn sequencer_built_tree_encodes_and_decodes() {
    let engine = loaded(&CLRS_WEIGHTS);
    let rounds = engine.rounds_total();
    let mut seq = Sequencer::with_config(
        engine,
        SequencerConfig::uniform(Duration::from_millis(150)),
    );
    for _ in 0..rounds {
        seq.enqueue(HuffmanRequest::MergeStep);
    }
    let clock = StepClock::new(50);
    assert!(run_to_settled(&mut seq, &clock, 10_000).settled);

    let engine = seq.engine();
    assert_eq!(engine.encode("f").unwrap(), "0");
    let bits = engine.encode("abcdef").unwrap();
    assert_eq!(engine.decode(&bits).unwrap(), "abcdef");

    // Total encoded length equals the weighted sum of code lengths.
    let table = engine.code_table().unwrap();
    let weighted: usize = CLRS_WEIGHTS
        .iter()
        .map(|(c, f)| table[c].len() * *f as usize)
        .sum();
    let whole: String = CLRS_WEIGHTS
        .iter()
        .flat_map(|&(c, f)| std::iter::repeat_n(c, f as usize))
        .collect();
    assert_eq!(engine.encode(&whole).unwrap().len(), weighted);
}
