// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Harness: deterministic drivers and reference fixtures for the engines.
//!
//! # Role in Orrery
//! Everything in `orrery-core` is a pure function of explicit `now_ms`
//! inputs, which makes the engines fully scriptable. This crate supplies the
//! scripts: stepped and wall clocks, batch drivers that run a sequencer to
//! completion, blake3 fingerprints of committed shapes, and small textbook
//! implementations of the same algorithms for parity checks.
//!
//! # Primary responsibilities
//! - [`StepClock`] / [`WallClock`]: hand-advanced and real time sources that
//!   both produce the `now_ms` values the sequencer consumes.
//! - [`drive`]: run a sequencer in fixed steps until it settles, reporting
//!   tick counts and sampled progress.
//! - [`fingerprint`]: canonical JSON of a shape record, hashed with blake3,
//!   so "nothing changed" is one string comparison.
//! - [`oracle`]: independent BST/AVL/Huffman builders with no animation
//!   machinery, used only to check that animated commits land on the
//!   textbook result.
//!
//! # How it fits in the system
//! The end-to-end suites under `tests/` drive real engines through the
//! public sequencer surface and compare against this crate's oracles and
//! fingerprints. Nothing here is needed at runtime; depend on it from
//! dev-dependencies only.

pub mod clock;
pub mod drive;
pub mod fingerprint;
pub mod oracle;

pub use clock::{StepClock, WallClock};
pub use drive::{DriveReport, progress_trace, run_to_settled};
pub use fingerprint::{avl_shape, bst_shape, fingerprint_text, fingerprint_value, huffman_queue};
pub use oracle::{AvlOracle, BstOracle, Rotation, huffman_lengths};
