// Forbid unsafe in production; deny in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: deferred-mutation animation engines for classic data structures.
//!
//! # Role in Orrery
//! `orrery-core` owns the semantics that make structure animation honest:
//! every operation is split into a request that precomputes everything the
//! animation needs (descent paths, rotation plans, merge pairs) and a single
//! commit that performs the real mutation when progress reaches 1.0. Between
//! the two, the committed structure is untouched, so cancelling is free and
//! the final shape always equals what the non-animated algorithm would
//! produce.
//!
//! # Primary responsibilities
//! - **BstEngine**: deferred insert/search/delete/traverse with path
//!   precomputation.
//! - **AvlEngine**: the BST semantics plus height bookkeeping, a four-phase
//!   insert and shadow-tree rotation planning.
//! - **HuffmanEngine**: queue-driven tree construction in animatable merge
//!   rounds, with the finished code table and codec.
//! - **AnimationClock / Sequencer**: wall-clock milliseconds to normalized
//!   progress (pause, resume, speed scaling) and strictly sequential batch
//!   draining over any engine.
//!
//! # How it fits in the system
//! Rendering and command layers consume the read-only query surface (pending
//! states, cursors, plans, merge views) and drive engines through a
//! [`Sequencer`]; they never mutate structures directly. `orrery-harness`
//! replays scripted scenarios over these engines and fingerprints the
//! results.

pub mod avl;
pub mod bst;
pub mod clock;
pub mod error;
pub mod huffman;
pub mod node;
pub mod pending;
pub mod sequencer;

#[cfg(feature = "state-persistence")]
pub mod persist;

pub use avl::{AvlEngine, AvlInsertPhase, AvlPhaseConfig, AvlRequest, RotationKind, RotationPlan};
pub use bst::{BstEngine, BstRequest};
pub use clock::{AnimationClock, ClockState};
pub use error::{EngineError, Result};
pub use huffman::{
    CodeNode, FragmentView, HuffmanEngine, HuffmanRequest, MergePhase, MergePhaseConfig, MergeView,
};
pub use node::{TraversalOrder, TreeNode};
pub use pending::{Comparison, DeleteCase, PendingOp, Side};
pub use sequencer::{Animated, OpKind, Sequencer, SequencerConfig, SequencerStats};

#[cfg(feature = "state-persistence")]
pub use persist::{AvlRecord, BstRecord, HuffmanRecord};
