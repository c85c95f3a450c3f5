#![forbid(unsafe_code)]

//! The deferred-mutation descriptor held by a tree while one operation's
//! animation is in flight.
//!
//! Every animatable state is a variant here, so consumers match exhaustively
//! instead of probing loosely-typed fields. At most one pending operation
//! exists per tree instance. While any non-[`Idle`](PendingOp::Idle) variant
//! is active the real link structure stays untouched; only these fields (and
//! the engine's progress value) move.
//!
//! [`SearchFound`](PendingOp::SearchFound) and
//! [`SearchNotFound`](PendingOp::SearchNotFound) are terminal residues: they
//! are tagged at commit, mutate nothing, count as idle for sequencing and are
//! replaced by the next request.

use crate::node::TraversalOrder;

/// Which child slot a pending insert will occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Live comparison of a target against the descent cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Less,
    Greater,
    Equal,
}

impl Comparison {
    pub(crate) fn of(ordering: std::cmp::Ordering) -> Self {
        match ordering {
            std::cmp::Ordering::Less => Self::Less,
            std::cmp::Ordering::Greater => Self::Greater,
            std::cmp::Ordering::Equal => Self::Equal,
        }
    }
}

/// Classification of a pending delete, fixed at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteCase<K> {
    /// Target absent; the commit is a structural no-op.
    NotFound,
    /// Target is a leaf.
    NoChildren,
    /// Target has exactly one child, which is promoted.
    OneChild,
    /// Target has two children; `replacement` is the in-order successor
    /// (minimum of the right subtree), located when the delete was requested
    /// so the animation can display it before any mutation.
    TwoChildren { replacement: K },
}

/// Tagged deferred-operation state, at most one per tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOp<K> {
    /// Nothing in flight.
    Idle,
    /// First insert into an empty tree.
    CreatingRoot { value: K },
    /// Insert below an existing parent; `path` is the full descent from the
    /// root, `parent_key` its last element, `side` the slot the value will
    /// occupy at commit.
    Inserting {
        value: K,
        path: Vec<K>,
        parent_key: K,
        side: Side,
    },
    /// Search in flight; `path` ends at the match or the last node visited
    /// before a null link.
    Searching { target: K, path: Vec<K> },
    /// Terminal: the search target exists.
    SearchFound { node_key: K },
    /// Terminal: the search target is absent; `last_key` is the final node
    /// visited (`None` on an empty tree).
    SearchNotFound { last_key: Option<K> },
    /// Delete in flight; `path` descends to the target (empty when absent).
    Deleting {
        target: K,
        path: Vec<K>,
        case: DeleteCase<K>,
    },
    /// Traversal in flight; `cursor` indexes the current element of
    /// `sequence` and the visited prefix is everything up to and including
    /// it. Traversals never mutate the tree.
    Traversing {
        order: TraversalOrder,
        sequence: Vec<K>,
        cursor: usize,
    },
}

// Manual impl: deriving would demand `K: Default` for a variant that holds
// no `K` at all.
impl<K> Default for PendingOp<K> {
    fn default() -> Self {
        Self::Idle
    }
}

/// Map progress onto an index into a precomputed path or sequence:
/// `floor(progress × len)` clamped to the last element.
pub(crate) fn cursor_index(progress: f64, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (((progress * len as f64).floor()) as usize).min(len - 1)
    }
}

impl<K> PendingOp<K> {
    /// Variant name, used in refusal messages and log events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::CreatingRoot { .. } => "CreatingRoot",
            Self::Inserting { .. } => "Inserting",
            Self::Searching { .. } => "Searching",
            Self::SearchFound { .. } => "SearchFound",
            Self::SearchNotFound { .. } => "SearchNotFound",
            Self::Deleting { .. } => "Deleting",
            Self::Traversing { .. } => "Traversing",
        }
    }

    /// True when a new operation may begin: nothing in flight, or only a
    /// terminal search residue left behind by the previous commit.
    #[must_use]
    pub fn accepts_request(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::SearchFound { .. } | Self::SearchNotFound { .. }
        )
    }

    /// True while an animation window is open (request made, commit not yet).
    #[must_use]
    pub fn in_flight(&self) -> bool {
        !self.accepts_request()
    }
}
