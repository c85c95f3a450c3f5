#![forbid(unsafe_code)]

//! Deferred-mutation binary search tree engine.
//!
//! Requesting an operation computes everything the animation needs (descent
//! path, delete case, traversal sequence) and parks it in a
//! [`PendingOp`] without touching the tree. The controller then pushes a
//! progress value into the engine until it reaches 1.0, at which point
//! [`commit`](crate::sequencer::Animated::commit) replays the ordinary
//! recursive algorithm on the real tree exactly once.
//!
//! # Example
//!
//! ```ignore
//! use orrery_core::bst::BstEngine;
//! use orrery_core::sequencer::Animated;
//!
//! let mut tree: BstEngine<i32> = BstEngine::new();
//! tree.activate();
//! tree.insert(50)?;
//! tree.set_progress(0.5);          // tree still empty here
//! tree.set_progress(1.0);
//! tree.commit();                    // root 50 exists now
//! ```
//!
//! # Invariants
//!
//! - While a pending operation is in flight the link structure is identical
//!   to the pre-request state; only pending fields and progress move.
//! - Commit happens at most once per request and replays the recursive
//!   insert/delete with the value captured at request time.
//! - Duplicate inserts and absent targets are domain no-ops, not errors.

use std::fmt;

use crate::error::{EngineError, Result};
use crate::node::{self, BstNode, TraversalOrder, TreeNode};
use crate::pending::{Comparison, DeleteCase, PendingOp, Side, cursor_index};
use crate::sequencer::{Animated, OpKind};

/// One animatable BST operation, the unit a sequencer queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BstRequest<K> {
    Insert(K),
    Search(K),
    Delete(K),
    Traverse(TraversalOrder),
}

/// Binary search tree with request/commit animation semantics.
#[derive(Debug, Clone)]
pub struct BstEngine<K> {
    root: Option<Box<BstNode<K>>>,
    pending: PendingOp<K>,
    progress: f64,
    active: bool,
}

impl<K> Default for BstEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> BstEngine<K> {
    /// A fresh, empty, deactivated engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            pending: PendingOp::Idle,
            progress: 0.0,
            active: false,
        }
    }

    /// Adopt an already-validated tree, idle and deactivated.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn from_root(root: Option<Box<BstNode<K>>>) -> Self {
        let mut engine = Self::new();
        engine.root = root;
        engine
    }

    /// Allow operations. Engines start deactivated.
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
    pub fn pending(&self) -> &PendingOp<K> {
        &self.pending
    }

    /// Last progress value pushed in, `[0, 1]`. Reads 0 while idle.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&BstNode<K>> {
        self.root.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        node::count(self.root())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the committed tree (empty = 0, single node = 1).
    #[must_use]
    pub fn height(&self) -> u32 {
        node::computed_height(self.root())
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.active {
            return Err(EngineError::NotActivated);
        }
        if self.pending.in_flight() {
            return Err(EngineError::busy(self.pending.label()));
        }
        Ok(())
    }

    /// Reset pending state and progress before accepting a new request.
    fn open_request(&mut self) {
        self.pending = PendingOp::Idle;
        self.progress = 0.0;
    }
}

impl<K: Ord + Clone + fmt::Debug> BstEngine<K> {
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        node::find(self.root(), key).is_some()
    }

    /// Committed keys in the given order, without animation.
    #[must_use]
    pub fn traversal(&self, order: TraversalOrder) -> Vec<K> {
        node::sequence(self.root(), order)
    }

    /// Request an insert. Empty tree enters `CreatingRoot`; a duplicate value
    /// returns `Ok` with nothing pending (domain no-op).
    pub fn insert(&mut self, value: K) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        match self.root() {
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "orrery::bst", value = ?value, "creating root");
                self.pending = PendingOp::CreatingRoot { value };
            }
            Some(root) => {
                let (path, found) = node::descent_path(Some(root), &value);
                if found {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(target: "orrery::bst", value = ?value, "duplicate insert ignored");
                    return Ok(());
                }
                // The path is never empty here: the tree has a root.
                let parent_key = path[path.len() - 1].clone();
                let side = if value < parent_key {
                    Side::Left
                } else {
                    Side::Right
                };
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    target: "orrery::bst",
                    value = ?value,
                    depth = path.len(),
                    "insert requested"
                );
                self.pending = PendingOp::Inserting {
                    value,
                    path,
                    parent_key,
                    side,
                };
            }
        }
        Ok(())
    }

    /// Request a search. The terminal found/not-found tag appears only at
    /// commit; until then consumers read `Searching` plus [`search_cursor`].
    ///
    /// [`search_cursor`]: Self::search_cursor
    pub fn search(&mut self, target: K) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        let (path, _found) = node::descent_path(self.root(), &target);
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "orrery::bst", target = ?target, depth = path.len(), "search requested");
        self.pending = PendingOp::Searching { target, path };
        Ok(())
    }

    /// Request a delete. The case (and two-child replacement) is classified
    /// now so the animation can show it before any mutation. An absent
    /// target pends with a zero-length path and commits as a no-op.
    pub fn delete(&mut self, target: K) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        let (path, found) = node::descent_path(self.root(), &target);
        let case = match node::find(self.root(), &target) {
            None => DeleteCase::NotFound,
            Some(n) => match (n.left(), n.right()) {
                (None, None) => DeleteCase::NoChildren,
                (Some(_), Some(right)) => DeleteCase::TwoChildren {
                    replacement: node::min_key(right).clone(),
                },
                _ => DeleteCase::OneChild,
            },
        };
        let path = if found { path } else { Vec::new() };
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "orrery::bst", target = ?target, case = ?case, "delete requested");
        self.pending = PendingOp::Deleting { target, path, case };
        Ok(())
    }

    /// Request a traversal animation. Never mutates; commit just clears.
    pub fn traverse(&mut self, order: TraversalOrder) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        let sequence = node::sequence(self.root(), order);
        self.pending = PendingOp::Traversing {
            order,
            sequence,
            cursor: 0,
        };
        Ok(())
    }

    /// Drop the whole tree. Requires nothing in flight.
    pub fn clear(&mut self) -> Result<()> {
        if self.pending.in_flight() {
            return Err(EngineError::PendingInFlight { action: "clear" });
        }
        self.root = None;
        self.open_request();
        Ok(())
    }

    /// Refuse further operations. Requires nothing in flight.
    pub fn deactivate(&mut self) -> Result<()> {
        if self.pending.in_flight() {
            return Err(EngineError::PendingInFlight { action: "deactivate" });
        }
        self.active = false;
        self.open_request();
        Ok(())
    }

    /// Current element of an in-flight search: the path entry progress has
    /// reached, plus the live target-vs-cursor comparison.
    #[must_use]
    pub fn search_cursor(&self) -> Option<(&K, Comparison)> {
        match &self.pending {
            PendingOp::Searching { target, path } if !path.is_empty() => {
                let key = &path[cursor_index(self.progress, path.len())];
                Some((key, Comparison::of(target.cmp(key))))
            }
            _ => None,
        }
    }

    /// Current element of an in-flight insert descent, with the comparison
    /// that chose the next branch.
    #[must_use]
    pub fn insert_cursor(&self) -> Option<(&K, Comparison)> {
        match &self.pending {
            PendingOp::Inserting { value, path, .. } if !path.is_empty() => {
                let key = &path[cursor_index(self.progress, path.len())];
                Some((key, Comparison::of(value.cmp(key))))
            }
            _ => None,
        }
    }

    /// Visited prefix of an in-flight traversal (through the cursor).
    #[must_use]
    pub fn visited_prefix(&self) -> Option<&[K]> {
        match &self.pending {
            PendingOp::Traversing {
                sequence, cursor, ..
            } => {
                if sequence.is_empty() {
                    Some(&[])
                } else {
                    Some(&sequence[..=*cursor])
                }
            }
            _ => None,
        }
    }

    fn insert_rec(link: Option<Box<BstNode<K>>>, value: K) -> Box<BstNode<K>> {
        match link {
            None => Box::new(BstNode::new(value)),
            Some(mut n) => {
                match value.cmp(&n.key) {
                    std::cmp::Ordering::Less => {
                        n.left = Some(Self::insert_rec(n.left.take(), value));
                    }
                    std::cmp::Ordering::Greater => {
                        n.right = Some(Self::insert_rec(n.right.take(), value));
                    }
                    std::cmp::Ordering::Equal => {}
                }
                n
            }
        }
    }

    fn delete_rec(link: Option<Box<BstNode<K>>>, target: &K) -> Option<Box<BstNode<K>>> {
        let mut n = link?;
        match target.cmp(&n.key) {
            std::cmp::Ordering::Less => {
                n.left = Self::delete_rec(n.left.take(), target);
                Some(n)
            }
            std::cmp::Ordering::Greater => {
                n.right = Self::delete_rec(n.right.take(), target);
                Some(n)
            }
            std::cmp::Ordering::Equal => match (n.left.take(), n.right.take()) {
                (None, None) => None,
                (Some(l), None) => Some(l),
                (None, Some(r)) => Some(r),
                (Some(l), Some(r)) => {
                    // Two children: adopt the in-order successor's key, then
                    // delete that key from the right subtree.
                    let successor = node::min_key(r.as_ref()).clone();
                    n.key = successor.clone();
                    n.left = Some(l);
                    n.right = Self::delete_rec(Some(r), &successor);
                    Some(n)
                }
            },
        }
    }
}

impl<K: Ord + Clone + fmt::Debug> Animated for BstEngine<K> {
    type Request = BstRequest<K>;

    fn begin(&mut self, request: BstRequest<K>) -> Result<()> {
        match request {
            BstRequest::Insert(value) => self.insert(value),
            BstRequest::Search(target) => self.search(target),
            BstRequest::Delete(target) => self.delete(target),
            BstRequest::Traverse(order) => self.traverse(order),
        }
    }

    fn classify(request: &BstRequest<K>) -> OpKind {
        match request {
            BstRequest::Insert(_) | BstRequest::Delete(_) => OpKind::Mutate,
            BstRequest::Search(_) => OpKind::Search,
            BstRequest::Traverse(_) => OpKind::Traverse,
        }
    }

    fn set_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
        if let PendingOp::Traversing {
            sequence, cursor, ..
        } = &mut self.pending
        {
            *cursor = cursor_index(self.progress, sequence.len());
        }
    }

    fn commit(&mut self) {
        if !self.pending.in_flight() {
            return;
        }
        let op = std::mem::take(&mut self.pending);
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "orrery::bst", op = op.label(), "commit");
        match op {
            PendingOp::CreatingRoot { value } => {
                self.root = Some(Box::new(BstNode::new(value)));
            }
            PendingOp::Inserting { value, .. } => {
                self.root = Some(Self::insert_rec(self.root.take(), value));
            }
            PendingOp::Searching { target, path } => {
                self.pending = if self.contains(&target) {
                    PendingOp::SearchFound { node_key: target }
                } else {
                    PendingOp::SearchNotFound {
                        last_key: path.last().cloned(),
                    }
                };
            }
            PendingOp::Deleting { target, case, .. } => {
                if case != DeleteCase::NotFound {
                    self.root = Self::delete_rec(self.root.take(), &target);
                }
            }
            PendingOp::Traversing { .. } => {}
            PendingOp::Idle | PendingOp::SearchFound { .. } | PendingOp::SearchNotFound { .. } => {}
        }
        self.progress = 0.0;
    }

    fn cancel(&mut self) {
        #[cfg(feature = "tracing")]
        if self.pending.in_flight() {
            tracing::debug!(target: "orrery::bst", op = self.pending.label(), "cancelled");
        }
        self.open_request();
    }

    fn is_idle(&self) -> bool {
        self.pending.accepts_request()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(values: &[i32]) -> BstEngine<i32> {
        let mut e = BstEngine::new();
        e.activate();
        for &v in values {
            e.insert(v).unwrap();
            e.set_progress(1.0);
            e.commit();
        }
        e
    }

    // ── Activation and preconditions ────────────────────────────────────

    #[test]
    fn operations_require_activation() {
        let mut e: BstEngine<i32> = BstEngine::new();
        assert!(matches!(e.insert(1), Err(EngineError::NotActivated)));
        assert!(matches!(e.search(1), Err(EngineError::NotActivated)));
        e.activate();
        assert!(e.insert(1).is_ok());
    }

    #[test]
    fn request_while_pending_fails_fast_and_changes_nothing() {
        let mut e = engine_with(&[10]);
        e.insert(5).unwrap();
        let before = e.pending().clone();
        let err = e.insert(7).unwrap_err();
        assert!(matches!(err, EngineError::Busy { pending: "Inserting" }));
        assert_eq!(*e.pending(), before);
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![10]);
    }

    // ── Insert ──────────────────────────────────────────────────────────

    #[test]
    fn first_insert_enters_creating_root() {
        let mut e: BstEngine<i32> = BstEngine::new();
        e.activate();
        e.insert(50).unwrap();
        assert_eq!(*e.pending(), PendingOp::CreatingRoot { value: 50 });
        assert!(e.is_empty());
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![50]);
        assert_eq!(*e.pending(), PendingOp::Idle);
    }

    #[test]
    fn insert_records_path_parent_and_side() {
        let mut e = engine_with(&[50, 30, 70]);
        e.insert(40).unwrap();
        match e.pending() {
            PendingOp::Inserting {
                value,
                path,
                parent_key,
                side,
            } => {
                assert_eq!(*value, 40);
                assert_eq!(*path, vec![50, 30]);
                assert_eq!(*parent_key, 30);
                assert_eq!(*side, Side::Right);
            }
            other => panic!("expected Inserting, got {other:?}"),
        }
    }

    #[test]
    fn tree_shape_is_untouched_until_commit() {
        let mut e = engine_with(&[50, 30, 70]);
        let before = e.traversal(TraversalOrder::Levelorder);
        e.insert(40).unwrap();
        for step in 0..=9 {
            e.set_progress(f64::from(step) / 10.0);
            assert_eq!(e.traversal(TraversalOrder::Levelorder), before);
        }
        e.set_progress(1.0);
        // Still untouched: mutation happens at commit, not at progress 1.0.
        assert_eq!(e.traversal(TraversalOrder::Levelorder), before);
        e.commit();
        assert_eq!(
            e.traversal(TraversalOrder::Levelorder),
            vec![50, 30, 70, 40]
        );
    }

    #[test]
    fn duplicate_insert_is_a_noop_not_an_error() {
        let mut e = engine_with(&[50, 30]);
        assert!(e.insert(30).is_ok());
        assert_eq!(*e.pending(), PendingOp::Idle);
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn insert_cursor_walks_the_path_with_comparisons() {
        let mut e = engine_with(&[50, 30, 70]);
        e.insert(40).unwrap();
        e.set_progress(0.0);
        assert_eq!(e.insert_cursor(), Some((&50, Comparison::Less)));
        e.set_progress(0.6);
        assert_eq!(e.insert_cursor(), Some((&30, Comparison::Greater)));
    }

    // ── Search ──────────────────────────────────────────────────────────

    #[test]
    fn search_tags_found_only_at_commit() {
        let mut e = engine_with(&[50, 30, 70, 20]);
        e.search(20).unwrap();
        match e.pending() {
            PendingOp::Searching { target, path } => {
                assert_eq!(*target, 20);
                assert_eq!(*path, vec![50, 30, 20]);
            }
            other => panic!("expected Searching, got {other:?}"),
        }
        e.set_progress(0.99);
        assert!(matches!(e.pending(), PendingOp::Searching { .. }));
        e.set_progress(1.0);
        e.commit();
        assert_eq!(*e.pending(), PendingOp::SearchFound { node_key: 20 });
    }

    #[test]
    fn search_cursor_steps_through_the_path() {
        let mut e = engine_with(&[50, 30, 70, 20]);
        e.search(20).unwrap();
        e.set_progress(0.0);
        assert_eq!(e.search_cursor(), Some((&50, Comparison::Less)));
        e.set_progress(0.5);
        assert_eq!(e.search_cursor(), Some((&30, Comparison::Less)));
        e.set_progress(0.9);
        assert_eq!(e.search_cursor(), Some((&20, Comparison::Equal)));
    }

    #[test]
    fn absent_search_reports_last_visited_key() {
        let mut e = engine_with(&[50, 30, 70, 20, 40, 60, 80]);
        e.search(90).unwrap();
        e.set_progress(1.0);
        e.commit();
        assert_eq!(
            *e.pending(),
            PendingOp::SearchNotFound { last_key: Some(80) }
        );
    }

    #[test]
    fn search_on_empty_tree_terminates_not_found() {
        let mut e: BstEngine<i32> = BstEngine::new();
        e.activate();
        e.search(1).unwrap();
        assert!(e.search_cursor().is_none());
        e.set_progress(1.0);
        e.commit();
        assert_eq!(*e.pending(), PendingOp::SearchNotFound { last_key: None });
    }

    #[test]
    fn terminal_residue_accepts_the_next_request() {
        let mut e = engine_with(&[10]);
        e.search(10).unwrap();
        e.set_progress(1.0);
        e.commit();
        assert!(e.is_idle());
        assert!(e.insert(5).is_ok());
        assert!(matches!(e.pending(), PendingOp::Inserting { .. }));
    }

    // ── Delete ──────────────────────────────────────────────────────────

    #[test]
    fn delete_leaf_classifies_no_children() {
        let mut e = engine_with(&[50, 30, 70]);
        e.delete(30).unwrap();
        match e.pending() {
            PendingOp::Deleting { path, case, .. } => {
                assert_eq!(*path, vec![50, 30]);
                assert_eq!(*case, DeleteCase::NoChildren);
            }
            other => panic!("expected Deleting, got {other:?}"),
        }
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![50, 70]);
    }

    #[test]
    fn delete_one_child_promotes_it() {
        let mut e = engine_with(&[50, 30, 20]);
        e.delete(30).unwrap();
        assert!(matches!(
            e.pending(),
            PendingOp::Deleting {
                case: DeleteCase::OneChild,
                ..
            }
        ));
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.traversal(TraversalOrder::Levelorder), vec![50, 20]);
    }

    #[test]
    fn delete_two_children_names_successor_at_request_time() {
        let mut e = engine_with(&[50, 30, 70, 60, 80]);
        e.delete(50).unwrap();
        match e.pending() {
            PendingOp::Deleting { case, .. } => {
                assert_eq!(*case, DeleteCase::TwoChildren { replacement: 60 });
            }
            other => panic!("expected Deleting, got {other:?}"),
        }
        e.set_progress(1.0);
        e.commit();
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![30, 60, 70, 80]);
        assert_eq!(e.traversal(TraversalOrder::Levelorder), vec![60, 30, 70, 80]);
    }

    #[test]
    fn delete_absent_value_pends_with_empty_path_and_commits_nothing() {
        let mut e = engine_with(&[50, 30]);
        e.delete(99).unwrap();
        match e.pending() {
            PendingOp::Deleting { path, case, .. } => {
                assert!(path.is_empty());
                assert_eq!(*case, DeleteCase::NotFound);
            }
            other => panic!("expected Deleting, got {other:?}"),
        }
        e.set_progress(1.0);
        e.commit();
        assert_eq!(*e.pending(), PendingOp::Idle);
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![30, 50]);
    }

    #[test]
    fn delete_root_of_singleton_empties_the_tree() {
        let mut e = engine_with(&[7]);
        e.delete(7).unwrap();
        e.set_progress(1.0);
        e.commit();
        assert!(e.is_empty());
    }

    // ── Traversal ───────────────────────────────────────────────────────

    #[test]
    fn traversal_prefix_grows_with_progress() {
        let mut e = engine_with(&[50, 30, 70, 20]);
        e.traverse(TraversalOrder::Inorder).unwrap();
        e.set_progress(0.0);
        assert_eq!(e.visited_prefix(), Some(&[20][..]));
        e.set_progress(0.25);
        assert_eq!(e.visited_prefix(), Some(&[20, 30][..]));
        e.set_progress(0.5);
        assert_eq!(e.visited_prefix(), Some(&[20, 30, 50][..]));
        e.set_progress(1.0);
        assert_eq!(e.visited_prefix(), Some(&[20, 30, 50, 70][..]));
        e.commit();
        assert_eq!(*e.pending(), PendingOp::Idle);
        assert_eq!(e.len(), 4);
    }

    #[test]
    fn traversal_of_empty_tree_is_inert() {
        let mut e: BstEngine<i32> = BstEngine::new();
        e.activate();
        e.traverse(TraversalOrder::Levelorder).unwrap();
        assert_eq!(e.visited_prefix(), Some(&[][..]));
        e.set_progress(1.0);
        e.commit();
        assert_eq!(*e.pending(), PendingOp::Idle);
    }

    // ── Cancel, clear, deactivate ───────────────────────────────────────

    #[test]
    fn cancel_discards_pending_without_touching_the_tree() {
        let mut e = engine_with(&[50, 30]);
        e.insert(40).unwrap();
        e.set_progress(0.7);
        e.cancel();
        assert_eq!(*e.pending(), PendingOp::Idle);
        assert_eq!(e.progress(), 0.0);
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![30, 50]);
    }

    #[test]
    fn clear_refused_mid_flight_allowed_when_idle() {
        let mut e = engine_with(&[1, 2, 3]);
        e.search(2).unwrap();
        assert!(matches!(
            e.clear(),
            Err(EngineError::PendingInFlight { action: "clear" })
        ));
        e.cancel();
        e.clear().unwrap();
        assert!(e.is_empty());
        assert!(e.is_active());
    }

    #[test]
    fn deactivate_refused_mid_flight() {
        let mut e = engine_with(&[1]);
        e.traverse(TraversalOrder::Preorder).unwrap();
        assert!(e.deactivate().is_err());
        e.cancel();
        e.deactivate().unwrap();
        assert!(matches!(e.insert(9), Err(EngineError::NotActivated)));
    }

    #[test]
    fn commit_without_pending_is_a_noop() {
        let mut e = engine_with(&[4, 2]);
        e.commit();
        assert_eq!(e.traversal(TraversalOrder::Inorder), vec![2, 4]);
    }
}
