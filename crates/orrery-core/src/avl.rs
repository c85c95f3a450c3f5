#![forbid(unsafe_code)]

//! Deferred-mutation AVL engine: BST semantics plus height bookkeeping,
//! balance-factor evaluation and shadow-tree rotation planning.
//!
//! An insert is animated in four phases mapped from progress by fixed
//! boundaries (see [`AvlPhaseConfig`]):
//!
//! 1. **Descent**: the BST-style walk to the insertion point.
//! 2. **Balance check**: a cursor walks the descent path bottom-up
//!    (pending value first) reading balance factors off the *pre-mutation*
//!    tree. The new node does not exist yet, so its entry reads 0 and its
//!    ancestors still show their pre-insert factors. That is deliberate;
//!    consumers must not treat these as post-insert values.
//! 3. **Disclosure**: the precomputed [`RotationPlan`] (or none) is the
//!    phase payload; nothing rotates.
//! 4. **Rotation**: plan node identities are exposed so positions can
//!    animate, while the real `rotate_left`/`rotate_right` run only at
//!    commit.
//!
//! The plan comes from a **shadow tree**: a deep clone of the real tree run
//! through the *same* recursive insert/rebalance routine used at commit,
//! instrumented to record the rotation it applies. One routine, two calls;
//! the plan can never drift from the commit.
//!
//! # Invariants
//!
//! - The real tree (links *and* cached heights) is untouched during the
//!   whole pending window.
//! - After every commit, every node satisfies `|balance| <= 1`.
//! - The disclosed plan always matches the rotation the commit performs.

use std::fmt;

use crate::error::{EngineError, Result};
use crate::node::{self, AvlNode, TraversalOrder, TreeNode};
use crate::pending::{Comparison, PendingOp, Side, cursor_index};
use crate::sequencer::{Animated, OpKind};

/// The four classic AVL rebalance cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotationKind {
    /// Left-left: single right rotation at the pivot.
    LL,
    /// Right-right: single left rotation at the pivot.
    RR,
    /// Left-right: rotate the left child left, then the pivot right.
    LR,
    /// Right-left: rotate the right child right, then the pivot left.
    RL,
}

/// Precomputed rotation for one insert: which case fires and which nodes
/// take part. `pivot_key` is the imbalanced node, `child_key` the child that
/// rises (for the single rotations it becomes the subtree root), and
/// `grandchild_key` the node that ends on top in the double rotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan<K> {
    pub kind: RotationKind,
    pub pivot_key: K,
    pub child_key: K,
    pub grandchild_key: Option<K>,
}

/// Phase of an in-flight AVL insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvlInsertPhase {
    Descent,
    BalanceCheck,
    Disclosure,
    Rotation,
}

/// Progress boundaries separating the four insert phases.
///
/// `descent_end < check_end < disclose_end <= 1.0`, all within `(0, 1]`.
/// The fourth phase runs from `disclose_end` to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvlPhaseConfig {
    pub descent_end: f64,
    pub check_end: f64,
    pub disclose_end: f64,
}

impl Default for AvlPhaseConfig {
    fn default() -> Self {
        Self {
            descent_end: 0.35,
            check_end: 0.75,
            disclose_end: 0.85,
        }
    }
}

impl AvlPhaseConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn descent_end(mut self, boundary: f64) -> Self {
        self.descent_end = boundary;
        self
    }

    #[must_use]
    pub fn check_end(mut self, boundary: f64) -> Self {
        self.check_end = boundary;
        self
    }

    #[must_use]
    pub fn disclose_end(mut self, boundary: f64) -> Self {
        self.disclose_end = boundary;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ascending = 0.0 < self.descent_end
            && self.descent_end < self.check_end
            && self.check_end < self.disclose_end
            && self.disclose_end <= 1.0;
        if ascending {
            Ok(())
        } else {
            Err(EngineError::invalid_config(format!(
                "phase boundaries must ascend within (0, 1]: {:?} < {:?} < {:?}",
                self.descent_end, self.check_end, self.disclose_end
            )))
        }
    }

    /// Phase a progress value falls into.
    #[must_use]
    pub fn phase_at(&self, progress: f64) -> AvlInsertPhase {
        if progress < self.descent_end {
            AvlInsertPhase::Descent
        } else if progress < self.check_end {
            AvlInsertPhase::BalanceCheck
        } else if progress < self.disclose_end {
            AvlInsertPhase::Disclosure
        } else {
            AvlInsertPhase::Rotation
        }
    }
}

/// One animatable AVL operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvlRequest<K> {
    Insert(K),
    Search(K),
    Traverse(TraversalOrder),
}

/// Self-balancing tree with request/commit animation semantics.
///
/// Deletes are not offered; rebalancing is insert-only.
#[derive(Debug, Clone)]
pub struct AvlEngine<K> {
    root: Option<Box<AvlNode<K>>>,
    pending: PendingOp<K>,
    /// Present from insert request to commit; advisory for animation only.
    plan: Option<RotationPlan<K>>,
    /// Descent path reversed with the pending value first; walked in phase 2.
    check_path: Vec<K>,
    phases: AvlPhaseConfig,
    progress: f64,
    active: bool,
}

impl<K> Default for AvlEngine<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> AvlEngine<K> {
    /// A fresh, empty, deactivated engine with default phase boundaries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            pending: PendingOp::Idle,
            plan: None,
            check_path: Vec::new(),
            phases: AvlPhaseConfig::default(),
            progress: 0.0,
            active: false,
        }
    }

    /// A fresh engine with custom phase boundaries.
    pub fn with_phases(phases: AvlPhaseConfig) -> Result<Self> {
        phases.validate()?;
        let mut engine = Self::new();
        engine.phases = phases;
        Ok(engine)
    }

    /// Adopt an already-validated tree, idle and deactivated.
    #[cfg(feature = "state-persistence")]
    pub(crate) fn from_root(root: Option<Box<AvlNode<K>>>) -> Self {
        let mut engine = Self::new();
        engine.root = root;
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
    pub fn pending(&self) -> &PendingOp<K> {
        &self.pending
    }

    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[inline]
    #[must_use]
    pub fn phases(&self) -> &AvlPhaseConfig {
        &self.phases
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&AvlNode<K>> {
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

    /// Cached height of the committed tree (empty = 0).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.root.as_deref().map_or(0, AvlNode::height)
    }

    /// The precomputed rotation for the in-flight insert, if any imbalance
    /// will occur. `None` also while idle.
    #[inline]
    #[must_use]
    pub fn rotation_plan(&self) -> Option<&RotationPlan<K>> {
        self.plan.as_ref()
    }

    /// Phase of the in-flight insert, `None` for other pending states.
    #[must_use]
    pub fn phase(&self) -> Option<AvlInsertPhase> {
        match self.pending {
            PendingOp::CreatingRoot { .. } | PendingOp::Inserting { .. } => {
                Some(self.phases.phase_at(self.progress))
            }
            _ => None,
        }
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

    fn open_request(&mut self) {
        self.pending = PendingOp::Idle;
        self.plan = None;
        self.check_path.clear();
        self.progress = 0.0;
    }
}

impl<K: Ord + Clone + fmt::Debug> AvlEngine<K> {
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        node::find(self.root(), key).is_some()
    }

    /// Committed keys in the given order, without animation.
    #[must_use]
    pub fn traversal(&self, order: TraversalOrder) -> Vec<K> {
        node::sequence(self.root(), order)
    }

    /// Balance factor of a committed node, `None` when the key is absent.
    #[must_use]
    pub fn balance_factor(&self, key: &K) -> Option<i32> {
        node::find(self.root(), key).map(AvlNode::balance)
    }

    /// Request an insert. Computes the descent path, the bottom-up check
    /// path and the rotation plan now; mutates nothing until commit.
    pub fn insert(&mut self, value: K) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        match self.root() {
            None => {
                self.check_path.push(value.clone());
                self.pending = PendingOp::CreatingRoot { value };
            }
            Some(root) => {
                let (path, found) = node::descent_path(Some(root), &value);
                if found {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(target: "orrery::avl", value = ?value, "duplicate insert ignored");
                    return Ok(());
                }
                self.plan = self.plan_rotation(&value);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    target: "orrery::avl",
                    value = ?value,
                    depth = path.len(),
                    plan = ?self.plan,
                    "insert requested"
                );
                self.check_path.push(value.clone());
                for key in path.iter().rev() {
                    self.check_path.push(key.clone());
                }
                let parent_key = path[path.len() - 1].clone();
                let side = if value < parent_key {
                    Side::Left
                } else {
                    Side::Right
                };
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

    /// Request a search; identical semantics to the BST engine.
    pub fn search(&mut self, target: K) -> Result<()> {
        self.ensure_ready()?;
        self.open_request();
        let (path, _found) = node::descent_path(self.root(), &target);
        self.pending = PendingOp::Searching { target, path };
        Ok(())
    }

    /// Request a traversal animation. Never mutates.
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

    /// Descent cursor during phase 1, with the live comparison. The cursor
    /// position scales with progress *within* the phase.
    #[must_use]
    pub fn insert_cursor(&self) -> Option<(&K, Comparison)> {
        if self.phase() != Some(AvlInsertPhase::Descent) {
            return None;
        }
        match &self.pending {
            PendingOp::Inserting { value, path, .. } if !path.is_empty() => {
                let local = self.progress / self.phases.descent_end;
                let key = &path[cursor_index(local, path.len())];
                Some((key, Comparison::of(value.cmp(key))))
            }
            _ => None,
        }
    }

    /// Balance-check cursor during phase 2: walks the descent path in
    /// reverse starting at the pending value, reporting each key's balance
    /// factor on the pre-mutation tree (an absent key reads 0).
    #[must_use]
    pub fn check_cursor(&self) -> Option<(&K, i32)> {
        if self.phase() != Some(AvlInsertPhase::BalanceCheck) || self.check_path.is_empty() {
            return None;
        }
        let span = self.phases.check_end - self.phases.descent_end;
        let local = (self.progress - self.phases.descent_end) / span;
        let key = &self.check_path[cursor_index(local, self.check_path.len())];
        Some((key, self.balance_factor(key).unwrap_or(0)))
    }

    /// Search cursor, as in the BST engine.
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

    /// Visited prefix of an in-flight traversal.
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

    /// Run the real insert routine over a disposable clone and capture the
    /// rotation it applies. Same code path as the commit.
    fn plan_rotation(&self, value: &K) -> Option<RotationPlan<K>> {
        let shadow = self.root.clone();
        let mut plan = None;
        let _ = Self::insert_balance(shadow, value.clone(), &mut plan);
        plan
    }

    /// Recursive insert with rebalancing. Used for both shadow planning and
    /// the commit; `plan` records the first rotation applied.
    fn insert_balance(
        link: Option<Box<AvlNode<K>>>,
        value: K,
        plan: &mut Option<RotationPlan<K>>,
    ) -> Box<AvlNode<K>> {
        match link {
            None => Box::new(AvlNode::new(value)),
            Some(mut n) => {
                match value.cmp(&n.key) {
                    std::cmp::Ordering::Less => {
                        n.left = Some(Self::insert_balance(n.left.take(), value, plan));
                    }
                    std::cmp::Ordering::Greater => {
                        n.right = Some(Self::insert_balance(n.right.take(), value, plan));
                    }
                    std::cmp::Ordering::Equal => return n,
                }
                n.recompute_height();
                Self::rebalance(n, plan)
            }
        }
    }

    fn rebalance(mut n: Box<AvlNode<K>>, plan: &mut Option<RotationPlan<K>>) -> Box<AvlNode<K>> {
        let balance = n.balance();
        if balance > 1 {
            let left_balance = n.left.as_deref().map_or(0, AvlNode::balance);
            if left_balance >= 0 {
                Self::record(plan, RotationKind::LL, &n, n.left.as_deref(), None);
                Self::rotate_right(n)
            } else {
                let grandchild = n.left.as_deref().and_then(TreeNode::right);
                Self::record(plan, RotationKind::LR, &n, n.left.as_deref(), grandchild);
                if let Some(l) = n.left.take() {
                    n.left = Some(Self::rotate_left(l));
                }
                Self::rotate_right(n)
            }
        } else if balance < -1 {
            let right_balance = n.right.as_deref().map_or(0, AvlNode::balance);
            if right_balance <= 0 {
                Self::record(plan, RotationKind::RR, &n, n.right.as_deref(), None);
                Self::rotate_left(n)
            } else {
                let grandchild = n.right.as_deref().and_then(TreeNode::left);
                Self::record(plan, RotationKind::RL, &n, n.right.as_deref(), grandchild);
                if let Some(r) = n.right.take() {
                    n.right = Some(Self::rotate_right(r));
                }
                Self::rotate_left(n)
            }
        } else {
            n
        }
    }

    fn record(
        plan: &mut Option<RotationPlan<K>>,
        kind: RotationKind,
        pivot: &AvlNode<K>,
        child: Option<&AvlNode<K>>,
        grandchild: Option<&AvlNode<K>>,
    ) {
        if plan.is_some() {
            return;
        }
        let Some(child) = child else { return };
        *plan = Some(RotationPlan {
            kind,
            pivot_key: pivot.key.clone(),
            child_key: child.key.clone(),
            grandchild_key: grandchild.map(|g| g.key.clone()),
        });
    }

    fn rotate_right(mut n: Box<AvlNode<K>>) -> Box<AvlNode<K>> {
        let Some(mut l) = n.left.take() else {
            return n;
        };
        n.left = l.right.take();
        n.recompute_height();
        l.right = Some(n);
        l.recompute_height();
        l
    }

    fn rotate_left(mut n: Box<AvlNode<K>>) -> Box<AvlNode<K>> {
        let Some(mut r) = n.right.take() else {
            return n;
        };
        n.right = r.left.take();
        n.recompute_height();
        r.left = Some(n);
        r.recompute_height();
        r
    }
}

impl<K: Ord + Clone + fmt::Debug> Animated for AvlEngine<K> {
    type Request = AvlRequest<K>;

    fn begin(&mut self, request: AvlRequest<K>) -> Result<()> {
        match request {
            AvlRequest::Insert(value) => self.insert(value),
            AvlRequest::Search(target) => self.search(target),
            AvlRequest::Traverse(order) => self.traverse(order),
        }
    }

    fn classify(request: &AvlRequest<K>) -> OpKind {
        match request {
            AvlRequest::Insert(_) => OpKind::Mutate,
            AvlRequest::Search(_) => OpKind::Search,
            AvlRequest::Traverse(_) => OpKind::Traverse,
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
        tracing::debug!(target: "orrery::avl", op = op.label(), "commit");
        match op {
            PendingOp::CreatingRoot { value } | PendingOp::Inserting { value, .. } => {
                let planned = self.plan.take();
                let mut applied = None;
                self.root = Some(Self::insert_balance(self.root.take(), value, &mut applied));
                debug_assert_eq!(applied, planned, "shadow plan diverged from commit");
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
            PendingOp::Traversing { .. }
            | PendingOp::Deleting { .. }
            | PendingOp::Idle
            | PendingOp::SearchFound { .. }
            | PendingOp::SearchNotFound { .. } => {}
        }
        self.check_path.clear();
        self.progress = 0.0;
    }

    fn cancel(&mut self) {
        #[cfg(feature = "tracing")]
        if self.pending.in_flight() {
            tracing::debug!(target: "orrery::avl", op = self.pending.label(), "cancelled");
        }
        self.open_request();
    }

    fn is_idle(&self) -> bool {
        self.pending.accepts_request()
    }
}
