#![forbid(unsafe_code)]

//! Tree node records and the walking seam shared by the BST and AVL engines.
//!
//! Nodes are plain owned records (`Option<Box<_>>` links). The [`TreeNode`]
//! trait is the read-only seam: traversal sequencing, descent paths and
//! lookups are written once against it and work for both node flavors.
//!
//! # Invariants
//!
//! - Strict ordering: every key in `left` is less than the node's key, every
//!   key in `right` greater. No duplicates.
//! - [`AvlNode::height`] equals `1 + max(height(left), height(right))` with a
//!   leaf at 1 and an empty slot contributing 0. Heights are recomputed
//!   bottom-up after every real structural change, never mid-animation.

use std::collections::VecDeque;

/// Order in which a traversal visits nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraversalOrder {
    /// Node, left subtree, right subtree.
    Preorder,
    /// Left subtree, node, right subtree (sorted for a BST).
    #[default]
    Inorder,
    /// Left subtree, right subtree, node.
    Postorder,
    /// Breadth-first, top row to bottom row.
    Levelorder,
}

/// Read-only view of a binary tree node.
///
/// Implemented by both node flavors so the walking helpers below are written
/// once. The trait exposes shape only; mutation stays with the owning engine.
pub trait TreeNode: Sized {
    type Key;

    fn key(&self) -> &Self::Key;
    fn left(&self) -> Option<&Self>;
    fn right(&self) -> Option<&Self>;
}

/// Plain BST node: a key and two owned child links.
#[derive(Debug, Clone)]
pub struct BstNode<K> {
    pub(crate) key: K,
    pub(crate) left: Option<Box<BstNode<K>>>,
    pub(crate) right: Option<Box<BstNode<K>>>,
}

impl<K> BstNode<K> {
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            left: None,
            right: None,
        }
    }
}

impl<K> TreeNode for BstNode<K> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    #[inline]
    fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }
}

/// AVL node: a key, two owned child links and a cached subtree height.
#[derive(Debug, Clone)]
pub struct AvlNode<K> {
    pub(crate) key: K,
    pub(crate) height: u32,
    pub(crate) left: Option<Box<AvlNode<K>>>,
    pub(crate) right: Option<Box<AvlNode<K>>>,
}

impl<K> AvlNode<K> {
    pub(crate) fn new(key: K) -> Self {
        Self {
            key,
            height: 1,
            left: None,
            right: None,
        }
    }

    /// Cached height of this subtree (leaf = 1).
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn link_height(link: &Option<Box<AvlNode<K>>>) -> u32 {
        link.as_deref().map_or(0, |n| n.height)
    }

    /// `height(left) - height(right)` from the cached heights.
    #[must_use]
    pub fn balance(&self) -> i32 {
        Self::link_height(&self.left) as i32 - Self::link_height(&self.right) as i32
    }

    pub(crate) fn recompute_height(&mut self) {
        self.height = 1 + Self::link_height(&self.left).max(Self::link_height(&self.right));
    }
}

impl<K> TreeNode for AvlNode<K> {
    type Key = K;

    #[inline]
    fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    #[inline]
    fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }
}

// ── Walking helpers ─────────────────────────────────────────────────────

/// Keys of the whole tree in the requested order.
#[must_use]
pub fn sequence<N: TreeNode>(root: Option<&N>, order: TraversalOrder) -> Vec<N::Key>
where
    N::Key: Clone,
{
    let mut out = Vec::new();
    match order {
        TraversalOrder::Preorder => preorder(root, &mut out),
        TraversalOrder::Inorder => inorder(root, &mut out),
        TraversalOrder::Postorder => postorder(root, &mut out),
        TraversalOrder::Levelorder => levelorder(root, &mut out),
    }
    out
}

fn preorder<N: TreeNode>(node: Option<&N>, out: &mut Vec<N::Key>)
where
    N::Key: Clone,
{
    if let Some(n) = node {
        out.push(n.key().clone());
        preorder(n.left(), out);
        preorder(n.right(), out);
    }
}

fn inorder<N: TreeNode>(node: Option<&N>, out: &mut Vec<N::Key>)
where
    N::Key: Clone,
{
    if let Some(n) = node {
        inorder(n.left(), out);
        out.push(n.key().clone());
        inorder(n.right(), out);
    }
}

fn postorder<N: TreeNode>(node: Option<&N>, out: &mut Vec<N::Key>)
where
    N::Key: Clone,
{
    if let Some(n) = node {
        postorder(n.left(), out);
        postorder(n.right(), out);
        out.push(n.key().clone());
    }
}

fn levelorder<N: TreeNode>(root: Option<&N>, out: &mut Vec<N::Key>)
where
    N::Key: Clone,
{
    let mut row = VecDeque::new();
    if let Some(n) = root {
        row.push_back(n);
    }
    while let Some(n) = row.pop_front() {
        out.push(n.key().clone());
        if let Some(l) = n.left() {
            row.push_back(l);
        }
        if let Some(r) = n.right() {
            row.push_back(r);
        }
    }
}

/// Locate a key by BST descent.
pub fn find<'a, N: TreeNode>(root: Option<&'a N>, target: &N::Key) -> Option<&'a N>
where
    N::Key: Ord,
{
    let mut cursor = root;
    while let Some(n) = cursor {
        cursor = match target.cmp(n.key()) {
            std::cmp::Ordering::Equal => return Some(n),
            std::cmp::Ordering::Less => n.left(),
            std::cmp::Ordering::Greater => n.right(),
        };
    }
    None
}

/// Keys visited while descending toward `target`, ending at the match or at
/// the last node before a null link. The flag reports whether the final key
/// is the target itself.
#[must_use]
pub fn descent_path<N: TreeNode>(root: Option<&N>, target: &N::Key) -> (Vec<N::Key>, bool)
where
    N::Key: Ord + Clone,
{
    let mut path = Vec::new();
    let mut cursor = root;
    while let Some(n) = cursor {
        path.push(n.key().clone());
        match target.cmp(n.key()) {
            std::cmp::Ordering::Equal => return (path, true),
            std::cmp::Ordering::Less => cursor = n.left(),
            std::cmp::Ordering::Greater => cursor = n.right(),
        }
    }
    (path, false)
}

/// Leftmost key of a subtree (the in-order minimum).
#[must_use]
pub fn min_key<N: TreeNode>(node: &N) -> &N::Key {
    let mut cursor = node;
    while let Some(l) = cursor.left() {
        cursor = l;
    }
    cursor.key()
}

/// Number of nodes in the tree.
#[must_use]
pub fn count<N: TreeNode>(root: Option<&N>) -> usize {
    root.map_or(0, |n| 1 + count(n.left()) + count(n.right()))
}

/// Height computed by walking (empty = 0, leaf = 1). The AVL engine uses the
/// cached [`AvlNode::height`] instead; this is for plain BST queries.
#[must_use]
pub fn computed_height<N: TreeNode>(root: Option<&N>) -> u32 {
    root.map_or(0, |n| {
        1 + computed_height(n.left()).max(computed_height(n.right()))
    })
}
