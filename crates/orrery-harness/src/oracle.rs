#![forbid(unsafe_code)]

//! Textbook reference implementations with no animation machinery.
//!
//! These exist so the parity suites have something to disagree with. They
//! share no code with `orrery-core`: plain recursive inserts and deletes,
//! heights recomputed by walking, the Huffman pool re-sorted every round.
//! Slow and obviously correct beats fast here.

use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Clone)]
struct Node {
    key: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

fn leaf(key: i32) -> Option<Box<Node>> {
    Some(Box::new(Node {
        key,
        left: None,
        right: None,
    }))
}

fn level_keys(root: &Option<Box<Node>>) -> Vec<i32> {
    let mut out = Vec::new();
    let mut row: VecDeque<&Node> = root.as_deref().into_iter().collect();
    while let Some(n) = row.pop_front() {
        out.push(n.key);
        if let Some(l) = n.left.as_deref() {
            row.push_back(l);
        }
        if let Some(r) = n.right.as_deref() {
            row.push_back(r);
        }
    }
    out
}

fn inorder_keys(root: &Option<Box<Node>>, out: &mut Vec<i32>) {
    if let Some(n) = root.as_deref() {
        inorder_keys(&n.left, out);
        out.push(n.key);
        inorder_keys(&n.right, out);
    }
}

// ── Plain binary search tree ────────────────────────────────────────────

/// Unbalanced BST with duplicate-ignoring insert and
/// successor-replacement delete.
#[derive(Debug, Clone, Default)]
pub struct BstOracle {
    root: Option<Box<Node>>,
}

impl BstOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: i32) {
        self.root = Self::insert_rec(self.root.take(), key);
    }

    pub fn delete(&mut self, key: i32) {
        self.root = Self::delete_rec(self.root.take(), key);
    }

    #[must_use]
    pub fn levelorder(&self) -> Vec<i32> {
        level_keys(&self.root)
    }

    #[must_use]
    pub fn inorder(&self) -> Vec<i32> {
        let mut out = Vec::new();
        inorder_keys(&self.root, &mut out);
        out
    }

    fn insert_rec(link: Option<Box<Node>>, key: i32) -> Option<Box<Node>> {
        match link {
            None => leaf(key),
            Some(mut n) => {
                if key < n.key {
                    n.left = Self::insert_rec(n.left.take(), key);
                } else if key > n.key {
                    n.right = Self::insert_rec(n.right.take(), key);
                }
                Some(n)
            }
        }
    }

    fn delete_rec(link: Option<Box<Node>>, key: i32) -> Option<Box<Node>> {
        let Some(mut n) = link else { return None };
        if key < n.key {
            n.left = Self::delete_rec(n.left.take(), key);
            return Some(n);
        }
        if key > n.key {
            n.right = Self::delete_rec(n.right.take(), key);
            return Some(n);
        }
        match (n.left.take(), n.right.take()) {
            (None, None) => None,
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (Some(l), Some(r)) => {
                let mut cursor = r.as_ref();
                while let Some(next) = cursor.left.as_deref() {
                    cursor = next;
                }
                let successor = cursor.key;
                n.key = successor;
                n.left = Some(l);
                n.right = Self::delete_rec(Some(r), successor);
                Some(n)
            }
        }
    }
}

// ── AVL tree ────────────────────────────────────────────────────────────

/// The rotation an [`AvlOracle`] insert performed, by case name and the key
/// of the node that was out of balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    pub case: &'static str,
    pub pivot: i32,
}

/// AVL tree that recomputes heights by walking on every balance check.
#[derive(Debug, Clone, Default)]
pub struct AvlOracle {
    root: Option<Box<Node>>,
}

impl AvlOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert and report the rotation performed, if any. At most one
    /// rotation (single or double) per insert.
    pub fn insert(&mut self, key: i32) -> Option<Rotation> {
        let mut rotation = None;
        self.root = Self::insert_rec(self.root.take(), key, &mut rotation);
        rotation
    }

    #[must_use]
    pub fn levelorder(&self) -> Vec<i32> {
        level_keys(&self.root)
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        Self::walk_height(&self.root)
    }

    fn walk_height(link: &Option<Box<Node>>) -> i32 {
        link.as_deref().map_or(0, |n| {
            1 + Self::walk_height(&n.left).max(Self::walk_height(&n.right))
        })
    }

    fn balance(n: &Node) -> i32 {
        Self::walk_height(&n.left) - Self::walk_height(&n.right)
    }

    fn rotate_right(mut n: Box<Node>) -> Box<Node> {
        let Some(mut l) = n.left.take() else { return n };
        n.left = l.right.take();
        l.right = Some(n);
        l
    }

    fn rotate_left(mut n: Box<Node>) -> Box<Node> {
        let Some(mut r) = n.right.take() else { return n };
        n.right = r.left.take();
        r.left = Some(n);
        r
    }

    fn insert_rec(
        link: Option<Box<Node>>,
        key: i32,
        rotation: &mut Option<Rotation>,
    ) -> Option<Box<Node>> {
        let mut n = match link {
            None => return leaf(key),
            Some(mut n) => {
                if key < n.key {
                    n.left = Self::insert_rec(n.left.take(), key, rotation);
                } else if key > n.key {
                    n.right = Self::insert_rec(n.right.take(), key, rotation);
                } else {
                    return Some(n);
                }
                n
            }
        };
        let balance = Self::balance(&n);
        if balance > 1 {
            if n.left.as_deref().map_or(0, Self::balance) >= 0 {
                rotation.get_or_insert(Rotation {
                    case: "LL",
                    pivot: n.key,
                });
                n = Self::rotate_right(n);
            } else {
                rotation.get_or_insert(Rotation {
                    case: "LR",
                    pivot: n.key,
                });
                if let Some(l) = n.left.take() {
                    n.left = Some(Self::rotate_left(l));
                }
                n = Self::rotate_right(n);
            }
        } else if balance < -1 {
            if n.right.as_deref().map_or(0, Self::balance) <= 0 {
                rotation.get_or_insert(Rotation {
                    case: "RR",
                    pivot: n.key,
                });
                n = Self::rotate_left(n);
            } else {
                rotation.get_or_insert(Rotation {
                    case: "RL",
                    pivot: n.key,
                });
                if let Some(r) = n.right.take() {
                    n.right = Some(Self::rotate_right(r));
                }
                n = Self::rotate_left(n);
            }
        }
        Some(n)
    }
}

// ── Huffman code lengths ────────────────────────────────────────────────

/// Code length per symbol for the canonical lowest-two-merge construction,
/// ties broken by arrival order, merged nodes arriving last.
#[must_use]
pub fn huffman_lengths(weights: &[(char, u64)]) -> BTreeMap<char, usize> {
    let mut depth: BTreeMap<char, usize> = weights.iter().map(|&(c, _)| (c, 0)).collect();
    if weights.len() == 1 {
        // A lone symbol still gets one bit.
        depth.insert(weights[0].0, 1);
        return depth;
    }
    let mut pool: Vec<(u64, u64, Vec<char>)> = weights
        .iter()
        .enumerate()
        .map(|(i, &(c, f))| (f, i as u64, vec![c]))
        .collect();
    let mut next_seq = pool.len() as u64;
    while pool.len() > 1 {
        pool.sort_by_key(|&(f, s, _)| (f, s));
        let (f1, _, mut syms) = pool.remove(0);
        let (f2, _, more) = pool.remove(0);
        for c in syms.iter().chain(more.iter()) {
            if let Some(d) = depth.get_mut(c) {
                *d += 1;
            }
        }
        syms.extend(more);
        pool.push((f1 + f2, next_seq, syms));
        next_seq += 1;
    }
    depth
}
