#![forbid(unsafe_code)]

//! Plain nested records for saving and loading committed structures.
//!
//! Records carry structural shape only (values, links, heights, frequencies).
//! Animation state is never persisted: snapshotting during an in-flight
//! operation captures the untouched pre-operation shape, and loading always
//! produces an idle, deactivated engine. Loads re-validate every structural
//! invariant, so a corrupt or hand-edited record is rejected instead of
//! poisoning an engine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::avl::AvlEngine;
use crate::bst::BstEngine;
use crate::error::{EngineError, Result};
use crate::huffman::{CodeNode, HuffmanEngine};
use crate::node::{AvlNode, BstNode, TreeNode};

/// Nested shape of a BST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BstRecord<K> {
    pub value: K,
    pub left: Option<Box<BstRecord<K>>>,
    pub right: Option<Box<BstRecord<K>>>,
}

/// Nested shape of an AVL tree, heights included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvlRecord<K> {
    pub value: K,
    pub height: u32,
    pub left: Option<Box<AvlRecord<K>>>,
    pub right: Option<Box<AvlRecord<K>>>,
}

/// Nested shape of a finished Huffman tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuffmanRecord {
    pub freq: u64,
    pub symbol: Option<char>,
    pub left: Option<Box<HuffmanRecord>>,
    pub right: Option<Box<HuffmanRecord>>,
}

impl<K: Clone> BstRecord<K> {
    fn of_node(node: &BstNode<K>) -> Self {
        Self {
            value: node.key().clone(),
            left: node.left().map(|n| Box::new(Self::of_node(n))),
            right: node.right().map(|n| Box::new(Self::of_node(n))),
        }
    }
}

impl<K: Clone> AvlRecord<K> {
    fn of_node(node: &AvlNode<K>) -> Self {
        Self {
            value: node.key().clone(),
            height: node.height(),
            left: node.left().map(|n| Box::new(Self::of_node(n))),
            right: node.right().map(|n| Box::new(Self::of_node(n))),
        }
    }
}

impl HuffmanRecord {
    fn of_node(node: &CodeNode) -> Self {
        Self {
            freq: node.freq(),
            symbol: node.symbol(),
            left: node.left().map(|n| Box::new(Self::of_node(n))),
            right: node.right().map(|n| Box::new(Self::of_node(n))),
        }
    }
}

fn check_bst_order<K: Ord + fmt::Debug>(
    record: &BstRecord<K>,
    lo: Option<&K>,
    hi: Option<&K>,
) -> Result<()> {
    if lo.is_some_and(|lo| record.value <= *lo) || hi.is_some_and(|hi| record.value >= *hi) {
        return Err(EngineError::invalid_record(format!(
            "value {:?} violates strict BST ordering",
            record.value
        )));
    }
    if let Some(left) = record.left.as_deref() {
        check_bst_order(left, lo, Some(&record.value))?;
    }
    if let Some(right) = record.right.as_deref() {
        check_bst_order(right, Some(&record.value), hi)?;
    }
    Ok(())
}

/// Ordering, stored heights and the balance bound, in one pass. Returns the
/// subtree height.
fn check_avl<K: Ord + fmt::Debug>(
    record: &AvlRecord<K>,
    lo: Option<&K>,
    hi: Option<&K>,
) -> Result<u32> {
    if lo.is_some_and(|lo| record.value <= *lo) || hi.is_some_and(|hi| record.value >= *hi) {
        return Err(EngineError::invalid_record(format!(
            "value {:?} violates strict BST ordering",
            record.value
        )));
    }
    let left_height = match record.left.as_deref() {
        Some(left) => check_avl(left, lo, Some(&record.value))?,
        None => 0,
    };
    let right_height = match record.right.as_deref() {
        Some(right) => check_avl(right, Some(&record.value), hi)?,
        None => 0,
    };
    let computed = 1 + left_height.max(right_height);
    if record.height != computed {
        return Err(EngineError::invalid_record(format!(
            "stored height {} at {:?} should be {computed}",
            record.height, record.value
        )));
    }
    let balance = i64::from(left_height) - i64::from(right_height);
    if balance.abs() > 1 {
        return Err(EngineError::invalid_record(format!(
            "node {:?} has balance factor {balance}",
            record.value
        )));
    }
    Ok(computed)
}

fn check_huffman(record: &HuffmanRecord, seen: &mut BTreeSet<char>) -> Result<()> {
    match (
        record.left.as_deref(),
        record.right.as_deref(),
        record.symbol,
    ) {
        (None, None, Some(symbol)) => {
            if record.freq == 0 {
                return Err(EngineError::ZeroFrequency { symbol });
            }
            if !seen.insert(symbol) {
                return Err(EngineError::DuplicateSymbol { symbol });
            }
            Ok(())
        }
        (Some(left), Some(right), None) => {
            if record.freq != left.freq + right.freq {
                return Err(EngineError::invalid_record(format!(
                    "fragment frequency {} is not {} + {}",
                    record.freq, left.freq, right.freq
                )));
            }
            check_huffman(left, seen)?;
            check_huffman(right, seen)
        }
        _ => Err(EngineError::invalid_record(
            "fragment must be a symbol leaf or have exactly two children".to_string(),
        )),
    }
}

fn build_bst<K>(record: BstRecord<K>) -> Box<BstNode<K>> {
    let mut node = Box::new(BstNode::new(record.value));
    node.left = record.left.map(|child| build_bst(*child));
    node.right = record.right.map(|child| build_bst(*child));
    node
}

fn build_avl<K>(record: AvlRecord<K>) -> Box<AvlNode<K>> {
    let mut node = Box::new(AvlNode::new(record.value));
    node.height = record.height;
    node.left = record.left.map(|child| build_avl(*child));
    node.right = record.right.map(|child| build_avl(*child));
    node
}

fn build_code(record: HuffmanRecord) -> Box<CodeNode> {
    Box::new(CodeNode {
        freq: record.freq,
        symbol: record.symbol,
        left: record.left.map(|child| build_code(*child)),
        right: record.right.map(|child| build_code(*child)),
    })
}

impl<K: Ord + Clone + fmt::Debug> BstEngine<K> {
    /// Snapshot the committed shape. Safe mid-animation: the deferred window
    /// guarantees the shape is the pre-operation one.
    #[must_use]
    pub fn to_record(&self) -> Option<BstRecord<K>> {
        self.root().map(BstRecord::of_node)
    }

    /// Rebuild an engine from a record. The result is idle and deactivated.
    pub fn from_record(record: Option<BstRecord<K>>) -> Result<Self> {
        let root = match record {
            None => None,
            Some(record) => {
                check_bst_order(&record, None, None)?;
                Some(build_bst(record))
            }
        };
        Ok(Self::from_root(root))
    }
}

impl<K: Ord + Clone + fmt::Debug> AvlEngine<K> {
    /// Snapshot the committed shape, stored heights included.
    #[must_use]
    pub fn to_record(&self) -> Option<AvlRecord<K>> {
        self.root().map(AvlRecord::of_node)
    }

    /// Rebuild an engine from a record. The result is idle and deactivated.
    pub fn from_record(record: Option<AvlRecord<K>>) -> Result<Self> {
        let root = match record {
            None => None,
            Some(record) => {
                check_avl(&record, None, None)?;
                Some(build_avl(record))
            }
        };
        Ok(Self::from_root(root))
    }
}

impl HuffmanEngine {
    /// Snapshot the finished tree. Mid-construction state is not
    /// persistable.
    pub fn to_record(&self) -> Result<Option<HuffmanRecord>> {
        if !self.is_done() {
            return Err(EngineError::CodecNotReady {
                remaining: self.rounds_total() - self.rounds_done(),
            });
        }
        Ok(self.root().map(HuffmanRecord::of_node))
    }

    /// Rebuild a finished engine from a record. The result is idle and
    /// deactivated, with the code table immediately available.
    pub fn from_record(record: Option<HuffmanRecord>) -> Result<Self> {
        let root = match record {
            None => None,
            Some(record) => {
                let mut seen = BTreeSet::new();
                check_huffman(&record, &mut seen)?;
                Some(build_code(record))
            }
        };
        Ok(Self::from_finished_root(root))
    }
}
