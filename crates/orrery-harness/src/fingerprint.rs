#![forbid(unsafe_code)]

//! Shape fingerprints: canonical JSON hashed with blake3.
//!
//! A fingerprint captures exactly what persistence would save: committed
//! values and links, no animation state. Two engines with the same committed
//! shape fingerprint identically whatever their pending operations, which is
//! what lets the no-early-mutation suites compare one string per sample
//! instead of whole traversals.

use std::fmt;
use std::fmt::Write as _;

use orrery_core::{AvlEngine, BstEngine, HuffmanEngine};
use serde::Serialize;

/// Hex blake3 digest of `text`, prefixed for log readability.
#[must_use]
pub fn fingerprint_text(text: &str) -> String {
    format!("blake3:{}", blake3::hash(text.as_bytes()).to_hex())
}

/// Fingerprint any serializable value via its canonical JSON form.
/// `serde_json` keeps struct fields in declaration order, so equal values
/// always produce equal digests.
#[must_use]
pub fn fingerprint_value<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|error| format!("<unserializable: {error}>"));
    fingerprint_text(&json)
}

/// Committed shape of a BST, pending state excluded.
#[must_use]
pub fn bst_shape<K>(engine: &BstEngine<K>) -> String
where
    K: Ord + Clone + fmt::Debug + Serialize,
{
    fingerprint_value(&engine.to_record())
}

/// Committed shape of an AVL tree, stored heights included.
#[must_use]
pub fn avl_shape<K>(engine: &AvlEngine<K>) -> String
where
    K: Ord + Clone + fmt::Debug + Serialize,
{
    fingerprint_value(&engine.to_record())
}

/// Committed Huffman queue as `(seq, freq, symbol)` triples in queue order.
/// Works mid-construction, where the finished-tree record does not exist
/// yet; the pending round's preview is deliberately not part of the digest.
#[must_use]
pub fn huffman_queue(engine: &HuffmanEngine) -> String {
    let mut canon = String::new();
    for fragment in engine.merge_view().queue_before {
        let _ = write!(
            canon,
            "{}:{}:{};",
            fragment.seq,
            fragment.freq,
            fragment.symbol.map_or('-', |c| c)
        );
    }
    fingerprint_text(&canon)
}
