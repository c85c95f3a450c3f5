#![forbid(unsafe_code)]

//! Error taxonomy for the animation engines.
//!
//! Domain no-ops (inserting a duplicate, searching or deleting an absent
//! value) are *not* errors; they surface through terminal pending states.
//! Everything here is a real refusal: the request was rejected before any
//! pending operation was created, and no engine state changed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A new operation was requested while another is still pending.
    #[error("operation already pending: {pending}")]
    Busy { pending: &'static str },

    /// The structure has not been activated yet.
    #[error("structure not activated")]
    NotActivated,

    /// The structure cannot be deactivated or cleared mid-animation.
    #[error("cannot {action} while an operation is pending")]
    PendingInFlight { action: &'static str },

    /// A Huffman symbol was supplied with a zero frequency.
    #[error("zero frequency for symbol {symbol:?}")]
    ZeroFrequency { symbol: char },

    /// The same Huffman symbol appeared twice in one build request.
    #[error("duplicate symbol {symbol:?} in frequency set")]
    DuplicateSymbol { symbol: char },

    /// Encode/decode was called before the Huffman build reached `Done`.
    #[error("codec not ready: {remaining} merge round(s) remaining")]
    CodecNotReady { remaining: usize },

    /// Encoding hit a symbol with no code in the table.
    #[error("unknown symbol {symbol:?}")]
    UnknownSymbol { symbol: char },

    /// Decoding hit a character outside `0`/`1` or ran out of tree mid-code.
    #[error("corrupt bitstring at offset {offset}")]
    CorruptBits { offset: usize },

    /// A persisted record violated the structural invariants on load.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// A configuration value was out of range.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl EngineError {
    #[must_use]
    pub fn busy(pending: &'static str) -> Self {
        Self::Busy { pending }
    }

    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
