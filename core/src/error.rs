//! Codec error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid hex data: {0}")]
    InvalidHex(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown transaction type: {0}")]
    UnknownTxType(u64),

    #[error("Unsupported transaction type: {0}")]
    UnsupportedTxType(String),

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Missing metadata field: {0}")]
    MissingMetadata(&'static str),

    #[error("Invalid metadata field {field}: {reason}")]
    InvalidMetadata { field: &'static str, reason: String },

    #[error("Operations do not match {kind}: {reason}")]
    ShapeMismatch { kind: &'static str, reason: String },

    #[error("Operations match no supported transaction: {0}")]
    UnmatchedOperations(String),

    #[error("Malformed transaction json: {0}")]
    Json(String),

    #[error("RLP decoding failed: {0}")]
    Rlp(String),

    #[error("Trailing bytes after transaction: {0}")]
    TrailingBytes(usize),
}

impl From<alloy_rlp::Error> for CodecError {
    fn from(e: alloy_rlp::Error) -> Self {
        CodecError::Rlp(e.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Json(e.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
