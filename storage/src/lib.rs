//! Theta Rosetta Storage Layer
//!
//! Holds the deferred stake-return ledger: pending principal returns keyed
//! by the block height at which they mature.

pub mod stake_returns;

pub use stake_returns::StakeReturnLedger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No stake returns at height {0}")]
    NotFound(u64),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
