//! Service layer for business logic
//!
//! Each Rosetta API group has a service that owns the node client and
//! ledger handles it needs. Services never touch HTTP types, so they are
//! driven directly in tests.

pub mod account;
pub mod block;
pub mod construction;
pub mod mempool;
pub mod network;
pub mod stake;

pub use account::AccountService;
pub use block::BlockService;
pub use construction::ConstructionService;
pub use mempool::MempoolService;
pub use network::NetworkService;
pub use stake::StakeService;

use rosetta_core::{DecodedTx, Hash};

use crate::models::{BlockIdentifier, Transaction, TransactionIdentifier};
use crate::{ApiError, ApiResult};

pub(crate) fn block_identifier(height: u64, hash: &Hash) -> BlockIdentifier {
    BlockIdentifier {
        index: height as i64,
        hash: hash.to_hex(),
    }
}

pub(crate) fn transaction(hash: &Hash, decoded: DecodedTx) -> Transaction {
    Transaction {
        transaction_identifier: TransactionIdentifier {
            hash: hash.to_hex(),
        },
        operations: decoded.operations,
        metadata: Some(decoded.metadata),
    }
}

pub(crate) fn parse_hash(s: &str) -> ApiResult<Hash> {
    s.parse()
        .map_err(|_| ApiError::InvalidInputParam(format!("invalid hash {}", s)))
}
