//! Theta Rosetta Core Library
//!
//! Native Theta transactions, their wire format and the mapping to and from
//! Rosetta operations.

pub mod chain;
pub mod codec;
pub mod coins;
pub mod currency;
pub mod description;
pub mod error;
pub mod operation;
pub mod primitives;
pub mod stake;
pub mod tx;

// Re-export main types
pub use chain::{BlockStatus, StakePurpose, CHAIN_NAME, LOCKING_PERIOD};
pub use codec::{decode, decode_stake_return, encode, BalanceChange, DecodeContext, DecodedTx};
pub use coins::Coins;
pub use currency::{Currency, Denom};
pub use description::{match_operations, validate_send, Matched};
pub use error::{CodecError, CodecResult};
pub use operation::{
    AccountIdentifier, Amount, Metadata, Operation, OperationIdentifier, OperationType,
};
pub use primitives::{Address, Bytes, Hash};
pub use stake::PendingStakeReturn;
pub use tx::{NativeTx, TxKind, WithdrawStakeTx};
