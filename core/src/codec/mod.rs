//! Operation codec
//!
//! `decode` turns a native transaction into ordered Rosetta operations plus
//! transaction metadata; `encode` rebuilds the native transaction from an
//! operation list and metadata. Both dispatch once over [`NativeTx`].
//!
//! Conventions shared by every kind: debits are negative, credits positive,
//! fees negative against the payer. Legs follow input, output, fee order and
//! within a party THETA comes before TFUEL.

mod decode;
mod encode;
pub mod metadata;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::coins::wei;
use crate::operation::{Metadata, Operation};
use crate::primitives::{flex_u64, Address};

pub use decode::{decode, decode_stake_return};
pub use encode::encode;

/// Per-account balance delta reported by the node for a contract call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    #[serde(alias = "Address")]
    pub address: Address,
    /// 0 = THETA, 1 = TFUEL, anything above is a token the gateway ignores
    #[serde(alias = "TokenType", default, with = "flex_u64")]
    pub token_type: u64,
    #[serde(alias = "IsNegative", default)]
    pub is_negative: bool,
    #[serde(alias = "Delta", default, with = "wei")]
    pub delta: BigUint,
}

/// Block-level facts the codec needs alongside the transaction itself
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext<'a> {
    /// Status stamped on every operation
    pub status: Option<&'a str>,
    pub gas_used: u64,
    /// Contract-call balance changes. `None` selects the construction view
    /// of a contract call (nominal from/to amounts).
    pub balance_changes: Option<&'a [BalanceChange]>,
}

impl<'a> DecodeContext<'a> {
    /// Context for transactions that are not (yet) part of a block
    pub fn construction() -> Self {
        Self::default()
    }

    pub fn in_block(
        status: &'a str,
        gas_used: u64,
        balance_changes: &'a [BalanceChange],
    ) -> Self {
        Self {
            status: Some(status),
            gas_used,
            balance_changes: Some(balance_changes),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTx {
    pub metadata: Metadata,
    pub operations: Vec<Operation>,
}
