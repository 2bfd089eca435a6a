//! Chain parameters and block status

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Blockchain name in every network identifier
pub const CHAIN_NAME: &str = "theta";

/// Blocks between a stake withdrawal and the return of its principal
pub const LOCKING_PERIOD: u64 = 28_800;

/// Height of the June 2021 fee adjustment
pub const FEE_ADJUSTMENT_HEIGHT: u64 = 10_009_000;

const MIN_TX_FEE_TFUEL_WEI: u64 = 1_000_000_000_000;
const MIN_TX_FEE_TFUEL_WEI_JUNE_2021: u64 = 300_000_000_000_000_000;

const MIN_GAS_PRICE: u64 = 100_000_000;
const MIN_GAS_PRICE_JUNE_2021: u64 = 4_000_000_000_000;

const MAX_GAS_LIMIT: u64 = 10_000_000;
const MAX_GAS_LIMIT_JUNE_2021: u64 = 20_000_000;

/// Gas limit used when a contract call carries none
pub const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

/// Minimum fee for a one-to-one send at `height`
pub fn minimum_send_fee(height: u64) -> BigUint {
    if height < FEE_ADJUSTMENT_HEIGHT {
        BigUint::from(MIN_TX_FEE_TFUEL_WEI)
    } else {
        BigUint::from(MIN_TX_FEE_TFUEL_WEI_JUNE_2021)
    }
}

pub fn minimum_gas_price(height: u64) -> BigUint {
    if height < FEE_ADJUSTMENT_HEIGHT {
        BigUint::from(MIN_GAS_PRICE)
    } else {
        BigUint::from(MIN_GAS_PRICE_JUNE_2021)
    }
}

pub fn max_gas_limit(height: u64) -> u64 {
    if height < FEE_ADJUSTMENT_HEIGHT {
        MAX_GAS_LIMIT
    } else {
        MAX_GAS_LIMIT_JUNE_2021
    }
}

/// What a stake deposit backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakePurpose {
    Validator,
    Guardian,
    EliteEdgeNode,
}

impl StakePurpose {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(StakePurpose::Validator),
            1 => Some(StakePurpose::Guardian),
            2 => Some(StakePurpose::EliteEdgeNode),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            StakePurpose::Validator => 0,
            StakePurpose::Guardian => 1,
            StakePurpose::EliteEdgeNode => 2,
        }
    }

    /// Validator and guardian stakes are THETA, edge node stakes TFUEL
    pub fn staked_denom(self) -> crate::currency::Denom {
        match self {
            StakePurpose::Validator | StakePurpose::Guardian => crate::currency::Denom::Theta,
            StakePurpose::EliteEdgeNode => crate::currency::Denom::TFuel,
        }
    }
}

/// Block status as reported by the node; every operation in a block
/// carries its block's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStatus {
    Pending,
    Valid,
    Invalid,
    Committed,
    DirectlyFinalized,
    IndirectlyFinalized,
    Trusted,
    Disposed,
}

impl BlockStatus {
    pub const ALL: [BlockStatus; 8] = [
        BlockStatus::Pending,
        BlockStatus::Valid,
        BlockStatus::Invalid,
        BlockStatus::Committed,
        BlockStatus::DirectlyFinalized,
        BlockStatus::IndirectlyFinalized,
        BlockStatus::Trusted,
        BlockStatus::Disposed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockStatus::Pending => "pending",
            BlockStatus::Valid => "valid",
            BlockStatus::Invalid => "invalid",
            BlockStatus::Committed => "committed",
            BlockStatus::DirectlyFinalized => "directly_finalized",
            BlockStatus::IndirectlyFinalized => "indirectly_finalized",
            BlockStatus::Trusted => "trusted",
            BlockStatus::Disposed => "disposed",
        }
    }

    /// Whether operations under this status count as applied
    pub fn is_successful(self) -> bool {
        !matches!(self, BlockStatus::Pending | BlockStatus::Invalid)
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BlockStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// The node sends the numeric code; names are accepted as well.
impl<'de> Deserialize<'de> for BlockStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let status = match &value {
            Value::Number(n) => n.as_u64().and_then(BlockStatus::from_code),
            Value::String(s) => BlockStatus::from_name(s)
                .or_else(|| s.parse::<u64>().ok().and_then(BlockStatus::from_code)),
            _ => None,
        };
        status.ok_or_else(|| serde::de::Error::custom(format!("invalid block status {}", value)))
    }
}
