//! Typed views of node responses
//!
//! The node mixes lowercase JSON names with Go's default field names, so
//! most fields carry both.

use num_bigint::BigUint;
use rosetta_core::chain::{BlockStatus, StakePurpose};
use rosetta_core::coins::wei;
use rosetta_core::primitives::flex_u64;
use rosetta_core::{Address, BalanceChange, Coins, Hash};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub latest_finalized_block_hash: Hash,
    #[serde(default, with = "flex_u64")]
    pub latest_finalized_block_height: u64,
    #[serde(default, with = "flex_u64")]
    pub latest_finalized_block_time: u64,
    #[serde(default, with = "flex_u64")]
    pub current_height: u64,
    #[serde(default)]
    pub syncing: bool,
    #[serde(default)]
    pub genesis_block_hash: Hash,
    #[serde(default, with = "flex_u64")]
    pub snapshot_block_height: u64,
    #[serde(default)]
    pub snapshot_block_hash: Hash,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeAccount {
    #[serde(default, alias = "Sequence", with = "flex_u64")]
    pub sequence: u64,
    #[serde(default, alias = "Coins")]
    pub coins: Coins,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Receipt {
    #[serde(default, alias = "GasUsed", with = "flex_u64")]
    pub gas_used: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceChangesEntry {
    #[serde(default, alias = "BalanceChanges")]
    pub balance_changes: Vec<BalanceChange>,
}

/// Transaction as embedded in a block
#[derive(Debug, Clone, Deserialize)]
pub struct BlockTx {
    #[serde(default)]
    pub raw: Value,
    #[serde(rename = "type", with = "flex_u64")]
    pub kind: u64,
    pub hash: Hash,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    #[serde(default)]
    pub balance_changes: Option<BalanceChangesEntry>,
}

impl BlockTx {
    pub fn gas_used(&self) -> u64 {
        self.receipt.as_ref().map_or(0, |r| r.gas_used)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeBlock {
    #[serde(default)]
    pub chain_id: String,
    #[serde(with = "flex_u64")]
    pub height: u64,
    pub hash: Hash,
    #[serde(default)]
    pub parent: Hash,
    #[serde(default)]
    pub transactions_hash: Hash,
    #[serde(default)]
    pub state_hash: Hash,
    /// Seconds since the epoch
    #[serde(default, with = "flex_u64")]
    pub timestamp: u64,
    #[serde(default)]
    pub proposer: Address,
    pub status: BlockStatus,
    #[serde(default)]
    pub transactions: Option<Vec<BlockTx>>,
}

impl NodeBlock {
    pub fn parent_height(&self) -> u64 {
        self.height.saturating_sub(1)
    }
}

/// Status the node reports for a transaction it has never seen
pub const TX_NOT_FOUND: &str = "not_found";

#[derive(Debug, Clone, Deserialize)]
pub struct NodeTransaction {
    #[serde(default)]
    pub block_hash: Hash,
    #[serde(default, with = "flex_u64")]
    pub block_height: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub hash: Hash,
    #[serde(default, rename = "type", with = "flex_u64")]
    pub kind: u64,
    #[serde(default)]
    pub transaction: Value,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    /// The node spells this key `blance_changes`
    #[serde(default, rename = "blance_changes", alias = "balance_changes")]
    pub balance_changes: Option<BalanceChangesEntry>,
}

impl NodeTransaction {
    pub fn is_found(&self) -> bool {
        !self.status.is_empty() && self.status != TX_NOT_FOUND && !self.transaction.is_null()
    }

    pub fn gas_used(&self) -> u64 {
        self.receipt.as_ref().map_or(0, |r| r.gas_used)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingTransactions {
    #[serde(default)]
    pub tx_hashes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Peers {
    #[serde(default)]
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastResult {
    pub hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    #[serde(alias = "Source")]
    pub source: Address,
    #[serde(default, alias = "Amount", with = "wei")]
    pub amount: BigUint,
    #[serde(default, alias = "Withdrawn")]
    pub withdrawn: bool,
    #[serde(default, alias = "ReturnHeight", with = "flex_u64")]
    pub return_height: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StakeHolder {
    #[serde(alias = "Holder")]
    pub holder: Address,
    #[serde(default, alias = "Stakes")]
    pub stakes: Vec<Stake>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EenpStake {
    #[serde(default)]
    pub stake: Option<Stake>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ValidatorPool {
    #[serde(default, rename = "SortedCandidates", alias = "sorted_candidates")]
    candidates: Option<Vec<StakeHolder>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GuardianPool {
    #[serde(default, rename = "SortedGuardians", alias = "sorted_guardians")]
    guardians: Option<Vec<StakeHolder>>,
}

#[derive(Debug, Clone, Deserialize)]
struct VcpPair {
    #[serde(default, rename = "BlockHash", alias = "block_hash")]
    block_hash: Hash,
    #[serde(default, rename = "Vcp", alias = "vcp")]
    vcp: Option<ValidatorPool>,
}

#[derive(Debug, Clone, Deserialize)]
struct GcpPair {
    #[serde(default, rename = "BlockHash", alias = "block_hash")]
    block_hash: Hash,
    #[serde(default, rename = "Gcp", alias = "gcp")]
    gcp: Option<GuardianPool>,
}

#[derive(Debug, Clone, Deserialize)]
struct EenpPair {
    #[serde(default, rename = "BlockHash", alias = "block_hash")]
    block_hash: Hash,
    #[serde(default, rename = "EENs", alias = "eens")]
    eens: Option<Vec<StakeHolder>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VcpResult {
    #[serde(default, rename = "BlockHashVcpPairs")]
    pairs: Option<Vec<VcpPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GcpResult {
    #[serde(default, rename = "BlockHashGcpPairs")]
    pairs: Option<Vec<GcpPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EenpResult {
    #[serde(default, rename = "BlockHashEenpPairs")]
    pairs: Option<Vec<EenpPair>>,
}

/// Stake holders of one pool as of one block
#[derive(Debug, Clone, Default)]
pub struct PoolSnapshot {
    pub block_hash: Hash,
    pub holders: Vec<StakeHolder>,
}

impl PoolSnapshot {
    /// Stake `source` placed with `holder`
    pub fn find_stake(&self, holder: &Address, source: &Address) -> Option<&Stake> {
        self.holders
            .iter()
            .filter(|h| h.holder == *holder)
            .flat_map(|h| h.stakes.iter())
            .find(|s| s.source == *source)
    }

    /// Withdrawn stakes in pool order
    pub fn withdrawn(&self) -> impl Iterator<Item = (&StakeHolder, &Stake)> {
        self.holders
            .iter()
            .flat_map(|h| h.stakes.iter().map(move |s| (h, s)))
            .filter(|(_, s)| s.withdrawn)
    }
}

/// The three candidate pools a stake can sit in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakePool {
    Validator,
    Guardian,
    EliteEdgeNode,
}

impl StakePool {
    pub const ALL: [StakePool; 3] = [
        StakePool::Validator,
        StakePool::Guardian,
        StakePool::EliteEdgeNode,
    ];

    pub fn for_purpose(purpose: StakePurpose) -> Self {
        match purpose {
            StakePurpose::Validator => StakePool::Validator,
            StakePurpose::Guardian => StakePool::Guardian,
            StakePurpose::EliteEdgeNode => StakePool::EliteEdgeNode,
        }
    }

    pub fn purpose(self) -> StakePurpose {
        match self {
            StakePool::Validator => StakePurpose::Validator,
            StakePool::Guardian => StakePurpose::Guardian,
            StakePool::EliteEdgeNode => StakePurpose::EliteEdgeNode,
        }
    }

    /// Short name used in snapshot return identifiers
    pub fn name(self) -> &'static str {
        match self {
            StakePool::Validator => "vcp",
            StakePool::Guardian => "gcp",
            StakePool::EliteEdgeNode => "eenp",
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            StakePool::Validator => "theta.GetVcpByHeight",
            StakePool::Guardian => "theta.GetGcpByHeight",
            StakePool::EliteEdgeNode => "theta.GetEenpByHeight",
        }
    }

    /// First pair of the pool response, which is the one at the requested
    /// height. A null or empty response yields `None`.
    pub fn parse_snapshot(self, value: Value) -> Result<Option<PoolSnapshot>, serde_json::Error> {
        if value.is_null() {
            return Ok(None);
        }
        let snapshot = match self {
            StakePool::Validator => serde_json::from_value::<VcpResult>(value)?
                .pairs
                .and_then(|p| p.into_iter().next())
                .map(|p| PoolSnapshot {
                    block_hash: p.block_hash,
                    holders: p.vcp.and_then(|v| v.candidates).unwrap_or_default(),
                }),
            StakePool::Guardian => serde_json::from_value::<GcpResult>(value)?
                .pairs
                .and_then(|p| p.into_iter().next())
                .map(|p| PoolSnapshot {
                    block_hash: p.block_hash,
                    holders: p.gcp.and_then(|g| g.guardians).unwrap_or_default(),
                }),
            StakePool::EliteEdgeNode => serde_json::from_value::<EenpResult>(value)?
                .pairs
                .and_then(|p| p.into_iter().next())
                .map(|p| PoolSnapshot {
                    block_hash: p.block_hash,
                    holders: p.eens.unwrap_or_default(),
                }),
        };
        Ok(snapshot)
    }
}
