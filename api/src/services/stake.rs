//! Stake service - resolves withdrawn stake amounts and seeds the ledger
//!
//! A withdrawal transaction only names holder, source and purpose. The
//! amount that comes back after the locking period has to be looked up in
//! the matching stake pool at the withdrawal height.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use rosetta_core::chain::StakePurpose;
use rosetta_core::stake::snapshot_return_identifier;
use rosetta_core::tx::{TxInput, TxOutput};
use rosetta_core::{PendingStakeReturn, WithdrawStakeTx};
use rosetta_network::{NodeClient, RpcError, StakePool};
use rosetta_storage::StakeReturnLedger;

use crate::{ApiError, ApiResult};

/// Retriable node failures stay retriable; anything else means the stake
/// cannot be resolved.
fn stake_error(e: RpcError) -> ApiError {
    let reason = e.to_string();
    ApiError::from_rpc(e, ApiError::UnableToResolveStake(reason))
}

#[derive(Clone)]
pub struct StakeService {
    node: NodeClient,
    ledger: StakeReturnLedger,
}

impl StakeService {
    pub fn new(node: NodeClient, ledger: StakeReturnLedger) -> Self {
        Self { node, ledger }
    }

    /// Amount staked by the withdrawal's source with its holder, as seen in
    /// the pool at `height`
    pub async fn resolve_stake(&self, height: u64, tx: &WithdrawStakeTx) -> ApiResult<BigUint> {
        let purpose = StakePurpose::from_u8(tx.purpose).ok_or_else(|| {
            ApiError::UnableToResolveStake(format!("unknown stake purpose {}", tx.purpose))
        })?;
        let holder = tx.holder.address;
        let source = tx.source.address;

        let stake = match purpose {
            StakePurpose::Validator | StakePurpose::Guardian => {
                let pool = StakePool::for_purpose(purpose);
                let snapshot = self
                    .node
                    .stake_pool(pool, height)
                    .await
                    .map_err(stake_error)?
                    .ok_or_else(|| {
                        ApiError::UnableToResolveStake(format!(
                            "no {} at height {}",
                            pool.name(),
                            height
                        ))
                    })?;
                snapshot.find_stake(&holder, &source).cloned()
            }
            StakePurpose::EliteEdgeNode => self
                .node
                .eenp_stake(height, &source, &holder)
                .await
                .map_err(stake_error)?,
        };

        stake.map(|s| s.amount).ok_or_else(|| {
            ApiError::UnableToResolveStake(format!(
                "no stake from {} with {} at height {}",
                source, holder, height
            ))
        })
    }

    /// Record the returns of every stake already withdrawn at the node's
    /// snapshot height. Each return lands one block after the stake's
    /// return height. Returns how many records were written.
    pub async fn snapshot_backfill(&self) -> ApiResult<usize> {
        if self.ledger.is_backfilled()? {
            tracing::info!("snapshot backfill already done");
            return Ok(0);
        }

        let status = self
            .node
            .status()
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetNodeStatus))?;
        let height = status.snapshot_block_height;

        let mut by_height: BTreeMap<u64, Vec<PendingStakeReturn>> = BTreeMap::new();
        for pool in StakePool::ALL {
            let snapshot = match self
                .node
                .stake_pool(pool, height)
                .await
                .map_err(stake_error)?
            {
                Some(snapshot) => snapshot,
                None => {
                    tracing::warn!(pool = pool.name(), height, "stake pool missing at snapshot");
                    continue;
                }
            };

            for (i, (holder, stake)) in snapshot.withdrawn().enumerate() {
                let tx = WithdrawStakeTx {
                    fee: Default::default(),
                    source: TxInput {
                        address: stake.source,
                        ..Default::default()
                    },
                    holder: TxOutput {
                        address: holder.holder,
                        ..Default::default()
                    },
                    purpose: pool.purpose().as_u8(),
                };
                // Live block processing keys a return by its withdrawal hash,
                // which the pool does not expose; match on the stake instead.
                if self.already_scheduled(&tx, stake.return_height)? {
                    tracing::debug!(
                        pool = pool.name(),
                        source = %stake.source,
                        "return already scheduled by a processed withdrawal"
                    );
                    continue;
                }
                let id = snapshot_return_identifier(pool.name(), &snapshot.block_hash, i);
                let ret = PendingStakeReturn::from_withdrawal(id, tx, stake.amount.clone());
                by_height
                    .entry(stake.return_height.saturating_add(1))
                    .or_default()
                    .push(ret);
            }
        }

        let mut written = 0;
        for (return_at, returns) in &by_height {
            written += self.ledger.put(*return_at, returns)?;
        }
        self.ledger.mark_backfilled()?;

        tracing::info!(height, written, "snapshot backfill complete");
        Ok(written)
    }

    /// Whether a return for the same stake is already recorded at or right
    /// after `return_height`
    fn already_scheduled(&self, tx: &WithdrawStakeTx, return_height: u64) -> ApiResult<bool> {
        for height in [return_height, return_height.saturating_add(1)] {
            let existing = self.ledger.get_or_empty(height)?;
            if existing.iter().any(|ret| {
                ret.tx.source.address == tx.source.address
                    && ret.tx.holder.address == tx.holder.address
                    && ret.tx.purpose == tx.purpose
            }) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rosetta_core::{Address, Coins, Hash};
    use rosetta_network::NodeRpc;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const HOLDER: &str = "0x2e833968e5bb786ae419c4d13189fb081cc43bab";
    const SOURCE: &str = "0x0d2fd67d573c8ecb4161510fc00754d64b401f86";

    struct SnapshotNode;

    #[async_trait]
    impl NodeRpc for SnapshotNode {
        async fn call(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            let block_hash = format!("0x{}", "aa".repeat(32));
            match method {
                "theta.GetStatus" => Ok(json!({ "snapshot_block_height": "100" })),
                "theta.GetVcpByHeight" => Ok(json!({
                    "BlockHashVcpPairs": [{
                        "BlockHash": block_hash,
                        "Vcp": {"SortedCandidates": [{
                            "Holder": HOLDER,
                            "Stakes": [
                                {"source": SOURCE, "amount": "1000", "withdrawn": true, "return_height": "150"},
                                {"source": HOLDER, "amount": "7", "withdrawn": false, "return_height": "0"}
                            ]
                        }]}
                    }]
                })),
                "theta.GetEenpStakeByHeight" => Ok(json!({
                    "stake": {"source": SOURCE, "amount": "42", "withdrawn": true, "return_height": "9"}
                })),
                _ => Err(RpcError::Remote {
                    code: -32000,
                    message: "not found".into(),
                }),
            }
        }
    }

    fn service() -> StakeService {
        StakeService::new(
            NodeClient::new(Arc::new(SnapshotNode)),
            StakeReturnLedger::temporary().unwrap(),
        )
    }

    fn withdrawal(purpose: u8) -> WithdrawStakeTx {
        WithdrawStakeTx {
            fee: Coins::default(),
            source: TxInput {
                address: SOURCE.parse().unwrap(),
                ..Default::default()
            },
            holder: TxOutput {
                address: HOLDER.parse().unwrap(),
                ..Default::default()
            },
            purpose,
        }
    }

    #[tokio::test]
    async fn test_resolve_validator_stake() {
        let amount = service().resolve_stake(120, &withdrawal(0)).await.unwrap();
        assert_eq!(amount, BigUint::from(1000u32));
    }

    #[tokio::test]
    async fn test_resolve_edge_node_stake() {
        let amount = service().resolve_stake(120, &withdrawal(2)).await.unwrap();
        assert_eq!(amount, BigUint::from(42u32));
    }

    #[tokio::test]
    async fn test_missing_guardian_pool_is_fatal() {
        let err = service().resolve_stake(120, &withdrawal(1)).await.unwrap_err();
        assert_eq!(err.code(), 37);
    }

    #[tokio::test]
    async fn test_backfill_stores_one_block_after_return_height() {
        let svc = service();
        assert_eq!(svc.snapshot_backfill().await.unwrap(), 1);

        assert!(svc.ledger.get_or_empty(150).unwrap().is_empty());
        let stored = svc.ledger.get(151).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tx.source.address, SOURCE.parse::<Address>().unwrap());
        assert_eq!(stored[0].tx.source.coins.theta_wei, BigUint::from(1000u32));
        assert!(svc.ledger.is_backfilled().unwrap());

        // second run is a no-op
        assert_eq!(svc.snapshot_backfill().await.unwrap(), 0);
        assert_eq!(svc.ledger.get(151).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backfill_skips_returns_scheduled_from_blocks() {
        let svc = service();
        let live = PendingStakeReturn::from_withdrawal(
            Hash([9; 32]),
            withdrawal(0),
            BigUint::from(1000u32),
        );
        svc.ledger.put(150, &[live]).unwrap();

        assert_eq!(svc.snapshot_backfill().await.unwrap(), 0);
        assert!(svc.ledger.get_or_empty(151).unwrap().is_empty());
        assert_eq!(svc.ledger.get(150).unwrap().len(), 1);
    }

    struct UnreachableNode;

    #[async_trait]
    impl NodeRpc for UnreachableNode {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, RpcError> {
            Err(RpcError::Timeout(std::time::Duration::from_secs(5)))
        }
    }

    #[tokio::test]
    async fn test_node_timeout_stays_retriable() {
        let svc = StakeService::new(
            NodeClient::new(Arc::new(UnreachableNode)),
            StakeReturnLedger::temporary().unwrap(),
        );
        let err = svc.resolve_stake(120, &withdrawal(0)).await.unwrap_err();
        assert_eq!(err.code(), 38);
        assert!(err.retriable());

        let err = svc.resolve_stake(120, &withdrawal(2)).await.unwrap_err();
        assert_eq!(err.code(), 38);
    }
}
