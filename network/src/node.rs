//! Typed wrappers over the node's `theta.*` methods

use std::sync::Arc;

use rosetta_core::{Address, Hash};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::rpc::NodeRpc;
use crate::types::*;

#[derive(Clone)]
pub struct NodeClient {
    rpc: Arc<dyn NodeRpc>,
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient").finish_non_exhaustive()
    }
}

fn parse<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
}

/// Absent objects come back either as `-32000` or as a null result
fn parse_optional<T: DeserializeOwned>(
    method: &str,
    result: Result<Value, RpcError>,
) -> Result<Option<T>, RpcError> {
    match result {
        Ok(Value::Null) => Ok(None),
        Ok(value) => parse(method, value).map(Some),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

impl NodeClient {
    pub fn new(rpc: Arc<dyn NodeRpc>) -> Self {
        Self { rpc }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.rpc.call(method, params).await
    }

    pub async fn status(&self) -> Result<NodeStatus, RpcError> {
        let method = "theta.GetStatus";
        parse(method, self.call(method, json!({})).await?)
    }

    /// Account at `height` (latest when `None`); `None` if the chain has
    /// never seen the address
    pub async fn account(
        &self,
        address: &Address,
        height: Option<u64>,
    ) -> Result<Option<NodeAccount>, RpcError> {
        let method = "theta.GetAccount";
        let mut params = json!({ "address": address.to_string() });
        if let Some(height) = height {
            params["height"] = Value::from(height.to_string());
        }
        parse_optional(method, self.call(method, params).await)
    }

    pub async fn block_by_height(&self, height: u64) -> Result<Option<NodeBlock>, RpcError> {
        let method = "theta.GetBlockByHeight";
        let params = json!({ "height": height.to_string() });
        parse_optional(method, self.call(method, params).await)
    }

    pub async fn block_by_hash(&self, hash: &Hash) -> Result<Option<NodeBlock>, RpcError> {
        let method = "theta.GetBlock";
        let params = json!({ "hash": hash.to_hex() });
        parse_optional(method, self.call(method, params).await)
    }

    pub async fn transaction(&self, hash: &Hash) -> Result<Option<NodeTransaction>, RpcError> {
        let method = "theta.GetTransaction";
        let params = json!({ "hash": hash.to_hex() });
        let tx: Option<NodeTransaction> = parse_optional(method, self.call(method, params).await)?;
        Ok(tx.filter(NodeTransaction::is_found))
    }

    pub async fn pending_transactions(&self) -> Result<Vec<String>, RpcError> {
        let method = "theta.GetPendingTransactions";
        let pending: Option<PendingTransactions> =
            parse_optional(method, self.call(method, json!({})).await)?;
        Ok(pending.map(|p| p.tx_hashes).unwrap_or_default())
    }

    pub async fn peers(&self, skip_edge_node: bool) -> Result<Vec<String>, RpcError> {
        let method = "theta.GetPeers";
        let params = json!({ "skip_edge_node": skip_edge_node });
        let peers: Option<Peers> = parse_optional(method, self.call(method, params).await)?;
        Ok(peers.map(|p| p.peers).unwrap_or_default())
    }

    /// Holders of `pool` as of `height`
    pub async fn stake_pool(
        &self,
        pool: StakePool,
        height: u64,
    ) -> Result<Option<PoolSnapshot>, RpcError> {
        let method = pool.method();
        let value = match self
            .call(method, json!({ "height": height.to_string() }))
            .await
        {
            Err(e) if e.is_not_found() => return Ok(None),
            other => other?,
        };
        pool.parse_snapshot(value)
            .map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }

    /// Withdrawn elite-edge-node stake `source` placed with `holder`
    pub async fn eenp_stake(
        &self,
        height: u64,
        source: &Address,
        holder: &Address,
    ) -> Result<Option<Stake>, RpcError> {
        let method = "theta.GetEenpStakeByHeight";
        let params = json!({
            "height": height.to_string(),
            "source": source.to_string(),
            "holder": holder.to_string(),
            "withdrawn_only": true,
        });
        let result: Option<EenpStake> = parse_optional(method, self.call(method, params).await)?;
        Ok(result.and_then(|r| r.stake))
    }

    /// Submit signed wire bytes; returns the hash the node assigned
    pub async fn broadcast_raw(&self, tx_bytes: &[u8]) -> Result<Hash, RpcError> {
        let method = "theta.BroadcastRawTransactionAsync";
        let params = json!({ "tx_bytes": hex::encode(tx_bytes) });
        let result: BroadcastResult = parse(method, self.call(method, params).await?)?;
        Ok(result.hash)
    }
}
