//! Network service - identifiers, node status and static options

use rosetta_core::{BlockStatus, Metadata, OperationType};
use rosetta_network::NodeClient;

use super::block_identifier;
use crate::models::{
    Allow, BlockIdentifier, NetworkOptionsResponse, NetworkStatusResponse, OperationStatus,
    Peer, SyncStatus, Version,
};
use crate::{ApiError, ApiResult};

#[derive(Clone)]
pub struct NetworkService {
    node: NodeClient,
}

impl NetworkService {
    pub fn new(node: NodeClient) -> Self {
        Self { node }
    }

    /// Latest finalized block, genesis and peers. Edge nodes are left out of
    /// the peer list unless `skip_edge_node` is set to false.
    pub async fn status(&self, metadata: Option<&Metadata>) -> ApiResult<NetworkStatusResponse> {
        let status = self
            .node
            .status()
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetNodeStatus))?;

        let skip_edge_node = metadata
            .and_then(|m| m.get("skip_edge_node"))
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let peers = self
            .node
            .peers(skip_edge_node)
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetNodeStatus))?;

        Ok(NetworkStatusResponse {
            current_block_identifier: block_identifier(
                status.latest_finalized_block_height,
                &status.latest_finalized_block_hash,
            ),
            current_block_timestamp: (status.latest_finalized_block_time as i64).saturating_mul(1000),
            genesis_block_identifier: BlockIdentifier {
                index: 0,
                hash: status.genesis_block_hash.to_hex(),
            },
            sync_status: SyncStatus {
                current_index: status.latest_finalized_block_height as i64,
                target_index: status.current_height as i64,
                synced: !status.syncing,
            },
            peers: peers
                .into_iter()
                .map(|peer_id| Peer {
                    peer_id,
                    metadata: None,
                })
                .collect(),
        })
    }
}

pub fn options(rosetta_version: &str) -> NetworkOptionsResponse {
    NetworkOptionsResponse {
        version: Version {
            rosetta_version: rosetta_version.to_string(),
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            middleware_version: None,
        },
        allow: Allow {
            operation_statuses: BlockStatus::ALL
                .iter()
                .map(|s| OperationStatus {
                    status: s.as_str().to_string(),
                    successful: s.is_successful(),
                })
                .collect(),
            operation_types: OperationType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            errors: ApiError::catalog(),
            historical_balance_lookup: true,
            call_methods: Vec::new(),
            balance_exemptions: Vec::new(),
            mempool_coins: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_lists_every_status_and_error() {
        let opts = options("1.4.10");
        assert_eq!(opts.version.rosetta_version, "1.4.10");
        assert_eq!(opts.allow.operation_statuses.len(), 8);
        let pending = &opts.allow.operation_statuses[0];
        assert_eq!(pending.status, "pending");
        assert!(!pending.successful);
        assert!(opts.allow.operation_statuses[4].successful);
        assert_eq!(opts.allow.operation_types.len(), OperationType::ALL.len());
        assert_eq!(opts.allow.errors.len(), 39);
        assert!(opts.allow.historical_balance_lookup);
    }
}
