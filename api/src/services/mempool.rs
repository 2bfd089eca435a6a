//! Mempool service

use rosetta_network::NodeClient;
use rosetta_storage::StakeReturnLedger;

use super::BlockService;
use crate::models::{Transaction, TransactionIdentifier};
use crate::{ApiError, ApiResult};

#[derive(Clone)]
pub struct MempoolService {
    node: NodeClient,
    blocks: BlockService,
}

impl MempoolService {
    pub fn new(node: NodeClient, ledger: StakeReturnLedger) -> Self {
        let blocks = BlockService::new(node.clone(), ledger);
        Self { node, blocks }
    }

    pub async fn pending(&self) -> ApiResult<Vec<TransactionIdentifier>> {
        let hashes = self
            .node
            .pending_transactions()
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetMempool))?;
        Ok(hashes
            .into_iter()
            .map(|hash| TransactionIdentifier { hash })
            .collect())
    }

    pub async fn transaction(&self, hash: &str) -> ApiResult<Transaction> {
        self.blocks
            .transaction(hash, ApiError::UnableToGetMempoolTransaction)
            .await
    }
}
