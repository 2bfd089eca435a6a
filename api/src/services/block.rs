//! Block service - assembles Rosetta blocks from node blocks
//!
//! Organic transactions are decoded in block order. A stake withdrawal is
//! published under a derived identifier and schedules its principal return
//! in the ledger; returns that mature at the requested height are appended
//! after every organic transaction.

use rosetta_core::stake::{return_height, withdrawal_identifier};
use rosetta_core::{
    decode, decode_stake_return, CodecResult, DecodeContext, DecodedTx, Hash, Metadata,
    NativeTx, PendingStakeReturn, TxKind,
};
use rosetta_network::{BlockTx, NodeBlock, NodeClient};
use rosetta_storage::StakeReturnLedger;
use serde_json::Value;

use super::{block_identifier, parse_hash, transaction, StakeService};
use crate::models::{Block, BlockIdentifier, PartialBlockIdentifier, Transaction};
use crate::{ApiError, ApiResult};

#[derive(Clone)]
pub struct BlockService {
    node: NodeClient,
    ledger: StakeReturnLedger,
    stakes: StakeService,
}

impl BlockService {
    pub fn new(node: NodeClient, ledger: StakeReturnLedger) -> Self {
        let stakes = StakeService::new(node.clone(), ledger.clone());
        Self {
            node,
            ledger,
            stakes,
        }
    }

    pub async fn fetch(&self, id: &PartialBlockIdentifier) -> ApiResult<NodeBlock> {
        let block = if let Some(index) = id.index {
            let height = u64::try_from(index)
                .map_err(|_| ApiError::InvalidInputParam(format!("negative block index {}", index)))?;
            self.node.block_by_height(height).await
        } else if let Some(hash) = &id.hash {
            self.node.block_by_hash(&parse_hash(hash)?).await
        } else {
            return Err(ApiError::MissingBlockHashOrHeight);
        };

        block
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetBlock))?
            .ok_or(ApiError::BlockNotFound)
    }

    pub async fn block(&self, id: &PartialBlockIdentifier) -> ApiResult<Block> {
        let block = self.fetch(id).await?;
        let status = block.status.as_str();

        let mut transactions = Vec::new();
        for tx in block.transactions.iter().flatten() {
            transactions.push(self.organic_transaction(&block, tx, status).await?);
        }
        transactions.extend(self.matured_returns(block.height, status)?);

        let mut metadata = Metadata::new();
        metadata.insert("status".to_string(), Value::from(status));
        metadata.insert(
            "transactions_hash".to_string(),
            Value::from(block.transactions_hash.to_hex()),
        );
        metadata.insert("state_hash".to_string(), Value::from(block.state_hash.to_hex()));
        metadata.insert("proposer".to_string(), Value::from(block.proposer.to_string()));

        Ok(Block {
            block_identifier: block_identifier(block.height, &block.hash),
            parent_block_identifier: BlockIdentifier {
                index: block.parent_height() as i64,
                hash: block.parent.to_hex(),
            },
            timestamp: (block.timestamp as i64).saturating_mul(1000),
            transactions,
            metadata: Some(metadata),
        })
    }

    async fn organic_transaction(
        &self,
        block: &NodeBlock,
        tx: &BlockTx,
        status: &str,
    ) -> ApiResult<Transaction> {
        let native = match decode_native(tx.kind, tx.raw.clone()) {
            Ok(native) => native,
            // A withdrawal that cannot be read would silently lose its return
            Err(e) if schedules_return(tx.kind) => {
                tracing::error!(hash = %tx.hash, error = %e, "undecodable stake withdrawal");
                return Err(ApiError::UnableToParseTransaction(format!("{}: {}", tx.hash, e)));
            }
            Err(e) => {
                tracing::warn!(hash = %tx.hash, kind = tx.kind, error = %e, "undecodable transaction in block");
                return Ok(opaque_transaction(&tx.hash, tx.kind));
            }
        };

        let changes = tx
            .balance_changes
            .as_ref()
            .map(|c| c.balance_changes.as_slice())
            .unwrap_or_default();
        let decoded = decode(
            &native,
            &DecodeContext::in_block(status, tx.gas_used(), changes),
        );

        if let NativeTx::WithdrawStake(withdrawal) = native {
            let amount = self.stakes.resolve_stake(block.height, &withdrawal).await?;
            let ret = PendingStakeReturn::from_withdrawal(tx.hash, withdrawal, amount);
            let return_at = return_height(block.height);
            self.ledger.put(return_at, std::slice::from_ref(&ret))?;
            tracing::info!(tx = %tx.hash, return_at, "stake return scheduled");
            return Ok(transaction(&withdrawal_identifier(&tx.hash), decoded));
        }

        Ok(transaction(&tx.hash, decoded))
    }

    /// Single transaction by hash, with no ledger side effects. `failed` is
    /// reported when the node query itself fails.
    pub async fn transaction(&self, hash: &str, failed: ApiError) -> ApiResult<Transaction> {
        let hash = parse_hash(hash)?;
        let tx = self
            .node
            .transaction(&hash)
            .await
            .map_err(|e| ApiError::from_rpc(e, failed))?
            .ok_or(ApiError::TransactionNotFound)?;

        let native = match decode_native(tx.kind, tx.transaction.clone()) {
            Ok(native) => native,
            Err(_) => return Ok(opaque_transaction(&hash, tx.kind)),
        };
        let changes = tx
            .balance_changes
            .as_ref()
            .map(|c| c.balance_changes.as_slice())
            .unwrap_or_default();
        let decoded = decode(
            &native,
            &DecodeContext::in_block(&tx.status, tx.gas_used(), changes),
        );
        Ok(transaction(&hash, decoded))
    }

    fn matured_returns(&self, height: u64, status: &str) -> ApiResult<Vec<Transaction>> {
        Ok(self
            .ledger
            .get_or_empty(height)?
            .iter()
            .map(|ret| transaction(&ret.tx_hash, decode_stake_return(ret, Some(status))))
            .collect())
    }
}

pub(crate) fn decode_native(kind: u64, raw: Value) -> CodecResult<NativeTx> {
    NativeTx::from_json(TxKind::from_code(kind)?, raw)
}

/// Kinds whose inclusion writes to the stake-return ledger
fn schedules_return(kind: u64) -> bool {
    kind == u64::from(TxKind::WithdrawStake.code())
}

fn opaque_transaction(hash: &Hash, kind: u64) -> Transaction {
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), Value::from(kind));
    transaction(
        hash,
        DecodedTx {
            metadata,
            operations: Vec::new(),
        },
    )
}
