//! Account service - balances at a block and per-denomination coins

use rosetta_core::{Address, Amount, Coins, Currency, Denom, Metadata};
use rosetta_network::{NodeAccount, NodeClient};
use serde_json::Value;

use super::{block_identifier, parse_hash};
use crate::models::{BlockIdentifier, Coin, CoinIdentifier, PartialBlockIdentifier};
use crate::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AccountService {
    node: NodeClient,
}

/// Denominations selected by an optional currency filter. Unknown
/// currencies are ignored; no filter selects both.
fn selected(currencies: Option<&[Currency]>) -> Vec<Denom> {
    match currencies {
        None => Denom::ALL.to_vec(),
        Some(list) => Denom::ALL
            .into_iter()
            .filter(|d| list.iter().any(|c| Denom::from_symbol(&c.symbol) == Some(*d)))
            .collect(),
    }
}

fn sequence_metadata(account: &NodeAccount) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("sequence_number".to_string(), Value::from(account.sequence));
    meta
}

impl AccountService {
    pub fn new(node: NodeClient) -> Self {
        Self { node }
    }

    async fn latest_finalized(&self) -> ApiResult<BlockIdentifier> {
        let status = self
            .node
            .status()
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetNodeStatus))?;
        Ok(block_identifier(
            status.latest_finalized_block_height,
            &status.latest_finalized_block_hash,
        ))
    }

    /// Fill in whichever half of a partial identifier is missing
    async fn resolve_block(&self, id: Option<&PartialBlockIdentifier>) -> ApiResult<BlockIdentifier> {
        let (index, hash) = match id {
            None => return self.latest_finalized().await,
            Some(id) => (id.index, id.hash.as_deref()),
        };

        match (index, hash) {
            (Some(index), Some(hash)) => Ok(BlockIdentifier {
                index,
                hash: hash.to_string(),
            }),
            (Some(index), None) => {
                let height = u64::try_from(index).map_err(|_| {
                    ApiError::InvalidInputParam(format!("negative block index {}", index))
                })?;
                let block = self
                    .node
                    .block_by_height(height)
                    .await
                    .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetBlock))?
                    .ok_or(ApiError::BlockNotFound)?;
                Ok(block_identifier(block.height, &block.hash))
            }
            (None, Some(hash)) => {
                let block = self
                    .node
                    .block_by_hash(&parse_hash(hash)?)
                    .await
                    .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetBlock))?
                    .ok_or(ApiError::BlockNotFound)?;
                Ok(block_identifier(block.height, &block.hash))
            }
            (None, None) => self.latest_finalized().await,
        }
    }

    /// Account at `height`; an address the chain has never seen has zero
    /// balances and sequence zero.
    async fn account(&self, address: &Address, height: Option<u64>) -> ApiResult<NodeAccount> {
        let account = self
            .node
            .account(address, height)
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetAccount))?;
        Ok(account.unwrap_or_default())
    }

    pub async fn balance(
        &self,
        address: &str,
        block: Option<&PartialBlockIdentifier>,
        currencies: Option<&[Currency]>,
    ) -> ApiResult<(BlockIdentifier, Vec<Amount>, Metadata)> {
        let address: Address = address.parse().map_err(|_| ApiError::InvalidAccountAddress)?;
        let block = self.resolve_block(block).await?;
        let account = self.account(&address, Some(block.index as u64)).await?;

        let balances = selected(currencies)
            .into_iter()
            .map(|d| Amount::new(account.coins.signed(d), d))
            .collect();
        Ok((block, balances, sequence_metadata(&account)))
    }

    pub async fn coins(
        &self,
        address: &str,
        currencies: Option<&[Currency]>,
    ) -> ApiResult<(BlockIdentifier, Vec<Coin>, Metadata)> {
        let address: Address = address.parse().map_err(|_| ApiError::InvalidAccountAddress)?;
        let block = self.latest_finalized().await?;
        let account = self.account(&address, None).await?;

        let coins = selected(currencies)
            .into_iter()
            .map(|d| coin(&account.coins, d))
            .collect();
        Ok((block, coins, sequence_metadata(&account)))
    }
}

fn coin(coins: &Coins, denom: Denom) -> Coin {
    Coin {
        coin_identifier: CoinIdentifier {
            identifier: denom.coin_identifier().to_string(),
        },
        amount: Amount::new(coins.signed(denom), denom),
    }
}
