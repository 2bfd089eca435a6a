//! Deferred stake returns
//!
//! A stake withdrawal only debits the fee when it is included; the principal
//! comes back `LOCKING_PERIOD` blocks later. The pending return is recorded
//! with the source coins overwritten by the amount actually staked.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::chain::{StakePurpose, LOCKING_PERIOD};
use crate::coins::Coins;
use crate::primitives::Hash;
use crate::tx::WithdrawStakeTx;

/// Prefix of the identifier a withdrawal is published under
pub const STAKE_WITHDRAW_PREFIX: &str = "stake_withdraw";

/// Prefix of the identifiers minted for returns found in a pool snapshot
pub const STAKE_RETURN_PREFIX: &str = "stake_return";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStakeReturn {
    /// Identifier of the return. For live withdrawals this is the hash of
    /// the withdrawal transaction.
    #[serde(alias = "hash")]
    pub tx_hash: Hash,
    pub tx: WithdrawStakeTx,
}

impl PendingStakeReturn {
    /// Build the record for a withdrawal whose stake resolved to `amount`
    pub fn from_withdrawal(tx_hash: Hash, mut tx: WithdrawStakeTx, amount: BigUint) -> Self {
        let denom = StakePurpose::from_u8(tx.purpose)
            .map(StakePurpose::staked_denom)
            .unwrap_or(crate::currency::Denom::Theta);
        let mut coins = Coins::default();
        coins.set(denom, amount);
        tx.source.coins = coins;
        Self { tx_hash, tx }
    }
}

/// Height at which a withdrawal observed at `height` returns its principal
pub fn return_height(observed_height: u64) -> u64 {
    observed_height.saturating_add(LOCKING_PERIOD)
}

/// Identifier a withdrawal transaction is published under, so the fee-only
/// withdrawal and the later return never share a transaction identifier.
pub fn withdrawal_identifier(tx_hash: &Hash) -> Hash {
    Hash::keccak(format!("{}_{}", STAKE_WITHDRAW_PREFIX, tx_hash.to_hex()).as_bytes())
}

/// Identifier of the `index`-th withdrawn stake found in `pool` at the
/// snapshot block `block_hash`
pub fn snapshot_return_identifier(pool: &str, block_hash: &Hash, index: usize) -> Hash {
    Hash::keccak(
        format!(
            "{}_{}_{}_{}",
            pool,
            STAKE_RETURN_PREFIX,
            block_hash.to_hex(),
            index
        )
        .as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Address;
    use crate::tx::{TxInput, TxOutput};

    fn withdrawal(purpose: u8) -> WithdrawStakeTx {
        WithdrawStakeTx {
            fee: Coins::tfuel(BigUint::from(1u32)),
            source: TxInput {
                address: Address([1; 20]),
                ..Default::default()
            },
            holder: TxOutput {
                address: Address([2; 20]),
                coins: Coins::default(),
            },
            purpose,
        }
    }

    #[test]
    fn test_amount_lands_in_staked_denom() {
        let ret = PendingStakeReturn::from_withdrawal(
            Hash([3; 32]),
            withdrawal(0),
            BigUint::from(1000u32),
        );
        assert_eq!(ret.tx.source.coins, Coins::theta(BigUint::from(1000u32)));

        let ret = PendingStakeReturn::from_withdrawal(
            Hash([3; 32]),
            withdrawal(2),
            BigUint::from(1000u32),
        );
        assert_eq!(ret.tx.source.coins, Coins::tfuel(BigUint::from(1000u32)));
    }

    #[test]
    fn test_identifiers_are_distinct() {
        let hash = Hash([7; 32]);
        assert_ne!(withdrawal_identifier(&hash), hash);
        assert_ne!(
            snapshot_return_identifier("vcp", &hash, 0),
            snapshot_return_identifier("gcp", &hash, 0)
        );
        assert_ne!(
            snapshot_return_identifier("vcp", &hash, 0),
            snapshot_return_identifier("vcp", &hash, 1)
        );
        assert_eq!(return_height(100), 28_900);
    }
}
