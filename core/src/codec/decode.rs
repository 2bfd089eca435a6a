//! Native transaction → operations

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use serde_json::Value;

use super::metadata::put;
use super::{DecodeContext, DecodedTx};
use crate::coins::Coins;
use crate::currency::Denom;
use crate::operation::{signer_metadata, Metadata, OperationType, OperationsBuilder};
use crate::primitives::Address;
use crate::stake::PendingStakeReturn;
use crate::tx::*;

fn debit(v: &BigUint) -> BigInt {
    -BigInt::from(v.clone())
}

fn credit(v: &BigUint) -> BigInt {
    BigInt::from(v.clone())
}

fn signer_meta(input: &TxInput) -> Metadata {
    signer_metadata(input.sequence, &input.signature)
}

/// Push the non-zero legs of `input`, THETA first. Returns whether any leg
/// was emitted.
fn push_input_legs(
    ops: &mut OperationsBuilder,
    op_type: OperationType,
    input: &TxInput,
    outgoing: bool,
) -> bool {
    let before = ops.len();
    for denom in Denom::ALL {
        let value = input.coins.get(denom);
        if value.is_zero() {
            continue;
        }
        let amount = if outgoing { debit(value) } else { credit(value) };
        ops.push(op_type, &input.address, amount, denom, Some(signer_meta(input)));
    }
    ops.len() > before
}

fn push_output_legs(ops: &mut OperationsBuilder, op_type: OperationType, output: &TxOutput) {
    for denom in Denom::ALL {
        let value = output.coins.get(denom);
        if !value.is_zero() {
            ops.push(op_type, &output.address, credit(value), denom, None);
        }
    }
}

/// Fee leg. The signer's sequence and signature ride on it when the signer
/// has no other operation in the transaction.
fn push_fee(ops: &mut OperationsBuilder, payer: &Address, fee: &Coins, signer: Option<&TxInput>) {
    ops.push(
        OperationType::TxFee,
        payer,
        debit(&fee.tfuel_wei),
        Denom::TFuel,
        signer.map(signer_meta),
    );
}

fn base_metadata(kind: TxKind) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("type".to_string(), Value::from(kind.code()));
    meta
}

/// Decode a native transaction. Pure: the stake-withdrawal side effect is
/// the caller's concern.
pub fn decode(tx: &NativeTx, ctx: &DecodeContext<'_>) -> DecodedTx {
    let mut ops = OperationsBuilder::new(ctx.status);
    let mut meta = base_metadata(tx.kind());

    match tx {
        NativeTx::Coinbase(tx) => {
            put(&mut meta, "block_height", &tx.block_height);
            ops.push(
                OperationType::CoinbaseTxProposer,
                &tx.proposer.address,
                BigInt::zero(),
                Denom::TFuel,
                Some(signer_meta(&tx.proposer)),
            );
            for output in &tx.outputs {
                ops.push(
                    OperationType::CoinbaseTxOutput,
                    &output.address,
                    credit(&output.coins.tfuel_wei),
                    Denom::TFuel,
                    None,
                );
            }
        }
        NativeTx::Slash(tx) => {
            put(&mut meta, "slashed_address", &tx.slashed_address);
            put(&mut meta, "reserve_sequence", &tx.reserve_sequence);
            put(&mut meta, "slash_proof", &tx.slash_proof);
            ops.push(
                OperationType::SlashTxProposer,
                &tx.proposer.address,
                BigInt::zero(),
                Denom::Theta,
                Some(signer_meta(&tx.proposer)),
            );
        }
        NativeTx::Send(tx) => decode_send(tx, &mut ops, &mut meta),
        NativeTx::ReserveFund(tx) => {
            put(&mut meta, "collateral", &tx.collateral);
            put(&mut meta, "resource_ids", &tx.resource_ids);
            put(&mut meta, "duration", &tx.duration);
            let legs = push_input_legs(&mut ops, OperationType::ReserveFundTxSource, &tx.source, true);
            push_fee(&mut ops, &tx.source.address, &tx.fee, (!legs).then_some(&tx.source));
        }
        NativeTx::ReleaseFund(tx) => {
            put(&mut meta, "reserve_sequence", &tx.reserve_sequence);
            let legs = push_input_legs(&mut ops, OperationType::ReleaseFundTxSource, &tx.source, true);
            push_fee(&mut ops, &tx.source.address, &tx.fee, (!legs).then_some(&tx.source));
        }
        NativeTx::ServicePayment(tx) => {
            put(&mut meta, "payment_sequence", &tx.payment_sequence);
            put(&mut meta, "reserve_sequence", &tx.reserve_sequence);
            put(&mut meta, "resource_id", &tx.resource_id);
            ops.push(
                OperationType::ServicePaymentTxSource,
                &tx.source.address,
                debit(&tx.source.coins.tfuel_wei),
                Denom::TFuel,
                Some(signer_meta(&tx.source)),
            );
            ops.push(
                OperationType::ServicePaymentTxTarget,
                &tx.target.address,
                credit(&tx.target.coins.tfuel_wei),
                Denom::TFuel,
                Some(signer_meta(&tx.target)),
            );
            push_fee(&mut ops, &tx.target.address, &tx.fee, None);
        }
        NativeTx::SplitRule(tx) => {
            put(&mut meta, "resource_id", &tx.resource_id);
            put(&mut meta, "splits", &tx.splits);
            put(&mut meta, "duration", &tx.duration);
            ops.push(
                OperationType::SplitRuleTxInitiator,
                &tx.initiator.address,
                debit(&tx.initiator.coins.tfuel_wei),
                Denom::TFuel,
                Some(signer_meta(&tx.initiator)),
            );
            push_fee(&mut ops, &tx.initiator.address, &tx.fee, None);
        }
        NativeTx::SmartContract(tx) => {
            put(&mut meta, "gas_limit", &tx.gas_limit);
            put(&mut meta, "gas_price", &tx.gas_price.to_string());
            put(&mut meta, "data", &tx.data);
            match ctx.balance_changes {
                Some(changes) => decode_contract_effects(tx, changes, ctx.gas_used, &mut ops),
                None => decode_contract_intent(tx, &mut ops),
            }
        }
        NativeTx::DepositStake(tx) => {
            put(&mut meta, "purpose", &tx.purpose);
            put(&mut meta, "holder", &tx.holder.address);
            let legs = push_input_legs(&mut ops, OperationType::DepositStakeTxSource, &tx.source, true);
            push_fee(&mut ops, &tx.source.address, &tx.fee, (!legs).then_some(&tx.source));
        }
        NativeTx::DepositStakeV2(tx) => {
            put(&mut meta, "purpose", &tx.purpose);
            put(&mut meta, "holder", &tx.holder.address);
            if !tx.bls_pubkey.is_empty() {
                put(&mut meta, "bls_pub_key", &tx.bls_pubkey);
            }
            if !tx.bls_pop.is_empty() {
                put(&mut meta, "bls_pop", &tx.bls_pop);
            }
            if !tx.holder_sig.is_empty() {
                put(&mut meta, "holder_sig", &tx.holder_sig);
            }
            let legs = push_input_legs(&mut ops, OperationType::DepositStakeTxSource, &tx.source, true);
            push_fee(&mut ops, &tx.source.address, &tx.fee, (!legs).then_some(&tx.source));
        }
        NativeTx::WithdrawStake(tx) => {
            put(&mut meta, "purpose", &tx.purpose);
            put(&mut meta, "holder", &tx.holder.address);
            // principal moves later, see decode_stake_return
            push_fee(&mut ops, &tx.source.address, &tx.fee, Some(&tx.source));
        }
        NativeTx::StakeRewardDistribution(tx) => {
            put(&mut meta, "split_basis_point", &tx.split_basis_point);
            put(&mut meta, "beneficiary", &tx.beneficiary.address);
            push_output_legs(
                &mut ops,
                OperationType::StakeRewardDistributionTxBeneficiary,
                &tx.beneficiary,
            );
            push_fee(&mut ops, &tx.holder.address, &tx.fee, Some(&tx.holder));
        }
    }

    DecodedTx {
        metadata: meta,
        operations: ops.build(),
    }
}

// Both legs of every party are always emitted. The fee is carried by the
// first input, whose TFUEL leg is shown net of it.
fn decode_send(tx: &SendTx, ops: &mut OperationsBuilder, meta: &mut Metadata) {
    put(meta, "fee", &tx.fee);

    for (i, input) in tx.inputs.iter().enumerate() {
        let tfuel = if i == 0 {
            credit(&input.coins.tfuel_wei) - credit(&tx.fee.tfuel_wei)
        } else {
            credit(&input.coins.tfuel_wei)
        };
        ops.push(
            OperationType::SendTxInput,
            &input.address,
            debit(&input.coins.theta_wei),
            Denom::Theta,
            Some(signer_meta(input)),
        );
        ops.push(
            OperationType::SendTxInput,
            &input.address,
            -tfuel,
            Denom::TFuel,
            Some(signer_meta(input)),
        );
    }

    for output in &tx.outputs {
        ops.push(
            OperationType::SendTxOutput,
            &output.address,
            credit(&output.coins.theta_wei),
            Denom::Theta,
            None,
        );
        ops.push(
            OperationType::SendTxOutput,
            &output.address,
            credit(&output.coins.tfuel_wei),
            Denom::TFuel,
            None,
        );
    }

    if let Some(payer) = tx.inputs.first() {
        push_fee(ops, &payer.address, &tx.fee, None);
    }
}

/// Committed contract call: what actually moved, then the gas charge
fn decode_contract_effects(
    tx: &SmartContractTx,
    changes: &[super::BalanceChange],
    gas_used: u64,
    ops: &mut OperationsBuilder,
) {
    for change in changes {
        let denom = match change.token_type {
            0 => Denom::Theta,
            1 => Denom::TFuel,
            _ => continue,
        };
        if change.delta.is_zero() {
            continue;
        }
        let (op_type, value) = if change.is_negative {
            (OperationType::SmartContractTxFrom, debit(&change.delta))
        } else {
            (OperationType::SmartContractTxTo, credit(&change.delta))
        };
        ops.push(op_type, &change.address, value, denom, None);
    }

    if gas_used != 0 {
        let fee = &tx.gas_price * BigUint::from(gas_used);
        ops.push(
            OperationType::TxFee,
            &tx.from.address,
            debit(&fee),
            Denom::TFuel,
            None,
        );
    }
}

/// Unsubmitted contract call: the nominal value on each side. TFUEL legs
/// are always present, THETA legs only when non-zero.
fn decode_contract_intent(tx: &SmartContractTx, ops: &mut OperationsBuilder) {
    if !tx.from.coins.theta_wei.is_zero() {
        ops.push(
            OperationType::SmartContractTxFrom,
            &tx.from.address,
            debit(&tx.from.coins.theta_wei),
            Denom::Theta,
            Some(signer_meta(&tx.from)),
        );
    }
    ops.push(
        OperationType::SmartContractTxFrom,
        &tx.from.address,
        debit(&tx.from.coins.tfuel_wei),
        Denom::TFuel,
        Some(signer_meta(&tx.from)),
    );
    if !tx.to.coins.theta_wei.is_zero() {
        ops.push(
            OperationType::SmartContractTxTo,
            &tx.to.address,
            credit(&tx.to.coins.theta_wei),
            Denom::Theta,
            None,
        );
    }
    ops.push(
        OperationType::SmartContractTxTo,
        &tx.to.address,
        credit(&tx.to.coins.tfuel_wei),
        Denom::TFuel,
        None,
    );
}

/// Synthetic transaction for a matured stake return: the principal credited
/// back to the source.
pub fn decode_stake_return(ret: &PendingStakeReturn, status: Option<&str>) -> DecodedTx {
    let mut ops = OperationsBuilder::new(status);
    let mut meta = base_metadata(TxKind::WithdrawStake);
    put(&mut meta, "purpose", &ret.tx.purpose);
    put(&mut meta, "holder", &ret.tx.holder.address);

    push_input_legs(
        &mut ops,
        OperationType::WithdrawStakeTxSource,
        &ret.tx.source,
        false,
    );

    DecodedTx {
        metadata: meta,
        operations: ops.build(),
    }
}
