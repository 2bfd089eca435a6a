//! Operations + metadata → native transaction

use num_bigint::{BigInt, BigUint};

use super::metadata::{
    get_biguint, get_bytes, get_json, get_string, get_u64, get_u8, require_address,
};
use crate::chain::DEFAULT_GAS_LIMIT;
use crate::coins::Coins;
use crate::currency::Denom;
use crate::error::{CodecError, CodecResult};
use crate::operation::{Metadata, Operation, OperationType};
use crate::primitives::{flex_u64, Address, Bytes};
use crate::tx::*;

/// Walks an operation list in order, checking each step against the kind's
/// fixed layout.
struct OpCursor<'a> {
    kind: TxKind,
    ops: &'a [Operation],
    pos: usize,
}

/// One balance leg: account, currency and signed amount
struct Leg<'a> {
    op: &'a Operation,
    address: Address,
    denom: Denom,
    value: BigInt,
}

impl<'a> OpCursor<'a> {
    fn new(kind: TxKind, ops: &'a [Operation]) -> Self {
        Self { kind, ops, pos: 0 }
    }

    fn mismatch(&self, reason: impl Into<String>) -> CodecError {
        CodecError::ShapeMismatch {
            kind: self.kind.name(),
            reason: reason.into(),
        }
    }

    fn next_if(&mut self, op_type: OperationType) -> CodecResult<Option<Leg<'a>>> {
        match self.ops.get(self.pos) {
            Some(op) if op.op_type == op_type.as_str() => {
                self.pos += 1;
                Ok(Some(self.leg(op)?))
            }
            _ => Ok(None),
        }
    }

    fn expect(&mut self, op_type: OperationType) -> CodecResult<Leg<'a>> {
        let pos = self.pos;
        match self.next_if(op_type)? {
            Some(leg) => Ok(leg),
            None => {
                let found = self
                    .ops
                    .get(pos)
                    .map(|op| op.op_type.as_str())
                    .unwrap_or("end of operations");
                Err(self.mismatch(format!(
                    "expected {} at index {}, found {}",
                    op_type, pos, found
                )))
            }
        }
    }

    fn finish(&self) -> CodecResult<()> {
        if self.pos != self.ops.len() {
            return Err(self.mismatch(format!(
                "unexpected {} at index {}",
                self.ops[self.pos].op_type, self.pos
            )));
        }
        Ok(())
    }

    fn leg(&self, op: &'a Operation) -> CodecResult<Leg<'a>> {
        Ok(Leg {
            op,
            address: op.address()?,
            denom: op.denom()?,
            value: op.signed_value()?,
        })
    }

    /// Magnitude of a leg that must not be positive
    fn debit(&self, leg: &Leg<'_>) -> CodecResult<BigUint> {
        (-&leg.value).to_biguint().ok_or_else(|| {
            self.mismatch(format!(
                "{} at index {} must not be positive",
                leg.op.op_type, leg.op.operation_identifier.index
            ))
        })
    }

    /// Magnitude of a leg that must not be negative
    fn credit(&self, leg: &Leg<'_>) -> CodecResult<BigUint> {
        leg.value.to_biguint().ok_or_else(|| {
            self.mismatch(format!(
                "{} at index {} must not be negative",
                leg.op.op_type, leg.op.operation_identifier.index
            ))
        })
    }

    fn require_denom(&self, leg: &Leg<'_>, denom: Denom) -> CodecResult<()> {
        if leg.denom != denom {
            return Err(self.mismatch(format!(
                "{} at index {} must be in {}",
                leg.op.op_type,
                leg.op.operation_identifier.index,
                denom.symbol()
            )));
        }
        Ok(())
    }

    fn require_account(&self, leg: &Leg<'_>, expected: &Address) -> CodecResult<()> {
        if leg.address != *expected {
            return Err(self.mismatch(format!(
                "{} at index {} must belong to {}",
                leg.op.op_type, leg.op.operation_identifier.index, expected
            )));
        }
        Ok(())
    }

    /// Debit legs of one party, at most one per currency. Returns the
    /// party address (if any leg was present), its coins and the first leg.
    fn debit_legs(
        &mut self,
        op_type: OperationType,
    ) -> CodecResult<(Option<Address>, Coins, Option<&'a Operation>)> {
        self.party_legs(op_type, true)
    }

    fn credit_legs(
        &mut self,
        op_type: OperationType,
    ) -> CodecResult<(Option<Address>, Coins, Option<&'a Operation>)> {
        self.party_legs(op_type, false)
    }

    fn party_legs(
        &mut self,
        op_type: OperationType,
        outgoing: bool,
    ) -> CodecResult<(Option<Address>, Coins, Option<&'a Operation>)> {
        let mut address = None;
        let mut coins = Coins::default();
        let mut first = None;
        let mut seen = Vec::new();

        while let Some(leg) = self.next_if(op_type)? {
            match address {
                None => address = Some(leg.address),
                Some(a) => self.require_account(&leg, &a)?,
            }
            if seen.contains(&leg.denom) {
                return Err(self.mismatch(format!(
                    "duplicate {} leg for {}",
                    leg.denom.symbol(),
                    op_type
                )));
            }
            seen.push(leg.denom);
            let value = if outgoing {
                self.debit(&leg)?
            } else {
                self.credit(&leg)?
            };
            coins.set(leg.denom, value);
            first.get_or_insert(leg.op);
        }
        Ok((address, coins, first))
    }

    /// Fee leg: TFUEL, not positive, charged to `payer` when given
    fn fee(&mut self, payer: Option<&Address>) -> CodecResult<(Address, Coins, &'a Operation)> {
        let leg = self.expect(OperationType::TxFee)?;
        self.require_denom(&leg, Denom::TFuel)?;
        if let Some(payer) = payer {
            self.require_account(&leg, payer)?;
        }
        let fee = self.debit(&leg)?;
        Ok((leg.address, Coins::tfuel(fee), leg.op))
    }
}

/// Sequence and signature of a signing input: the operation's own metadata
/// first, then the transaction metadata (construction requests carry the
/// sequence there).
fn signer_fields(op: Option<&Operation>, meta: &Metadata) -> CodecResult<(u64, Bytes)> {
    let op_meta = op.and_then(|op| op.metadata.as_ref());

    let sequence = match op_meta.and_then(|m| m.get("sequence")) {
        Some(v) => flex_u64::from_value(v).ok_or(CodecError::InvalidMetadata {
            field: "sequence",
            reason: format!("not an integer: {}", v),
        })?,
        None => get_u64(meta, "sequence")?.unwrap_or(0),
    };

    let signature = match op_meta.map(|m| get_bytes(m, "signature")).transpose()?.flatten() {
        Some(sig) => sig,
        None => get_bytes(meta, "signature")?.unwrap_or_default(),
    };

    Ok((sequence, signature))
}

fn input(address: Address, coins: Coins, op: Option<&Operation>, meta: &Metadata) -> CodecResult<TxInput> {
    let (sequence, signature) = signer_fields(op, meta)?;
    Ok(TxInput {
        address,
        coins,
        sequence,
        signature,
    })
}

/// Rebuild a native transaction of `kind` from its operations. The layout
/// is the one `decode` produces; anything else is a shape mismatch.
pub fn encode(kind: TxKind, ops: &[Operation], meta: &Metadata) -> CodecResult<NativeTx> {
    let mut cur = OpCursor::new(kind, ops);

    let tx = match kind {
        TxKind::Coinbase => {
            let proposer = cur.expect(OperationType::CoinbaseTxProposer)?;
            let mut outputs = Vec::new();
            while let Some(leg) = cur.next_if(OperationType::CoinbaseTxOutput)? {
                cur.require_denom(&leg, Denom::TFuel)?;
                outputs.push(TxOutput {
                    address: leg.address,
                    coins: Coins::tfuel(cur.credit(&leg)?),
                });
            }
            NativeTx::Coinbase(CoinbaseTx {
                proposer: input(proposer.address, Coins::default(), Some(proposer.op), meta)?,
                outputs,
                block_height: get_u64(meta, "block_height")?.unwrap_or(0),
            })
        }
        TxKind::Slash => {
            let proposer = cur.expect(OperationType::SlashTxProposer)?;
            NativeTx::Slash(SlashTx {
                proposer: input(proposer.address, Coins::default(), Some(proposer.op), meta)?,
                slashed_address: require_address(meta, "slashed_address")?,
                reserve_sequence: get_u64(meta, "reserve_sequence")?.unwrap_or(0),
                slash_proof: get_bytes(meta, "slash_proof")?.unwrap_or_default(),
            })
        }
        TxKind::Send => encode_send(&mut cur, meta)?,
        TxKind::ReserveFund => {
            let (addr, coins, first) = cur.debit_legs(OperationType::ReserveFundTxSource)?;
            let (payer, fee, fee_op) = cur.fee(addr.as_ref())?;
            NativeTx::ReserveFund(ReserveFundTx {
                fee,
                source: input(payer, coins, first.or(Some(fee_op)), meta)?,
                resource_ids: get_json(meta, "resource_ids")?.unwrap_or_default(),
                collateral: get_json(meta, "collateral")?.unwrap_or_default(),
                duration: get_u64(meta, "duration")?.unwrap_or(0),
            })
        }
        TxKind::ReleaseFund => {
            let (addr, coins, first) = cur.debit_legs(OperationType::ReleaseFundTxSource)?;
            let (payer, fee, fee_op) = cur.fee(addr.as_ref())?;
            NativeTx::ReleaseFund(ReleaseFundTx {
                fee,
                source: input(payer, coins, first.or(Some(fee_op)), meta)?,
                reserve_sequence: get_u64(meta, "reserve_sequence")?.unwrap_or(0),
            })
        }
        TxKind::ServicePayment => {
            let source = cur.expect(OperationType::ServicePaymentTxSource)?;
            cur.require_denom(&source, Denom::TFuel)?;
            let target = cur.expect(OperationType::ServicePaymentTxTarget)?;
            cur.require_denom(&target, Denom::TFuel)?;
            let (_, fee, _) = cur.fee(Some(&target.address))?;
            NativeTx::ServicePayment(ServicePaymentTx {
                fee,
                source: input(
                    source.address,
                    Coins::tfuel(cur.debit(&source)?),
                    Some(source.op),
                    meta,
                )?,
                target: input(
                    target.address,
                    Coins::tfuel(cur.credit(&target)?),
                    Some(target.op),
                    meta,
                )?,
                payment_sequence: get_u64(meta, "payment_sequence")?.unwrap_or(0),
                reserve_sequence: get_u64(meta, "reserve_sequence")?.unwrap_or(0),
                resource_id: get_string(meta, "resource_id")?.unwrap_or_default(),
            })
        }
        TxKind::SplitRule => {
            let initiator = cur.expect(OperationType::SplitRuleTxInitiator)?;
            cur.require_denom(&initiator, Denom::TFuel)?;
            let (_, fee, _) = cur.fee(Some(&initiator.address))?;
            NativeTx::SplitRule(SplitRuleTx {
                fee,
                resource_id: get_string(meta, "resource_id")?.unwrap_or_default(),
                initiator: input(
                    initiator.address,
                    Coins::tfuel(cur.debit(&initiator)?),
                    Some(initiator.op),
                    meta,
                )?,
                splits: get_json(meta, "splits")?.unwrap_or_default(),
                duration: get_u64(meta, "duration")?.unwrap_or(0),
            })
        }
        TxKind::SmartContract => {
            let (from, from_coins, first) = cur.debit_legs(OperationType::SmartContractTxFrom)?;
            let (to, to_coins, _) = cur.credit_legs(OperationType::SmartContractTxTo)?;
            let from = from.ok_or_else(|| cur.mismatch("missing SmartContractTxFrom"))?;
            let to = to.ok_or_else(|| cur.mismatch("missing SmartContractTxTo"))?;
            NativeTx::SmartContract(SmartContractTx {
                from: input(from, from_coins, first, meta)?,
                to: TxOutput {
                    address: to,
                    coins: to_coins,
                },
                gas_limit: get_u64(meta, "gas_limit")?.unwrap_or(DEFAULT_GAS_LIMIT),
                gas_price: get_biguint(meta, "gas_price")?.unwrap_or_default(),
                data: get_bytes(meta, "data")?.unwrap_or_default(),
            })
        }
        TxKind::DepositStake | TxKind::DepositStakeV2 => {
            let (addr, coins, first) = cur.debit_legs(OperationType::DepositStakeTxSource)?;
            let (payer, fee, fee_op) = cur.fee(addr.as_ref())?;
            let source = input(payer, coins, first.or(Some(fee_op)), meta)?;
            let holder = TxOutput {
                address: require_address(meta, "holder")?,
                coins: Coins::default(),
            };
            let purpose = get_u8(meta, "purpose")?.ok_or(CodecError::MissingMetadata("purpose"))?;

            if kind == TxKind::DepositStake {
                NativeTx::DepositStake(DepositStakeTx {
                    fee,
                    source,
                    holder,
                    purpose,
                })
            } else {
                NativeTx::DepositStakeV2(DepositStakeTxV2 {
                    fee,
                    source,
                    holder,
                    purpose,
                    bls_pubkey: get_bytes(meta, "bls_pub_key")?.unwrap_or_default(),
                    bls_pop: get_bytes(meta, "bls_pop")?.unwrap_or_default(),
                    holder_sig: get_bytes(meta, "holder_sig")?.unwrap_or_default(),
                })
            }
        }
        TxKind::WithdrawStake => {
            let (payer, fee, fee_op) = cur.fee(None)?;
            NativeTx::WithdrawStake(WithdrawStakeTx {
                fee,
                source: input(payer, Coins::default(), Some(fee_op), meta)?,
                holder: TxOutput {
                    address: require_address(meta, "holder")?,
                    coins: Coins::default(),
                },
                purpose: get_u8(meta, "purpose")?.ok_or(CodecError::MissingMetadata("purpose"))?,
            })
        }
        TxKind::StakeRewardDistribution => {
            let (beneficiary, coins, _) =
                cur.credit_legs(OperationType::StakeRewardDistributionTxBeneficiary)?;
            let (holder, fee, fee_op) = cur.fee(None)?;
            let beneficiary = match beneficiary {
                Some(a) => a,
                None => require_address(meta, "beneficiary")?,
            };
            NativeTx::StakeRewardDistribution(StakeRewardDistributionTx {
                fee,
                holder: input(holder, Coins::default(), Some(fee_op), meta)?,
                beneficiary: TxOutput {
                    address: beneficiary,
                    coins,
                },
                split_basis_point: get_u64(meta, "split_basis_point")?.unwrap_or(0),
            })
        }
    };

    cur.finish()?;
    Ok(tx)
}

/// Inputs as (THETA, TFUEL) pairs, outputs as pairs, then the fee charged to
/// the first input, whose TFUEL leg is net of the fee.
fn encode_send(cur: &mut OpCursor<'_>, meta: &Metadata) -> CodecResult<NativeTx> {
    let mut inputs: Vec<TxInput> = Vec::new();
    let mut first_tfuel: Option<BigInt> = None;

    while let Some(theta) = cur.next_if(OperationType::SendTxInput)? {
        cur.require_denom(&theta, Denom::Theta)?;
        let tfuel = cur.expect(OperationType::SendTxInput)?;
        cur.require_denom(&tfuel, Denom::TFuel)?;
        cur.require_account(&tfuel, &theta.address)?;

        let theta_wei = cur.debit(&theta)?;
        let tfuel_wei = if inputs.is_empty() {
            // fee is added back once it is known
            first_tfuel = Some(-&tfuel.value);
            BigUint::default()
        } else {
            cur.debit(&tfuel)?
        };
        inputs.push(input(theta.address, Coins::new(theta_wei, tfuel_wei), Some(theta.op), meta)?);
    }

    let mut outputs = Vec::new();
    while let Some(theta) = cur.next_if(OperationType::SendTxOutput)? {
        cur.require_denom(&theta, Denom::Theta)?;
        let tfuel = cur.expect(OperationType::SendTxOutput)?;
        cur.require_denom(&tfuel, Denom::TFuel)?;
        cur.require_account(&tfuel, &theta.address)?;
        outputs.push(TxOutput {
            address: theta.address,
            coins: Coins::new(cur.credit(&theta)?, cur.credit(&tfuel)?),
        });
    }

    let payer = inputs
        .first()
        .map(|i| i.address)
        .ok_or_else(|| cur.mismatch("at least one SendTxInput pair is required"))?;
    let (_, fee, _) = cur.fee(Some(&payer))?;

    if let (Some(net), Some(first)) = (first_tfuel, inputs.first_mut()) {
        first.coins.tfuel_wei = (net + BigInt::from(fee.tfuel_wei.clone()))
            .to_biguint()
            .ok_or_else(|| cur.mismatch("first input spends less TFUEL than the fee"))?;
    }

    Ok(NativeTx::Send(SendTx {
        fee,
        inputs,
        outputs,
    }))
}
