//! Operation descriptions for transaction construction
//!
//! Only two kinds can be built from scratch: a one-to-one send and a
//! contract call. Each declares an ordered list of slots and an operation
//! list must fill exactly one of them.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::currency::Denom;
use crate::error::{CodecError, CodecResult};
use crate::operation::{Operation, OperationType};
use crate::primitives::Address;
use crate::tx::TxKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    NegativeOrZero,
    PositiveOrZero,
}

impl AmountSign {
    fn admits(self, value: &BigInt) -> bool {
        match self {
            AmountSign::NegativeOrZero => !value.is_positive(),
            AmountSign::PositiveOrZero => !value.is_negative(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSlot {
    pub op_type: OperationType,
    pub sign: AmountSign,
    pub denom: Denom,
}

const fn slot(op_type: OperationType, sign: AmountSign, denom: Denom) -> OperationSlot {
    OperationSlot {
        op_type,
        sign,
        denom,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Description {
    pub kind: TxKind,
    pub slots: &'static [OperationSlot],
}

pub const SEND: Description = Description {
    kind: TxKind::Send,
    slots: &[
        slot(OperationType::SendTxInput, AmountSign::NegativeOrZero, Denom::Theta),
        slot(OperationType::SendTxInput, AmountSign::NegativeOrZero, Denom::TFuel),
        slot(OperationType::SendTxOutput, AmountSign::PositiveOrZero, Denom::Theta),
        slot(OperationType::SendTxOutput, AmountSign::PositiveOrZero, Denom::TFuel),
        slot(OperationType::TxFee, AmountSign::NegativeOrZero, Denom::TFuel),
    ],
};

pub const SMART_CONTRACT: Description = Description {
    kind: TxKind::SmartContract,
    slots: &[
        slot(OperationType::SmartContractTxFrom, AmountSign::NegativeOrZero, Denom::TFuel),
        slot(OperationType::SmartContractTxTo, AmountSign::PositiveOrZero, Denom::TFuel),
    ],
};

pub const CONSTRUCTIBLE: [Description; 2] = [SEND, SMART_CONTRACT];

/// An operation list that filled every slot of `description`
#[derive(Debug, Clone)]
pub struct Matched<'a> {
    pub description: Description,
    pub operations: &'a [Operation],
    /// Parsed account of each slot, in slot order
    pub accounts: Vec<Address>,
    /// Signed amount of each slot, in slot order
    pub amounts: Vec<BigInt>,
}

impl Matched<'_> {
    pub fn kind(&self) -> TxKind {
        self.description.kind
    }

    /// Account of the first slot, which is always the signer
    pub fn signer(&self) -> Address {
        self.accounts[0]
    }

    /// Fee of a matched send as a non-negative amount
    pub fn send_fee(&self) -> Option<BigInt> {
        (self.kind() == TxKind::Send).then(|| -&self.amounts[4])
    }
}

fn fill(description: Description, ops: &[Operation]) -> Result<(Vec<Address>, Vec<BigInt>), String> {
    if ops.len() != description.slots.len() {
        return Err(format!(
            "{} expects {} operations, got {}",
            description.kind,
            description.slots.len(),
            ops.len()
        ));
    }

    let mut accounts = Vec::with_capacity(ops.len());
    let mut amounts = Vec::with_capacity(ops.len());
    for (i, (slot, op)) in description.slots.iter().zip(ops).enumerate() {
        if op.op_type != slot.op_type.as_str() {
            return Err(format!(
                "{}: operation {} is {}, expected {}",
                description.kind, i, op.op_type, slot.op_type
            ));
        }
        let address = op.address().map_err(|e| format!("operation {}: {}", i, e))?;
        let denom = op.denom().map_err(|e| format!("operation {}: {}", i, e))?;
        if denom != slot.denom {
            return Err(format!(
                "{}: operation {} must be in {}",
                description.kind,
                i,
                slot.denom.symbol()
            ));
        }
        let value = op.signed_value().map_err(|e| format!("operation {}: {}", i, e))?;
        if !slot.sign.admits(&value) {
            return Err(format!(
                "{}: operation {} has the wrong sign",
                description.kind, i
            ));
        }
        accounts.push(address);
        amounts.push(value);
    }
    Ok((accounts, amounts))
}

/// Match `ops` against the constructible kinds in order; the first that fits
/// wins. A miss is reported once, with every candidate's reason.
pub fn match_operations(ops: &[Operation]) -> CodecResult<Matched<'_>> {
    let mut reasons = Vec::new();
    for description in CONSTRUCTIBLE {
        match fill(description, ops) {
            Ok((accounts, amounts)) => {
                return Ok(Matched {
                    description,
                    operations: ops,
                    accounts,
                    amounts,
                })
            }
            Err(reason) => reasons.push(reason),
        }
    }
    Err(CodecError::UnmatchedOperations(reasons.join("; ")))
}

/// Account rules of a one-to-one send: both input legs and the fee come
/// from one account, both output legs go to one account, and the two differ.
pub fn validate_send(matched: &Matched<'_>) -> CodecResult<()> {
    if matched.kind() != TxKind::Send {
        return Ok(());
    }
    let a = &matched.accounts;
    let mismatch = |reason: &str| CodecError::ShapeMismatch {
        kind: TxKind::Send.name(),
        reason: reason.to_string(),
    };

    if a[0] != a[1] || a[1] != a[4] {
        return Err(mismatch("from address not matching"));
    }
    if a[2] != a[3] {
        return Err(mismatch("to address not matching"));
    }
    if a[1] == a[3] {
        return Err(mismatch("from and to accounts are the same"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationsBuilder;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn send_ops(from: u8, to: u8, fee_payer: u8) -> Vec<Operation> {
        let mut b = OperationsBuilder::new(None);
        b.push(OperationType::SendTxInput, &addr(from), BigInt::from(-10), Denom::Theta, None)
            .push(OperationType::SendTxInput, &addr(from), BigInt::from(-20), Denom::TFuel, None)
            .push(OperationType::SendTxOutput, &addr(to), BigInt::from(10), Denom::Theta, None)
            .push(OperationType::SendTxOutput, &addr(to), BigInt::from(20), Denom::TFuel, None)
            .push(OperationType::TxFee, &addr(fee_payer), BigInt::from(-3), Denom::TFuel, None);
        b.build()
    }

    fn contract_ops() -> Vec<Operation> {
        let mut b = OperationsBuilder::new(None);
        b.push(OperationType::SmartContractTxFrom, &addr(1), BigInt::from(-5), Denom::TFuel, None)
            .push(OperationType::SmartContractTxTo, &addr(2), BigInt::from(5), Denom::TFuel, None);
        b.build()
    }

    #[test]
    fn test_send_matches() {
        let ops = send_ops(1, 2, 1);
        let matched = match_operations(&ops).unwrap();
        assert_eq!(matched.kind(), TxKind::Send);
        assert_eq!(matched.signer(), addr(1));
        assert_eq!(matched.send_fee(), Some(BigInt::from(3)));
        validate_send(&matched).unwrap();
    }

    #[test]
    fn test_contract_matches() {
        let ops = contract_ops();
        let matched = match_operations(&ops).unwrap();
        assert_eq!(matched.kind(), TxKind::SmartContract);
        assert_eq!(matched.send_fee(), None);
    }

    #[test]
    fn test_three_operations_unmatched() {
        let mut ops = contract_ops();
        ops.push(ops[1].clone());
        let err = match_operations(&ops).unwrap_err();
        assert!(matches!(err, CodecError::UnmatchedOperations(_)));
    }

    #[test]
    fn test_wrong_currency_unmatched() {
        let mut ops = contract_ops();
        ops[0].amount.as_mut().unwrap().currency = Denom::Theta.currency();
        assert!(matches!(
            match_operations(&ops),
            Err(CodecError::UnmatchedOperations(_))
        ));
    }

    #[test]
    fn test_send_account_rules() {
        let ops = send_ops(1, 2, 3);
        let matched = match_operations(&ops).unwrap();
        assert!(validate_send(&matched).is_err());

        let ops = send_ops(1, 1, 1);
        let matched = match_operations(&ops).unwrap();
        assert!(validate_send(&matched).is_err());
    }
}
