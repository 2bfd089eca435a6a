//! Rosetta operation model
//!
//! An operation is a single balance effect on one account in one currency.
//! Operations inside a transaction are chained: every operation after the
//! first names the one immediately before it in `related_operations`.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::currency::{Currency, Denom};
use crate::error::CodecError;
use crate::primitives::{Address, Bytes};

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccountIdentifier {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<SubAccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AccountIdentifier {
    pub fn new(address: &Address) -> Self {
        Self {
            address: address.to_string(),
            sub_account: None,
            metadata: None,
        }
    }

    pub fn parse_address(&self) -> Result<Address, CodecError> {
        self.address.parse()
    }
}

/// Signed decimal amount in the smallest unit (wei)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
}

impl Amount {
    pub fn new(value: BigInt, denom: Denom) -> Self {
        Self {
            value: value.to_string(),
            currency: denom.currency(),
        }
    }

    pub fn parse_value(&self) -> Result<BigInt, CodecError> {
        BigInt::from_str(&self.value).map_err(|_| CodecError::InvalidAmount(self.value.clone()))
    }

    pub fn denom(&self) -> Result<Denom, CodecError> {
        Denom::from_currency(&self.currency)
            .ok_or_else(|| CodecError::UnsupportedCurrency(self.currency.symbol.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_operations: Vec<OperationIdentifier>,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Operation {
    pub fn kind(&self) -> Option<OperationType> {
        self.op_type.parse().ok()
    }

    pub fn address(&self) -> Result<Address, CodecError> {
        self.account
            .as_ref()
            .ok_or_else(|| CodecError::InvalidAddress("missing account".to_string()))?
            .parse_address()
    }

    pub fn signed_value(&self) -> Result<BigInt, CodecError> {
        self.amount
            .as_ref()
            .ok_or_else(|| CodecError::InvalidAmount("missing amount".to_string()))?
            .parse_value()
    }

    pub fn denom(&self) -> Result<Denom, CodecError> {
        self.amount
            .as_ref()
            .ok_or_else(|| CodecError::InvalidAmount("missing amount".to_string()))?
            .denom()
    }
}

macro_rules! operation_types {
    ($($variant:ident),+ $(,)?) => {
        /// Every operation type the gateway emits or accepts
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OperationType {
            $($variant),+
        }

        impl OperationType {
            pub const ALL: &'static [OperationType] = &[$(OperationType::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(OperationType::$variant => stringify!($variant)),+
                }
            }
        }

        impl FromStr for OperationType {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(OperationType::$variant),)+
                    other => Err(CodecError::UnsupportedTxType(other.to_string())),
                }
            }
        }
    };
}

operation_types!(
    CoinbaseTxProposer,
    CoinbaseTxOutput,
    SlashTxProposer,
    SendTxInput,
    SendTxOutput,
    ReserveFundTxSource,
    ReleaseFundTxSource,
    ServicePaymentTxSource,
    ServicePaymentTxTarget,
    SplitRuleTxInitiator,
    SmartContractTxFrom,
    SmartContractTxTo,
    DepositStakeTxSource,
    DepositStakeTxHolder,
    WithdrawStakeTxSource,
    WithdrawStakeTxHolder,
    StakeRewardDistributionTxHolder,
    StakeRewardDistributionTxBeneficiary,
    TxFee,
);

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequence and signature of the input that produced an operation
pub fn signer_metadata(sequence: u64, signature: &Bytes) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("sequence".to_string(), Value::from(sequence));
    meta.insert("signature".to_string(), Value::from(signature.to_hex()));
    meta
}

/// Appends operations with consecutive indices, chaining each one to its
/// predecessor and stamping the shared status.
#[derive(Debug, Default)]
pub struct OperationsBuilder {
    status: Option<String>,
    ops: Vec<Operation>,
}

impl OperationsBuilder {
    pub fn new(status: Option<&str>) -> Self {
        Self {
            status: status.map(str::to_string),
            ops: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        op_type: OperationType,
        account: &Address,
        value: BigInt,
        denom: Denom,
        metadata: Option<Metadata>,
    ) -> &mut Self {
        let index = self.ops.len() as i64;
        let related_operations = if index > 0 {
            vec![OperationIdentifier { index: index - 1 }]
        } else {
            Vec::new()
        };

        self.ops.push(Operation {
            operation_identifier: OperationIdentifier { index },
            related_operations,
            op_type: op_type.as_str().to_string(),
            status: self.status.clone(),
            account: Some(AccountIdentifier::new(account)),
            amount: Some(Amount::new(value, denom)),
            metadata,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn build(self) -> Vec<Operation> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_names() {
        assert_eq!(OperationType::TxFee.as_str(), "TxFee");
        assert_eq!(
            "SmartContractTxFrom".parse::<OperationType>().unwrap(),
            OperationType::SmartContractTxFrom
        );
        assert!("Transfer".parse::<OperationType>().is_err());
        assert_eq!(OperationType::ALL.len(), 19);
    }

    #[test]
    fn test_builder_chains_related_operations() {
        let addr = Address([1u8; 20]);
        let mut builder = OperationsBuilder::new(Some("valid"));
        builder
            .push(OperationType::SendTxInput, &addr, BigInt::from(-1), Denom::Theta, None)
            .push(OperationType::SendTxOutput, &addr, BigInt::from(1), Denom::Theta, None)
            .push(OperationType::TxFee, &addr, BigInt::from(0), Denom::TFuel, None);
        let ops = builder.build();

        assert!(ops[0].related_operations.is_empty());
        for (i, op) in ops.iter().enumerate().skip(1) {
            assert_eq!(op.operation_identifier.index, i as i64);
            assert_eq!(
                op.related_operations,
                vec![OperationIdentifier { index: i as i64 - 1 }]
            );
            assert_eq!(op.status.as_deref(), Some("valid"));
        }
    }

    #[test]
    fn test_operation_wire_shape() {
        let addr = Address([2u8; 20]);
        let mut builder = OperationsBuilder::new(None);
        builder.push(OperationType::TxFee, &addr, BigInt::from(-7), Denom::TFuel, None);
        let json = serde_json::to_value(&builder.build()[0]).unwrap();

        assert_eq!(json["operation_identifier"]["index"], 0);
        assert_eq!(json["type"], "TxFee");
        assert_eq!(json["amount"]["value"], "-7");
        assert_eq!(json["amount"]["currency"]["symbol"], "TFUEL");
        assert_eq!(json["amount"]["currency"]["decimals"], 18);
        assert!(json.get("related_operations").is_none());
        assert!(json.get("status").is_none());
    }
}
