//! Native transaction formats
//!
//! Transactions arrive in two shapes: as JSON objects inside node RPC results
//! (block and transaction queries) and as RLP bytes on the construction path.
//! Wire bytes are `rlp(kind) ‖ rlp(body)`.

use std::fmt;

use alloy_rlp::{BufMut, Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coins::{biguint_length, decode_biguint, encode_biguint, wei, Coins};
use crate::error::{CodecError, CodecResult};
use crate::primitives::{flex_u64, Address, Bytes, Hash};

macro_rules! tx_kinds {
    ($($variant:ident = $code:expr => $name:expr),+ $(,)?) => {
        /// Transaction type tag, as numbered by the node
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TxKind {
            $($variant),+
        }

        impl TxKind {
            pub fn code(self) -> u8 {
                match self {
                    $(TxKind::$variant => $code),+
                }
            }

            pub fn from_code(code: u64) -> CodecResult<Self> {
                match code {
                    $($code => Ok(TxKind::$variant),)+
                    other => Err(CodecError::UnknownTxType(other)),
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(TxKind::$variant => $name),+
                }
            }
        }
    };
}

tx_kinds!(
    Coinbase = 0 => "CoinbaseTx",
    Slash = 1 => "SlashTx",
    Send = 2 => "SendTx",
    ReserveFund = 3 => "ReserveFundTx",
    ReleaseFund = 4 => "ReleaseFundTx",
    ServicePayment = 5 => "ServicePaymentTx",
    SplitRule = 6 => "SplitRuleTx",
    SmartContract = 7 => "SmartContractTx",
    DepositStake = 8 => "DepositStakeTx",
    WithdrawStake = 9 => "WithdrawStakeTx",
    DepositStakeV2 = 10 => "DepositStakeTxV2",
    StakeRewardDistribution = 11 => "StakeRewardDistributionTx",
);

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct TxInput {
    #[serde(alias = "Address")]
    pub address: Address,
    #[serde(alias = "Coins", default)]
    pub coins: Coins,
    #[serde(alias = "Sequence", default, with = "flex_u64")]
    pub sequence: u64,
    #[serde(alias = "Signature", default)]
    pub signature: Bytes,
}

impl TxInput {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct TxOutput {
    #[serde(alias = "Address")]
    pub address: Address,
    #[serde(alias = "Coins", default)]
    pub coins: Coins,
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Split {
    #[serde(alias = "Address")]
    pub address: Address,
    #[serde(alias = "Percentage", default, with = "flex_u64")]
    pub percentage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct CoinbaseTx {
    #[serde(alias = "Proposer")]
    pub proposer: TxInput,
    #[serde(alias = "Outputs", default)]
    pub outputs: Vec<TxOutput>,
    #[serde(alias = "BlockHeight", default, with = "flex_u64")]
    pub block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct SlashTx {
    #[serde(alias = "Proposer")]
    pub proposer: TxInput,
    #[serde(alias = "SlashedAddress", default)]
    pub slashed_address: Address,
    #[serde(alias = "ReserveSequence", default, with = "flex_u64")]
    pub reserve_sequence: u64,
    #[serde(alias = "SlashProof", default)]
    pub slash_proof: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct SendTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Inputs", default)]
    pub inputs: Vec<TxInput>,
    #[serde(alias = "Outputs", default)]
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct ReserveFundTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "ResourceIDs", default)]
    pub resource_ids: Vec<String>,
    #[serde(alias = "Collateral", default)]
    pub collateral: Coins,
    #[serde(alias = "Duration", default, with = "flex_u64")]
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct ReleaseFundTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "ReserveSequence", default, with = "flex_u64")]
    pub reserve_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct ServicePaymentTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "Target")]
    pub target: TxInput,
    #[serde(alias = "PaymentSequence", default, with = "flex_u64")]
    pub payment_sequence: u64,
    #[serde(alias = "ReserveSequence", default, with = "flex_u64")]
    pub reserve_sequence: u64,
    #[serde(alias = "ResourceID", default)]
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct SplitRuleTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "ResourceID", default)]
    pub resource_id: String,
    #[serde(alias = "Initiator")]
    pub initiator: TxInput,
    #[serde(alias = "Splits", default)]
    pub splits: Vec<Split>,
    #[serde(alias = "Duration", default, with = "flex_u64")]
    pub duration: u64,
}

/// Contract call. `gas_price` is a big integer, so the RLP codec is written
/// out by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartContractTx {
    #[serde(alias = "From")]
    pub from: TxInput,
    #[serde(alias = "To")]
    pub to: TxOutput,
    #[serde(alias = "GasLimit", default, with = "flex_u64")]
    pub gas_limit: u64,
    #[serde(alias = "GasPrice", default, with = "wei")]
    pub gas_price: BigUint,
    #[serde(alias = "Data", default)]
    pub data: Bytes,
}

impl SmartContractTx {
    fn payload_length(&self) -> usize {
        self.from.length()
            + self.to.length()
            + self.gas_limit.length()
            + biguint_length(&self.gas_price)
            + self.data.length()
    }
}

impl Encodable for SmartContractTx {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.from.encode(out);
        self.to.encode(out);
        self.gas_limit.encode(out);
        encode_biguint(&self.gas_price, out);
        self.data.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for SmartContractTx {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started = buf.len();
        let tx = Self {
            from: TxInput::decode(buf)?,
            to: TxOutput::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            gas_price: decode_biguint(buf)?,
            data: Bytes::decode(buf)?,
        };
        let consumed = started - buf.len();
        if consumed != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: consumed,
            });
        }
        Ok(tx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct DepositStakeTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "Holder")]
    pub holder: TxOutput,
    #[serde(alias = "Purpose", default)]
    pub purpose: u8,
}

/// Deposit with the BLS material guardians and edge nodes register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct DepositStakeTxV2 {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "Holder")]
    pub holder: TxOutput,
    #[serde(alias = "Purpose", default)]
    pub purpose: u8,
    #[serde(alias = "BlsPubkey", default)]
    pub bls_pubkey: Bytes,
    #[serde(alias = "BlsPop", default)]
    pub bls_pop: Bytes,
    #[serde(alias = "HolderSig", default)]
    pub holder_sig: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct WithdrawStakeTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Source")]
    pub source: TxInput,
    #[serde(alias = "Holder")]
    pub holder: TxOutput,
    #[serde(alias = "Purpose", default)]
    pub purpose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, RlpEncodable, RlpDecodable)]
pub struct StakeRewardDistributionTx {
    #[serde(alias = "Fee", default)]
    pub fee: Coins,
    #[serde(alias = "Holder")]
    pub holder: TxInput,
    #[serde(alias = "Beneficiary")]
    pub beneficiary: TxOutput,
    #[serde(alias = "SplitBasisPoint", default, with = "flex_u64")]
    pub split_basis_point: u64,
}

/// Closed union over every native transaction kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeTx {
    Coinbase(CoinbaseTx),
    Slash(SlashTx),
    Send(SendTx),
    ReserveFund(ReserveFundTx),
    ReleaseFund(ReleaseFundTx),
    ServicePayment(ServicePaymentTx),
    SplitRule(SplitRuleTx),
    SmartContract(SmartContractTx),
    DepositStake(DepositStakeTx),
    WithdrawStake(WithdrawStakeTx),
    DepositStakeV2(DepositStakeTxV2),
    StakeRewardDistribution(StakeRewardDistributionTx),
}

impl NativeTx {
    pub fn kind(&self) -> TxKind {
        match self {
            NativeTx::Coinbase(_) => TxKind::Coinbase,
            NativeTx::Slash(_) => TxKind::Slash,
            NativeTx::Send(_) => TxKind::Send,
            NativeTx::ReserveFund(_) => TxKind::ReserveFund,
            NativeTx::ReleaseFund(_) => TxKind::ReleaseFund,
            NativeTx::ServicePayment(_) => TxKind::ServicePayment,
            NativeTx::SplitRule(_) => TxKind::SplitRule,
            NativeTx::SmartContract(_) => TxKind::SmartContract,
            NativeTx::DepositStake(_) => TxKind::DepositStake,
            NativeTx::WithdrawStake(_) => TxKind::WithdrawStake,
            NativeTx::DepositStakeV2(_) => TxKind::DepositStakeV2,
            NativeTx::StakeRewardDistribution(_) => TxKind::StakeRewardDistribution,
        }
    }

    /// Parse the `raw` object the node attaches to each transaction
    pub fn from_json(kind: TxKind, raw: Value) -> CodecResult<Self> {
        let tx = match kind {
            TxKind::Coinbase => NativeTx::Coinbase(serde_json::from_value(raw)?),
            TxKind::Slash => NativeTx::Slash(serde_json::from_value(raw)?),
            TxKind::Send => NativeTx::Send(serde_json::from_value(raw)?),
            TxKind::ReserveFund => NativeTx::ReserveFund(serde_json::from_value(raw)?),
            TxKind::ReleaseFund => NativeTx::ReleaseFund(serde_json::from_value(raw)?),
            TxKind::ServicePayment => NativeTx::ServicePayment(serde_json::from_value(raw)?),
            TxKind::SplitRule => NativeTx::SplitRule(serde_json::from_value(raw)?),
            TxKind::SmartContract => NativeTx::SmartContract(serde_json::from_value(raw)?),
            TxKind::DepositStake => NativeTx::DepositStake(serde_json::from_value(raw)?),
            TxKind::WithdrawStake => NativeTx::WithdrawStake(serde_json::from_value(raw)?),
            TxKind::DepositStakeV2 => NativeTx::DepositStakeV2(serde_json::from_value(raw)?),
            TxKind::StakeRewardDistribution => {
                NativeTx::StakeRewardDistribution(serde_json::from_value(raw)?)
            }
        };
        Ok(tx)
    }

    fn encode_body(&self, out: &mut dyn BufMut) {
        match self {
            NativeTx::Coinbase(tx) => tx.encode(out),
            NativeTx::Slash(tx) => tx.encode(out),
            NativeTx::Send(tx) => tx.encode(out),
            NativeTx::ReserveFund(tx) => tx.encode(out),
            NativeTx::ReleaseFund(tx) => tx.encode(out),
            NativeTx::ServicePayment(tx) => tx.encode(out),
            NativeTx::SplitRule(tx) => tx.encode(out),
            NativeTx::SmartContract(tx) => tx.encode(out),
            NativeTx::DepositStake(tx) => tx.encode(out),
            NativeTx::WithdrawStake(tx) => tx.encode(out),
            NativeTx::DepositStakeV2(tx) => tx.encode(out),
            NativeTx::StakeRewardDistribution(tx) => tx.encode(out),
        }
    }

    /// Wire bytes: `rlp(kind) ‖ rlp(body)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.kind().code().encode(&mut out);
        self.encode_body(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut buf = bytes;
        let kind = TxKind::from_code(u8::decode(&mut buf)? as u64)?;
        let tx = match kind {
            TxKind::Coinbase => NativeTx::Coinbase(Decodable::decode(&mut buf)?),
            TxKind::Slash => NativeTx::Slash(Decodable::decode(&mut buf)?),
            TxKind::Send => NativeTx::Send(Decodable::decode(&mut buf)?),
            TxKind::ReserveFund => NativeTx::ReserveFund(Decodable::decode(&mut buf)?),
            TxKind::ReleaseFund => NativeTx::ReleaseFund(Decodable::decode(&mut buf)?),
            TxKind::ServicePayment => NativeTx::ServicePayment(Decodable::decode(&mut buf)?),
            TxKind::SplitRule => NativeTx::SplitRule(Decodable::decode(&mut buf)?),
            TxKind::SmartContract => NativeTx::SmartContract(Decodable::decode(&mut buf)?),
            TxKind::DepositStake => NativeTx::DepositStake(Decodable::decode(&mut buf)?),
            TxKind::WithdrawStake => NativeTx::WithdrawStake(Decodable::decode(&mut buf)?),
            TxKind::DepositStakeV2 => NativeTx::DepositStakeV2(Decodable::decode(&mut buf)?),
            TxKind::StakeRewardDistribution => {
                NativeTx::StakeRewardDistribution(Decodable::decode(&mut buf)?)
            }
        };
        if !buf.is_empty() {
            return Err(CodecError::TrailingBytes(buf.len()));
        }
        Ok(tx)
    }

    /// Content hash of the wire bytes
    pub fn hash(&self) -> Hash {
        Hash::keccak(&self.to_bytes())
    }

    /// Every input that carries a signature
    fn signing_inputs_mut(&mut self) -> Vec<&mut TxInput> {
        match self {
            NativeTx::Coinbase(tx) => vec![&mut tx.proposer],
            NativeTx::Slash(tx) => vec![&mut tx.proposer],
            NativeTx::Send(tx) => tx.inputs.iter_mut().collect(),
            NativeTx::ReserveFund(tx) => vec![&mut tx.source],
            NativeTx::ReleaseFund(tx) => vec![&mut tx.source],
            NativeTx::ServicePayment(tx) => vec![&mut tx.source, &mut tx.target],
            NativeTx::SplitRule(tx) => vec![&mut tx.initiator],
            NativeTx::SmartContract(tx) => vec![&mut tx.from],
            NativeTx::DepositStake(tx) => vec![&mut tx.source],
            NativeTx::WithdrawStake(tx) => vec![&mut tx.source],
            NativeTx::DepositStakeV2(tx) => vec![&mut tx.source],
            NativeTx::StakeRewardDistribution(tx) => vec![&mut tx.holder],
        }
    }

    /// Account that signs the transaction on the construction path
    pub fn signer(&self) -> Option<Address> {
        match self {
            NativeTx::Coinbase(tx) => Some(tx.proposer.address),
            NativeTx::Slash(tx) => Some(tx.proposer.address),
            NativeTx::Send(tx) => tx.inputs.first().map(|i| i.address),
            NativeTx::ReserveFund(tx) => Some(tx.source.address),
            NativeTx::ReleaseFund(tx) => Some(tx.source.address),
            NativeTx::ServicePayment(tx) => Some(tx.target.address),
            NativeTx::SplitRule(tx) => Some(tx.initiator.address),
            NativeTx::SmartContract(tx) => Some(tx.from.address),
            NativeTx::DepositStake(tx) => Some(tx.source.address),
            NativeTx::WithdrawStake(tx) => Some(tx.source.address),
            NativeTx::DepositStakeV2(tx) => Some(tx.source.address),
            NativeTx::StakeRewardDistribution(tx) => Some(tx.holder.address),
        }
    }

    /// Attach `signature` to every input owned by `signer`. Returns whether
    /// any input matched.
    pub fn set_signature(&mut self, signer: &Address, signature: Bytes) -> bool {
        let mut matched = false;
        for input in self.signing_inputs_mut() {
            if input.address == *signer {
                input.signature = signature.clone();
                matched = true;
            }
        }
        matched
    }

    pub fn is_signed(&self) -> bool {
        let mut tx = self.clone();
        tx.signing_inputs_mut().iter().any(|i| i.is_signed())
    }

    /// Copy of the transaction with every signature removed
    pub fn unsigned(&self) -> Self {
        let mut tx = self.clone();
        for input in tx.signing_inputs_mut() {
            input.signature = Bytes::default();
        }
        tx
    }

    /// Bytes a signer commits to: `rlp(chain_id) ‖ wire(unsigned)`, wrapped
    /// in an empty Ethereum legacy transaction so wallets can sign it as one.
    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        let mut payload = Vec::new();
        chain_id.encode(&mut payload);
        payload.extend_from_slice(&self.unsigned().to_bytes());
        eth_envelope(&payload)
    }
}

fn eth_envelope(data: &[u8]) -> Vec<u8> {
    let zero = 0u64;
    let to = [0u8; 20];
    let fields: [&dyn Encodable; 9] = [
        &zero, // nonce
        &zero, // gas price
        &zero, // gas
        &to,
        &zero, // value
        &data,
        &zero, // v
        &zero, // r
        &zero, // s
    ];

    let payload_length: usize = fields.iter().map(|f| f.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 4);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for field in fields {
        field.encode(&mut out);
    }
    out
}
