//! Construction service - the derive / preprocess / metadata / payloads /
//! parse / combine / hash / submit flow
//!
//! Unsigned and signed transactions travel as plain hex of the wire bytes.
//! The signing payload is keccak256 of the sign-bytes and is signed with a
//! recoverable secp256k1 signature.

use num_bigint::BigUint;
use rosetta_core::chain::{max_gas_limit, minimum_gas_price, minimum_send_fee};
use rosetta_core::codec::metadata::{get_address, get_biguint, get_bytes, get_u64, put, require_u64};
use rosetta_core::{
    decode, encode, match_operations, validate_send, AccountIdentifier, Address, Amount, Bytes,
    DecodeContext, Denom, Hash, Metadata, NativeTx, Operation, TxKind,
};
use rosetta_network::NodeClient;
use serde_json::Value;

use crate::models::{PublicKey, Signature, SigningPayload};
use crate::{ApiError, ApiResult};

pub const CURVE_SECP256K1: &str = "secp256k1";
pub const SIGNATURE_TYPE: &str = "ecdsa_recovery";

#[derive(Clone)]
pub struct ConstructionService {
    chain_id: String,
    node: NodeClient,
}

fn decode_hex(s: &str) -> ApiResult<Vec<u8>> {
    Bytes::from_hex(s)
        .map(|b| b.0)
        .map_err(|e| ApiError::InvalidInputParam(e.to_string()))
}

fn native_from_hex(s: &str) -> ApiResult<NativeTx> {
    let bytes = decode_hex(s)?;
    NativeTx::from_bytes(&bytes).map_err(|e| ApiError::UnableToParseTransaction(e.to_string()))
}

fn constructible(tx: &NativeTx) -> ApiResult<()> {
    match tx.kind() {
        TxKind::Send | TxKind::SmartContract => Ok(()),
        other => Err(ApiError::InvalidInputParam(format!(
            "unsupported transaction type {}",
            other.name()
        ))),
    }
}

/// Address of a curve-tagged public key
pub fn derive(public_key: Option<&PublicKey>) -> ApiResult<AccountIdentifier> {
    let key = public_key.ok_or_else(|| ApiError::InvalidInputParam("public key missing".into()))?;
    if key.curve_type != CURVE_SECP256K1 {
        return Err(ApiError::InvalidInputParam(format!(
            "unsupported curve type {}",
            key.curve_type
        )));
    }
    let bytes = decode_hex(&key.hex_bytes)?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidInputParam("empty public key".into()));
    }
    let address = rosetta_crypto::public_key_to_address(&bytes)?;
    Ok(AccountIdentifier::new(&Address(address)))
}

/// Options for the metadata stage: kind, signer, send fee and the caller's
/// gas settings
pub fn preprocess(operations: &[Operation], metadata: Option<&Metadata>) -> ApiResult<Metadata> {
    let matched = match_operations(operations)?;
    validate_send(&matched)?;

    let mut options = Metadata::new();
    options.insert("type".to_string(), Value::from(matched.kind().code()));
    options.insert("signer".to_string(), Value::from(matched.signer().to_string()));
    if let Some(fee) = matched.send_fee() {
        options.insert("fee".to_string(), Value::from(fee.to_string()));
    }
    if let Some(meta) = metadata {
        for key in ["gas_limit", "gas_price", "data"] {
            if let Some(v) = meta.get(key).filter(|v| !v.is_null()) {
                options.insert(key.to_string(), v.clone());
            }
        }
    }
    Ok(options)
}

/// Unsigned transaction and the single payload its signer has to sign
pub fn payloads(
    chain_id: &str,
    operations: &[Operation],
    metadata: &Metadata,
) -> ApiResult<(String, SigningPayload)> {
    let matched = match_operations(operations)?;
    validate_send(&matched)?;
    require_u64(metadata, "sequence")?;

    let tx = encode(matched.kind(), operations, metadata)?;
    let digest = Hash::keccak(&tx.sign_bytes(chain_id));

    let payload = SigningPayload {
        account_identifier: AccountIdentifier::new(&matched.signer()),
        hex_bytes: hex::encode(digest.as_bytes()),
        signature_type: SIGNATURE_TYPE.to_string(),
    };
    Ok((hex::encode(tx.to_bytes()), payload))
}

/// Operations, metadata and (when signed) the signer of a hex transaction
pub fn parse(
    transaction: &str,
    signed: bool,
) -> ApiResult<(Vec<Operation>, Metadata, Option<Vec<AccountIdentifier>>)> {
    let tx = native_from_hex(transaction)?;
    constructible(&tx)?;

    let decoded = decode(&tx, &DecodeContext::construction());
    let signers = if signed {
        let signer = tx
            .signer()
            .ok_or_else(|| ApiError::UnableToParseTransaction("transaction has no signer".into()))?;
        Some(vec![AccountIdentifier::new(&signer)])
    } else {
        None
    };
    Ok((decoded.operations, decoded.metadata, signers))
}

/// Attach the one signature to the unsigned transaction after checking it
/// recovers to the transaction's signer
pub fn combine(chain_id: &str, unsigned: &str, signatures: &[Signature]) -> ApiResult<String> {
    let [signature] = signatures else {
        return Err(ApiError::InvalidInputParam("need exact 1 signature".into()));
    };

    let mut tx = native_from_hex(unsigned)?;
    constructible(&tx)?;

    let claimed = signature
        .signing_payload
        .account_identifier
        .parse_address()
        .map_err(|_| ApiError::InvalidAccountAddress)?;
    if tx.signer() != Some(claimed) {
        tracing::warn!(signer = %claimed, "signature from an account that does not sign this transaction");
        return Err(ApiError::SignatureVerificationFailed(format!(
            "{} does not sign this transaction",
            claimed
        )));
    }

    let sig = decode_hex(&signature.hex_bytes)?;
    if let Err(e) = rosetta_crypto::verify_signature(&tx.sign_bytes(chain_id), &sig, claimed.as_bytes()) {
        tracing::warn!(signer = %claimed, error = %e, "signature verification failed");
        return Err(e.into());
    }

    tx.set_signature(&claimed, Bytes(sig));
    Ok(hex::encode(tx.to_bytes()))
}

/// Content hash of a signed hex transaction
/// Hash of the signed wire bytes. The bytes must decode as a transaction.
pub fn hash(signed: &str) -> ApiResult<Hash> {
    let bytes = decode_hex(signed)?;
    NativeTx::from_bytes(&bytes).map_err(|e| ApiError::UnableToParseTransaction(e.to_string()))?;
    Ok(Hash::keccak(&bytes))
}

impl ConstructionService {
    pub fn new(chain_id: impl Into<String>, node: NodeClient) -> Self {
        Self {
            chain_id: chain_id.into(),
            node,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Next sequence for the signer plus fee and gas settings, defaulted
    /// from the chain parameters at the node's current height
    pub async fn metadata(&self, options: &Metadata) -> ApiResult<(Metadata, Vec<Amount>)> {
        let signer = get_address(options, "signer")?
            .ok_or_else(|| ApiError::InvalidInputParam("empty signer address".into()))?;
        let code = get_u64(options, "type")?
            .ok_or_else(|| ApiError::InvalidInputParam("tx type missing in metadata".into()))?;
        let kind = TxKind::from_code(code)?;

        let status = self
            .node
            .status()
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetNodeStatus))?;
        let height = status.current_height;

        let account = self
            .node
            .account(&signer, None)
            .await
            .map_err(|e| ApiError::from_rpc(e, ApiError::UnableToGetAccount))?
            .ok_or(ApiError::UnableToGetAccount)?;

        let mut metadata = Metadata::new();
        put(&mut metadata, "sequence", &(account.sequence + 1));

        let fee = match kind {
            TxKind::Send => {
                let fee = get_biguint(options, "fee")?
                    .filter(|f| *f != BigUint::default())
                    .unwrap_or_else(|| minimum_send_fee(height));
                put(&mut metadata, "fee", &fee.to_string());
                fee
            }
            TxKind::SmartContract => {
                let gas_limit = get_u64(options, "gas_limit")?.unwrap_or_else(|| max_gas_limit(height));
                let gas_price = get_biguint(options, "gas_price")?
                    .unwrap_or_else(|| minimum_gas_price(height));
                let data = get_bytes(options, "data")?.unwrap_or_default();
                put(&mut metadata, "gas_limit", &gas_limit.to_string());
                put(&mut metadata, "gas_price", &gas_price.to_string());
                put(&mut metadata, "data", &hex::encode(data.as_slice()));
                gas_price * BigUint::from(gas_limit)
            }
            other => {
                return Err(ApiError::InvalidInputParam(format!(
                    "unsupported transaction type {}",
                    other.name()
                )))
            }
        };

        Ok((metadata, vec![Amount::new(fee.into(), Denom::TFuel)]))
    }

    pub async fn submit(&self, signed: &str) -> ApiResult<Hash> {
        let bytes = decode_hex(signed)?;
        match self.node.broadcast_raw(&bytes).await {
            Ok(hash) => {
                tracing::info!(%hash, "transaction submitted");
                Ok(hash)
            }
            Err(e) => {
                tracing::warn!(error = %e, "broadcast failed");
                let reason = e.to_string();
                Err(ApiError::from_rpc(e, ApiError::UnableToSubmitTransaction(reason)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use rosetta_core::operation::OperationsBuilder;
    use rosetta_core::OperationType;
    use rosetta_crypto::KeyPair;

    const SECRET: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const CHAIN: &str = "privatenet";

    fn sequence(n: u64) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("sequence".to_string(), Value::from(n));
        meta
    }

    fn send_ops(from: &Address, to: &Address) -> Vec<Operation> {
        let mut b = OperationsBuilder::new(None);
        b.push(OperationType::SendTxInput, from, BigInt::from(-10), Denom::Theta, None)
            .push(OperationType::SendTxInput, from, BigInt::from(-20), Denom::TFuel, None)
            .push(OperationType::SendTxOutput, to, BigInt::from(10), Denom::Theta, None)
            .push(OperationType::SendTxOutput, to, BigInt::from(20), Denom::TFuel, None)
            .push(OperationType::TxFee, from, BigInt::from(-3), Denom::TFuel, None);
        b.build()
    }

    #[test]
    fn test_derive_rejects_other_curves() {
        let key = PublicKey {
            hex_bytes: "02".repeat(33),
            curve_type: "edwards25519".into(),
        };
        assert_eq!(derive(Some(&key)).unwrap_err().code(), 19);
        assert_eq!(derive(None).unwrap_err().code(), 19);
    }

    #[test]
    fn test_derive_known_address() {
        let keypair = KeyPair::from_private_key_hex(SECRET).unwrap();
        let key = PublicKey {
            hex_bytes: hex::encode(keypair.public_key_compressed()),
            curve_type: CURVE_SECP256K1.into(),
        };
        let account = derive(Some(&key)).unwrap();
        assert_eq!(
            account.address.to_lowercase(),
            "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_preprocess_send_options() {
        let from = Address([1; 20]);
        let ops = send_ops(&from, &Address([2; 20]));
        let options = preprocess(&ops, None).unwrap();
        assert_eq!(options["type"], 2);
        assert_eq!(options["signer"], from.to_string());
        assert_eq!(options["fee"], "3");
    }

    #[test]
    fn test_payloads_require_sequence() {
        let ops = send_ops(&Address([1; 20]), &Address([2; 20]));
        assert!(payloads(CHAIN, &ops, &Metadata::new()).is_err());
    }

    #[test]
    fn test_send_sign_and_combine() {
        let keypair = KeyPair::from_private_key_hex(SECRET).unwrap();
        let from = Address(keypair.address());
        let ops = send_ops(&from, &Address([2; 20]));

        let (unsigned, payload) = payloads(CHAIN, &ops, &sequence(1)).unwrap();
        assert_eq!(payload.signature_type, SIGNATURE_TYPE);

        let (parsed, _, signers) = parse(&unsigned, false).unwrap();
        assert_eq!(parsed.len(), 5);
        assert!(signers.is_none());

        let digest: [u8; 32] = hex::decode(&payload.hex_bytes).unwrap().try_into().unwrap();
        let signature = Signature {
            signing_payload: payload.clone(),
            public_key: PublicKey {
                hex_bytes: hex::encode(keypair.public_key_compressed()),
                curve_type: CURVE_SECP256K1.into(),
            },
            signature_type: SIGNATURE_TYPE.into(),
            hex_bytes: hex::encode(keypair.sign_digest(&digest)),
        };

        let signed = combine(CHAIN, &unsigned, std::slice::from_ref(&signature)).unwrap();
        let (_, _, signers) = parse(&signed, true).unwrap();
        assert_eq!(signers.unwrap()[0].address, from.to_string());

        // signed for another chain
        assert_eq!(
            combine("mainnet", &unsigned, &[signature.clone()]).unwrap_err().code(),
            35
        );
        assert_eq!(combine(CHAIN, &unsigned, &[]).unwrap_err().code(), 19);

        let expected = Hash::keccak(&hex::decode(&signed).unwrap());
        assert_eq!(hash(&signed).unwrap(), expected);
    }

    #[test]
    fn test_hash_requires_a_transaction() {
        assert_eq!(hash("deadbeef").unwrap_err().code(), 21);
        assert_eq!(hash("").unwrap_err().code(), 21);
        assert_eq!(hash("zz").unwrap_err().code(), 19);
    }
}
