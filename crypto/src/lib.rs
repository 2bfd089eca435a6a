//! Theta Rosetta Cryptography
//!
//! Keccak hashing, secp256k1 address derivation and recoverable
//! signature verification. Addresses are the last 20 bytes of the
//! keccak256 digest of the uncompressed public key (without the 0x04 tag).

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// `R ‖ S ‖ V`, with V in {0, 1} (27/28 are accepted on input)
pub const SIGNATURE_LENGTH: usize = 65;

pub const ADDRESS_LENGTH: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Signature does not match signer {expected}, recovered {recovered}")]
    SignerMismatch { expected: String, recovered: String },
}

/// Secp256k1 key pair, used by wallets and tests to produce signatures
/// the gateway accepts.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Create keypair from raw 32 private key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = PublicKey::from_secret_key_global(&secret);
        Ok(Self { secret, public })
    }

    /// Create keypair from private key hex
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_secret_bytes(&bytes)
    }

    /// 33-byte compressed public key
    pub fn public_key_compressed(&self) -> [u8; 33] {
        self.public.serialize()
    }

    pub fn address(&self) -> [u8; ADDRESS_LENGTH] {
        address_from_public_key(&self.public)
    }

    /// Sign the keccak256 digest of `message`
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.sign_digest(&keccak256(message))
    }

    /// Sign a precomputed 32-byte digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> [u8; SIGNATURE_LENGTH] {
        let msg = Message::from_digest(*digest);
        let (rec_id, compact) = SECP256K1
            .sign_ecdsa_recoverable(&msg, &self.secret)
            .serialize_compact();

        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&compact);
        out[64] = rec_id.to_i32() as u8;
        out
    }
}

/// Hash data with Keccak256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Derive an account address from a serialized secp256k1 public key
/// (33-byte compressed or 65-byte uncompressed).
pub fn public_key_to_address(public_key: &[u8]) -> Result<[u8; ADDRESS_LENGTH], CryptoError> {
    let public = PublicKey::from_slice(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    Ok(address_from_public_key(&public))
}

fn address_from_public_key(public: &PublicKey) -> [u8; ADDRESS_LENGTH] {
    let uncompressed = public.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);

    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&digest[12..]);
    address
}

/// Recover the signer address from a signature over a 32-byte digest
pub fn recover_address(
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<[u8; ADDRESS_LENGTH], CryptoError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            signature.len()
        )));
    }

    let v = match signature[64] {
        v @ 0..=1 => v,
        v @ 27..=28 => v - 27,
        other => {
            return Err(CryptoError::InvalidSignature(format!(
                "invalid recovery id {}",
                other
            )))
        }
    };

    let rec_id = RecoveryId::from_i32(v as i32)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let sig = RecoverableSignature::from_compact(&signature[..64], rec_id)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let msg = Message::from_digest(*digest);
    let public = sig
        .recover(&msg)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    Ok(address_from_public_key(&public))
}

/// Verify that `signature` over keccak256(`message`) was produced by `signer`
pub fn verify_signature(
    message: &[u8],
    signature: &[u8],
    signer: &[u8; ADDRESS_LENGTH],
) -> Result<(), CryptoError> {
    let recovered = recover_address(&keccak256(message), signature)?;
    if &recovered != signer {
        return Err(CryptoError::SignerMismatch {
            expected: hex::encode(signer),
            recovered: hex::encode(recovered),
        });
    }
    Ok(())
}
