//! Account addresses, content hashes and opaque byte strings
//!
//! All three travel as `0x`-prefixed hex on the JSON side and as RLP byte
//! strings on the wire.

use std::fmt;
use std::str::FromStr;

use alloy_rlp::{BufMut, Decodable, Encodable, Header};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodecError;

pub const ADDRESS_LENGTH: usize = 20;
pub const HASH_LENGTH: usize = 32;

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// 20-byte account address, displayed with an EIP-55 mixed-case checksum
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Strict check used for caller-supplied account identifiers
    pub fn is_hex_address(s: &str) -> bool {
        let body = strip_hex_prefix(s);
        body.len() == ADDRESS_LENGTH * 2 && body.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = rosetta_crypto::keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Address(bytes)
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_hex_address(s) {
            return Err(CodecError::InvalidAddress(s.to_string()));
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(strip_hex_prefix(s), &mut bytes)
            .map_err(|_| CodecError::InvalidAddress(s.to_string()))?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Encodable for Address {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out)
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl Decodable for Address {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        <[u8; ADDRESS_LENGTH]>::decode(buf).map(Address)
    }
}

/// 32-byte hash, displayed as lowercase `0x` hex
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_LENGTH]);

impl Hash {
    /// keccak256 over arbitrary bytes
    pub fn keccak(data: &[u8]) -> Self {
        Hash(rosetta_crypto::keccak256(data))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = strip_hex_prefix(s);
        if body.len() != HASH_LENGTH * 2 {
            return Err(CodecError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; HASH_LENGTH];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|_| CodecError::InvalidHash(s.to_string()))?;
        Ok(Hash(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Variable-length byte string. Empty means absent (e.g. an unsigned input).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        hex::decode(strip_hex_prefix(s))
            .map(Bytes)
            .map_err(|_| CodecError::InvalidHex(s.to_string()))
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", self.to_hex())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Bytes::default()),
            Some(s) => Bytes::from_hex(&s).map_err(serde::de::Error::custom),
        }
    }
}

impl Encodable for Bytes {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0[..].encode(out)
    }

    fn length(&self) -> usize {
        self.0[..].length()
    }
}

impl Decodable for Bytes {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Header::decode_bytes(buf, false).map(|b| Bytes(b.to_vec()))
    }
}

/// Parse an unsigned integer the node may render as a JSON number, a
/// decimal string or a `0x` hex string.
pub(crate) fn parse_uint_text(s: &str) -> Option<num_bigint::BigUint> {
    let s = s.trim();
    if let Some(h) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if h.is_empty() {
            return Some(num_bigint::BigUint::default());
        }
        return num_bigint::BigUint::parse_bytes(h.as_bytes(), 16);
    }
    num_bigint::BigUint::parse_bytes(s.as_bytes(), 10)
}

/// Serde adapter for `u64` fields the node renders either as a number or as
/// a (decimal or hex) string.
pub mod flex_u64 {
    use num_traits::ToPrimitive;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("expected unsigned integer, got {}", value))
        })
    }

    pub fn from_value(value: &Value) -> Option<u64> {
        match value {
            Value::Null => Some(0),
            Value::Number(n) => n.as_u64(),
            Value::String(s) => super::parse_uint_text(s).and_then(|n| n.to_u64()),
            _ => None,
        }
    }
}
