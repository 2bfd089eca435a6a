//! THETA/TFUEL balance pair carried by every transaction input and output

use alloy_rlp::{BufMut, Decodable, Encodable, Header};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::currency::Denom;
use crate::primitives::parse_uint_text;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coins {
    #[serde(
        rename = "thetawei",
        alias = "ThetaWei",
        default,
        with = "wei"
    )]
    pub theta_wei: BigUint,
    #[serde(
        rename = "tfuelwei",
        alias = "TFuelWei",
        default,
        with = "wei"
    )]
    pub tfuel_wei: BigUint,
}

impl Coins {
    pub fn new(theta_wei: BigUint, tfuel_wei: BigUint) -> Self {
        Self {
            theta_wei,
            tfuel_wei,
        }
    }

    pub fn tfuel(tfuel_wei: BigUint) -> Self {
        Self {
            theta_wei: BigUint::default(),
            tfuel_wei,
        }
    }

    pub fn theta(theta_wei: BigUint) -> Self {
        Self {
            theta_wei,
            tfuel_wei: BigUint::default(),
        }
    }

    pub fn get(&self, denom: Denom) -> &BigUint {
        match denom {
            Denom::Theta => &self.theta_wei,
            Denom::TFuel => &self.tfuel_wei,
        }
    }

    pub fn set(&mut self, denom: Denom, value: BigUint) {
        match denom {
            Denom::Theta => self.theta_wei = value,
            Denom::TFuel => self.tfuel_wei = value,
        }
    }

    pub fn signed(&self, denom: Denom) -> BigInt {
        BigInt::from(self.get(denom).clone())
    }

    pub fn is_zero(&self) -> bool {
        self.theta_wei == BigUint::default() && self.tfuel_wei == BigUint::default()
    }
}

/// Wei amounts are decimal strings when serialized; on input the node may
/// send numbers, decimal strings, hex strings or null.
pub mod wei {
    use super::*;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid wei amount: {}", value)))
    }

    pub fn from_value(value: &Value) -> Option<BigUint> {
        match value {
            Value::Null => Some(BigUint::default()),
            Value::Number(n) => parse_uint_text(&n.to_string()),
            Value::String(s) => parse_uint_text(s),
            _ => None,
        }
    }
}

fn encode_uint(value: &BigUint, out: &mut dyn BufMut) {
    let bytes = uint_bytes(value);
    bytes[..].encode(out)
}

fn uint_bytes(value: &BigUint) -> Vec<u8> {
    if *value == BigUint::default() {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

pub(crate) fn encode_biguint(value: &BigUint, out: &mut dyn BufMut) {
    encode_uint(value, out)
}

pub(crate) fn biguint_length(value: &BigUint) -> usize {
    uint_bytes(value)[..].length()
}

pub(crate) fn decode_biguint(buf: &mut &[u8]) -> alloy_rlp::Result<BigUint> {
    let bytes = Header::decode_bytes(buf, false)?;
    if bytes.first() == Some(&0) {
        return Err(alloy_rlp::Error::LeadingZero);
    }
    Ok(BigUint::from_bytes_be(bytes))
}

impl Encodable for Coins {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        encode_uint(&self.theta_wei, out);
        encode_uint(&self.tfuel_wei, out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Coins {
    fn payload_length(&self) -> usize {
        biguint_length(&self.theta_wei) + biguint_length(&self.tfuel_wei)
    }
}

impl Decodable for Coins {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started = buf.len();
        let theta_wei = decode_biguint(buf)?;
        let tfuel_wei = decode_biguint(buf)?;
        if started - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: started - buf.len(),
            });
        }
        Ok(Self {
            theta_wei,
            tfuel_wei,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coins_json_accepts_numbers_and_strings() {
        let coins: Coins = serde_json::from_str(
            r#"{"thetawei": 1000000000000000000000, "tfuelwei": "0x0de0b6b3a7640000"}"#,
        )
        .unwrap();
        assert_eq!(
            coins.theta_wei,
            BigUint::parse_bytes(b"1000000000000000000000", 10).unwrap()
        );
        assert_eq!(coins.tfuel_wei, BigUint::from(1_000_000_000_000_000_000u64));

        let coins: Coins = serde_json::from_str(r#"{"ThetaWei": null}"#).unwrap();
        assert!(coins.is_zero());
    }

    #[test]
    fn test_coins_serialize_as_decimal_strings() {
        let coins = Coins::new(BigUint::from(5u32), BigUint::default());
        let json = serde_json::to_value(&coins).unwrap();
        assert_eq!(json, serde_json::json!({"thetawei": "5", "tfuelwei": "0"}));
    }

    #[test]
    fn test_zero_encodes_as_empty_string() {
        let mut out = Vec::new();
        Coins::default().encode(&mut out);
        assert_eq!(out, vec![0xc2, 0x80, 0x80]);
        assert_eq!(Coins::default().length(), out.len());

        let decoded = Coins::decode(&mut out.as_slice()).unwrap();
        assert!(decoded.is_zero());
    }
}
