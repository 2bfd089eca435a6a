//! Typed reads from free-form metadata maps

use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::coins::wei;
use crate::error::{CodecError, CodecResult};
use crate::operation::Metadata;
use crate::primitives::{flex_u64, Address, Bytes};

pub fn put<T: Serialize>(meta: &mut Metadata, key: &str, value: &T) {
    if let Ok(v) = serde_json::to_value(value) {
        meta.insert(key.to_string(), v);
    }
}

fn present<'a>(meta: &'a Metadata, key: &str) -> Option<&'a Value> {
    meta.get(key).filter(|v| !v.is_null())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidMetadata {
        field,
        reason: reason.into(),
    }
}

pub fn get_u64(meta: &Metadata, key: &'static str) -> CodecResult<Option<u64>> {
    present(meta, key)
        .map(|v| flex_u64::from_value(v).ok_or_else(|| invalid(key, format!("not an integer: {}", v))))
        .transpose()
}

pub fn require_u64(meta: &Metadata, key: &'static str) -> CodecResult<u64> {
    get_u64(meta, key)?.ok_or(CodecError::MissingMetadata(key))
}

pub fn get_u8(meta: &Metadata, key: &'static str) -> CodecResult<Option<u8>> {
    get_u64(meta, key)?
        .map(|v| u8::try_from(v).map_err(|_| invalid(key, format!("out of range: {}", v))))
        .transpose()
}

pub fn get_biguint(meta: &Metadata, key: &'static str) -> CodecResult<Option<BigUint>> {
    present(meta, key)
        .map(|v| wei::from_value(v).ok_or_else(|| invalid(key, format!("not an amount: {}", v))))
        .transpose()
}

pub fn get_string(meta: &Metadata, key: &'static str) -> CodecResult<Option<String>> {
    match present(meta, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(key, format!("not a string: {}", other))),
    }
}

pub fn get_bytes(meta: &Metadata, key: &'static str) -> CodecResult<Option<Bytes>> {
    get_string(meta, key)?
        .map(|s| Bytes::from_hex(&s).map_err(|_| invalid(key, "not hex")))
        .transpose()
}

pub fn get_address(meta: &Metadata, key: &'static str) -> CodecResult<Option<Address>> {
    get_string(meta, key)?
        .map(|s| s.parse::<Address>().map_err(|_| invalid(key, format!("not an address: {}", s))))
        .transpose()
}

pub fn require_address(meta: &Metadata, key: &'static str) -> CodecResult<Address> {
    get_address(meta, key)?.ok_or(CodecError::MissingMetadata(key))
}

pub fn get_json<T: DeserializeOwned>(meta: &Metadata, key: &'static str) -> CodecResult<Option<T>> {
    present(meta, key)
        .map(|v| serde_json::from_value(v.clone()).map_err(|e| invalid(key, e.to_string())))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        match v {
            Value::Object(m) => m,
            _ => Metadata::new(),
        }
    }

    #[test]
    fn test_integer_fields_accept_strings() {
        let m = meta(json!({"gas_limit": "21000", "sequence": 4, "purpose": 300}));
        assert_eq!(get_u64(&m, "gas_limit").unwrap(), Some(21000));
        assert_eq!(require_u64(&m, "sequence").unwrap(), 4);
        assert!(get_u8(&m, "purpose").is_err());
        assert_eq!(
            require_u64(&m, "fee"),
            Err(CodecError::MissingMetadata("fee"))
        );
    }

    #[test]
    fn test_null_is_absent() {
        let m = meta(json!({"data": null}));
        assert_eq!(get_bytes(&m, "data").unwrap(), None);
    }

    #[test]
    fn test_bytes_and_addresses() {
        let m = meta(json!({
            "data": "0xa9059cbb",
            "holder": "0x2e833968e5bb786ae419c4d13189fb081cc43bab",
            "bad": 12
        }));
        assert_eq!(
            get_bytes(&m, "data").unwrap(),
            Some(Bytes(vec![0xa9, 0x05, 0x9c, 0xbb]))
        );
        assert!(get_address(&m, "holder").unwrap().is_some());
        assert!(get_string(&m, "bad").is_err());
    }
}
