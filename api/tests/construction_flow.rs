//! Construction API end to end against a scripted node

mod common;

use axum::http::StatusCode;
use common::{network_identifier, post, state, MockNode};
use rosetta_core::{Address, Hash};
use rosetta_crypto::KeyPair;
use rosetta_storage::StakeReturnLedger;
use serde_json::{json, Value};

const SECRET: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const CONTRACT: &str = "0x0d2fd67d573c8ecb4161510fc00754d64b401f86";

fn tfuel(value: &str) -> Value {
    json!({ "value": value, "currency": { "symbol": "TFUEL", "decimals": 18 } })
}

fn contract_operations(from: &str) -> Value {
    json!([
        {
            "operation_identifier": { "index": 0 },
            "type": "SmartContractTxFrom",
            "account": { "address": from },
            "amount": tfuel("-1000")
        },
        {
            "operation_identifier": { "index": 1 },
            "related_operations": [{ "index": 0 }],
            "type": "SmartContractTxTo",
            "account": { "address": CONTRACT },
            "amount": tfuel("1000")
        }
    ])
}

#[tokio::test]
async fn test_contract_call_round_trip() {
    let keypair = KeyPair::from_private_key_hex(SECRET).unwrap();
    let from = Address(keypair.address()).to_string();

    let node = MockNode::new();
    node.respond(
        "theta.GetStatus",
        json!({ "current_height": "100", "latest_finalized_block_height": "98" }),
    );
    node.respond(
        "theta.GetAccount",
        json!({ "sequence": "4", "coins": { "thetawei": "0", "tfuelwei": "5000000000000000000" } }),
    );
    let state = state(node.clone(), StakeReturnLedger::temporary().unwrap());

    // preprocess
    let (status, body) = post(
        &state,
        "/construction/preprocess",
        json!({
            "network_identifier": network_identifier(),
            "operations": contract_operations(&from),
            "metadata": { "gas_limit": "50000", "gas_price": "4000000000000", "data": "6080" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let options = body["options"].clone();
    assert_eq!(options["type"], 7);
    assert_eq!(options["signer"], from.as_str());

    // metadata
    let (status, body) = post(
        &state,
        "/construction/metadata",
        json!({ "network_identifier": network_identifier(), "options": options }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let metadata = body["metadata"].clone();
    assert_eq!(metadata["sequence"], 5);
    assert_eq!(metadata["gas_limit"], "50000");
    assert_eq!(body["suggested_fee"][0]["value"], "200000000000000000");
    assert_eq!(body["suggested_fee"][0]["currency"]["symbol"], "TFUEL");

    // payloads
    let (status, body) = post(
        &state,
        "/construction/payloads",
        json!({
            "network_identifier": network_identifier(),
            "operations": contract_operations(&from),
            "metadata": metadata
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let unsigned = body["unsigned_transaction"].as_str().unwrap().to_string();
    let payload = body["payloads"][0].clone();
    assert_eq!(payload["account_identifier"]["address"], from.as_str());
    assert_eq!(payload["signature_type"], "ecdsa_recovery");

    // parse unsigned
    let (status, body) = post(
        &state,
        "/construction/parse",
        json!({ "network_identifier": network_identifier(), "signed": false, "transaction": unsigned }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let ops = body["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0]["type"], "SmartContractTxFrom");
    assert_eq!(ops[0]["account"]["address"], from.as_str());
    assert_eq!(ops[0]["amount"]["value"], "-1000");
    assert_eq!(ops[1]["type"], "SmartContractTxTo");
    assert_eq!(ops[1]["amount"]["value"], "1000");
    assert!(body.get("account_identifier_signers").is_none());

    // sign and combine
    let digest: [u8; 32] = hex::decode(payload["hex_bytes"].as_str().unwrap())
        .unwrap()
        .try_into()
        .unwrap();
    let signature = hex::encode(keypair.sign_digest(&digest));
    let (status, body) = post(
        &state,
        "/construction/combine",
        json!({
            "network_identifier": network_identifier(),
            "unsigned_transaction": unsigned,
            "signatures": [{
                "signing_payload": payload,
                "public_key": {
                    "hex_bytes": hex::encode(keypair.public_key_compressed()),
                    "curve_type": "secp256k1"
                },
                "signature_type": "ecdsa_recovery",
                "hex_bytes": signature
            }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let signed = body["signed_transaction"].as_str().unwrap().to_string();

    // parse signed
    let (_, body) = post(
        &state,
        "/construction/parse",
        json!({ "network_identifier": network_identifier(), "signed": true, "transaction": signed }),
    )
    .await;
    assert_eq!(body["account_identifier_signers"][0]["address"], from.as_str());

    // hash
    let expected = Hash::keccak(&hex::decode(&signed).unwrap()).to_hex();
    let (_, body) = post(
        &state,
        "/construction/hash",
        json!({ "network_identifier": network_identifier(), "signed_transaction": signed }),
    )
    .await;
    assert_eq!(body["transaction_identifier"]["hash"], expected.as_str());

    // submit
    node.respond("theta.BroadcastRawTransactionAsync", json!({ "hash": expected }));
    let (status, body) = post(
        &state,
        "/construction/submit",
        json!({ "network_identifier": network_identifier(), "signed_transaction": signed }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction_identifier"]["hash"], expected.as_str());
    let (_, params) = node
        .calls()
        .into_iter()
        .find(|(m, _)| m == "theta.BroadcastRawTransactionAsync")
        .unwrap();
    assert_eq!(params["tx_bytes"], signed.as_str());
}

#[tokio::test]
async fn test_three_operations_are_unmatched() {
    let state = state(MockNode::new(), StakeReturnLedger::temporary().unwrap());
    let mut ops = contract_operations("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
    let extra = ops[1].clone();
    ops.as_array_mut().unwrap().push(extra);

    let (status, body) = post(
        &state,
        "/construction/preprocess",
        json!({ "network_identifier": network_identifier(), "operations": ops }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 34);
    assert_eq!(body["retriable"], false);
}

#[tokio::test]
async fn test_network_identifier_checks() {
    let state = state(MockNode::new(), StakeReturnLedger::temporary().unwrap());
    let ops = contract_operations("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");

    let (_, body) = post(&state, "/construction/preprocess", json!({ "operations": ops })).await;
    assert_eq!(body["code"], 5);

    let (_, body) = post(
        &state,
        "/construction/preprocess",
        json!({
            "network_identifier": { "blockchain": "theta", "network": "mainnet" },
            "operations": ops
        }),
    )
    .await;
    assert_eq!(body["code"], 4);

    let (_, body) = post(
        &state,
        "/construction/preprocess",
        json!({
            "network_identifier": { "blockchain": "ethereum", "network": "privatenet" },
            "operations": ops
        }),
    )
    .await;
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_offline_mode_refuses_node_endpoints() {
    let node = MockNode::new();
    let state = state(node.clone(), StakeReturnLedger::temporary().unwrap()).with_online(false);

    let (_, body) = post(
        &state,
        "/construction/metadata",
        json!({
            "network_identifier": network_identifier(),
            "options": { "type": 7, "signer": "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23" }
        }),
    )
    .await;
    assert_eq!(body["code"], 32);

    let (_, body) = post(&state, "/network/status", json!({ "network_identifier": network_identifier() })).await;
    assert_eq!(body["code"], 32);
    assert!(node.calls().is_empty());

    // derive needs no node
    let keypair = KeyPair::from_private_key_hex(SECRET).unwrap();
    let (status, body) = post(
        &state,
        "/construction/derive",
        json!({
            "public_key": {
                "hex_bytes": hex::encode(keypair.public_key_compressed()),
                "curve_type": "secp256k1"
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        body["account_identifier"]["address"],
        Address(keypair.address()).to_string().as_str()
    );
}

#[tokio::test]
async fn test_metadata_requires_signer() {
    let state = state(MockNode::new(), StakeReturnLedger::temporary().unwrap());
    let (_, body) = post(
        &state,
        "/construction/metadata",
        json!({ "network_identifier": network_identifier(), "options": { "type": 2 } }),
    )
    .await;
    assert_eq!(body["code"], 19);
    assert_eq!(body["message"], "Invalid input param: empty signer address");
}

#[tokio::test]
async fn test_hash_rejects_bytes_that_are_not_a_transaction() {
    let state = state(MockNode::new(), StakeReturnLedger::temporary().unwrap());

    let (status, body) = post(
        &state,
        "/construction/hash",
        json!({ "network_identifier": network_identifier(), "signed_transaction": "deadbeef" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 21);
    assert_eq!(body["retriable"], false);
}
