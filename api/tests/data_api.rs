//! Block, account and network endpoints against a scripted node

mod common;

use axum::http::StatusCode;
use common::{network_identifier, post, state, MockNode};
use num_bigint::BigUint;
use rosetta_core::stake::withdrawal_identifier;
use rosetta_core::tx::{TxInput, TxOutput};
use rosetta_core::{Coins, Hash, PendingStakeReturn, WithdrawStakeTx};
use rosetta_network::RpcError;
use rosetta_storage::StakeReturnLedger;
use serde_json::{json, Value};
use std::time::Duration;

const HOLDER: &str = "0x2e833968e5bb786ae419c4d13189fb081cc43bab";
const SOURCE: &str = "0x0d2fd67d573c8ecb4161510fc00754d64b401f86";

fn hash_hex(byte: u8) -> String {
    format!("0x{}", hex::encode([byte; 32]))
}

fn node_block(height: u64, transactions: Value) -> Value {
    json!({
        "chain_id": "privatenet",
        "height": height.to_string(),
        "hash": hash_hex(0xbb),
        "parent": hash_hex(0xaa),
        "transactions_hash": hash_hex(0x01),
        "state_hash": hash_hex(0x02),
        "timestamp": "1600000000",
        "proposer": HOLDER,
        "status": 4,
        "transactions": transactions
    })
}

fn block_request(index: u64) -> Value {
    json!({ "network_identifier": network_identifier(), "block_identifier": { "index": index } })
}

fn stored_return(id: u8) -> PendingStakeReturn {
    let tx = WithdrawStakeTx {
        fee: Coins::default(),
        source: TxInput {
            address: SOURCE.parse().unwrap(),
            ..Default::default()
        },
        holder: TxOutput {
            address: HOLDER.parse().unwrap(),
            ..Default::default()
        },
        purpose: 0,
    };
    PendingStakeReturn::from_withdrawal(Hash([id; 32]), tx, BigUint::from(1000u32))
}

#[tokio::test]
async fn test_matured_return_is_the_only_transaction() {
    let node = MockNode::new();
    node.respond("theta.GetBlockByHeight", node_block(101, json!([])));
    let ledger = StakeReturnLedger::temporary().unwrap();
    ledger.put(101, &[stored_return(7)]).unwrap();
    let state = state(node, ledger);

    let (status, body) = post(&state, "/block", block_request(101)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let block = &body["block"];
    assert_eq!(block["block_identifier"]["index"], 101);
    assert_eq!(block["parent_block_identifier"]["index"], 100);
    assert_eq!(block["timestamp"], 1_600_000_000_000i64);
    assert_eq!(block["metadata"]["status"], "directly_finalized");

    let txs = block["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["transaction_identifier"]["hash"], hash_hex(7).as_str());
    let op = &txs[0]["operations"][0];
    assert_eq!(op["type"], "WithdrawStakeTxSource");
    assert_eq!(op["status"], "directly_finalized");
    assert_eq!(op["amount"]["value"], "1000");
    assert_eq!(op["amount"]["currency"]["symbol"], "THETA");
}

#[tokio::test]
async fn test_withdrawal_schedules_its_return() {
    let tx_hash = hash_hex(0x33);
    let withdrawal = json!({
        "type": 9,
        "hash": tx_hash,
        "raw": {
            "fee": { "thetawei": "0", "tfuelwei": "1000000000000" },
            "source": {
                "address": SOURCE,
                "coins": { "thetawei": "0", "tfuelwei": "0" },
                "sequence": "3",
                "signature": "0x01"
            },
            "holder": { "address": HOLDER, "coins": { "thetawei": "0", "tfuelwei": "0" } },
            "purpose": 0
        }
    });

    let node = MockNode::new();
    node.respond("theta.GetBlockByHeight", node_block(200, json!([withdrawal])));
    node.respond(
        "theta.GetVcpByHeight",
        json!({
            "BlockHashVcpPairs": [{
                "BlockHash": hash_hex(0xbb),
                "Vcp": { "SortedCandidates": [{
                    "Holder": HOLDER,
                    "Stakes": [{ "source": SOURCE, "amount": "5000", "withdrawn": true, "return_height": "29000" }]
                }]}
            }]
        }),
    );
    let ledger = StakeReturnLedger::temporary().unwrap();
    let state = state(node.clone(), ledger.clone());

    let (status, body) = post(&state, "/block", block_request(200)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let txs = body["block"]["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 1);
    let published = withdrawal_identifier(&tx_hash.parse().unwrap()).to_hex();
    assert_eq!(txs[0]["transaction_identifier"]["hash"], published.as_str());
    let ops = txs[0]["operations"].as_array().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0]["type"], "TxFee");
    assert_eq!(ops[0]["amount"]["value"], "-1000000000000");

    let scheduled = ledger.get(200 + 28_800).unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].tx_hash.to_hex(), tx_hash);
    assert_eq!(scheduled[0].tx.source.coins.theta_wei, BigUint::from(5000u32));

    // replaying the block does not schedule twice
    post(&state, "/block", block_request(200)).await;
    assert_eq!(ledger.get(200 + 28_800).unwrap().len(), 1);

    // the return shows up at its height under the withdrawal hash
    node.respond("theta.GetBlockByHeight", node_block(29_000, json!([])));
    let (_, body) = post(&state, "/block", block_request(29_000)).await;
    let txs = body["block"]["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["transaction_identifier"]["hash"], tx_hash.as_str());
    assert_eq!(txs[0]["operations"][0]["amount"]["value"], "5000");
}

#[tokio::test]
async fn test_unresolvable_stake_fails_the_block() {
    let withdrawal = json!({
        "type": 9,
        "hash": hash_hex(0x44),
        "raw": {
            "fee": { "thetawei": "0", "tfuelwei": "1" },
            "source": { "address": SOURCE },
            "holder": { "address": HOLDER },
            "purpose": 1
        }
    });
    let node = MockNode::new();
    node.respond("theta.GetBlockByHeight", node_block(300, json!([withdrawal])));
    let state = state(node, StakeReturnLedger::temporary().unwrap());

    let (_, body) = post(&state, "/block", block_request(300)).await;
    assert_eq!(body["code"], 37);
}

#[tokio::test]
async fn test_missing_block() {
    let state = state(MockNode::new(), StakeReturnLedger::temporary().unwrap());

    let (_, body) = post(&state, "/block", block_request(5)).await;
    assert_eq!(body["code"], 39);
    assert_eq!(body["retriable"], false);

    let (_, body) = post(
        &state,
        "/block",
        json!({ "network_identifier": network_identifier(), "block_identifier": {} }),
    )
    .await;
    assert_eq!(body["code"], 9);
}

#[tokio::test]
async fn test_block_transaction_has_no_ledger_side_effect() {
    let tx_hash = hash_hex(0x55);
    let node = MockNode::new();
    node.respond(
        "theta.GetTransaction",
        json!({
            "block_hash": hash_hex(0xbb),
            "block_height": "200",
            "status": "finalized",
            "hash": tx_hash,
            "type": 9,
            "transaction": {
                "fee": { "thetawei": "0", "tfuelwei": "7" },
                "source": { "address": SOURCE },
                "holder": { "address": HOLDER },
                "purpose": 0
            }
        }),
    );
    let ledger = StakeReturnLedger::temporary().unwrap();
    let state = state(node.clone(), ledger.clone());

    let (status, body) = post(
        &state,
        "/block/transaction",
        json!({
            "network_identifier": network_identifier(),
            "block_identifier": { "index": 200, "hash": hash_hex(0xbb) },
            "transaction_identifier": { "hash": tx_hash }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["transaction"]["transaction_identifier"]["hash"], tx_hash.as_str());
    assert_eq!(body["transaction"]["operations"][0]["status"], "finalized");
    assert!(!node.called("theta.GetVcpByHeight"));
    assert!(ledger.get_or_empty(200 + 28_800).unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_account_has_zero_balances() {
    let node = MockNode::new();
    node.respond(
        "theta.GetStatus",
        json!({
            "latest_finalized_block_height": "42",
            "latest_finalized_block_hash": hash_hex(0x42)
        }),
    );
    let state = state(node.clone(), StakeReturnLedger::temporary().unwrap());

    let (status, body) = post(
        &state,
        "/account/balance",
        json!({
            "network_identifier": network_identifier(),
            "account_identifier": { "address": SOURCE },
            "currencies": [{ "symbol": "TFUEL", "decimals": 18 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["block_identifier"]["index"], 42);
    let balances = body["balances"].as_array().unwrap();
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0]["value"], "0");
    assert_eq!(balances[0]["currency"]["symbol"], "TFUEL");

    let (_, params) = node
        .calls()
        .into_iter()
        .find(|(m, _)| m == "theta.GetAccount")
        .unwrap();
    assert_eq!(params["height"], "42");
}

#[tokio::test]
async fn test_account_coins() {
    let node = MockNode::new();
    node.respond("theta.GetStatus", json!({ "latest_finalized_block_height": "9" }));
    node.respond(
        "theta.GetAccount",
        json!({ "sequence": "2", "coins": { "thetawei": "10", "tfuelwei": "20" } }),
    );
    let state = state(node, StakeReturnLedger::temporary().unwrap());

    let (status, body) = post(
        &state,
        "/account/coins",
        json!({
            "network_identifier": network_identifier(),
            "account_identifier": { "address": SOURCE },
            "include_mempool": false
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["coins"][0]["coin_identifier"]["identifier"], "ThetaWei");
    assert_eq!(body["coins"][0]["amount"]["value"], "10");
    assert_eq!(body["coins"][1]["coin_identifier"]["identifier"], "TFuelWei");
    assert_eq!(body["metadata"]["sequence_number"], 2);
}

#[tokio::test]
async fn test_network_status_and_list() {
    let node = MockNode::new();
    node.respond(
        "theta.GetStatus",
        json!({
            "latest_finalized_block_height": "10",
            "latest_finalized_block_hash": hash_hex(0x10),
            "latest_finalized_block_time": "1600000000",
            "current_height": "12",
            "syncing": false,
            "genesis_block_hash": hash_hex(0x00)
        }),
    );
    node.respond("theta.GetPeers", json!({ "peers": ["peer-a", "peer-b"] }));
    let state = state(node.clone(), StakeReturnLedger::temporary().unwrap());

    let (_, body) = post(&state, "/network/list", json!({})).await;
    assert_eq!(body["network_identifiers"][0]["blockchain"], "theta");
    assert_eq!(body["network_identifiers"][0]["network"], "privatenet");

    let (status, body) = post(
        &state,
        "/network/status",
        json!({ "network_identifier": network_identifier() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["current_block_identifier"]["index"], 10);
    assert_eq!(body["current_block_timestamp"], 1_600_000_000_000i64);
    assert_eq!(body["genesis_block_identifier"]["index"], 0);
    assert_eq!(body["sync_status"]["target_index"], 12);
    assert_eq!(body["sync_status"]["synced"], true);
    assert_eq!(body["peers"].as_array().unwrap().len(), 2);

    let (_, params) = node
        .calls()
        .into_iter()
        .find(|(m, _)| m == "theta.GetPeers")
        .unwrap();
    assert_eq!(params["skip_edge_node"], true);
}

#[tokio::test]
async fn test_mempool() {
    let node = MockNode::new();
    node.respond(
        "theta.GetPendingTransactions",
        json!({ "tx_hashes": [hash_hex(0x01), hash_hex(0x02)] }),
    );
    let state = state(node, StakeReturnLedger::temporary().unwrap());

    let (_, body) = post(&state, "/mempool", json!({ "network_identifier": network_identifier() })).await;
    let ids = body["transaction_identifiers"].as_array().unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0]["hash"], hash_hex(0x01).as_str());

    let (_, body) = post(
        &state,
        "/mempool/transaction",
        json!({
            "network_identifier": network_identifier(),
            "transaction_identifier": { "hash": hash_hex(0x09) }
        }),
    )
    .await;
    assert_eq!(body["code"], 36);
    assert_eq!(body["retriable"], false);
}

fn withdrawal_block(height: u64, source: &str) -> Value {
    node_block(
        height,
        json!([{
            "type": 9,
            "hash": hash_hex(0x66),
            "raw": {
                "fee": { "thetawei": "0", "tfuelwei": "1" },
                "source": { "address": source },
                "holder": { "address": HOLDER },
                "purpose": 0
            }
        }]),
    )
}

#[tokio::test]
async fn test_block_fetch_failures_are_distinct_from_missing_blocks() {
    let node = MockNode::new();
    node.fail(
        "theta.GetBlockByHeight",
        RpcError::Remote {
            code: -32603,
            message: "internal".into(),
        },
    );
    let state = state(node.clone(), StakeReturnLedger::temporary().unwrap());

    let (_, body) = post(&state, "/block", block_request(5)).await;
    assert_eq!(body["code"], 12);

    node.fail("theta.GetBlockByHeight", RpcError::Timeout(Duration::from_secs(5)));
    let (_, body) = post(&state, "/block", block_request(5)).await;
    assert_eq!(body["code"], 38);
    assert_eq!(body["retriable"], true);
}

#[tokio::test]
async fn test_stake_lookup_timeout_is_retriable() {
    let node = MockNode::new();
    node.respond("theta.GetBlockByHeight", withdrawal_block(400, SOURCE));
    node.fail("theta.GetVcpByHeight", RpcError::Timeout(Duration::from_secs(5)));
    let ledger = StakeReturnLedger::temporary().unwrap();
    let state = state(node, ledger.clone());

    let (status, body) = post(&state, "/block", block_request(400)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 38);
    assert_eq!(body["retriable"], true);
    assert!(ledger.get_or_empty(400 + 28_800).unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_withdrawal_fails_the_block() {
    let node = MockNode::new();
    node.respond("theta.GetBlockByHeight", withdrawal_block(500, "0xnothex"));
    let ledger = StakeReturnLedger::temporary().unwrap();
    let state = state(node.clone(), ledger.clone());

    let (status, body) = post(&state, "/block", block_request(500)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 21);
    assert_eq!(body["retriable"], false);
    assert!(!node.called("theta.GetVcpByHeight"));
    assert!(ledger.get_or_empty(500 + 28_800).unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_send_is_served_opaque() {
    let node = MockNode::new();
    node.respond(
        "theta.GetBlockByHeight",
        node_block(
            600,
            json!([{
                "type": 2,
                "hash": hash_hex(0x77),
                "raw": { "inputs": "not a list" }
            }]),
        ),
    );
    let state = state(node, StakeReturnLedger::temporary().unwrap());

    let (status, body) = post(&state, "/block", block_request(600)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let tx = &body["block"]["transactions"][0];
    assert_eq!(tx["transaction_identifier"]["hash"], hash_hex(0x77).as_str());
    assert_eq!(tx["metadata"]["type"], 2);
    assert!(tx["operations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_block_transaction() {
    let node = MockNode::new();
    node.respond(
        "theta.GetTransaction",
        json!({ "status": "not_found", "transaction": null }),
    );
    let state = state(node, StakeReturnLedger::temporary().unwrap());

    let (status, body) = post(
        &state,
        "/block/transaction",
        json!({
            "network_identifier": network_identifier(),
            "block_identifier": { "index": 200, "hash": hash_hex(0xbb) },
            "transaction_identifier": { "hash": hash_hex(0x99) }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 36);
    assert_eq!(body["retriable"], false);
}
