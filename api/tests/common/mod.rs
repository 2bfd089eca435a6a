//! Shared fixtures: a scripted node and a one-shot request helper

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rosetta_api::{create_router, ApiState};
use rosetta_network::{NodeRpc, RpcError};
use rosetta_storage::StakeReturnLedger;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const CHAIN_ID: &str = "privatenet";

/// Node that answers each method with a canned result. Unscripted methods
/// fail with the node's not-found code. Every call is recorded.
#[derive(Default)]
pub struct MockNode {
    responses: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: &str, result: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), Ok(result));
    }

    pub fn fail(&self, method: &str, err: RpcError) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), Err(err));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|(m, _)| m == method)
    }
}

#[async_trait]
impl NodeRpc for MockNode {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        self.responses
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_else(|| {
                Err(RpcError::Remote {
                    code: -32000,
                    message: format!("{} not scripted", method),
                })
            })
    }
}

pub fn state(node: Arc<MockNode>, ledger: StakeReturnLedger) -> ApiState {
    ApiState::new(CHAIN_ID, node, ledger)
}

pub fn network_identifier() -> Value {
    json!({ "blockchain": "theta", "network": CHAIN_ID })
}

/// POST `body` to `path` and return the status with the decoded JSON body
pub async fn post(state: &ApiState, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
