//! JSON-RPC 2.0 transport to the Theta node

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::RpcError;

/// One request, one response. Implementations must bound every call by a
/// timeout and never retry.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RemoteError>,
}

/// reqwest-backed client for the node's HTTP endpoint
#[derive(Debug)]
pub struct HttpRpcClient {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout(self.timeout)
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl NodeRpc for HttpRpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "node request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        let parsed: Response = serde_json::from_str(&text).map_err(|e| {
            if status.is_server_error() {
                RpcError::Transport(format!("HTTP {}", status))
            } else {
                RpcError::Decode(e.to_string())
            }
        })?;

        if let Some(err) = parsed.error {
            if err.code != crate::error::NOT_FOUND_CODE {
                warn!(method, code = err.code, message = %err.message, "node returned an error");
            }
            return Err(RpcError::Remote {
                code: err.code,
                message: err.message,
            });
        }

        Ok(parsed.result)
    }
}
