use std::time::Duration;

use thiserror::Error;

/// Code the node answers with when the requested object does not exist
pub const NOT_FOUND_CODE: i64 = -32000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Node unreachable: {0}")]
    Transport(String),

    #[error("Node request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Node error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Malformed node response: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether the same request may succeed later
    pub fn is_retriable(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::Remote { code, .. } if *code == NOT_FOUND_CODE)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Decode(e.to_string())
    }
}
