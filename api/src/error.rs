//! API Error Handling
//!
//! Every failure is a Rosetta error object: a stable code, a message and a
//! retriable flag. Variants carrying a string append it to a fixed prefix.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rosetta_core::CodecError;
use rosetta_crypto::CryptoError;
use rosetta_network::RpcError;
use rosetta_storage::StorageError;
use serde_json::json;
use thiserror::Error;

use crate::models::RosettaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("unable to get chain ID")]
    UnableToGetChainId,

    #[error("invalid blockchain specified in network identifier")]
    InvalidBlockchain,

    #[error("invalid sub-network identifier")]
    InvalidSubnetwork,

    #[error("invalid network specified in network identifier")]
    InvalidNetwork,

    #[error("network identifier is missing")]
    MissingNetworkIdentifier,

    #[error("unable to get latest block")]
    UnableToGetLatestBlock,

    #[error("unable to get genesis block")]
    UnableToGetGenesisBlock,

    #[error("unable to get account")]
    UnableToGetAccount,

    #[error("missing block hash or height for querying block")]
    MissingBlockHashOrHeight,

    #[error("invalid account address")]
    InvalidAccountAddress,

    #[error("a valid subaccount must be specified")]
    MustSpecifySubAccount,

    #[error("unable to get block")]
    UnableToGetBlock,

    #[error("operation not implemented")]
    NotImplemented,

    #[error("unable to get transactions")]
    UnableToGetTransactions,

    #[error("unable to submit transaction: {0}")]
    UnableToSubmitTransaction(String),

    #[error("unable to get next nonce")]
    UnableToGetNextNonce,

    #[error("malformed value: {0}")]
    MalformedValue(String),

    #[error("unable to get node status")]
    UnableToGetNodeStatus,

    #[error("Invalid input param: {0}")]
    InvalidInputParam(String),

    #[error("unsupported public key type")]
    UnsupportedPublicKeyType,

    #[error("unable to parse transaction: {0}")]
    UnableToParseTransaction(String),

    #[error("invalid gas price")]
    InvalidGasPrice,

    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    #[error("operation construction check error: {0}")]
    ConstructionCheck(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("exceeded max fee")]
    ExceededFee,

    #[error("unable to estimate gas: {0}")]
    UnableToEstimateGas(String),

    #[error("unable to get suggest gas: {0}")]
    UnableToGetSuggestGas(String),

    #[error("unable to get block transaction")]
    UnableToGetBlockTransaction,

    #[error("unable to get mempool")]
    UnableToGetMempool,

    #[error("unable to get mempool transaction")]
    UnableToGetMempoolTransaction,

    #[error("Endpoint unavailable offline")]
    UnavailableOffline,

    #[error("db key not found")]
    DbKeyNotFound,

    #[error("operations do not match any supported transaction: {0}")]
    UnmatchedOperations(String),

    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("unable to resolve staked amount: {0}")]
    UnableToResolveStake(String),

    #[error("upstream node unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("block not found")]
    BlockNotFound,
}

impl ApiError {
    pub fn code(&self) -> i32 {
        match self {
            ApiError::UnableToGetChainId => 1,
            ApiError::InvalidBlockchain => 2,
            ApiError::InvalidSubnetwork => 3,
            ApiError::InvalidNetwork => 4,
            ApiError::MissingNetworkIdentifier => 5,
            ApiError::UnableToGetLatestBlock => 6,
            ApiError::UnableToGetGenesisBlock => 7,
            ApiError::UnableToGetAccount => 8,
            ApiError::MissingBlockHashOrHeight => 9,
            ApiError::InvalidAccountAddress => 10,
            ApiError::MustSpecifySubAccount => 11,
            ApiError::UnableToGetBlock => 12,
            ApiError::NotImplemented => 13,
            ApiError::UnableToGetTransactions => 14,
            ApiError::UnableToSubmitTransaction(_) => 15,
            ApiError::UnableToGetNextNonce => 16,
            ApiError::MalformedValue(_) => 17,
            ApiError::UnableToGetNodeStatus => 18,
            ApiError::InvalidInputParam(_) => 19,
            ApiError::UnsupportedPublicKeyType => 20,
            ApiError::UnableToParseTransaction(_) => 21,
            ApiError::InvalidGasPrice => 22,
            ApiError::Unmarshal(_) => 23,
            ApiError::ConstructionCheck(_) => 24,
            ApiError::Internal(_) => 25,
            ApiError::ExceededFee => 26,
            ApiError::UnableToEstimateGas(_) => 27,
            ApiError::UnableToGetSuggestGas(_) => 28,
            ApiError::UnableToGetBlockTransaction => 29,
            ApiError::UnableToGetMempool => 30,
            ApiError::UnableToGetMempoolTransaction => 31,
            ApiError::UnavailableOffline => 32,
            ApiError::DbKeyNotFound => 33,
            ApiError::UnmatchedOperations(_) => 34,
            ApiError::SignatureVerificationFailed(_) => 35,
            ApiError::TransactionNotFound => 36,
            ApiError::UnableToResolveStake(_) => 37,
            ApiError::UpstreamUnavailable(_) => 38,
            ApiError::BlockNotFound => 39,
        }
    }

    pub fn retriable(&self) -> bool {
        matches!(
            self,
            ApiError::UnableToGetChainId
                | ApiError::UnableToGetLatestBlock
                | ApiError::UnableToGetGenesisBlock
                | ApiError::UnableToGetAccount
                | ApiError::UnableToGetNextNonce
                | ApiError::UnableToGetNodeStatus
                | ApiError::ConstructionCheck(_)
                | ApiError::ExceededFee
                | ApiError::UnableToEstimateGas(_)
                | ApiError::UnableToGetSuggestGas(_)
                | ApiError::UnableToGetBlockTransaction
                | ApiError::UnableToGetMempool
                | ApiError::UnableToGetMempoolTransaction
                | ApiError::UpstreamUnavailable(_)
        )
    }

    /// Map a node failure: transport problems become retriable upstream
    /// errors, everything else the endpoint's own error.
    pub fn from_rpc(err: RpcError, otherwise: ApiError) -> ApiError {
        if err.is_retriable() {
            ApiError::UpstreamUnavailable(err.to_string())
        } else {
            otherwise
        }
    }

    pub fn to_rosetta(&self) -> RosettaError {
        RosettaError {
            code: self.code(),
            message: self.to_string(),
            retriable: self.retriable(),
            details: None,
        }
    }

    /// Every error this gateway can return, in code order
    pub fn catalog() -> Vec<RosettaError> {
        let empty = String::new;
        [
            ApiError::UnableToGetChainId,
            ApiError::InvalidBlockchain,
            ApiError::InvalidSubnetwork,
            ApiError::InvalidNetwork,
            ApiError::MissingNetworkIdentifier,
            ApiError::UnableToGetLatestBlock,
            ApiError::UnableToGetGenesisBlock,
            ApiError::UnableToGetAccount,
            ApiError::MissingBlockHashOrHeight,
            ApiError::InvalidAccountAddress,
            ApiError::MustSpecifySubAccount,
            ApiError::UnableToGetBlock,
            ApiError::NotImplemented,
            ApiError::UnableToGetTransactions,
            ApiError::UnableToSubmitTransaction(empty()),
            ApiError::UnableToGetNextNonce,
            ApiError::MalformedValue(empty()),
            ApiError::UnableToGetNodeStatus,
            ApiError::InvalidInputParam(empty()),
            ApiError::UnsupportedPublicKeyType,
            ApiError::UnableToParseTransaction(empty()),
            ApiError::InvalidGasPrice,
            ApiError::Unmarshal(empty()),
            ApiError::ConstructionCheck(empty()),
            ApiError::Internal(empty()),
            ApiError::ExceededFee,
            ApiError::UnableToEstimateGas(empty()),
            ApiError::UnableToGetSuggestGas(empty()),
            ApiError::UnableToGetBlockTransaction,
            ApiError::UnableToGetMempool,
            ApiError::UnableToGetMempoolTransaction,
            ApiError::UnavailableOffline,
            ApiError::DbKeyNotFound,
            ApiError::UnmatchedOperations(empty()),
            ApiError::SignatureVerificationFailed(empty()),
            ApiError::TransactionNotFound,
            ApiError::UnableToResolveStake(empty()),
            ApiError::UpstreamUnavailable(empty()),
            ApiError::BlockNotFound,
        ]
        .iter()
        .map(|e| {
            let mut entry = e.to_rosetta();
            entry.message = entry.message.trim_end_matches([':', ' ']).to_string();
            entry
        })
        .collect()
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnmatchedOperations(reason) => ApiError::UnmatchedOperations(reason),
            CodecError::InvalidAddress(_) => ApiError::InvalidAccountAddress,
            CodecError::Rlp(_) | CodecError::TrailingBytes(_) | CodecError::UnknownTxType(_) => {
                ApiError::UnableToParseTransaction(e.to_string())
            }
            other => ApiError::InvalidInputParam(other.to_string()),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidPublicKey(_) => ApiError::InvalidInputParam(e.to_string()),
            other => ApiError::SignatureVerificationFailed(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => ApiError::DbKeyNotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!(self.to_rosetta()));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
