//! Theta Rosetta Network Module
//!
//! JSON-RPC access to the upstream Theta node.

pub mod error;
pub mod node;
pub mod rpc;
pub mod types;

pub use error::{RpcError, NOT_FOUND_CODE};
pub use node::NodeClient;
pub use rpc::{HttpRpcClient, NodeRpc};
pub use types::{
    BlockTx, NodeAccount, NodeBlock, NodeStatus, NodeTransaction, PoolSnapshot, Stake,
    StakeHolder, StakePool,
};
