//! API State Management

use std::sync::Arc;

use rosetta_network::{NodeClient, NodeRpc};
use rosetta_storage::StakeReturnLedger;

use crate::models::NetworkIdentifier;
use crate::{ApiError, ApiResult};

pub const ROSETTA_VERSION: &str = "1.4.10";

/// Shared by every handler. Holds no per-request state.
#[derive(Clone)]
pub struct ApiState {
    pub chain_id: String,
    pub online: bool,
    pub node: NodeClient,
    pub ledger: StakeReturnLedger,
    pub rosetta_version: String,
}

impl ApiState {
    pub fn new(chain_id: impl Into<String>, rpc: Arc<dyn NodeRpc>, ledger: StakeReturnLedger) -> Self {
        Self {
            chain_id: chain_id.into(),
            online: true,
            node: NodeClient::new(rpc),
            ledger,
            rosetta_version: ROSETTA_VERSION.to_string(),
        }
    }

    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    pub fn with_rosetta_version(mut self, version: impl Into<String>) -> Self {
        self.rosetta_version = version.into();
        self
    }

    pub fn network_identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: rosetta_core::CHAIN_NAME.to_string(),
            network: self.chain_id.clone(),
            sub_network_identifier: None,
        }
    }

    /// Fails before any node traffic when running offline
    pub fn require_online(&self) -> ApiResult<()> {
        if self.online {
            Ok(())
        } else {
            Err(ApiError::UnavailableOffline)
        }
    }

    pub fn check_network(&self, ni: Option<&NetworkIdentifier>) -> ApiResult<()> {
        let ni = ni.ok_or(ApiError::MissingNetworkIdentifier)?;
        if !ni.blockchain.eq_ignore_ascii_case(rosetta_core::CHAIN_NAME) {
            return Err(ApiError::InvalidBlockchain);
        }
        if ni.sub_network_identifier.is_some() {
            return Err(ApiError::InvalidSubnetwork);
        }
        if !ni.network.eq_ignore_ascii_case(&self.chain_id) {
            return Err(ApiError::InvalidNetwork);
        }
        Ok(())
    }

    /// Network check for endpoints where the identifier may be omitted
    pub fn check_network_if_present(&self, ni: Option<&NetworkIdentifier>) -> ApiResult<()> {
        match ni {
            Some(_) => self.check_network(ni),
            None => Ok(()),
        }
    }
}
