//! Theta Rosetta gateway
//!
//! Serves the Rosetta Data and Construction APIs in front of a Theta node.
//! Offline mode serves only the endpoints that need no node.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rosetta_api::services::StakeService;
use rosetta_api::{start_server, ApiState};
use rosetta_network::{HttpRpcClient, NodeClient, NodeRpc};
use rosetta_storage::StakeReturnLedger;
use tracing_subscriber::EnvFilter;

use config::{Config, Mode};

#[derive(Parser)]
#[command(name = "theta-rosetta")]
#[command(about = "Rosetta API gateway for the Theta blockchain", version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured mode
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the node RPC endpoint
    #[arg(long, value_name = "URL")]
    rpc_endpoint: Option<String>,
}

impl Cli {
    fn apply(self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(endpoint) = self.rpc_endpoint {
            config.theta.rpc_endpoint = endpoint;
        }
        config
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let config = cli.apply(config);
    config.validate()?;

    init_logging(&config.log.level);

    let addr = config.listen_addr()?;
    let state = match config.mode {
        Mode::Online => online_state(&config).await?,
        Mode::Offline => offline_state(&config)?,
    };

    tracing::info!(
        chain_id = %state.chain_id,
        mode = ?config.mode,
        endpoint = %config.theta.rpc_endpoint,
        "starting theta rosetta gateway"
    );
    start_server(addr, state).await?;
    Ok(())
}

async fn online_state(config: &Config) -> Result<ApiState> {
    let rpc: Arc<dyn NodeRpc> = Arc::new(HttpRpcClient::new(
        config.theta.rpc_endpoint.clone(),
        Duration::from_secs(config.theta.timeout_secs),
    )?);
    let node = NodeClient::new(rpc.clone());

    let status = node
        .status()
        .await
        .with_context(|| format!("querying node at {}", config.theta.rpc_endpoint))?;
    if !config.theta.chain_id.is_empty() && config.theta.chain_id != status.chain_id {
        tracing::warn!(
            configured = %config.theta.chain_id,
            reported = %status.chain_id,
            "configured chain id differs from the node's; using the node's"
        );
    }

    let ledger = StakeReturnLedger::open(&config.ledger.path)
        .with_context(|| format!("opening ledger at {}", config.ledger.path.display()))?;

    if config.ledger.snapshot_backfill {
        let stakes = StakeService::new(node, ledger.clone());
        let limit = Duration::from_secs(config.ledger.backfill_timeout_secs);
        match tokio::time::timeout(limit, stakes.snapshot_backfill()).await {
            Ok(Ok(count)) => tracing::info!(count, "snapshot backfill finished"),
            Ok(Err(e)) => tracing::warn!(error = %e, "snapshot backfill failed"),
            Err(_) => tracing::warn!(secs = limit.as_secs(), "snapshot backfill timed out"),
        }
        ledger.flush()?;
    }

    Ok(ApiState::new(status.chain_id, rpc, ledger))
}

fn offline_state(config: &Config) -> Result<ApiState> {
    // Never called: every node-backed endpoint is refused before dispatch
    let rpc: Arc<dyn NodeRpc> = Arc::new(HttpRpcClient::new(
        config.theta.rpc_endpoint.clone(),
        Duration::from_secs(config.theta.timeout_secs),
    )?);
    let ledger = StakeReturnLedger::temporary()?;
    Ok(ApiState::new(config.theta.chain_id.clone(), rpc, ledger).with_online(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "theta-rosetta",
            "--mode",
            "offline",
            "--port",
            "9000",
            "--rpc-endpoint",
            "http://node:16888/rpc",
        ]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));

        let config = cli.apply(Config::default());
        assert_eq!(config.mode, Mode::Offline);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.theta.rpc_endpoint, "http://node:16888/rpc");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["theta-rosetta", "-c", "gateway.toml"]);
        assert_eq!(cli.config, PathBuf::from("gateway.toml"));
        let config = cli.apply(Config::default());
        assert_eq!(config.mode, Mode::Online);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_offline_state_needs_no_node() {
        let mut config = Config::default();
        config.mode = Mode::Offline;
        config.theta.chain_id = "privatenet".to_string();
        let state = offline_state(&config).unwrap();
        assert!(!state.online);
        assert_eq!(state.chain_id, "privatenet");
    }
}
