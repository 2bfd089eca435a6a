//! Gateway configuration
//!
//! Every field has a default, so an empty file (or none at all) yields a
//! runnable online gateway against a local node.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub theta: ThetaConfig,
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThetaConfig {
    pub rpc_endpoint: String,
    pub timeout_secs: u64,
    /// Required offline; discovered from the node when online
    pub chain_id: String,
}

impl Default for ThetaConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:16888/rpc".to_string(),
            timeout_secs: 30,
            chain_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub snapshot_backfill: bool,
    pub backfill_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/data/return_stakes"),
            snapshot_backfill: true,
            backfill_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.address, self.server.port);
        addr.parse()
            .with_context(|| format!("invalid listen address {}", addr))
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode == Mode::Offline && self.theta.chain_id.is_empty() {
            bail!("theta.chain_id is required in offline mode");
        }
        if self.theta.timeout_secs == 0 {
            bail!("theta.timeout_secs must be positive");
        }
        Ok(())
    }
}
