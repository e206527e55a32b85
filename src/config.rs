//! Environment-driven configuration.
//!
//! Loads a `.env` file when present, then reads from the process
//! environment. The signer key is consumed here as an already-available
//! secret; how it reaches the environment (file, secret store) is outside
//! this crate.

use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

use crate::types::ChainRole;

/// Main configuration for the warden.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: ChainConfig,
    pub destination: ChainConfig,
    pub warden: WardenConfig,
    pub relay: RelaySettings,
}

/// Per-chain RPC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
}

/// Signer and metadata configuration.
#[derive(Clone, Deserialize)]
pub struct WardenConfig {
    pub private_key: String,
    /// Path to the role-keyed contract metadata document.
    pub contract_info: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for WardenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WardenConfig")
            .field("private_key", &"<redacted>")
            .field("contract_info", &self.contract_info)
            .finish()
    }
}

/// Tunables for one relay pass.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Number of recent blocks scanned per pass.
    #[serde(default = "default_scan_window")]
    pub scan_window: u64,
    /// Bound on the receipt wait per submitted transaction.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Interval between receipt polls.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Gas limit used when estimation fails.
    #[serde(default = "default_gas_limit_fallback")]
    pub gas_limit_fallback: u64,
    /// Fixed priority fee for fee-market chains, in gwei.
    #[serde(default = "default_priority_fee_gwei")]
    pub priority_fee_gwei: u64,
}

impl RelaySettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn priority_fee_wei(&self) -> u128 {
        self.priority_fee_gwei as u128 * 1_000_000_000
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            scan_window: default_scan_window(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            gas_limit_fallback: default_gas_limit_fallback(),
            priority_fee_gwei: default_priority_fee_gwei(),
        }
    }
}

/// Default functions
fn default_scan_window() -> u64 {
    5
}

fn default_confirmation_timeout_secs() -> u64 {
    180
}

fn default_receipt_poll_interval_ms() -> u64 {
    3000
}

fn default_gas_limit_fallback() -> u64 {
    800_000
}

fn default_priority_fee_gwei() -> u64 {
    2
}

fn default_contract_info() -> String {
    "contract_info.json".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads a .env file if present, then reads from the environment.
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path.
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables.
    fn load_from_env() -> Result<Self> {
        let source = ChainConfig {
            rpc_url: env::var("SOURCE_RPC_URL")
                .map_err(|_| eyre!("SOURCE_RPC_URL environment variable is required"))?,
        };

        let destination = ChainConfig {
            rpc_url: env::var("DESTINATION_RPC_URL")
                .map_err(|_| eyre!("DESTINATION_RPC_URL environment variable is required"))?,
        };

        let warden = WardenConfig {
            private_key: env::var("WARDEN_PRIVATE_KEY")
                .map_err(|_| eyre!("WARDEN_PRIVATE_KEY environment variable is required"))?,
            contract_info: env::var("CONTRACT_INFO")
                .ok()
                .unwrap_or_else(default_contract_info),
        };

        let relay = RelaySettings {
            scan_window: env::var("SCAN_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_scan_window()),
            confirmation_timeout_secs: env::var("CONFIRMATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_confirmation_timeout_secs()),
            receipt_poll_interval_ms: env::var("RECEIPT_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_receipt_poll_interval_ms()),
            gas_limit_fallback: env::var("GAS_LIMIT_FALLBACK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_gas_limit_fallback()),
            priority_fee_gwei: env::var("PRIORITY_FEE_GWEI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_priority_fee_gwei()),
        };

        let config = Config {
            source,
            destination,
            warden,
            relay,
        };

        config.validate()?;
        Ok(config)
    }

    /// RPC configuration for the given role.
    pub fn chain(&self, role: ChainRole) -> &ChainConfig {
        match role {
            ChainRole::Source => &self.source,
            ChainRole::Destination => &self.destination,
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.source.rpc_url.is_empty() {
            return Err(eyre!("SOURCE_RPC_URL cannot be empty"));
        }

        if self.destination.rpc_url.is_empty() {
            return Err(eyre!("DESTINATION_RPC_URL cannot be empty"));
        }

        if self.warden.private_key.len() != 66 || !self.warden.private_key.starts_with("0x") {
            return Err(eyre!(
                "WARDEN_PRIVATE_KEY must be 66 chars (0x + 64 hex chars)"
            ));
        }

        if self.warden.contract_info.is_empty() {
            return Err(eyre!("CONTRACT_INFO cannot be empty"));
        }

        if self.relay.scan_window == 0 {
            return Err(eyre!("SCAN_WINDOW must be at least 1 block"));
        }

        if self.relay.confirmation_timeout_secs == 0 {
            return Err(eyre!("CONFIRMATION_TIMEOUT_SECS must be non-zero"));
        }

        Ok(())
    }
}
