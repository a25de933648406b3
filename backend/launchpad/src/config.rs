//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::errors::{LaunchpadError, Result};
use crate::types::is_evm_address;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// JSON-RPC endpoint of the node holding the submitting accounts
    pub rpc_url: String,
    /// Destination of every shield transfer
    pub privacy_pool_address: String,
    /// Default deadline for the pre-submission phase of contribute/distribute
    pub operation_timeout_secs: u64,
    /// How long to wait for a submitted transaction's receipt
    pub confirmation_timeout_secs: u64,
    /// Delay between `eth_getTransactionReceipt` polls
    pub receipt_poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./launchpad.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| LaunchpadError::Config("Invalid API_PORT".to_string()))?,
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            privacy_pool_address: env_var("PRIVACY_POOL_ADDRESS").map_err(|_| {
                LaunchpadError::Config(
                    "PRIVACY_POOL_ADDRESS environment variable is required".to_string(),
                )
            })?,
            operation_timeout_secs: env_var("OPERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| LaunchpadError::Config("Invalid OPERATION_TIMEOUT_SECS".to_string()))?,
            confirmation_timeout_secs: env_var("CONFIRMATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| {
                    LaunchpadError::Config("Invalid CONFIRMATION_TIMEOUT_SECS".to_string())
                })?,
            receipt_poll_interval_ms: env_var("RECEIPT_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| {
                    LaunchpadError::Config("Invalid RECEIPT_POLL_INTERVAL_MS".to_string())
                })?,
        };

        if !is_evm_address(&config.privacy_pool_address) {
            return Err(LaunchpadError::Config(
                "PRIVACY_POOL_ADDRESS must be a 0x-prefixed 20-byte hex address".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| LaunchpadError::Config(format!("Missing env var: {key}")))
}
