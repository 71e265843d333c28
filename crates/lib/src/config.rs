use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::{fmt, fs, path::Path, str::FromStr, time::Duration};

use crate::{
    constant::{
        ADD_COMPUTE_UNIT_LIMIT_CU, ADD_COMPUTE_UNIT_PRICE_CU, CLOSE_ACCOUNT_CU,
        DEFAULT_ACCOUNTS_PER_TRANSACTION, DEFAULT_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS,
        DEFAULT_CONFIRMATION_TIMEOUT_MS, DEFAULT_METADATA_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS,
        DEFAULT_TRACKING_ADDRESS, MAX_ACCOUNTS_PER_TRANSACTION,
    },
    error::ReclaimError,
    sanitize_error,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: Network,
    pub batching: BatchingConfig,
    pub compute_budget: ComputeBudgetConfig,
    pub confirmation: ConfirmationConfig,
    pub tracking: TrackingConfig,
    pub metadata: MetadataConfig,
}

/// Cluster the wallet is connected to. Drives the default RPC endpoint and explorer links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    MainnetBeta,
    Devnet,
    Testnet,
    Localnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Value of the explorer `cluster` query parameter, `None` on mainnet
    pub fn explorer_cluster(&self) -> Option<&'static str> {
        match self {
            Network::MainnetBeta => None,
            Network::Devnet => Some("devnet"),
            Network::Testnet => Some("testnet"),
            Network::Localnet => Some("custom&customUrl=http%3A%2F%2F127.0.0.1%3A8899"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::MainnetBeta => "mainnet-beta",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Close instructions packed into one transaction
    pub accounts_per_transaction: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self { accounts_per_transaction: DEFAULT_ACCOUNTS_PER_TRANSACTION }
    }
}

/// Fixed priority fee and per-instruction compute costs used to size each close transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeBudgetConfig {
    pub unit_price_micro_lamports: u64,
    pub close_account_cu: u32,
    pub set_compute_unit_price_cu: u32,
    pub set_compute_unit_limit_cu: u32,
}

impl Default for ComputeBudgetConfig {
    fn default() -> Self {
        Self {
            unit_price_micro_lamports: DEFAULT_COMPUTE_UNIT_PRICE_MICRO_LAMPORTS,
            close_account_cu: CLOSE_ACCOUNT_CU,
            set_compute_unit_price_cu: ADD_COMPUTE_UNIT_PRICE_CU,
            set_compute_unit_limit_cu: ADD_COMPUTE_UNIT_LIMIT_CU,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self { poll_interval_ms: DEFAULT_POLL_INTERVAL_MS, timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Read-only, non-signer account appended to every close transaction for attribution
    pub address: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { address: DEFAULT_TRACKING_ADDRESS.to_string() }
    }
}

impl TrackingConfig {
    pub fn pubkey(&self) -> Result<Pubkey, ReclaimError> {
        Pubkey::from_str(&self.address).map_err(|e| {
            ReclaimError::ConfigError(format!("Invalid tracking address {}: {e}", self.address))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// DAS-compatible endpoint used to resolve token names and images. Unset disables lookup.
    pub das_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self { das_url: None, timeout_secs: DEFAULT_METADATA_TIMEOUT_SECS }
    }
}

impl Config {
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ReclaimError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ReclaimError::ConfigError(format!("Failed to read config file: {}", sanitize_error!(e)))
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            ReclaimError::ConfigError(format!("Failed to parse config file: {}", sanitize_error!(e)))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ReclaimError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_config(path)
        } else {
            log::info!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<(), ReclaimError> {
        let mut errors = Vec::new();

        let per_tx = self.batching.accounts_per_transaction;
        if per_tx == 0 {
            errors.push("batching.accounts_per_transaction must be greater than 0".to_string());
        } else if per_tx > MAX_ACCOUNTS_PER_TRANSACTION {
            errors.push(format!(
                "batching.accounts_per_transaction must be at most {MAX_ACCOUNTS_PER_TRANSACTION}, got {per_tx}"
            ));
        }

        if self.confirmation.poll_interval_ms == 0 {
            errors.push("confirmation.poll_interval_ms must be greater than 0".to_string());
        }
        if self.confirmation.timeout_ms < self.confirmation.poll_interval_ms {
            errors.push(format!(
                "confirmation.timeout_ms ({}) must not be shorter than poll_interval_ms ({})",
                self.confirmation.timeout_ms, self.confirmation.poll_interval_ms
            ));
        }

        if let Err(e) = self.tracking.pubkey() {
            errors.push(e.to_string());
        }

        if let Some(das_url) = &self.metadata.das_url {
            if let Err(e) = reqwest::Url::parse(das_url) {
                errors.push(format!("metadata.das_url is not a valid URL: {}", sanitize_error!(e)));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReclaimError::ConfigError(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batching.accounts_per_transaction, 20);
        assert_eq!(config.compute_budget.unit_price_micro_lamports, 1000);
        assert_eq!(config.confirmation.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.confirmation.timeout(), Duration::from_millis(10_000));
        assert_eq!(config.network, Network::MainnetBeta);
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
network = "devnet"

[batching]
accounts_per_transaction = 10

[compute_budget]
unit_price_micro_lamports = 5000
close_account_cu = 2916

[confirmation]
poll_interval_ms = 250
timeout_ms = 5000

[metadata]
das_url = "https://devnet.helius-rpc.com/?api-key=test"
"#,
        );

        let config = Config::load_config(file.path()).unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.batching.accounts_per_transaction, 10);
        assert_eq!(config.compute_budget.unit_price_micro_lamports, 5000);
        assert_eq!(config.compute_budget.close_account_cu, 2916);
        // Unset fields keep their defaults
        assert_eq!(config.compute_budget.set_compute_unit_limit_cu, ADD_COMPUTE_UNIT_LIMIT_CU);
        assert_eq!(config.confirmation.poll_interval_ms, 250);
        assert_eq!(config.tracking.address, DEFAULT_TRACKING_ADDRESS);
        assert!(config.metadata.das_url.is_some());
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let file = write_config("");
        let config = Config::load_config(file.path()).unwrap();
        assert_eq!(config.batching.accounts_per_transaction, DEFAULT_ACCOUNTS_PER_TRANSACTION);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = write_config("batching = [not toml");
        let result = Config::load_config(file.path());
        assert!(matches!(result, Err(ReclaimError::ConfigError(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_config("nonexistent_reclaim.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("nonexistent_reclaim.toml").unwrap();
        assert_eq!(config.batching.accounts_per_transaction, DEFAULT_ACCOUNTS_PER_TRANSACTION);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.batching.accounts_per_transaction = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("accounts_per_transaction"));
    }

    #[test]
    fn test_validate_rejects_oversized_batch() {
        let mut config = Config::default();
        config.batching.accounts_per_transaction = MAX_ACCOUNTS_PER_TRANSACTION + 1;
        assert!(config.validate().is_err());

        config.batching.accounts_per_transaction = MAX_ACCOUNTS_PER_TRANSACTION;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_timeout_shorter_than_interval() {
        let mut config = Config::default();
        config.confirmation.poll_interval_ms = 1000;
        config.confirmation.timeout_ms = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tracking_address() {
        let mut config = Config::default();
        config.tracking.address = "not-a-pubkey".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tracking address"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.batching.accounts_per_transaction = 0;
        config.confirmation.poll_interval_ms = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("accounts_per_transaction"));
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_network_explorer_cluster() {
        assert_eq!(Network::MainnetBeta.explorer_cluster(), None);
        assert_eq!(Network::Devnet.explorer_cluster(), Some("devnet"));
        assert_eq!(Network::Devnet.to_string(), "devnet");
    }
}
