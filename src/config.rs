use config::{Config as ConfigLoader, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Error;

/// Network preset used when `config/network.toml` is absent
pub const DEFAULT_NETWORK: &str = "osmosis-testnet";

/// Network configuration for a CosmWasm chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Network name (e.g., osmosis-testnet)
    pub network_name: String,
    /// Chain ID (e.g., osmo-test-5)
    pub chain_id: String,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Bech32 account prefix
    pub account_prefix: String,
    /// Gas price as `<decimal><denom>`, handed to the chain client as-is
    pub gas_price: String,
    /// Multiplier applied to simulated gas
    pub gas_adjustment: f64,
    /// Fixed gas limit; simulated when unset
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Faucet endpoint for test tokens
    #[serde(default)]
    pub faucet_url: Option<String>,
}

impl NetworkConfig {
    /// Built-in Osmosis testnet preset
    pub fn osmosis_testnet() -> Self {
        Self {
            network_name: DEFAULT_NETWORK.to_string(),
            chain_id: "osmo-test-5".to_string(),
            rpc_url: "https://rpc.testnet.osmosis.zone".to_string(),
            account_prefix: "osmo".to_string(),
            gas_price: "0.025uosmo".to_string(),
            gas_adjustment: 1.3,
            gas_limit: None,
            faucet_url: Some("https://faucet.testnet.osmosis.zone".to_string()),
        }
    }

    /// Load a named network preset from the `network` file in the config directory
    pub fn load(network: &str) -> Result<Self, Error> {
        let settings = ConfigLoader::builder()
            .add_source(File::with_name(&format!("{}/network", config_dir())))
            .build()?;

        settings.get::<NetworkConfig>(network).map_err(Into::into)
    }

    /// Parsed gas price
    pub fn parsed_gas_price(&self) -> Result<GasPrice, Error> {
        GasPrice::from_str(&self.gas_price)
    }
}

/// Config directory, overridable through `ETF_CONFIG_DIR`
pub fn config_dir() -> String {
    env::var("ETF_CONFIG_DIR").unwrap_or_else(|_| "config".to_string())
}

/// Gas price in the `<decimal><denom>` notation, e.g. `0.025uosmo`
#[derive(Debug, Clone, PartialEq)]
pub struct GasPrice {
    pub amount: f64,
    pub denom: String,
}

impl GasPrice {
    /// Fee amount for the given gas limit, rounded up
    pub fn fee_amount(&self, gas_limit: u64) -> u128 {
        (gas_limit as f64 * self.amount).ceil() as u128
    }
}

impl FromStr for GasPrice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| Error::Config(format!("Gas price '{}' has no denom", s)))?;
        let (amount, denom) = s.split_at(split);

        let amount = amount
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("Invalid gas price amount in '{}'", s)))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::Config(format!("Invalid gas price amount in '{}'", s)));
        }

        Ok(Self {
            amount,
            denom: denom.to_string(),
        })
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Retry policy for transient failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds)
    pub initial_backoff_ms: u64,
    /// Factor applied to the delay after every retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .max(1.0)
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_backoff_ms as f64 * factor) as u64)
    }
}

/// Driver and runner behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    /// Deadline for a single chain operation (seconds)
    pub operation_timeout_secs: u64,
    /// Default deadline for a scenario (seconds)
    pub scenario_timeout_secs: u64,
    /// Whether the runner continues after a failed step or scenario
    pub continue_on_failure: bool,
    /// Directory relative artifact paths are resolved against
    pub artifacts_dir: PathBuf,
    /// Retry policy for timeouts and connection failures
    pub retry: RetryPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 60,
            scenario_timeout_secs: 300,
            continue_on_failure: false,
            artifacts_dir: PathBuf::from("artifacts"),
            retry: RetryPolicy::default(),
        }
    }
}

impl DriverConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario_timeout_secs)
    }

    /// Resolve an artifact path against `artifacts_dir`
    pub fn artifact_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            self.artifacts_dir.join(path)
        }
    }
}

/// Secret string that never shows up in debug output
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Complete configuration for one run, immutable once loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Active network
    pub network: NetworkConfig,
    /// Driver behaviour
    pub driver: DriverConfig,
    /// Wallet mnemonic (seed phrase)
    #[serde(default, skip_serializing)]
    pub mnemonic: Option<Secret>,
    /// HD account index
    #[serde(default)]
    pub account_index: u32,
}

impl Settings {
    /// Create settings for a network with default driver behaviour
    pub fn with_network(network: NetworkConfig) -> Self {
        Self {
            network,
            driver: DriverConfig::default(),
            mnemonic: None,
            account_index: 0,
        }
    }

    /// Load configuration with layered sources: defaults -> network preset -> file -> env vars
    ///
    /// Environment variables use the `ETF` prefix with `__` between nested keys,
    /// e.g. `ETF_NETWORK__RPC_URL` or `ETF_DRIVER__RETRY__MAX_RETRIES`.
    /// The mnemonic is read from `ETF_MNEMONIC`.
    pub fn from_sources(config_file: Option<&Path>, network: Option<&str>) -> Result<Self, Error> {
        info!("Loading configuration with layered sources");

        let network_name = network
            .map(str::to_string)
            .or_else(|| env::var("ETF_NETWORK_PRESET").ok())
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());

        let preset = match NetworkConfig::load(&network_name) {
            Ok(preset) => preset,
            Err(e) if network_name == DEFAULT_NETWORK => {
                debug!("Using built-in {} preset: {}", DEFAULT_NETWORK, e);
                NetworkConfig::osmosis_testnet()
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Unknown network '{}': {}",
                    network_name, e
                )))
            }
        };

        let defaults = DriverConfig::default();
        let mut builder = ConfigLoader::builder()
            .set_default("network.network_name", preset.network_name)?
            .set_default("network.chain_id", preset.chain_id)?
            .set_default("network.rpc_url", preset.rpc_url)?
            .set_default("network.account_prefix", preset.account_prefix)?
            .set_default("network.gas_price", preset.gas_price)?
            .set_default("network.gas_adjustment", preset.gas_adjustment)?
            .set_default("network.gas_limit", preset.gas_limit)?
            .set_default("network.faucet_url", preset.faucet_url)?
            .set_default(
                "driver.operation_timeout_secs",
                defaults.operation_timeout_secs,
            )?
            .set_default("driver.scenario_timeout_secs", defaults.scenario_timeout_secs)?
            .set_default("driver.continue_on_failure", defaults.continue_on_failure)?
            .set_default(
                "driver.artifacts_dir",
                defaults.artifacts_dir.to_string_lossy().to_string(),
            )?
            .set_default("driver.retry.max_retries", defaults.retry.max_retries)?
            .set_default(
                "driver.retry.initial_backoff_ms",
                defaults.retry.initial_backoff_ms,
            )?
            .set_default(
                "driver.retry.backoff_multiplier",
                defaults.retry.backoff_multiplier,
            )?
            .set_default("account_index", 0)?;

        if let Some(path) = config_file {
            if path.exists() {
                builder = builder.add_source(File::from(path));
                info!("Added configuration file: {}", path.display());
            } else {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
        } else {
            let default_path = Self::default_path();
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path.as_path()));
                info!("Added configuration file: {}", default_path.display());
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ETF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        if settings.mnemonic.is_none() {
            warn!("No mnemonic configured; signing commands will fail");
        }
        debug!("Final config: {:?}", settings);

        Ok(settings)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(Error::Config("network.rpc_url is required".to_string()));
        }
        if self.network.chain_id.trim().is_empty() {
            return Err(Error::Config("network.chain_id is required".to_string()));
        }
        if self.network.account_prefix.trim().is_empty() {
            return Err(Error::Config(
                "network.account_prefix is required".to_string(),
            ));
        }
        if self.network.gas_adjustment <= 0.0 {
            return Err(Error::Config(
                "network.gas_adjustment must be positive".to_string(),
            ));
        }
        self.network.parsed_gas_price()?;
        if self.driver.operation_timeout_secs == 0 || self.driver.scenario_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }

    /// The mnemonic, or a configuration error naming where to put it
    pub fn require_mnemonic(&self) -> Result<&str, Error> {
        self.mnemonic
            .as_ref()
            .map(Secret::expose)
            .ok_or_else(|| {
                Error::Config("mnemonic is required (set ETF_MNEMONIC)".to_string())
            })
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("etf-driver");
        path.push("config.toml");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_price_parsing() {
        let price = GasPrice::from_str("0.025uosmo").unwrap();
        assert_eq!(price.amount, 0.025);
        assert_eq!(price.denom, "uosmo");
        assert_eq!(price.fee_amount(200_000), 5_000);
        assert_eq!(price.fee_amount(1), 1);
    }

    #[test]
    fn test_gas_price_with_ibc_denom() {
        let price =
            GasPrice::from_str("1ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2")
                .unwrap();
        assert_eq!(price.amount, 1.0);
        assert!(price.denom.starts_with("ibc/"));
    }

    #[test]
    fn test_gas_price_rejects_missing_parts() {
        assert!(GasPrice::from_str("0.025").is_err());
        assert!(GasPrice::from_str("uosmo").is_err());
        assert!(GasPrice::from_str("").is_err());
    }

    #[test]
    fn test_retry_backoff_grows() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_secret_is_redacted() {
        let settings = Settings {
            mnemonic: Some(Secret::new("abandon abandon about")),
            ..Settings::with_network(NetworkConfig::osmosis_testnet())
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("abandon"));
        assert!(debug.contains("Secret(***)"));
    }
}
