//! Configuration management for the transfer orchestrator
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::chain::{validate_endpoint, Network};
use crate::error::{TransferError, TransferResult};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "XCHAIN_TRANSFER_CONFIG";

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub transfer: TransferConfig,
    pub keystore: KeystoreConfig,
    pub networks: HashMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub api_timeout_secs: u64,
    pub signer_timeout_secs: u64,
    pub step_pause_ms: u64,
    pub status_poll_ms: u64,
}

impl TransferConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn signer_timeout(&self) -> Duration {
        Duration::from_secs(self.signer_timeout_secs)
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }

    pub fn status_poll(&self) -> Duration {
        Duration::from_millis(self.status_poll_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeystoreConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub network_id: u32,
    pub endpoint: String,
    /// Fee per export/import in base units
    pub tx_fee: u64,
    pub enabled: bool,
}

impl Settings {
    /// Load settings from `path`, the `XCHAIN_TRANSFER_CONFIG` file, or `config/default.toml`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/default.toml")),
        };

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(raw);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_networks().is_empty() {
            anyhow::bail!("At least one network must be enabled");
        }

        for (name, network) in &self.networks {
            if network.enabled {
                validate_endpoint(&network.endpoint)
                    .with_context(|| format!("Network {} is misconfigured", name))?;
                if network.tx_fee == 0 {
                    tracing::warn!("Network {} has a zero tx fee", name);
                }
            }
        }

        if self.transfer.api_timeout_secs == 0 || self.transfer.signer_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }

        Ok(())
    }

    /// Get list of enabled networks
    pub fn enabled_networks(&self) -> Vec<(&String, &NetworkConfig)> {
        let mut enabled: Vec<_> = self.networks.iter().filter(|(_, n)| n.enabled).collect();
        enabled.sort_by(|a, b| a.0.cmp(b.0));
        enabled
    }

    /// Resolve an operator-selected network, optionally pointing it at another endpoint
    pub fn network(&self, name: &str, endpoint_override: Option<&str>) -> TransferResult<Network> {
        let config = self
            .networks
            .get(name)
            .filter(|n| n.enabled)
            .ok_or_else(|| {
                let known: Vec<&str> = self
                    .enabled_networks()
                    .into_iter()
                    .map(|(n, _)| n.as_str())
                    .collect();
                TransferError::Config(format!(
                    "network {} is not supported (choose one of: {})",
                    name,
                    known.join(", ")
                ))
            })?;

        let endpoint = match endpoint_override {
            Some(url) => {
                validate_endpoint(url)?;
                url.to_string()
            }
            None => config.endpoint.clone(),
        };

        Ok(Network {
            name: name.to_string(),
            network_id: config.network_id,
            endpoint,
            tx_fee: config.tx_fee,
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
