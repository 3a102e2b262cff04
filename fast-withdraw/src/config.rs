//! Configuration Management Module
//!
//! Loads the fast withdraw configuration from TOML: channel node endpoint,
//! session store location, identity labels, the two chains and the transfer
//! parameters.

use std::time::Duration;

use anyhow::Context;
use chain_clients_evm::{normalize_address, NATIVE_ASSET_ID};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FAST_WITHDRAW_CONFIG_PATH";

const DEFAULT_CONFIG_PATH: &str = "config/fast-withdraw.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastWithdrawConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Chain the value starts on
    pub child_chain: ChainConfig,
    /// Chain the value is withdrawn on
    pub parent_chain: ChainConfig,
    pub transfer: TransferConfig,
}

/// Channel node connection, session storage and confirmation polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the channel node HTTP API
    pub channel_node_url: String,
    /// Directory holding one JSON record per opened session
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
    /// How long each balance gate may wait for its post-condition
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
    /// Delay between balance polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Root key source and derivation labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Environment variable name containing the root private key (hex)
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    #[serde(default = "default_child_label")]
    pub child_label: String,
    #[serde(default = "default_parent_label")]
    pub parent_label: String,
    /// Open the parent session with the root key instead of a derived one
    #[serde(default)]
    pub parent_uses_root: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
            child_label: default_child_label(),
            parent_label: default_parent_label(),
            parent_uses_root: false,
        }
    }
}

/// Configuration for one EVM chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    pub chain_id: u64,
}

/// What to move and where to withdraw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Amount in base units, as a decimal string (u128 does not fit TOML integers)
    pub amount_wei: String,
    #[serde(default = "default_asset_id")]
    pub asset_id: String,
    /// Parent-chain address receiving the withdrawal; defaults to the root address
    #[serde(default)]
    pub withdraw_recipient: Option<String>,
}

fn default_store_dir() -> String {
    ".fast-withdraw/store".to_string()
}

fn default_confirmation_timeout_ms() -> u64 {
    120_000
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_private_key_env() -> String {
    "FAST_WITHDRAW_ROOT_PRIVATE_KEY".to_string()
}

fn default_child_label() -> String {
    "child".to_string()
}

fn default_parent_label() -> String {
    "parent".to_string()
}

fn default_asset_id() -> String {
    NATIVE_ASSET_ID.to_string()
}

impl FastWithdrawConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Uses `path`, else the `FAST_WITHDRAW_CONFIG_PATH` env var, else
    /// `config/fast-withdraw.toml`. The loaded configuration is validated.
    ///
    /// # Returns
    ///
    /// * `Ok(FastWithdrawConfig)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - File missing, unparsable, or validation failed
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Config file not found at {}. Copy config/fast-withdraw.template.toml to {} and fill in your values.",
                config_path,
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", config_path))?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: FastWithdrawConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service.channel_node_url.trim().is_empty() {
            anyhow::bail!("Configuration error: service.channel_node_url must not be empty");
        }
        if self.service.store_dir.trim().is_empty() {
            anyhow::bail!("Configuration error: service.store_dir must not be empty");
        }
        if self.service.confirmation_timeout_ms == 0 {
            anyhow::bail!("Configuration error: service.confirmation_timeout_ms must be positive");
        }
        if self.service.poll_interval_ms == 0
            || self.service.poll_interval_ms > self.service.confirmation_timeout_ms
        {
            anyhow::bail!(
                "Configuration error: service.poll_interval_ms must be between 1 and confirmation_timeout_ms ({})",
                self.service.confirmation_timeout_ms
            );
        }

        for (section, chain) in [("child_chain", &self.child_chain), ("parent_chain", &self.parent_chain)] {
            if chain.rpc_url.trim().is_empty() {
                anyhow::bail!("Configuration error: {}.rpc_url must not be empty", section);
            }
        }
        if self.child_chain.chain_id == self.parent_chain.chain_id {
            anyhow::bail!(
                "Configuration error: child_chain and parent_chain must have different chain_id values (both are {})",
                self.child_chain.chain_id
            );
        }

        let identity = &self.identity;
        if identity.private_key_env.trim().is_empty() {
            anyhow::bail!("Configuration error: identity.private_key_env must not be empty");
        }
        if identity.child_label.trim().is_empty() || identity.parent_label.trim().is_empty() {
            anyhow::bail!("Configuration error: identity labels must not be empty");
        }
        if identity.child_label == identity.parent_label {
            anyhow::bail!(
                "Configuration error: identity.child_label and identity.parent_label must differ (both are '{}')",
                identity.child_label
            );
        }

        self.amount_wei()?;
        normalize_address(&self.transfer.asset_id)
            .context("Configuration error: transfer.asset_id must be a 20-byte hex address")?;
        if let Some(recipient) = &self.transfer.withdraw_recipient {
            normalize_address(recipient).context(
                "Configuration error: transfer.withdraw_recipient must be a 20-byte hex address",
            )?;
        }

        Ok(())
    }

    /// Transfer amount in base units.
    pub fn amount_wei(&self) -> anyhow::Result<u128> {
        let amount: u128 = self.transfer.amount_wei.trim().parse().with_context(|| {
            format!(
                "Configuration error: transfer.amount_wei '{}' is not a decimal integer",
                self.transfer.amount_wei
            )
        })?;
        if amount == 0 {
            anyhow::bail!("Configuration error: transfer.amount_wei must be positive");
        }
        Ok(amount)
    }

    /// Reads the root private key from the configured environment variable.
    pub fn root_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.identity.private_key_env).with_context(|| {
            format!(
                "Environment variable {} (identity.private_key_env) is not set",
                self.identity.private_key_env
            )
        })
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.service.confirmation_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.service.poll_interval_ms)
    }
}
