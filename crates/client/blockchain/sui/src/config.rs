//! Sui network configuration.

use std::env;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::core::error::SuiError;

/// Default gas budget for funding transactions (0.05 SUI).
pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;

/// Sui network types.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SuiNetwork {
    /// Sui mainnet
    #[default]
    Mainnet,
    /// Sui testnet
    Testnet,
    /// Sui devnet
    Devnet,
    /// Local Sui network
    Localnet,
}

impl SuiNetwork {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "https://fullnode.mainnet.sui.io:443",
            SuiNetwork::Testnet => "https://fullnode.testnet.sui.io:443",
            SuiNetwork::Devnet => "https://fullnode.devnet.sui.io:443",
            SuiNetwork::Localnet => "http://127.0.0.1:9000",
        }
    }

    /// Default zkLogin proving service for this network.
    pub fn default_prover_url(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "https://prover.mystenlabs.com/v1",
            SuiNetwork::Testnet | SuiNetwork::Devnet => "https://prover-dev.mystenlabs.com/v1",
            SuiNetwork::Localnet => "http://127.0.0.1:8080/v1",
        }
    }
}

/// Sui-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiConfig {
    /// Sui network to connect to
    pub network: SuiNetwork,

    /// Custom RPC endpoint URL (overrides network default)
    pub rpc_url: Option<String>,

    /// Custom zkLogin proving service URL (overrides network default)
    pub prover_url: Option<String>,

    /// Gas budget for funding transactions (in MIST)
    pub gas_budget: u64,
}

impl SuiConfig {
    /// Create a new Sui configuration.
    pub fn new(network: SuiNetwork) -> Self {
        Self {
            network,
            rpc_url: None,
            prover_url: None,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SUI_NETWORK` - Network name (mainnet, testnet, devnet, localnet) (default: mainnet)
    /// - `SUI_RPC_URL` - Custom RPC endpoint URL
    /// - `ZKSEND_PROVER_URL` - Custom zkLogin proving service URL
    /// - `SUI_GAS_BUDGET` - Funding gas budget in MIST (default: 50000000)
    pub fn from_env() -> Result<Self, SuiError> {
        let network = match env::var("SUI_NETWORK") {
            Ok(value) => value.parse::<SuiNetwork>().map_err(|_| {
                SuiError::InvalidConfig(format!(
                    "Invalid SUI_NETWORK: {}. Must be mainnet, testnet, devnet, or localnet",
                    value
                ))
            })?,
            Err(_) => SuiNetwork::default(),
        };

        let gas_budget = match env::var("SUI_GAS_BUDGET") {
            Ok(value) => value.parse::<u64>().map_err(|e| {
                SuiError::InvalidConfig(format!("Invalid SUI_GAS_BUDGET {:?}: {}", value, e))
            })?,
            Err(_) => DEFAULT_GAS_BUDGET,
        };

        Ok(Self {
            network,
            rpc_url: env::var("SUI_RPC_URL").ok(),
            prover_url: env::var("ZKSEND_PROVER_URL").ok(),
            gas_budget,
        })
    }

    /// Set custom RPC URL.
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Set custom proving service URL.
    pub fn with_prover_url(mut self, url: impl Into<String>) -> Self {
        self.prover_url = Some(url.into());
        self
    }

    /// Set gas budget.
    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = budget;
        self
    }

    /// Get the RPC URL (custom or default for network).
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Get the proving service URL (custom or default for network).
    pub fn prover_url(&self) -> &str {
        self.prover_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_prover_url())
    }

    pub fn validate(&self) -> Result<(), SuiError> {
        for (name, value) in [("RPC URL", self.rpc_url()), ("prover URL", self.prover_url())] {
            let parsed = url::Url::parse(value)
                .map_err(|e| SuiError::InvalidConfig(format!("Invalid {} {}: {}", name, value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SuiError::InvalidConfig(format!(
                    "Invalid {} {}: scheme must be http or https",
                    name, value
                )));
            }
        }

        if self.gas_budget == 0 {
            return Err(SuiError::InvalidConfig(
                "Gas budget must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SuiConfig {
    fn default() -> Self {
        Self::new(SuiNetwork::default())
    }
}
