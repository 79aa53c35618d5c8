//! Link creation configuration.
//!
//! [`LinkConfig`] is immutable once built. Every field is checked by
//! [`LinkConfigBuilder::build`] (or when loading TOML), so invalid settings
//! fail before any chain query is made.

use std::path::Path;

use serde::{Deserialize, Serialize};

use client_blockchain_core::SuiAddress;
use client_blockchain_sui::{DEFAULT_GAS_BUDGET, SuiNetwork};

use crate::builder::MIN_CLAIM_GAS_BUDGET;
use crate::error::{Result, ZkSendError};
use crate::link::{DEFAULT_LINK_HOST, DEFAULT_LINK_PATH, LinkEncoder, Redirect};

/// What to do with small SUI coins the planner did not select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DustPolicy {
    /// Leave unselected coins untouched.
    #[default]
    Keep,
    /// Merge unselected SUI coins with a balance below `below` into the gas coin.
    SmashIntoGas { below: u64 },
}

/// Immutable settings for building one or more links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    sender: SuiAddress,

    #[serde(default)]
    network: SuiNetwork,

    #[serde(default)]
    redirect: Option<Redirect>,

    #[serde(default = "default_host")]
    host: String,

    #[serde(default = "default_path")]
    path: String,

    /// Budget of the funding transaction, in MIST
    #[serde(default = "default_gas_budget")]
    gas_budget: u64,

    /// Fixed gas reservation for the claim; estimated from the gas price when absent
    #[serde(default)]
    claim_gas_budget: Option<u64>,

    #[serde(default)]
    dust_policy: DustPolicy,
}

fn default_host() -> String {
    DEFAULT_LINK_HOST.to_string()
}

fn default_path() -> String {
    DEFAULT_LINK_PATH.to_string()
}

fn default_gas_budget() -> u64 {
    DEFAULT_GAS_BUDGET
}

impl LinkConfig {
    pub fn builder(sender: SuiAddress) -> LinkConfigBuilder {
        LinkConfigBuilder::new(sender)
    }

    /// Parse and validate a TOML document. Unknown keys are rejected.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| ZkSendError::InvalidConfig(format!("Invalid link config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ZkSendError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn sender(&self) -> SuiAddress {
        self.sender
    }

    pub fn network(&self) -> SuiNetwork {
        self.network
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }

    pub fn gas_budget(&self) -> u64 {
        self.gas_budget
    }

    pub fn claim_gas_budget(&self) -> Option<u64> {
        self.claim_gas_budget
    }

    pub fn dust_policy(&self) -> DustPolicy {
        self.dust_policy
    }

    /// Encoder for this configuration's host and path.
    pub fn encoder(&self) -> Result<LinkEncoder> {
        LinkEncoder::new(&self.host, &self.path)
    }

    fn validate(&self) -> Result<()> {
        if let Some(redirect) = &self.redirect {
            redirect.parsed_url()?;
            if redirect.name.trim().is_empty() {
                return Err(ZkSendError::InvalidConfig(
                    "Redirect name must not be empty".to_string(),
                ));
            }
        }

        if self.gas_budget == 0 {
            return Err(ZkSendError::InvalidConfig(
                "Gas budget must be greater than 0".to_string(),
            ));
        }

        if let Some(budget) = self.claim_gas_budget {
            check_claim_gas_budget(budget)?;
        }

        if self.dust_policy == (DustPolicy::SmashIntoGas { below: 0 }) {
            return Err(ZkSendError::InvalidConfig(
                "Dust threshold must be greater than 0".to_string(),
            ));
        }

        self.encoder()?;
        Ok(())
    }
}

/// A claim gas reservation below the floor leaves the link unclaimable.
pub(crate) fn check_claim_gas_budget(budget: u64) -> Result<()> {
    if budget < MIN_CLAIM_GAS_BUDGET {
        return Err(ZkSendError::InvalidConfig(format!(
            "Claim gas budget {budget} is below the minimum of {MIN_CLAIM_GAS_BUDGET} MIST"
        )));
    }
    Ok(())
}

/// Builder for [`LinkConfig`].
#[derive(Debug, Clone)]
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    fn new(sender: SuiAddress) -> Self {
        Self {
            config: LinkConfig {
                sender,
                network: SuiNetwork::default(),
                redirect: None,
                host: default_host(),
                path: default_path(),
                gas_budget: DEFAULT_GAS_BUDGET,
                claim_gas_budget: None,
                dust_policy: DustPolicy::default(),
            },
        }
    }

    pub fn network(mut self, network: SuiNetwork) -> Self {
        self.config.network = network;
        self
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.config.redirect = Some(redirect);
        self
    }

    pub fn host(mut self, host: impl Into<String>, path: impl Into<String>) -> Self {
        self.config.host = host.into();
        self.config.path = path.into();
        self
    }

    pub fn gas_budget(mut self, budget: u64) -> Self {
        self.config.gas_budget = budget;
        self
    }

    pub fn claim_gas_budget(mut self, budget: u64) -> Self {
        self.config.claim_gas_budget = Some(budget);
        self
    }

    pub fn dust_policy(mut self, policy: DustPolicy) -> Self {
        self.config.dust_policy = policy;
        self
    }

    pub fn build(self) -> Result<LinkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> SuiAddress {
        "0xa11ce".parse().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = LinkConfig::builder(sender()).build().unwrap();
        assert_eq!(config.network(), SuiNetwork::Mainnet);
        assert_eq!(config.gas_budget(), DEFAULT_GAS_BUDGET);
        assert_eq!(config.dust_policy(), DustPolicy::Keep);
        assert_eq!(config.encoder().unwrap().base(), "https://zksend.com/claim");
    }

    #[test]
    fn test_builder_rejects_invalid_fields() {
        let bad_redirect = LinkConfig::builder(sender())
            .redirect(Redirect::new("javascript:alert(1)", "x"))
            .build();
        assert!(matches!(bad_redirect, Err(ZkSendError::InvalidConfig(_))));

        assert!(LinkConfig::builder(sender()).gas_budget(0).build().is_err());
        assert!(LinkConfig::builder(sender()).claim_gas_budget(0).build().is_err());
        assert!(
            LinkConfig::builder(sender())
                .claim_gas_budget(MIN_CLAIM_GAS_BUDGET - 1)
                .build()
                .is_err()
        );
        assert!(
            LinkConfig::builder(sender())
                .claim_gas_budget(MIN_CLAIM_GAS_BUDGET)
                .build()
                .is_ok()
        );
        assert!(
            LinkConfig::builder(sender())
                .host("not a host", "/claim")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let source = r#"
            sender = "0xa11ce"
            network = "testnet"
            gas_budget = 20000000

            [redirect]
            url = "https://shop.example/thanks"
            name = "Shop"

            [dust_policy]
            policy = "smash_into_gas"
            below = 1000
        "#;
        let config = LinkConfig::from_toml_str(source).unwrap();

        assert_eq!(config.sender(), sender());
        assert_eq!(config.network(), SuiNetwork::Testnet);
        assert_eq!(config.gas_budget(), 20_000_000);
        assert_eq!(config.dust_policy(), DustPolicy::SmashIntoGas { below: 1000 });
        assert_eq!(config.redirect().unwrap().name, "Shop");
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let source = r#"
            sender = "0xa11ce"
            gas_budjet = 1
        "#;
        assert!(matches!(
            LinkConfig::from_toml_str(source),
            Err(ZkSendError::InvalidConfig(_))
        ));
    }
}
