//! Subcommands and the helpers they share.

mod claim;
mod create;
mod inspect;
mod prove;
mod zk_address;

pub use claim::Claim;
pub use create::Create;
pub use inspect::Inspect;
pub use prove::Prove;
pub use zk_address::ZkAddress;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use client_blockchain_core::{ChainClient, CoinType, Ed25519Keypair};
use client_blockchain_sui::{SuiConfig, SuiNetwork, SuiRpcClient};

/// Sui configuration from the environment, optionally pinned to `network`.
///
/// A link always names its network; the environment only supplies endpoints
/// and budgets in that case.
pub(crate) fn sui_config(network: Option<SuiNetwork>) -> Result<SuiConfig> {
    let mut config = SuiConfig::from_env().context("Failed to load Sui configuration")?;
    if let Some(network) = network {
        config.network = network;
    }
    Ok(config)
}

pub(crate) fn chain_client(config: SuiConfig) -> Result<Arc<dyn ChainClient>> {
    tracing::info!(network = %config.network, rpc = config.rpc_url(), "Connecting to Sui");
    let client = SuiRpcClient::new(config).context("Failed to create Sui RPC client")?;
    Ok(Arc::new(client))
}

pub(crate) fn parse_keypair(encoded: &str) -> Result<Ed25519Keypair> {
    Ed25519Keypair::from_bech32(encoded.trim()).context("Invalid private key")
}

/// Parse `COIN_TYPE=AMOUNT`.
pub(crate) fn parse_balance(value: &str) -> Result<(CoinType, u64)> {
    let (coin_type, amount) = value
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("Expected COIN_TYPE=AMOUNT, got {value:?}"))?;
    let coin_type = coin_type
        .trim()
        .parse::<CoinType>()
        .with_context(|| format!("Invalid coin type {coin_type:?}"))?;
    let amount = amount
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Invalid amount {amount:?}"))?;
    Ok((coin_type, amount))
}
