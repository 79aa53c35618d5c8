//! Sui network integration for claimable links.
//!
//! This crate connects the chain-agnostic link logic to a Sui full node:
//! - Network configuration (`SuiNetwork`, `SuiConfig`)
//! - JSON-RPC [`ChainClient`](client_blockchain_core::ChainClient) implementation
//! - HTTP zkLogin proving service
//!
//! # Architecture
//!
//! ```text
//! zksend (planner, claim flow)
//!     │  Arc<dyn ChainClient>
//!     ▼
//! SuiRpcClient ──JSON-RPC──▶ Sui full node
//!
//! zk (proof inputs)
//!     │  &dyn ProvingService
//!     ▼
//! HttpProvingService ──HTTP──▶ zkLogin prover
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use client_blockchain_sui::{SuiConfig, SuiRpcClient};
//! use client_blockchain_core::ChainClient;
//!
//! let config = SuiConfig::from_env()?;
//! let client: Arc<dyn ChainClient> = Arc::new(SuiRpcClient::new(config)?);
//! let price = client.reference_gas_price().await?;
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod prover;
pub mod utils;

pub use client::SuiRpcClient;
pub use config::{DEFAULT_GAS_BUDGET, SuiConfig, SuiNetwork};
pub use core::{Result, SuiError};
pub use prover::HttpProvingService;
