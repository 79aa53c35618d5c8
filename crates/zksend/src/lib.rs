//! Claimable links on Sui.
//!
//! A sender funds a one-time ephemeral address with coins and objects and
//! shares a URL carrying its secret key. Whoever holds the URL can claim the
//! assets in one transaction; unused claim gas goes back to the sender.
//!
//! # Architecture
//!
//! ```text
//! LinkStateBuilder ──▶ CoinInventory (one snapshot per build)
//!        │         ──▶ planner (coin selection, gas reservation)
//!        │         ──▶ funding (ordered instructions → transaction)
//!        ▼
//!   LinkEncoder ──▶ URL ──▶ ClaimLink::decode ──▶ ClaimOrchestrator
//! ```
//!
//! The chain client is always injected (`Arc<dyn ChainClient>`); nothing in
//! this crate constructs one.
//!
//! # Usage
//!
//! ```ignore
//! let config = LinkConfig::builder(sender.address()).network(SuiNetwork::Testnet).build()?;
//! let mut builder = LinkStateBuilder::new(config, client.clone());
//! builder.add_claimable_mist(1_000_000_000)?;
//! let created = builder.create(&sender).await?;
//!
//! let link = ClaimLink::decode(&created.url)?;
//! ClaimOrchestrator::new(client).claim(&link, recipient).await?;
//! ```

pub mod builder;
pub mod claim;
pub mod config;
pub mod error;
pub mod funding;
pub mod inventory;
pub mod link;
pub mod planner;

pub use builder::{
    CLAIM_BASE_GAS_UNITS, CLAIM_PER_OBJECT_GAS_UNITS, ClaimRequest, CreatedLink,
    FundingTransaction, LinkPhase, LinkStateBuilder, MIN_CLAIM_GAS_BUDGET, estimate_claim_gas,
};
pub use claim::{
    ClaimOrchestrator, ClaimOutcome, ClaimTransaction, ClaimableAssets, GasReserve,
    redirect_after_claim,
};
pub use config::{DustPolicy, LinkConfig, LinkConfigBuilder};
pub use error::{Result, ZkSendError};
pub use funding::{CoinSource, Instruction};
pub use inventory::CoinInventory;
pub use link::{CLAIMER_ADDRESS_PARAM, ClaimLink, LinkEncoder, Redirect};
pub use planner::{GasPlan, PlannedTransfer, plan, plan_gas};
