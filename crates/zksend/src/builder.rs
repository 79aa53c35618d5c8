//! Link creation.
//!
//! A [`LinkStateBuilder`] owns a fresh ephemeral keypair and accumulates
//! claims while [`LinkPhase::Open`]. Building the funding transaction seals
//! it; from then on only the link itself can be read.
//!
//! # Flow
//!
//! ```text
//! add_claimable_*  ─▶  build()  ─▶  sign + submit  ─▶  link_url()
//!      (Open)          (seals)
//! ```
//!
//! [`LinkStateBuilder::create`] runs the whole flow and seals only once the
//! chain accepted the funding transaction, so a `VersionConflict` leaves the
//! builder open for a rebuild from a fresh snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use client_blockchain_core::{
    ChainClient, CoinType, Ed25519Keypair, ExecutedTransaction, ObjectId, ObjectRef,
    SignedTransaction, SuiAddress, TransactionData, TransactionDigest, TransactionSigner,
    TransportError,
};

use crate::config::{LinkConfig, check_claim_gas_budget};
use crate::error::{Result, ZkSendError};
use crate::funding::{CoinPlan, FundingPlan, Instruction};
use crate::inventory::CoinInventory;
use crate::link::ClaimLink;
use crate::planner::{plan, plan_gas};

/// Gas units charged by a claim regardless of its size.
pub const CLAIM_BASE_GAS_UNITS: u64 = 2_000;

/// Additional gas units per claimed object.
pub const CLAIM_PER_OBJECT_GAS_UNITS: u64 = 500;

/// Lower bound of the claim gas reservation, in MIST.
pub const MIN_CLAIM_GAS_BUDGET: u64 = 5_000_000;

/// A single requested claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRequest {
    Coin { coin_type: CoinType, amount: u64 },
    Object { object_id: ObjectId },
}

/// Builder lifecycle. Transitions only from `Open` to `Sealed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Open,
    Sealed,
}

#[derive(Debug)]
enum LinkState {
    Open {
        claims: Vec<ClaimRequest>,
        gas_estimate: Option<u64>,
    },
    Sealed {
        claims: Vec<ClaimRequest>,
        funding: FundingTransaction,
    },
}

/// Unsigned funding transaction and the plan it was lowered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingTransaction {
    pub data: TransactionData,
    pub instructions: Vec<Instruction>,
    /// Ephemeral address receiving the assets.
    pub recipient: SuiAddress,
    /// MIST reserved for the claim transaction.
    pub gas_reserve: u64,
}

impl FundingTransaction {
    pub fn digest(&self) -> Result<TransactionDigest> {
        Ok(self.data.digest()?)
    }
}

/// A funded link.
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub url: String,
    pub link: ClaimLink,
    pub funding: FundingTransaction,
    pub executed: ExecutedTransaction,
}

/// Accumulates claims for one link and emits its funding transaction.
///
/// Not meant to be shared between concurrent callers; create one builder per
/// link.
pub struct LinkStateBuilder {
    config: LinkConfig,
    client: Arc<dyn ChainClient>,
    keypair: Ed25519Keypair,
    state: LinkState,
}

impl LinkStateBuilder {
    /// Create a builder with a freshly generated ephemeral keypair.
    pub fn new(config: LinkConfig, client: Arc<dyn ChainClient>) -> Self {
        Self::with_keypair(config, client, Ed25519Keypair::generate())
    }

    pub fn with_keypair(
        config: LinkConfig,
        client: Arc<dyn ChainClient>,
        keypair: Ed25519Keypair,
    ) -> Self {
        tracing::debug!(address = %keypair.address(), "New link");
        Self {
            config,
            client,
            keypair,
            state: LinkState::Open {
                claims: Vec::new(),
                gas_estimate: None,
            },
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn phase(&self) -> LinkPhase {
        match self.state {
            LinkState::Open { .. } => LinkPhase::Open,
            LinkState::Sealed { .. } => LinkPhase::Sealed,
        }
    }

    /// Ephemeral address that will hold the link's assets.
    pub fn address(&self) -> SuiAddress {
        self.keypair.address()
    }

    pub fn claims(&self) -> &[ClaimRequest] {
        match &self.state {
            LinkState::Open { claims, .. } | LinkState::Sealed { claims, .. } => claims,
        }
    }

    /// Funding transaction of a sealed link.
    pub fn funding(&self) -> Option<&FundingTransaction> {
        match &self.state {
            LinkState::Open { .. } => None,
            LinkState::Sealed { funding, .. } => Some(funding),
        }
    }

    pub fn link(&self) -> ClaimLink {
        let link = ClaimLink::new(self.keypair.clone(), self.config.network());
        match self.config.redirect() {
            Some(redirect) => link.with_redirect(redirect.clone()),
            None => link,
        }
    }

    pub fn link_url(&self) -> Result<String> {
        Ok(self.config.encoder()?.encode(&self.link()))
    }

    fn open_claims(&mut self) -> Result<(&mut Vec<ClaimRequest>, &mut Option<u64>)> {
        match &mut self.state {
            LinkState::Open {
                claims,
                gas_estimate,
            } => Ok((claims, gas_estimate)),
            LinkState::Sealed { .. } => Err(ZkSendError::LinkSealed),
        }
    }

    // ========================================================================
    // Claims
    // ========================================================================

    /// Add `amount` of `coin_type` to the link.
    ///
    /// # Errors
    ///
    /// - `LinkSealed` once the funding transaction was built
    /// - `AmountOverflow` when the total for `coin_type` exceeds u64
    pub fn add_claimable_balance(&mut self, coin_type: CoinType, amount: u64) -> Result<()> {
        let (claims, _) = self.open_claims()?;

        let current = claims
            .iter()
            .filter_map(|claim| match claim {
                ClaimRequest::Coin {
                    coin_type: existing,
                    amount,
                } if *existing == coin_type => Some(*amount),
                _ => None,
            })
            .try_fold(0u64, u64::checked_add);
        if current.and_then(|total| total.checked_add(amount)).is_none() {
            return Err(ZkSendError::AmountOverflow { coin_type });
        }

        if amount == 0 {
            tracing::debug!(%coin_type, "Ignoring zero amount claim");
            return Ok(());
        }

        claims.push(ClaimRequest::Coin { coin_type, amount });
        Ok(())
    }

    /// Add `amount` MIST of SUI.
    pub fn add_claimable_mist(&mut self, amount: u64) -> Result<()> {
        self.add_claimable_balance(CoinType::sui(), amount)
    }

    /// Add an object owned by the sender.
    ///
    /// Ownership and transferability are checked by [`Self::build`].
    pub fn add_claimable_object(&mut self, object_id: ObjectId) -> Result<()> {
        let (claims, _) = self.open_claims()?;
        if claims
            .iter()
            .any(|claim| *claim == ClaimRequest::Object { object_id })
        {
            return Err(ZkSendError::ObjectNotTransferable {
                object_id,
                reason: "already added to this link".to_string(),
            });
        }
        claims.push(ClaimRequest::Object { object_id });
        Ok(())
    }

    /// Fix the claim gas reservation instead of estimating it from the gas price.
    ///
    /// # Errors
    ///
    /// - `LinkSealed` once the funding transaction was built
    /// - `InvalidConfig` when `budget` is below [`MIN_CLAIM_GAS_BUDGET`]
    pub fn set_gas_budget_estimate(&mut self, budget: u64) -> Result<()> {
        check_claim_gas_budget(budget)?;
        let (_, gas_estimate) = self.open_claims()?;
        *gas_estimate = Some(budget);
        Ok(())
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Plan the funding transaction and seal the link.
    ///
    /// Coins are snapshotted once; a plan built from a stale snapshot is
    /// rejected by the chain at submission with `VersionConflict`.
    pub async fn build(&mut self) -> Result<FundingTransaction> {
        let funding = self.plan_funding().await?;
        self.seal(funding.clone())?;
        Ok(funding)
    }

    /// Sign and submit a funding transaction built by this builder.
    pub async fn submit(
        &self,
        funding: &FundingTransaction,
        signer: &dyn TransactionSigner,
    ) -> Result<ExecutedTransaction> {
        if signer.address() != self.config.sender() {
            return Err(ZkSendError::Signing(format!(
                "signer {} is not the link sender {}",
                signer.address(),
                self.config.sender()
            )));
        }

        let signature = signer.sign_transaction(&funding.data)?;
        let signed = SignedTransaction::new(funding.data.clone(), vec![signature]);
        let executed = self
            .client
            .submit_transaction(signed)
            .await
            .map_err(|error| {
                if error.is_version_conflict() {
                    tracing::warn!(%error, "Funding transaction used a stale snapshot");
                }
                ZkSendError::from(error)
            })?;

        tracing::info!(
            digest = %executed.digest,
            link = %funding.recipient,
            gas_used = executed.gas_used,
            "✓ Link funded"
        );
        Ok(executed)
    }

    /// Build, sign and submit, sealing only after the chain accepted the transaction.
    pub async fn create(&mut self, signer: &dyn TransactionSigner) -> Result<CreatedLink> {
        let funding = self.plan_funding().await?;
        let executed = self.submit(&funding, signer).await?;
        self.seal(funding.clone())?;

        Ok(CreatedLink {
            url: self.link_url()?,
            link: self.link(),
            funding,
            executed,
        })
    }

    fn seal(&mut self, funding: FundingTransaction) -> Result<()> {
        let claims = match &mut self.state {
            LinkState::Open { claims, .. } => std::mem::take(claims),
            LinkState::Sealed { .. } => return Err(ZkSendError::LinkSealed),
        };
        self.state = LinkState::Sealed { claims, funding };
        Ok(())
    }

    async fn plan_funding(&self) -> Result<FundingTransaction> {
        let (claims, gas_estimate) = match &self.state {
            LinkState::Open {
                claims,
                gas_estimate,
            } => (claims, *gas_estimate),
            LinkState::Sealed { .. } => return Err(ZkSendError::LinkSealed),
        };
        if claims.is_empty() {
            return Err(ZkSendError::EmptyLink);
        }

        let sender = self.config.sender();
        let recipient = self.address();

        let mut amounts: BTreeMap<CoinType, Vec<u64>> = BTreeMap::new();
        let mut object_ids = Vec::new();
        for claim in claims {
            match claim {
                ClaimRequest::Coin { coin_type, amount } => {
                    amounts.entry(coin_type.clone()).or_default().push(*amount)
                }
                ClaimRequest::Object { object_id } => object_ids.push(*object_id),
            }
        }

        let objects = self.check_objects(&object_ids).await?;
        let gas_price = self.client.reference_gas_price().await?;
        let reserve = gas_estimate
            .or(self.config.claim_gas_budget())
            .unwrap_or_else(|| estimate_claim_gas(gas_price, claims.len()));

        let mut inventory =
            CoinInventory::new(self.client.clone(), sender).with_excluded(object_ids);

        let sui = CoinType::sui();
        let mut coin_plans = Vec::new();
        for (coin_type, claim_amounts) in amounts.iter().filter(|(ct, _)| **ct != sui) {
            let total = sum_amounts(coin_type, claim_amounts)?;
            let coins = inventory.coins(coin_type).await?;
            coin_plans.push(CoinPlan {
                planned: plan(total, coin_type, coins)?,
                amounts: claim_amounts.clone(),
            });
        }

        let sui_amounts = amounts.get(&sui).cloned().unwrap_or_default();
        let claimable_sui = sum_amounts(&sui, &sui_amounts)?;
        let gas = plan_gas(
            claimable_sui,
            reserve,
            self.config.gas_budget(),
            inventory.coins(&sui).await?,
            self.config.dust_policy(),
        )?;

        let plan = FundingPlan::assemble(
            sender,
            recipient,
            &coin_plans,
            &gas,
            &sui_amounts,
            &objects,
            gas_price,
        )?;
        let data = plan.to_transaction_data()?;

        tracing::info!(
            link = %recipient,
            instructions = plan.instructions.len(),
            gas_reserve = reserve,
            "Funding transaction planned"
        );
        for instruction in &plan.instructions {
            tracing::debug!(%instruction, "Funding instruction");
        }

        Ok(FundingTransaction {
            data,
            instructions: plan.instructions,
            recipient,
            gas_reserve: reserve,
        })
    }

    /// Object references of claimable objects, which must be owned by the
    /// sender and publicly transferable.
    async fn check_objects(&self, object_ids: &[ObjectId]) -> Result<Vec<ObjectRef>> {
        let sender = self.config.sender();
        let mut refs = Vec::with_capacity(object_ids.len());

        for object_id in object_ids {
            let not_transferable = |reason: String| ZkSendError::ObjectNotTransferable {
                object_id: *object_id,
                reason,
            };

            let object = match self.client.get_object(*object_id).await {
                Ok(object) => object,
                Err(TransportError::ObjectNotFound(_)) => {
                    return Err(not_transferable("object not found".to_string()));
                }
                Err(other) => return Err(other.into()),
            };
            if object.owner != sender {
                return Err(not_transferable(format!("owned by {}", object.owner)));
            }
            if !self.client.is_transferable(*object_id).await? {
                return Err(not_transferable(
                    "type has no public transfer (missing store ability)".to_string(),
                ));
            }
            refs.push(object.object_ref);
        }

        Ok(refs)
    }
}

fn sum_amounts(coin_type: &CoinType, amounts: &[u64]) -> Result<u64> {
    amounts
        .iter()
        .try_fold(0u64, |total, amount| total.checked_add(*amount))
        .ok_or_else(|| ZkSendError::AmountOverflow {
            coin_type: coin_type.clone(),
        })
}

/// Claim gas reservation for `claim_count` claims at `gas_price`.
pub fn estimate_claim_gas(gas_price: u64, claim_count: usize) -> u64 {
    let objects = u64::try_from(claim_count).unwrap_or(u64::MAX);
    let units = CLAIM_PER_OBJECT_GAS_UNITS
        .saturating_mul(objects)
        .saturating_add(CLAIM_BASE_GAS_UNITS);
    gas_price.saturating_mul(units).max(MIN_CLAIM_GAS_BUDGET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::MockChainClient;

    fn setup() -> (MockChainClient, Ed25519Keypair, LinkStateBuilder) {
        let chain = MockChainClient::new();
        let sender = Ed25519Keypair::from_secret_bytes([1; 32]);
        let config = LinkConfig::builder(sender.address()).build().unwrap();
        let builder = LinkStateBuilder::with_keypair(
            config,
            Arc::new(chain.clone()),
            Ed25519Keypair::from_secret_bytes([2; 32]),
        );
        (chain, sender, builder)
    }

    #[test]
    fn test_amount_overflow() {
        let (_, _, mut builder) = setup();
        builder.add_claimable_mist(u64::MAX).unwrap();
        assert!(matches!(
            builder.add_claimable_mist(1),
            Err(ZkSendError::AmountOverflow { .. })
        ));
        assert_eq!(builder.claims().len(), 1);
    }

    #[test]
    fn test_claim_gas_estimate_has_a_floor() {
        assert_eq!(estimate_claim_gas(1, 3), MIN_CLAIM_GAS_BUDGET);
        assert_eq!(estimate_claim_gas(10_000, 2), 10_000 * (2_000 + 2 * 500));
        assert_eq!(estimate_claim_gas(u64::MAX, 1), u64::MAX);
    }

    #[tokio::test]
    async fn test_build_seals_the_link() {
        let (chain, sender, mut builder) = setup();
        chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
        builder.add_claimable_mist(10_000).unwrap();

        let funding = builder.build().await.unwrap();
        assert_eq!(builder.phase(), LinkPhase::Sealed);
        assert_eq!(builder.funding(), Some(&funding));
        assert_eq!(builder.claims().len(), 1);

        assert!(matches!(builder.build().await, Err(ZkSendError::LinkSealed)));
        assert!(matches!(builder.add_claimable_mist(1), Err(ZkSendError::LinkSealed)));
        assert!(builder.link_url().is_ok());
    }

    #[tokio::test]
    async fn test_failed_build_stays_open() {
        let (_, _, mut builder) = setup();
        builder.add_claimable_mist(10).unwrap();

        assert!(matches!(
            builder.build().await,
            Err(ZkSendError::InsufficientFunds { .. })
        ));
        assert_eq!(builder.phase(), LinkPhase::Open);
    }

    #[tokio::test]
    async fn test_empty_link_is_rejected() {
        let (_, _, mut builder) = setup();
        assert!(matches!(builder.build().await, Err(ZkSendError::EmptyLink)));
    }

    #[tokio::test]
    async fn test_submit_requires_the_sender() {
        let (chain, sender, mut builder) = setup();
        chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
        builder.add_claimable_mist(10_000).unwrap();
        let funding = builder.build().await.unwrap();

        let stranger = Ed25519Keypair::from_secret_bytes([9; 32]);
        assert!(matches!(
            builder.submit(&funding, &stranger).await,
            Err(ZkSendError::Signing(_))
        ));
        assert_eq!(chain.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_claim_gas_estimate_below_floor_is_rejected() {
        let (chain, sender, mut builder) = setup();
        let coin_x: CoinType = "0xabc::token::X".parse().unwrap();
        chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
        chain.add_coin(sender.address(), coin_x.clone(), 500);
        builder.add_claimable_balance(coin_x, 120).unwrap();

        assert!(matches!(
            builder.set_gas_budget_estimate(0),
            Err(ZkSendError::InvalidConfig(_))
        ));
        assert!(builder.set_gas_budget_estimate(MIN_CLAIM_GAS_BUDGET - 1).is_err());

        // A coin-only link still carries the claim gas.
        builder.set_gas_budget_estimate(MIN_CLAIM_GAS_BUDGET).unwrap();
        let funding = builder.build().await.unwrap();
        assert_eq!(funding.gas_reserve, MIN_CLAIM_GAS_BUDGET);
        assert_eq!(
            funding.instructions.last(),
            Some(&Instruction::TransferGas {
                amount: MIN_CLAIM_GAS_BUDGET
            })
        );
    }
}
