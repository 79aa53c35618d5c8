//! Claiming a link.
//!
//! The claim transaction is paid by the link's gas reservation. Everything
//! else owned by the ephemeral address goes to the claimer, and the gas coin
//! (what is left of the reservation) goes back to the sender of the funding
//! transaction. The sender is not stored in the link; it is recovered from
//! the chain.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use url::Url;

use client_blockchain_core::{
    Argument, ChainClient, CoinObject, CoinType, OwnedObject, ProgrammableTransactionBuilder,
    SignedTransaction, SuiAddress, TransactionData, TransactionDigest, TransportError,
};
use zk::ZkAddressInputs;

use crate::builder::MIN_CLAIM_GAS_BUDGET;
use crate::error::{Result, ZkSendError};
use crate::funding::gas_reserve_transfer;
use crate::link::ClaimLink;

/// Protocol cap on a single transaction's gas budget (50 SUI).
pub const MAX_GAS_BUDGET: u64 = 50_000_000_000;

/// Gas reservation found for a link, and who funded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasReserve {
    pub coin: CoinObject,
    pub sender: SuiAddress,
    pub funding_digest: TransactionDigest,
}

/// What a link currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimableAssets {
    pub address: SuiAddress,
    /// Coin balances per type, gas reservation excluded.
    pub balances: BTreeMap<CoinType, u64>,
    /// Non-coin objects.
    pub objects: Vec<OwnedObject>,
    pub gas_reserve: Option<GasReserve>,
}

impl ClaimableAssets {
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.objects.is_empty()
    }
}

/// Unsigned claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTransaction {
    pub data: TransactionData,
    pub claimer: SuiAddress,
    /// Objects transferred to the claimer.
    pub claimed: Vec<OwnedObject>,
    /// Where the remaining gas goes, if the reservation was identified.
    pub refund: Option<SuiAddress>,
}

/// Result of a submitted claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub digest: TransactionDigest,
    pub claimer: SuiAddress,
    pub claimed: usize,
    pub refund: Option<SuiAddress>,
    /// Redirect target with the claimer's address appended.
    pub redirect: Option<Url>,
}

/// Claim side of the link protocol.
pub struct ClaimOrchestrator {
    client: Arc<dyn ChainClient>,
}

impl ClaimOrchestrator {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Assets held by the link's ephemeral address.
    pub async fn list_claimable_assets(&self, link: &ClaimLink) -> Result<ClaimableAssets> {
        let address = link.address();
        let owned = self.client.get_owned_objects(address).await?;
        let gas_reserve = self.find_gas_reserve(address, &owned).await?;
        let reserve_id = gas_reserve.as_ref().map(|r| r.coin.object_id);

        let mut balances: BTreeMap<CoinType, u64> = BTreeMap::new();
        let mut objects = Vec::new();
        for object in owned {
            if Some(object.object_id()) == reserve_id {
                continue;
            }
            match object.as_coin() {
                Some(coin) => {
                    let balance = balances.entry(coin.coin_type).or_default();
                    *balance = balance.saturating_add(coin.balance);
                }
                None => objects.push(object),
            }
        }

        Ok(ClaimableAssets {
            address,
            balances,
            objects,
            gas_reserve,
        })
    }

    /// Build the claim transaction sending everything to `claimer`.
    ///
    /// # Errors
    ///
    /// - `NothingToClaim` when the ephemeral address owns nothing (already
    ///   claimed or never funded)
    /// - `InsufficientGas` when no SUI is left to pay for the claim
    pub async fn prepare_claim(
        &self,
        link: &ClaimLink,
        claimer: SuiAddress,
    ) -> Result<ClaimTransaction> {
        let address = link.address();
        let owned = self.client.get_owned_objects(address).await?;
        if owned.is_empty() {
            return Err(ZkSendError::NothingToClaim { address });
        }

        let gas_reserve = self.find_gas_reserve(address, &owned).await?;
        let (gas_coin, refund) = match &gas_reserve {
            Some(reserve) => (reserve.coin.clone(), Some(reserve.sender)),
            None => {
                let largest = owned
                    .iter()
                    .filter(|o| o.is_gas_coin())
                    .filter_map(OwnedObject::as_coin)
                    .max_by_key(|coin| coin.balance)
                    .ok_or(ZkSendError::InsufficientGas {
                        required: MIN_CLAIM_GAS_BUDGET,
                        available: 0,
                    })?;
                tracing::warn!(
                    link = %address,
                    gas_coin = %largest.object_id,
                    "Gas reservation not identified; remaining gas goes to the claimer"
                );
                (largest, None)
            }
        };

        let claimed: Vec<OwnedObject> = owned
            .into_iter()
            .filter(|o| o.object_id() != gas_coin.object_id)
            .collect();

        let mut builder = ProgrammableTransactionBuilder::new();
        let mut to_claimer = claimed
            .iter()
            .map(|o| builder.object(o.object_ref))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        match refund {
            Some(sender) => {
                if !to_claimer.is_empty() {
                    builder.transfer_objects(to_claimer, claimer)?;
                }
                builder.transfer_objects(vec![Argument::GasCoin], sender)?;
            }
            None => {
                to_claimer.push(Argument::GasCoin);
                builder.transfer_objects(to_claimer, claimer)?;
            }
        }

        let gas_price = self.client.reference_gas_price().await?;
        let data = TransactionData::new_programmable(
            address,
            vec![gas_coin.object_ref()],
            builder.finish(),
            gas_coin.balance.min(MAX_GAS_BUDGET),
            gas_price,
        );

        tracing::debug!(
            link = %address,
            %claimer,
            claimed = claimed.len(),
            refund = ?refund,
            "Claim transaction prepared"
        );

        Ok(ClaimTransaction {
            data,
            claimer,
            claimed,
            refund,
        })
    }

    /// Prepare, sign with the link's key, and submit.
    pub async fn claim(&self, link: &ClaimLink, claimer: SuiAddress) -> Result<ClaimOutcome> {
        let prepared = self.prepare_claim(link, claimer).await?;
        let signature = link.keypair.sign_transaction(&prepared.data)?;
        let signed = SignedTransaction::new(prepared.data, vec![signature]);
        let executed = self.client.submit_transaction(signed).await?;

        tracing::info!(
            digest = %executed.digest,
            link = %link.address(),
            %claimer,
            "✓ Link claimed"
        );

        Ok(ClaimOutcome {
            digest: executed.digest,
            claimer,
            claimed: prepared.claimed.len(),
            refund: prepared.refund,
            redirect: redirect_after_claim(link, claimer)?,
        })
    }

    /// Claim to the zkLogin address derived from `inputs`.
    pub async fn claim_to_zklogin(
        &self,
        link: &ClaimLink,
        inputs: &ZkAddressInputs,
    ) -> Result<ClaimOutcome> {
        let claimer = zk::derive_address(inputs)?;
        tracing::debug!(%claimer, issuer = %inputs.issuer, "Claiming to zkLogin address");
        self.claim(link, claimer).await
    }

    /// Identify the gas reservation among the link's SUI coins.
    ///
    /// Each distinct funding transaction is fetched once; its final command
    /// names the reserved amount and the ephemeral address it was sent to.
    async fn find_gas_reserve(
        &self,
        address: SuiAddress,
        owned: &[OwnedObject],
    ) -> Result<Option<GasReserve>> {
        let sui_coins: Vec<CoinObject> = owned
            .iter()
            .filter(|o| o.is_gas_coin())
            .filter_map(OwnedObject::as_coin)
            .collect();

        let mut seen = HashSet::new();
        for coin in &sui_coins {
            let digest = coin.previous_transaction;
            if !seen.insert(digest) {
                continue;
            }

            let record = match self.client.get_transaction(digest).await {
                Ok(record) => record,
                Err(TransportError::TransactionNotFound(_)) => {
                    tracing::debug!(%digest, "Funding transaction not found");
                    continue;
                }
                Err(other) => return Err(other.into()),
            };

            let Some((amount, recipient)) = gas_reserve_transfer(record.data.programmable())
            else {
                continue;
            };
            if recipient != address {
                continue;
            }

            if let Some(coin) = sui_coins
                .iter()
                .find(|c| c.previous_transaction == digest && c.balance == amount)
            {
                return Ok(Some(GasReserve {
                    coin: coin.clone(),
                    sender: record.sender,
                    funding_digest: digest,
                }));
            }
        }

        Ok(None)
    }
}

/// Redirect target for a claimed link, with `zksend_address` set to `claimer`.
pub fn redirect_after_claim(link: &ClaimLink, claimer: SuiAddress) -> Result<Option<Url>> {
    link.redirect
        .as_ref()
        .map(|redirect| redirect.with_claimer(claimer))
        .transpose()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Redirect;
    use client_blockchain_core::{Ed25519Keypair, MockChainClient};
    use client_blockchain_sui::SuiNetwork;

    #[tokio::test]
    async fn test_unfunded_link_has_nothing_to_claim() {
        let chain = MockChainClient::new();
        let orchestrator = ClaimOrchestrator::new(Arc::new(chain));
        let link = ClaimLink::new(Ed25519Keypair::from_secret_bytes([5; 32]), SuiNetwork::Localnet);

        let error = orchestrator
            .prepare_claim(&link, "0xb0b".parse().unwrap())
            .await
            .unwrap_err();
        assert!(error.is_already_claimed());
    }

    #[tokio::test]
    async fn test_unidentified_reserve_pays_from_largest_sui_coin() {
        let chain = MockChainClient::new();
        let link = ClaimLink::new(Ed25519Keypair::from_secret_bytes([6; 32]), SuiNetwork::Localnet);
        chain.add_coin(link.address(), CoinType::sui(), 10_000_000);
        let largest = chain.add_coin(link.address(), CoinType::sui(), 30_000_000);

        let orchestrator = ClaimOrchestrator::new(Arc::new(chain));
        let claim = orchestrator
            .prepare_claim(&link, "0xb0b".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(claim.refund, None);
        assert_eq!(claim.data.gas_data.payment, vec![largest.object_ref()]);
        assert_eq!(claim.claimed.len(), 1);
    }

    #[test]
    fn test_redirect_after_claim() {
        let link = ClaimLink::new(Ed25519Keypair::from_secret_bytes([7; 32]), SuiNetwork::Mainnet);
        let claimer: SuiAddress = "0xb0b".parse().unwrap();
        assert_eq!(redirect_after_claim(&link, claimer).unwrap(), None);

        let link = link.with_redirect(Redirect::new("https://shop.example/done", "Shop"));
        let url = redirect_after_claim(&link, claimer).unwrap().unwrap();
        assert_eq!(url.query(), Some(format!("zksend_address={}", claimer.to_hex()).as_str()));
    }
}
