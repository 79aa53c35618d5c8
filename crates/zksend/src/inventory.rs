//! Snapshot of the sender's coins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use client_blockchain_core::{ChainClient, CoinObject, CoinType, ObjectId, SuiAddress};

use crate::error::Result;

/// Per coin type cache of the coins owned by one address.
///
/// Each coin type is fetched at most once; the planner works from that
/// snapshot and never re-queries mid-plan. Objects requested as claimable
/// objects are excluded so the same object is never both spent and sent.
pub struct CoinInventory {
    client: Arc<dyn ChainClient>,
    owner: SuiAddress,
    excluded: HashSet<ObjectId>,
    cache: HashMap<CoinType, Vec<CoinObject>>,
}

impl CoinInventory {
    pub fn new(client: Arc<dyn ChainClient>, owner: SuiAddress) -> Self {
        Self {
            client,
            owner,
            excluded: HashSet::new(),
            cache: HashMap::new(),
        }
    }

    /// Exclude objects from every coin list returned by this inventory.
    pub fn with_excluded(mut self, object_ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.excluded.extend(object_ids);
        self.cache.clear();
        self
    }

    /// Coins of `coin_type`, in the order the chain returned them.
    pub async fn coins(&mut self, coin_type: &CoinType) -> Result<&[CoinObject]> {
        if !self.cache.contains_key(coin_type) {
            let coins: Vec<CoinObject> = self
                .client
                .get_coins(self.owner, coin_type)
                .await?
                .into_iter()
                .filter(|coin| !self.excluded.contains(&coin.object_id))
                .collect();

            tracing::debug!(
                owner = %self.owner,
                %coin_type,
                count = coins.len(),
                "Coin snapshot taken"
            );
            self.cache.insert(coin_type.clone(), coins);
        }

        Ok(self
            .cache
            .get(coin_type)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::MockChainClient;

    #[tokio::test]
    async fn test_snapshot_is_cached_and_excludes_objects() {
        let chain = MockChainClient::new();
        let owner: SuiAddress = "0xa11ce".parse().unwrap();
        let usdc: CoinType = "0xabc::usdc::USDC".parse().unwrap();
        let kept = chain.add_coin(owner, usdc.clone(), 100);
        let excluded = chain.add_coin(owner, usdc.clone(), 50);

        let mut inventory = CoinInventory::new(Arc::new(chain.clone()), owner)
            .with_excluded([excluded.object_id]);

        let coins = inventory.coins(&usdc).await.unwrap();
        assert_eq!(coins, [kept.clone()]);

        // A coin added after the snapshot stays invisible to this inventory.
        chain.add_coin(owner, usdc.clone(), 25);
        assert_eq!(inventory.coins(&usdc).await.unwrap().len(), 1);

        let mut fresh = CoinInventory::new(Arc::new(chain), owner);
        assert_eq!(fresh.coins(&usdc).await.unwrap().len(), 3);
    }
}
