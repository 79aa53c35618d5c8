//! End-to-end link scenarios against the in-memory chain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use client_blockchain_core::{
    ChainClient, CoinObject, CoinType, Ed25519Keypair, ExecutedTransaction, MockChainClient,
    ObjectId, OwnedObject, SignedTransaction, SuiAddress, TransactionDigest, TransactionRecord,
    TransportError,
};
use client_blockchain_sui::SuiNetwork;
use zk::ZkAddressInputs;
use zksend::{
    ClaimLink, ClaimOrchestrator, Instruction, LinkConfig, LinkPhase, LinkStateBuilder, Redirect,
    ZkSendError,
};

const GAS_CHARGE: u64 = 1_000_000;
const MIN_RESERVE: u64 = 5_000_000;

fn coin_x() -> CoinType {
    "0xabc::token::X".parse().unwrap()
}

fn sender() -> Ed25519Keypair {
    Ed25519Keypair::from_secret_bytes([11; 32])
}

fn ephemeral() -> Ed25519Keypair {
    Ed25519Keypair::from_secret_bytes([22; 32])
}

fn claimer() -> SuiAddress {
    "0xc1a1e5".parse().unwrap()
}

fn config() -> LinkConfig {
    LinkConfig::builder(sender().address())
        .network(SuiNetwork::Localnet)
        .redirect(Redirect::new("https://shop.example/thanks", "Shop"))
        .build()
        .unwrap()
}

fn builder(chain: Arc<dyn ChainClient>) -> LinkStateBuilder {
    LinkStateBuilder::with_keypair(config(), chain, ephemeral())
}

fn balances(coins: &[CoinObject]) -> Vec<u64> {
    let mut balances: Vec<u64> = coins.iter().map(|c| c.balance).collect();
    balances.sort_unstable();
    balances
}

#[tokio::test]
async fn test_create_and_claim_refunds_unused_gas() {
    let chain = MockChainClient::new();
    let sui = CoinType::sui();
    let sender = sender();
    chain.add_coin(sender.address(), sui.clone(), 2_000_000_000);
    chain.add_coin(sender.address(), coin_x(), 500);
    let ticket = chain.add_object(sender.address(), "0xabc::ticket::Ticket", true);

    let client: Arc<dyn ChainClient> = Arc::new(chain.clone());
    let mut builder = builder(client.clone());
    builder.add_claimable_mist(100_000_000).unwrap();
    builder.add_claimable_balance(coin_x(), 120).unwrap();
    builder.add_claimable_object(ticket.object_id()).unwrap();

    let created = builder.create(&sender).await.unwrap();
    assert_eq!(builder.phase(), LinkPhase::Sealed);
    assert_eq!(created.funding.gas_reserve, MIN_RESERVE);
    assert_eq!(
        chain.balance_of(sender.address(), &sui),
        2_000_000_000 - 100_000_000 - MIN_RESERVE - GAS_CHARGE
    );

    // The claimer only sees the URL.
    let link = ClaimLink::decode(&created.url).unwrap();
    assert_eq!(link.network, SuiNetwork::Localnet);
    assert_eq!(link.address(), ephemeral().address());

    let orchestrator = ClaimOrchestrator::new(client);
    let assets = orchestrator.list_claimable_assets(&link).await.unwrap();
    assert_eq!(assets.balances.get(&sui), Some(&100_000_000));
    assert_eq!(assets.balances.get(&coin_x()), Some(&120));
    assert_eq!(assets.objects.len(), 1);
    let reserve = assets.gas_reserve.unwrap();
    assert_eq!(reserve.sender, sender.address());
    assert_eq!(reserve.coin.balance, MIN_RESERVE);

    let outcome = orchestrator.claim(&link, claimer()).await.unwrap();
    assert_eq!(outcome.claimed, 3);
    assert_eq!(outcome.refund, Some(sender.address()));
    assert!(
        outcome
            .redirect
            .unwrap()
            .query_pairs()
            .any(|(k, v)| k == "zksend_address" && v == claimer().to_hex())
    );

    assert_eq!(chain.balance_of(claimer(), &sui), 100_000_000);
    assert_eq!(chain.balance_of(claimer(), &coin_x()), 120);
    assert_eq!(chain.get_object(ticket.object_id()).await.unwrap().owner, claimer());
    assert_eq!(
        chain.balance_of(sender.address(), &sui),
        2_000_000_000 - 100_000_000 - 2 * GAS_CHARGE
    );
    assert!(chain.objects_of(link.address()).is_empty());

    // A second claim finds nothing.
    let error = orchestrator.claim(&link, claimer()).await.unwrap_err();
    assert!(error.is_already_claimed());
}

#[tokio::test]
async fn test_partial_coin_selection_returns_change_to_sender() {
    let chain = MockChainClient::new();
    let sender = sender();
    chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
    let coin_100 = chain.add_coin(sender.address(), coin_x(), 100);
    let coin_50 = chain.add_coin(sender.address(), coin_x(), 50);
    chain.add_coin(sender.address(), coin_x(), 30);

    let mut builder = builder(Arc::new(chain.clone()));
    builder.add_claimable_balance(coin_x(), 120).unwrap();
    let funding = builder.build().await.unwrap();

    assert_eq!(
        funding.instructions[0],
        Instruction::Merge {
            coin_type: coin_x(),
            primary: coin_100.object_id,
            merged: vec![coin_50.object_id],
        }
    );
    assert!(funding.instructions.iter().any(|i| matches!(
        i,
        Instruction::Split { coin_type, amounts, .. } if *coin_type == coin_x() && amounts == &[120]
    )));
    assert!(matches!(
        funding.instructions.last(),
        Some(Instruction::TransferGas { amount: MIN_RESERVE })
    ));

    builder.submit(&funding, &sender).await.unwrap();
    assert_eq!(balances(&chain.coins_of(ephemeral().address(), &coin_x())), [120]);
    assert_eq!(balances(&chain.coins_of(sender.address(), &coin_x())), [30, 30]);
}

#[tokio::test]
async fn test_claims_of_one_type_share_a_merge_and_split() {
    let chain = MockChainClient::new();
    let sender = sender();
    chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
    let coin_100 = chain.add_coin(sender.address(), coin_x(), 100);
    let coin_50 = chain.add_coin(sender.address(), coin_x(), 50);
    chain.add_coin(sender.address(), coin_x(), 30);

    let mut builder = builder(Arc::new(chain.clone()));
    builder.add_claimable_balance(coin_x(), 100).unwrap();
    builder.add_claimable_balance(coin_x(), 15).unwrap();
    let funding = builder.build().await.unwrap();

    let merges: Vec<&Instruction> = funding
        .instructions
        .iter()
        .filter(|i| matches!(i, Instruction::Merge { coin_type, .. } if *coin_type == coin_x()))
        .collect();
    assert_eq!(
        merges,
        [&Instruction::Merge {
            coin_type: coin_x(),
            primary: coin_100.object_id,
            merged: vec![coin_50.object_id],
        }]
    );

    let splits: Vec<&Instruction> = funding
        .instructions
        .iter()
        .filter(|i| matches!(i, Instruction::Split { coin_type, .. } if *coin_type == coin_x()))
        .collect();
    assert_eq!(
        splits,
        [&Instruction::Split {
            coin_type: coin_x(),
            source: coin_100.object_id,
            amounts: vec![15, 100],
        }]
    );

    builder.submit(&funding, &sender).await.unwrap();
    assert_eq!(balances(&chain.coins_of(ephemeral().address(), &coin_x())), [15, 100]);
    assert_eq!(balances(&chain.coins_of(sender.address(), &coin_x())), [30, 35]);
}

#[tokio::test]
async fn test_missing_coin_type_is_insufficient_funds() {
    let chain = MockChainClient::new();
    chain.add_coin(sender().address(), CoinType::sui(), 1_000_000_000);
    let coin_y: CoinType = "0xdef::token::Y".parse().unwrap();

    let mut builder = builder(Arc::new(chain));
    builder.add_claimable_balance(coin_y.clone(), 1).unwrap();

    match builder.build().await {
        Err(ZkSendError::InsufficientFunds {
            coin_type,
            requested,
            available,
        }) => {
            assert_eq!(coin_type, coin_y);
            assert_eq!((requested, available), (1, 0));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
}

#[tokio::test]
async fn test_gas_reservation_shortfall_is_insufficient_gas() {
    let chain = MockChainClient::new();
    chain.add_coin(sender().address(), CoinType::sui(), 20_000_000);

    let mut builder = builder(Arc::new(chain));
    builder.add_claimable_mist(10_000_000).unwrap();

    let error = builder.build().await.unwrap_err();
    assert!(matches!(error, ZkSendError::InsufficientGas { .. }));
    assert_eq!(error.shortfall(), Some(10_000_000 + MIN_RESERVE + 50_000_000 - 20_000_000));
}

#[tokio::test]
async fn test_identical_inputs_build_identical_transactions() {
    async fn build_once() -> Vec<u8> {
        let chain = MockChainClient::new();
        let sender = sender();
        chain.add_coin(sender.address(), CoinType::sui(), 3_000_000_000);
        chain.add_coin(sender.address(), CoinType::sui(), 7);
        chain.add_coin(sender.address(), coin_x(), 40);
        chain.add_coin(sender.address(), coin_x(), 40);
        let badge = chain.add_object(sender.address(), "0xabc::badge::Badge", true);

        let mut builder = builder(Arc::new(chain));
        builder.add_claimable_balance(coin_x(), 60).unwrap();
        builder.add_claimable_object(badge.object_id()).unwrap();
        builder.add_claimable_mist(5).unwrap();
        builder.add_claimable_balance(coin_x(), 15).unwrap();
        builder.build().await.unwrap().data.to_bytes().unwrap()
    }

    assert_eq!(build_once().await, build_once().await);
}

#[tokio::test]
async fn test_objects_must_be_transferable_and_owned() {
    let chain = MockChainClient::new();
    let sender = sender();
    chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
    let soulbound = chain.add_object(sender.address(), "0xabc::badge::Soulbound", false);
    let foreign = chain.add_object(claimer(), "0xabc::badge::Badge", true);

    let mut builder = builder(Arc::new(chain.clone()));
    builder.add_claimable_object(soulbound.object_id()).unwrap();
    assert!(matches!(
        builder.build().await,
        Err(ZkSendError::ObjectNotTransferable { object_id, .. }) if object_id == soulbound.object_id()
    ));

    let mut builder = LinkStateBuilder::new(config(), Arc::new(chain));
    builder.add_claimable_object(foreign.object_id()).unwrap();
    assert!(matches!(
        builder.build().await,
        Err(ZkSendError::ObjectNotTransferable { .. })
    ));
}

#[tokio::test]
async fn test_stale_snapshot_is_a_retryable_conflict() {
    let chain = MockChainClient::new();
    let sender = sender();
    let gas = chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);

    let mut builder = builder(Arc::new(chain.clone()));
    builder.add_claimable_mist(1_000).unwrap();
    let funding = builder.build().await.unwrap();

    chain.bump_version(gas.object_id);
    let error = builder.submit(&funding, &sender).await.unwrap_err();
    assert!(error.is_retryable());
    assert_eq!(chain.transaction_count(), 0);
}

/// Chain whose first submission loses a race against another writer.
struct RacingChain {
    inner: MockChainClient,
    raced: AtomicBool,
}

#[async_trait]
impl ChainClient for RacingChain {
    async fn get_coins(
        &self,
        owner: SuiAddress,
        coin_type: &CoinType,
    ) -> Result<Vec<CoinObject>, TransportError> {
        self.inner.get_coins(owner, coin_type).await
    }

    async fn get_owned_objects(&self, owner: SuiAddress) -> Result<Vec<OwnedObject>, TransportError> {
        self.inner.get_owned_objects(owner).await
    }

    async fn get_object(&self, object_id: ObjectId) -> Result<OwnedObject, TransportError> {
        self.inner.get_object(object_id).await
    }

    async fn is_transferable(&self, object_id: ObjectId) -> Result<bool, TransportError> {
        self.inner.is_transferable(object_id).await
    }

    async fn reference_gas_price(&self) -> Result<u64, TransportError> {
        self.inner.reference_gas_price().await
    }

    async fn submit_transaction(
        &self,
        transaction: SignedTransaction,
    ) -> Result<ExecutedTransaction, TransportError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            for payment in &transaction.data.gas_data.payment {
                self.inner.bump_version(payment.object_id);
            }
        }
        self.inner.submit_transaction(transaction).await
    }

    async fn get_transaction(
        &self,
        digest: TransactionDigest,
    ) -> Result<TransactionRecord, TransportError> {
        self.inner.get_transaction(digest).await
    }

    fn network(&self) -> &str {
        self.inner.network()
    }
}

#[tokio::test]
async fn test_create_stays_open_after_conflict() {
    let chain = MockChainClient::new();
    let sender = sender();
    chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);
    let racing = RacingChain {
        inner: chain.clone(),
        raced: AtomicBool::new(false),
    };

    let mut builder = builder(Arc::new(racing));
    builder.add_claimable_mist(1_000).unwrap();

    let error = builder.create(&sender).await.unwrap_err();
    assert!(matches!(error, ZkSendError::VersionConflict(_)));
    assert_eq!(builder.phase(), LinkPhase::Open);

    // Rebuilding takes a fresh snapshot.
    builder.create(&sender).await.unwrap();
    assert_eq!(builder.phase(), LinkPhase::Sealed);
    assert_eq!(chain.balance_of(ephemeral().address(), &CoinType::sui()), 1_000 + MIN_RESERVE);
}

#[tokio::test]
async fn test_claim_to_zklogin_address() {
    let chain = MockChainClient::new();
    let sender = sender();
    chain.add_coin(sender.address(), CoinType::sui(), 1_000_000_000);

    let client: Arc<dyn ChainClient> = Arc::new(chain.clone());
    let mut builder = builder(client.clone());
    builder.add_claimable_mist(42_000).unwrap();
    let created = builder.create(&sender).await.unwrap();

    let inputs = ZkAddressInputs {
        ephemeral_public_key: *Ed25519Keypair::from_secret_bytes([33; 32]).public_key().as_bytes(),
        issuer: "https://accounts.google.com".to_string(),
        audience: "client-id.apps.googleusercontent.com".to_string(),
        subject: "110169484474386276334".to_string(),
        salt: 129_390_038_577_185_583_942_388_216_820_280_642_146,
        max_epoch: 10,
    };
    let expected = zk::derive_address(&inputs).unwrap();

    let link = ClaimLink::decode(&created.url).unwrap();
    let outcome = ClaimOrchestrator::new(client)
        .claim_to_zklogin(&link, &inputs)
        .await
        .unwrap();

    assert_eq!(outcome.claimer, expected);
    assert_eq!(chain.balance_of(expected, &CoinType::sui()), 42_000);
}
