//! Chain client abstraction.
//!
//! The link planner and claim flow only need a handful of read queries and a
//! submission endpoint. Everything network-specific lives behind
//! [`ChainClient`] so that the same logic runs against the JSON-RPC client and
//! the in-memory mock.

use async_trait::async_trait;

use crate::transaction::{SignedTransaction, TransactionData};
use crate::types::{CoinObject, CoinType, ObjectId, OwnedObject, SuiAddress, TransactionDigest};

// ============================================================================
// Error Types
// ============================================================================

/// Transport layer errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An input object was consumed or modified since it was read.
    ///
    /// The whole transaction was rejected; rebuilding from a fresh snapshot
    /// is the expected recovery.
    #[error("Object version conflict: {0}")]
    VersionConflict(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionDigest),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Backend-specific error: {0}")]
    BackendError(String),
}

impl TransportError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict(_))
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Outcome of a submitted transaction that the chain accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedTransaction {
    pub digest: TransactionDigest,
    pub gas_used: u64,
    /// Objects created by the transaction, with their new owners.
    pub created: Vec<(ObjectId, SuiAddress)>,
}

/// A transaction as recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub digest: TransactionDigest,
    pub sender: SuiAddress,
    pub data: TransactionData,
}

// ============================================================================
// Chain Client
// ============================================================================

/// Read and submit operations against one network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// All coins of `coin_type` owned by `owner`, in the order the node returns them.
    async fn get_coins(
        &self,
        owner: SuiAddress,
        coin_type: &CoinType,
    ) -> Result<Vec<CoinObject>, TransportError>;

    /// Every object owned by `owner`, coins included.
    async fn get_owned_objects(&self, owner: SuiAddress) -> Result<Vec<OwnedObject>, TransportError>;

    async fn get_object(&self, object_id: ObjectId) -> Result<OwnedObject, TransportError>;

    /// Whether the object's type has public transfer (the `store` ability).
    async fn is_transferable(&self, object_id: ObjectId) -> Result<bool, TransportError>;

    async fn reference_gas_price(&self) -> Result<u64, TransportError>;

    /// Submit a signed transaction and wait for it to execute.
    ///
    /// Stale object versions are reported as [`TransportError::VersionConflict`].
    async fn submit_transaction(
        &self,
        transaction: SignedTransaction,
    ) -> Result<ExecutedTransaction, TransportError>;

    async fn get_transaction(
        &self,
        digest: TransactionDigest,
    ) -> Result<TransactionRecord, TransportError>;

    /// Network name (e.g. "mainnet", "testnet", "localnet").
    fn network(&self) -> &str;
}
