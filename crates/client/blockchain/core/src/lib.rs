//! Chain abstraction layer for claimable links.
//!
//! # Architecture
//!
//! ```text
//! ChainClient (async trait, network access)
//!     ├── JSON-RPC implementation (client-blockchain-sui)
//!     └── MockChainClient (feature `mock`, in-memory execution)
//!
//! Local model
//!     ├── types        identifiers, coins, owned objects
//!     ├── transaction  programmable transactions, BCS encoding, digests
//!     └── crypto       Ed25519 keys, addresses, signatures
//! ```
//!
//! Everything that can be computed locally (transaction bytes, digests,
//! signatures, addresses) lives here so that planners and claim logic never
//! depend on a concrete network client.
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_core::{ChainClient, CoinType, Ed25519Keypair};
//!
//! async fn sui_balance(client: &dyn ChainClient, key: &Ed25519Keypair) -> u64 {
//!     let coins = client.get_coins(key.address(), &CoinType::sui()).await?;
//!     coins.iter().map(|c| c.balance).sum()
//! }
//! ```

pub mod crypto;
pub mod traits;
pub mod transaction;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use crypto::{
    Ed25519Keypair, Ed25519PublicKey, KeyError, SigningError, TransactionSigner, blake2b256,
    verify_transaction_signature, ED25519_FLAG, ZKLOGIN_FLAG,
};
pub use traits::{ChainClient, ExecutedTransaction, TransactionRecord, TransportError};
pub use transaction::{
    Argument, CallArg, Command, ObjectArg, ProgrammableTransaction, ProgrammableTransactionBuilder,
    SignedTransaction, TransactionData, TransactionError, UserSignature,
};
pub use types::{
    CoinObject, CoinType, Digest, ObjectDigest, ObjectId, ObjectKind, ObjectRef, OwnedObject,
    ParseError, SuiAddress, TransactionDigest,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockChainClient;
