//! zkLogin identity derivation.
//!
//! This crate derives stable on-chain addresses from OAuth identities and
//! assembles the inputs an external proving service turns into a proof:
//! - **Poseidon**: native BN254 Poseidon hashing and ASCII claim packing
//! - **Identity**: address seed, address and nonce derivation
//! - **Inputs**: proof request construction with circuit budget checks
//! - **Prover**: `ProvingService` interface (HTTP implementation lives in
//!   client-blockchain-sui, stub behind the `stub` feature)
//! - **Signer**: zkLogin `TransactionSigner`
//!
//! # Feature Flags
//!
//! - `stub`: deterministic stub proving service for development and tests
//!
//! # Examples
//!
//! ```toml
//! # Production: prover injected by the caller
//! zk = { path = "../zk" }
//!
//! # Tests with the stub prover
//! zk = { path = "../zk", features = ["stub"] }
//! ```

pub mod error;
pub mod identity;
pub mod inputs;
pub mod jwt;
pub mod poseidon;
pub mod prover;
pub mod signer;

pub use error::ZkLoginError;
pub use identity::{
    KEY_CLAIM_NAME, MAX_AUDIENCE_LENGTH, MAX_ISSUER_LENGTH, MAX_KEY_CLAIM_NAME_LENGTH,
    MAX_KEY_CLAIM_VALUE_LENGTH, ZkAddressInputs, derive_address, derive_address_seed,
    generate_nonce, generate_randomness,
};
pub use inputs::{ProofInputs, ProofRequest, build_proof_inputs};
pub use jwt::JwtClaims;
pub use prover::{IssBase64Details, ProofPoints, ProvingService, ZkLoginProof};
pub use signer::ZkLoginSigner;

#[cfg(any(test, feature = "stub"))]
pub use prover::StubProvingService;

/// BN254 scalar field element used by all commitments.
pub use ark_bn254::Fr as FieldElement;
