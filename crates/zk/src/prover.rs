//! Proving service interface.
//!
//! Proof generation is delegated to an external service that receives a
//! [`ProofRequest`] and returns Groth16 proof points. Implementations:
//! - HTTP prover (client-blockchain-sui)
//! - [`StubProvingService`] (feature `stub`, tests)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ZkLoginError;
use crate::inputs::ProofRequest;

/// Groth16 proof points as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
}

/// Location of the `iss` claim inside the base64 JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssBase64Details {
    pub value: String,
    pub index_mod_4: u8,
}

/// Proof artifact returned by a proving service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkLoginProof {
    pub proof_points: ProofPoints,
    pub iss_base64_details: IssBase64Details,
    pub header_base64: String,
}

/// External zero-knowledge proving service.
#[async_trait]
pub trait ProvingService: Send + Sync {
    /// Produce a proof for `request`, or [`ZkLoginError::ProofFailure`].
    async fn prove(&self, request: &ProofRequest) -> Result<ZkLoginProof, ZkLoginError>;
}

// ============================================================================
// Stub Proving Service
// ============================================================================

/// Stub proving service for testing and development.
///
/// Returns proof points derived from the public inputs, so identical requests
/// always yield identical proofs. Requests without a JWT are rejected.
///
/// **Warning**: Provides no cryptographic guarantees - do not use in production.
#[cfg(any(test, feature = "stub"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct StubProvingService;

#[cfg(any(test, feature = "stub"))]
impl StubProvingService {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(any(test, feature = "stub"))]
#[async_trait]
impl ProvingService for StubProvingService {
    async fn prove(&self, request: &ProofRequest) -> Result<ZkLoginProof, ZkLoginError> {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        use crate::poseidon::{field_to_decimal, hash_one};

        if request.jwt.is_empty() {
            return Err(ZkLoginError::ProofFailure("empty JWT".to_string()));
        }

        let digest = request.inputs.public_inputs_hash()?;
        let next = hash_one(digest)?;
        let (digest, next) = (field_to_decimal(&digest), field_to_decimal(&next));

        let issuer_claim = format!("\"iss\":\"{}\",", request.address_inputs.issuer);

        Ok(ZkLoginProof {
            proof_points: ProofPoints {
                a: vec![digest.clone(), next.clone(), "1".to_string()],
                b: vec![
                    vec![digest.clone(), next.clone()],
                    vec![next.clone(), digest.clone()],
                    vec!["1".to_string(), "0".to_string()],
                ],
                c: vec![next, digest, "1".to_string()],
            },
            iss_base64_details: IssBase64Details {
                value: URL_SAFE_NO_PAD.encode(issuer_claim),
                index_mod_4: 0,
            },
            header_base64: request.jwt.split('.').next().unwrap_or_default().to_string(),
        })
    }
}
