//! zkLogin transaction signer.
//!
//! Wraps an ephemeral Ed25519 signature together with the proof that binds
//! the ephemeral key to an OAuth identity, producing the serialized
//! `0x05 || BCS(authenticator)` signature.

use client_blockchain_core::{
    Ed25519Keypair, SigningError, SuiAddress, TransactionData, TransactionSigner, UserSignature,
    ZKLOGIN_FLAG,
};
use serde::Serialize;

use crate::error::ZkLoginError;
use crate::inputs::ProofRequest;
use crate::poseidon::field_to_decimal;
use crate::prover::{IssBase64Details, ProofPoints, ZkLoginProof};

#[derive(Serialize)]
struct AuthenticatorInputs<'a> {
    proof_points: &'a ProofPoints,
    iss_base64_details: &'a IssBase64Details,
    header_base64: &'a str,
    address_seed: &'a str,
}

#[derive(Serialize)]
struct Authenticator<'a> {
    inputs: AuthenticatorInputs<'a>,
    max_epoch: u64,
    user_signature: &'a [u8],
}

/// Signs for a zkLogin address with an ephemeral key and its proof.
#[derive(Debug, Clone)]
pub struct ZkLoginSigner {
    ephemeral: Ed25519Keypair,
    proof: ZkLoginProof,
    address_seed: String,
    max_epoch: u64,
    address: SuiAddress,
}

impl ZkLoginSigner {
    /// Fails if `ephemeral` is not the key the request was built for.
    pub fn new(
        ephemeral: Ed25519Keypair,
        request: &ProofRequest,
        proof: ZkLoginProof,
    ) -> Result<Self, ZkLoginError> {
        if ephemeral.public_key().as_bytes() != &request.address_inputs.ephemeral_public_key {
            return Err(ZkLoginError::InvalidInput(
                "ephemeral key does not match the proof request".to_string(),
            ));
        }

        Ok(Self {
            ephemeral,
            proof,
            address_seed: field_to_decimal(&request.inputs.address_seed),
            max_epoch: request.address_inputs.max_epoch,
            address: request.inputs.address,
        })
    }

    pub fn max_epoch(&self) -> u64 {
        self.max_epoch
    }
}

impl TransactionSigner for ZkLoginSigner {
    fn address(&self) -> SuiAddress {
        self.address
    }

    fn sign_transaction(&self, tx: &TransactionData) -> Result<UserSignature, SigningError> {
        let user_signature = self.ephemeral.sign_transaction(tx)?;

        let authenticator = Authenticator {
            inputs: AuthenticatorInputs {
                proof_points: &self.proof.proof_points,
                iss_base64_details: &self.proof.iss_base64_details,
                header_base64: &self.proof.header_base64,
                address_seed: &self.address_seed,
            },
            max_epoch: self.max_epoch,
            user_signature: user_signature.as_bytes(),
        };

        let encoded =
            bcs::to_bytes(&authenticator).map_err(|e| SigningError::Signer(e.to_string()))?;
        let mut bytes = Vec::with_capacity(1 + encoded.len());
        bytes.push(ZKLOGIN_FLAG);
        bytes.extend(encoded);
        Ok(UserSignature(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::generate_nonce;
    use crate::inputs::build_proof_inputs;
    use crate::jwt::{JwtClaims, encode_test_jwt};
    use crate::prover::{ProvingService, StubProvingService};
    use client_blockchain_core::ProgrammableTransaction;
    use serde_json::json;

    #[tokio::test]
    async fn test_signature_carries_flag_and_address() {
        let ephemeral = Ed25519Keypair::from_secret_bytes([8u8; 32]);
        let jwt = encode_test_jwt(&json!({
            "iss": "https://accounts.google.com",
            "aud": "aud",
            "sub": "sub",
            "nonce": generate_nonce(&ephemeral.public_key(), 5, 2).unwrap(),
        }));
        let claims = JwtClaims::from_unverified_jwt(&jwt).unwrap();
        let request = build_proof_inputs(&jwt, &claims, &ephemeral.public_key(), 2, 5, 1).unwrap();
        let proof = StubProvingService::new().prove(&request).await.unwrap();

        let signer = ZkLoginSigner::new(ephemeral.clone(), &request, proof).unwrap();
        assert_eq!(signer.address(), request.inputs.address);
        assert_ne!(signer.address(), ephemeral.address());

        let tx = TransactionData::new_programmable(
            signer.address(),
            vec![],
            ProgrammableTransaction::default(),
            1,
            1,
        );
        let signature = signer.sign_transaction(&tx).unwrap();
        assert_eq!(signature.as_bytes()[0], ZKLOGIN_FLAG);
    }

    #[tokio::test]
    async fn test_rejects_foreign_ephemeral_key() {
        let ephemeral = Ed25519Keypair::from_secret_bytes([8u8; 32]);
        let jwt = encode_test_jwt(&json!({
            "iss": "i",
            "aud": "a",
            "sub": "s",
            "nonce": generate_nonce(&ephemeral.public_key(), 5, 2).unwrap(),
        }));
        let claims = JwtClaims::from_unverified_jwt(&jwt).unwrap();
        let request = build_proof_inputs(&jwt, &claims, &ephemeral.public_key(), 2, 5, 1).unwrap();
        let proof = StubProvingService::new().prove(&request).await.unwrap();

        let other = Ed25519Keypair::from_secret_bytes([9u8; 32]);
        assert!(ZkLoginSigner::new(other, &request, proof).is_err());
    }
}
