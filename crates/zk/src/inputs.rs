//! Proof-input construction for the external zkLogin proving service.

use ark_bn254::Fr;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use client_blockchain_core::{Ed25519PublicKey, SuiAddress};
use serde::Serialize;

use crate::error::ZkLoginError;
use crate::identity::{
    KEY_CLAIM_NAME, MAX_ISSUER_LENGTH, ZkAddressInputs, address_from_seed, audience_hash,
    derive_address_seed, ephemeral_key_elements, generate_nonce, nonce_element,
    subject_claim_hashes,
};
use crate::jwt::JwtClaims;
use crate::poseidon::{hash_ascii_str_to_field, hash_many};

/// Field elements the circuit exposes, in circuit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofInputs {
    pub ephemeral_key_hi: Fr,
    pub ephemeral_key_lo: Fr,
    pub max_epoch: Fr,
    pub randomness: Fr,
    pub nonce: Fr,
    pub issuer_hash: Fr,
    pub audience_hash: Fr,
    pub key_claim_name_hash: Fr,
    pub subject_hash: Fr,
    pub salt_hash: Fr,
    pub address_seed: Fr,
    /// Address the proof will authorize.
    pub address: SuiAddress,
}

impl ProofInputs {
    pub fn to_field_elements(&self) -> Vec<Fr> {
        vec![
            self.ephemeral_key_hi,
            self.ephemeral_key_lo,
            self.max_epoch,
            self.randomness,
            self.nonce,
            self.issuer_hash,
            self.audience_hash,
            self.key_claim_name_hash,
            self.subject_hash,
            self.salt_hash,
            self.address_seed,
        ]
    }

    /// Single-element digest of all public inputs.
    pub fn public_inputs_hash(&self) -> Result<Fr, ZkLoginError> {
        hash_many(&self.to_field_elements())
    }
}

/// Request body for the proving service.
///
/// Serializes to the prover's camelCase wire format; `inputs` stays local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub jwt: String,
    /// Base64 of `flag || ephemeral public key`.
    pub extended_ephemeral_public_key: String,
    pub max_epoch: String,
    pub jwt_randomness: String,
    pub salt: String,
    pub key_claim_name: String,

    /// Address inputs equivalent to this request.
    #[serde(skip)]
    pub address_inputs: ZkAddressInputs,
    #[serde(skip)]
    pub inputs: ProofInputs,
}

/// Assemble the proving request and public inputs for a token.
///
/// Every claim is checked against its circuit budget. The token must carry
/// exactly the nonce derived from the ephemeral key, epoch window and
/// randomness; otherwise the request is refused.
pub fn build_proof_inputs(
    jwt: &str,
    claims: &JwtClaims,
    ephemeral_public_key: &Ed25519PublicKey,
    randomness: u128,
    max_epoch: u64,
    salt: u128,
) -> Result<ProofRequest, ZkLoginError> {
    let expected_nonce = generate_nonce(ephemeral_public_key, max_epoch, randomness)?;
    match &claims.nonce {
        None => return Err(ZkLoginError::MissingNonce),
        Some(actual) if *actual != expected_nonce => {
            return Err(ZkLoginError::NonceMismatch {
                expected: expected_nonce,
                actual: actual.clone(),
            });
        }
        Some(_) => {}
    }

    let address_inputs = ZkAddressInputs {
        ephemeral_public_key: *ephemeral_public_key.as_bytes(),
        issuer: claims.iss.clone(),
        audience: claims.aud.clone(),
        subject: claims.sub.clone(),
        salt,
        max_epoch,
    };

    let (ephemeral_key_hi, ephemeral_key_lo) = ephemeral_key_elements(ephemeral_public_key);
    let issuer_hash = hash_ascii_str_to_field("iss", &claims.iss, MAX_ISSUER_LENGTH)?;
    let audience_hash = audience_hash(&claims.aud)?;
    let [key_claim_name_hash, subject_hash, salt_hash] = subject_claim_hashes(&claims.sub, salt)?;
    let address_seed = derive_address_seed(&address_inputs)?;
    let address = address_from_seed(&claims.iss, &address_seed)?;

    let inputs = ProofInputs {
        ephemeral_key_hi,
        ephemeral_key_lo,
        max_epoch: Fr::from(max_epoch),
        randomness: Fr::from(randomness),
        nonce: nonce_element(ephemeral_public_key, max_epoch, randomness)?,
        issuer_hash,
        audience_hash,
        key_claim_name_hash,
        subject_hash,
        salt_hash,
        address_seed,
        address,
    };

    tracing::debug!(%address, max_epoch, "Built zkLogin proof inputs");

    Ok(ProofRequest {
        jwt: jwt.to_string(),
        extended_ephemeral_public_key: STANDARD.encode(ephemeral_public_key.to_extended_bytes()),
        max_epoch: max_epoch.to_string(),
        jwt_randomness: randomness.to_string(),
        salt: salt.to_string(),
        key_claim_name: KEY_CLAIM_NAME.to_string(),
        address_inputs,
        inputs,
    })
}
