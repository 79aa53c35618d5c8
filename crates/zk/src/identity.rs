//! zkLogin address, address seed and nonce derivation.
//!
//! ```text
//! subject commitment   = P(H("sub", 32), H(subject, 115), P(salt))
//! ephemeral commitment = P(eph_hi, eph_lo)
//! address seed         = P(H(audience, 145), subject commitment, ephemeral commitment)
//! address              = Blake2b-256(0x05 || len(iss) || iss || seed)
//! nonce                = base64url(last 20 bytes of P(eph_hi, eph_lo, max_epoch, randomness))
//! ```
//!
//! `P` is Poseidon over BN254 and `H(value, n)` packs an ASCII claim padded to
//! `n` bytes. Every function here is pure: identical inputs always produce the
//! identical address.

use ark_bn254::Fr;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use client_blockchain_core::{Ed25519PublicKey, SuiAddress, ZKLOGIN_FLAG, blake2b256};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ZkLoginError;
use crate::poseidon::{
    check_ascii_claim, field_from_be_bytes, field_to_be_bytes, hash_ascii_str_to_field, hash_many,
    hash_one, hash_two,
};

/// Circuit budget for the `iss` claim, in bytes.
pub const MAX_ISSUER_LENGTH: usize = 224;
/// Circuit budget for the `aud` claim, in bytes.
pub const MAX_AUDIENCE_LENGTH: usize = 145;
/// Circuit budget for the key-claim name (e.g. `sub`), in bytes.
pub const MAX_KEY_CLAIM_NAME_LENGTH: usize = 32;
/// Circuit budget for the key-claim value (the subject), in bytes.
pub const MAX_KEY_CLAIM_VALUE_LENGTH: usize = 115;

/// Key claim the address is bound to.
pub const KEY_CLAIM_NAME: &str = "sub";

const NONCE_LENGTH_BYTES: usize = 20;

/// Everything an on-chain zkLogin address is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkAddressInputs {
    pub ephemeral_public_key: [u8; 32],
    pub issuer: String,
    pub audience: String,
    pub subject: String,
    /// User salt committing the subject.
    pub salt: u128,
    pub max_epoch: u64,
}

impl ZkAddressInputs {
    pub fn ephemeral_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.ephemeral_public_key)
    }
}

/// The extended ephemeral public key (`flag || pk`, 33 bytes) split into a
/// high element (top 17 bytes) and a low element (bottom 16 bytes).
pub fn ephemeral_key_elements(public_key: &Ed25519PublicKey) -> (Fr, Fr) {
    let extended = public_key.to_extended_bytes();
    let (hi, lo) = extended.split_at(extended.len() - 16);
    (field_from_be_bytes(hi), field_from_be_bytes(lo))
}

/// Hashes of the key-claim name, the subject and the salt, in circuit order.
pub fn subject_claim_hashes(subject: &str, salt: u128) -> Result<[Fr; 3], ZkLoginError> {
    let name = hash_ascii_str_to_field("key_claim_name", KEY_CLAIM_NAME, MAX_KEY_CLAIM_NAME_LENGTH)?;
    let value = hash_ascii_str_to_field("sub", subject, MAX_KEY_CLAIM_VALUE_LENGTH)?;
    let salt = hash_one(Fr::from(salt))?;
    Ok([name, value, salt])
}

/// Commitment to the subject claim and the user salt.
pub fn subject_commitment(subject: &str, salt: u128) -> Result<Fr, ZkLoginError> {
    hash_many(&subject_claim_hashes(subject, salt)?)
}

pub fn audience_hash(audience: &str) -> Result<Fr, ZkLoginError> {
    hash_ascii_str_to_field("aud", audience, MAX_AUDIENCE_LENGTH)
}

pub fn ephemeral_commitment(public_key: &Ed25519PublicKey) -> Result<Fr, ZkLoginError> {
    let (hi, lo) = ephemeral_key_elements(public_key);
    hash_two(hi, lo)
}

/// Address seed binding audience, subject and ephemeral key.
pub fn derive_address_seed(inputs: &ZkAddressInputs) -> Result<Fr, ZkLoginError> {
    let audience = audience_hash(&inputs.audience)?;
    let subject = subject_commitment(&inputs.subject, inputs.salt)?;
    let ephemeral = ephemeral_commitment(&inputs.ephemeral_key())?;
    hash_many(&[audience, subject, ephemeral])
}

/// Address controlled by a zkLogin authenticator with the given seed.
pub fn address_from_seed(issuer: &str, seed: &Fr) -> Result<SuiAddress, ZkLoginError> {
    check_ascii_claim("iss", issuer, MAX_ISSUER_LENGTH)?;

    let issuer_length = [issuer.len() as u8];
    let seed_bytes = field_to_be_bytes(seed);
    Ok(SuiAddress::new(blake2b256(&[
        &[ZKLOGIN_FLAG],
        &issuer_length,
        issuer.as_bytes(),
        &seed_bytes,
    ])))
}

/// Derive the on-chain address for `inputs`.
///
/// The issuer is checked against its circuit budget so that an address is
/// never produced for a token the prover would refuse.
pub fn derive_address(inputs: &ZkAddressInputs) -> Result<SuiAddress, ZkLoginError> {
    check_ascii_claim("iss", &inputs.issuer, MAX_ISSUER_LENGTH)?;
    let seed = derive_address_seed(inputs)?;
    address_from_seed(&inputs.issuer, &seed)
}

/// Nonce field element binding the ephemeral key, epoch window and randomness.
pub fn nonce_element(
    public_key: &Ed25519PublicKey,
    max_epoch: u64,
    randomness: u128,
) -> Result<Fr, ZkLoginError> {
    let (hi, lo) = ephemeral_key_elements(public_key);
    hash_many(&[hi, lo, Fr::from(max_epoch), Fr::from(randomness)])
}

/// Nonce to place in the OAuth request (base64url, no padding).
pub fn generate_nonce(
    public_key: &Ed25519PublicKey,
    max_epoch: u64,
    randomness: u128,
) -> Result<String, ZkLoginError> {
    let nonce = nonce_element(public_key, max_epoch, randomness)?;
    let bytes = field_to_be_bytes(&nonce);
    Ok(URL_SAFE_NO_PAD.encode(&bytes[bytes.len() - NONCE_LENGTH_BYTES..]))
}

/// Fresh 128-bit randomness for a nonce.
pub fn generate_randomness() -> u128 {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    u128::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::Ed25519Keypair;

    fn inputs() -> ZkAddressInputs {
        ZkAddressInputs {
            ephemeral_public_key: *Ed25519Keypair::from_secret_bytes([1u8; 32])
                .public_key()
                .as_bytes(),
            issuer: "https://accounts.google.com".to_string(),
            audience: "25769832374-famecqrhe2gkebt5fvqms2263046lj96.apps.googleusercontent.com"
                .to_string(),
            subject: "110463452167303598383".to_string(),
            salt: 129_390_038_577_185_583_942_388_216_820_280_642_146,
            max_epoch: 10,
        }
    }

    #[test]
    fn test_address_is_deterministic() {
        assert_eq!(derive_address(&inputs()).unwrap(), derive_address(&inputs()).unwrap());
    }

    #[test]
    fn test_every_field_changes_the_address() {
        let base = derive_address(&inputs()).unwrap();

        let mut changed = inputs();
        changed.issuer = "https://id.twitch.tv/oauth2".to_string();
        assert_ne!(derive_address(&changed).unwrap(), base);

        let mut changed = inputs();
        changed.audience.push('x');
        assert_ne!(derive_address(&changed).unwrap(), base);

        let mut changed = inputs();
        changed.salt += 1;
        assert_ne!(derive_address(&changed).unwrap(), base);

        let mut changed = inputs();
        changed.subject = "110463452167303598384".to_string();
        assert_ne!(derive_address(&changed).unwrap(), base);

        let mut changed = inputs();
        changed.ephemeral_public_key = *Ed25519Keypair::from_secret_bytes([2u8; 32])
            .public_key()
            .as_bytes();
        assert_ne!(derive_address(&changed).unwrap(), base);
    }

    #[test]
    fn test_overlong_subject_rejected() {
        let mut long = inputs();
        long.subject = "9".repeat(MAX_KEY_CLAIM_VALUE_LENGTH + 1);
        assert!(matches!(
            derive_address(&long),
            Err(ZkLoginError::ClaimTooLong { max: MAX_KEY_CLAIM_VALUE_LENGTH, .. })
        ));

        let mut long = inputs();
        long.issuer = "i".repeat(MAX_ISSUER_LENGTH + 1);
        assert!(matches!(derive_address(&long), Err(ZkLoginError::ClaimTooLong { .. })));
    }

    #[test]
    fn test_issuer_budget_checked_before_seed() {
        let mut edge = inputs();
        edge.issuer = "i".repeat(MAX_ISSUER_LENGTH);
        assert!(derive_address(&edge).is_ok());

        let mut wide = inputs();
        wide.issuer = "https://accounts.gööglé.com".to_string();
        assert!(matches!(derive_address(&wide), Err(ZkLoginError::InvalidInput(_))));

        let seed = derive_address_seed(&inputs()).unwrap();
        assert!(matches!(
            address_from_seed(&"i".repeat(MAX_ISSUER_LENGTH + 1), &seed),
            Err(ZkLoginError::ClaimTooLong { max: MAX_ISSUER_LENGTH, .. })
        ));
    }

    #[test]
    fn test_ephemeral_split_covers_extended_key() {
        let key = Ed25519Keypair::from_secret_bytes([1u8; 32]).public_key();
        let (hi, lo) = ephemeral_key_elements(&key);
        let extended = key.to_extended_bytes();
        assert_eq!(field_to_be_bytes(&hi)[15..], extended[..17]);
        assert_eq!(field_to_be_bytes(&lo)[16..], extended[17..]);
    }

    #[test]
    fn test_nonce_binds_key_epoch_and_randomness() {
        let key = Ed25519Keypair::from_secret_bytes([1u8; 32]).public_key();
        let nonce = generate_nonce(&key, 10, 42).unwrap();
        assert_eq!(nonce.len(), 27);
        assert_eq!(nonce, generate_nonce(&key, 10, 42).unwrap());
        assert_ne!(nonce, generate_nonce(&key, 11, 42).unwrap());
        assert_ne!(nonce, generate_nonce(&key, 10, 43).unwrap());

        let other = Ed25519Keypair::from_secret_bytes([2u8; 32]).public_key();
        assert_ne!(nonce, generate_nonce(&other, 10, 42).unwrap());
    }
}
