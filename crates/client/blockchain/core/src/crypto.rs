//! Ed25519 keys, address derivation and transaction signing.
//!
//! Addresses are Blake2b-256 over a one-byte signature scheme flag followed by
//! the public key. Private keys use the Bech32 `suiprivkey` export format
//! (flag byte followed by the 32-byte secret).

use std::fmt;

use bech32::{Bech32, Hrp};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::transaction::{TransactionData, TransactionError, UserSignature};
use crate::types::SuiAddress;

/// Signature scheme flag for Ed25519.
pub const ED25519_FLAG: u8 = 0x00;

/// Signature scheme flag for zkLogin authenticators.
pub const ZKLOGIN_FLAG: u8 = 0x05;

/// Bech32 human-readable part of exported private keys.
pub const PRIVATE_KEY_HRP: &str = "suiprivkey";

pub const ED25519_SECRET_KEY_LENGTH: usize = 32;
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;
const ED25519_SIGNATURE_LENGTH: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key encoding: {0}")]
    InvalidEncoding(String),

    #[error("Unsupported signature scheme flag: {0:#04x}")]
    UnsupportedScheme(u8),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Signature verification failed: {0}")]
    Verification(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Signer failed: {0}")]
    Signer(String),
}

/// Blake2b with a 32-byte output over the concatenation of `parts`.
pub fn blake2b256(parts: &[&[u8]]) -> [u8; 32] {
    let mut state = blake2b_simd::Params::new().hash_length(32).to_state();
    for part in parts {
        state.update(part);
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(state.finalize().as_bytes());
    out
}

impl SuiAddress {
    /// Derive the address controlled by a public key of the given scheme.
    pub fn from_public_key(flag: u8, public_key: &[u8]) -> Self {
        Self::new(blake2b256(&[&[flag], public_key]))
    }
}

// ============================================================================
// Ed25519 Keys
// ============================================================================

/// Ed25519 public key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; ED25519_PUBLIC_KEY_LENGTH]);

impl Ed25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; ED25519_PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Flag byte followed by the key, as used in address and nonce derivation.
    pub fn to_extended_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_LENGTH + 1] {
        let mut out = [0u8; ED25519_PUBLIC_KEY_LENGTH + 1];
        out[0] = ED25519_FLAG;
        out[1..].copy_from_slice(&self.0);
        out
    }

    pub fn to_address(&self) -> SuiAddress {
        SuiAddress::from_public_key(ED25519_FLAG, &self.0)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), KeyError> {
        let key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        let signature_bytes: [u8; ED25519_SIGNATURE_LENGTH] =
            signature.try_into().map_err(|_| KeyError::InvalidLength {
                expected: ED25519_SIGNATURE_LENGTH,
                actual: signature.len(),
            })?;
        key.verify(message, &ed25519_dalek::Signature::from_bytes(&signature_bytes))
            .map_err(|e| KeyError::Verification(e.to_string()))
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", hex::encode(self.0))
    }
}

/// Ed25519 keypair.
#[derive(Clone)]
pub struct Ed25519Keypair {
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Generate a fresh keypair from the operating system RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: [u8; ED25519_SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    pub fn from_secret_slice(secret: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; ED25519_SECRET_KEY_LENGTH] =
            secret.try_into().map_err(|_| KeyError::InvalidLength {
                expected: ED25519_SECRET_KEY_LENGTH,
                actual: secret.len(),
            })?;
        Ok(Self::from_secret_bytes(bytes))
    }

    pub fn secret_bytes(&self) -> [u8; ED25519_SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn address(&self) -> SuiAddress {
        self.public_key().to_address()
    }

    /// Sign an arbitrary message, returning the raw 64-byte signature.
    pub fn sign_message(&self, message: &[u8]) -> [u8; ED25519_SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Produce the serialized `flag || signature || public key` over the
    /// Blake2b-256 digest of the intent message.
    pub fn sign_transaction(&self, tx: &TransactionData) -> Result<UserSignature, TransactionError> {
        let digest = blake2b256(&[&tx.signing_message()?]);
        let signature = self.sign_message(&digest);

        let mut bytes = Vec::with_capacity(1 + ED25519_SIGNATURE_LENGTH + ED25519_PUBLIC_KEY_LENGTH);
        bytes.push(ED25519_FLAG);
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(self.public_key().as_bytes());
        Ok(UserSignature(bytes))
    }

    /// Export as a Bech32 `suiprivkey` string.
    pub fn to_bech32(&self) -> Result<String, KeyError> {
        let hrp = Hrp::parse(PRIVATE_KEY_HRP).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
        let mut data = Vec::with_capacity(1 + ED25519_SECRET_KEY_LENGTH);
        data.push(ED25519_FLAG);
        data.extend_from_slice(&self.secret_bytes());
        bech32::encode::<Bech32>(hrp, &data).map_err(|e| KeyError::InvalidEncoding(e.to_string()))
    }

    /// Import a Bech32 `suiprivkey` string. Only Ed25519 keys are supported.
    pub fn from_bech32(encoded: &str) -> Result<Self, KeyError> {
        let (hrp, data) =
            bech32::decode(encoded.trim()).map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;

        if hrp.as_str() != PRIVATE_KEY_HRP {
            return Err(KeyError::InvalidEncoding(format!(
                "unexpected prefix {:?}",
                hrp.as_str()
            )));
        }

        Self::from_flagged_secret(&data)
    }

    /// Decode `flag || secret` bytes.
    pub fn from_flagged_secret(data: &[u8]) -> Result<Self, KeyError> {
        match data.split_first() {
            Some((&ED25519_FLAG, secret)) => Self::from_secret_slice(secret),
            Some((&flag, _)) => Err(KeyError::UnsupportedScheme(flag)),
            None => Err(KeyError::InvalidLength {
                expected: ED25519_SECRET_KEY_LENGTH + 1,
                actual: 0,
            }),
        }
    }
}

impl PartialEq for Ed25519Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.secret_bytes() == other.secret_bytes()
    }
}

impl Eq for Ed25519Keypair {}

impl fmt::Debug for Ed25519Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material.
        f.debug_struct("Ed25519Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Verify a serialized Ed25519 user signature against a transaction and its sender.
pub fn verify_transaction_signature(
    tx: &TransactionData,
    signature: &UserSignature,
) -> Result<(), KeyError> {
    let bytes = signature.as_bytes();
    let expected = 1 + ED25519_SIGNATURE_LENGTH + ED25519_PUBLIC_KEY_LENGTH;
    if bytes.len() != expected {
        return Err(KeyError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes[0] != ED25519_FLAG {
        return Err(KeyError::UnsupportedScheme(bytes[0]));
    }

    let mut public_key = [0u8; ED25519_PUBLIC_KEY_LENGTH];
    public_key.copy_from_slice(&bytes[1 + ED25519_SIGNATURE_LENGTH..]);
    let public_key = Ed25519PublicKey(public_key);

    if public_key.to_address() != tx.sender() {
        return Err(KeyError::Verification(format!(
            "signer {} is not the transaction sender {}",
            public_key.to_address(),
            tx.sender()
        )));
    }

    let message = tx
        .signing_message()
        .map_err(|e| KeyError::InvalidEncoding(e.to_string()))?;
    let digest = blake2b256(&[&message]);
    public_key.verify(&digest, &bytes[1..1 + ED25519_SIGNATURE_LENGTH])
}

// ============================================================================
// Signer Abstraction
// ============================================================================

/// Anything able to authorize transactions for one address.
///
/// The funding side receives the sender's signer from the caller; the claim
/// side signs with the link's ephemeral keypair.
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> SuiAddress;

    fn sign_transaction(&self, tx: &TransactionData) -> Result<UserSignature, SigningError>;
}

impl TransactionSigner for Ed25519Keypair {
    fn address(&self) -> SuiAddress {
        Ed25519Keypair::address(self)
    }

    fn sign_transaction(&self, tx: &TransactionData) -> Result<UserSignature, SigningError> {
        Ed25519Keypair::sign_transaction(self, tx).map_err(SigningError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ProgrammableTransaction;

    #[test]
    fn test_bech32_round_trip() {
        let keypair = Ed25519Keypair::generate();
        let encoded = keypair.to_bech32().unwrap();
        assert!(encoded.starts_with("suiprivkey1"));
        assert_eq!(Ed25519Keypair::from_bech32(&encoded).unwrap(), keypair);
    }

    #[test]
    fn test_rejects_non_ed25519_flag() {
        let mut data = vec![0x01];
        data.extend_from_slice(&[7u8; 32]);
        assert!(matches!(
            Ed25519Keypair::from_flagged_secret(&data),
            Err(KeyError::UnsupportedScheme(0x01))
        ));
    }

    #[test]
    fn test_address_is_deterministic() {
        let keypair = Ed25519Keypair::from_secret_bytes([3u8; 32]);
        let again = Ed25519Keypair::from_secret_bytes([3u8; 32]);
        assert_eq!(keypair.address(), again.address());
        assert_ne!(
            keypair.address(),
            Ed25519Keypair::from_secret_bytes([4u8; 32]).address()
        );
    }

    #[test]
    fn test_transaction_signature_verifies() {
        let keypair = Ed25519Keypair::from_secret_bytes([5u8; 32]);
        let tx = TransactionData::new_programmable(
            keypair.address(),
            vec![],
            ProgrammableTransaction::default(),
            10,
            1,
        );

        let signature = keypair.sign_transaction(&tx).unwrap();
        assert_eq!(signature.as_bytes().len(), 97);
        verify_transaction_signature(&tx, &signature).unwrap();

        let other = Ed25519Keypair::from_secret_bytes([6u8; 32]);
        let forged = other.sign_transaction(&tx).unwrap();
        assert!(verify_transaction_signature(&tx, &forged).is_err());
    }
}
