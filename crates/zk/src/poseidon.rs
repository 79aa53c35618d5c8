//! Poseidon hash functions for BN254 field elements.
//!
//! Native (non-circuit) Poseidon hashing used by every zkLogin commitment:
//! - ASCII claim packing (`hash_ascii_str_to_field`)
//! - Address seed and nonce derivation
//!
//! # Performance
//!
//! Uses a globally cached Poseidon config (OnceLock). The round constants and
//! MDS matrix are derived once on first use.
//!
//! # Security Parameters
//!
//! - Field: BN254 (254-bit prime)
//! - Full rounds: 8
//! - Partial rounds: 57
//! - Security level: 128 bits

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::{BigInteger, PrimeField};

use crate::error::ZkLoginError;

/// Bytes packed into one field element when hashing strings (248 bits).
pub const PACK_WIDTH_BYTES: usize = 31;

static POSEIDON_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Get cached Poseidon config (8/57 rounds, 128-bit security).
pub fn get_poseidon_config() -> &'static PoseidonConfig<Fr> {
    POSEIDON_CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(254, 2, 8, 57, 0);
        PoseidonConfig::new(8, 57, 5, mds, ark, 2, 1)
    })
}

#[inline]
fn squeeze_single_element(sponge: &mut PoseidonSponge<Fr>) -> Result<Fr, ZkLoginError> {
    sponge
        .squeeze_field_elements::<Fr>(1)
        .first()
        .copied()
        .ok_or_else(|| ZkLoginError::Poseidon("squeeze returned no elements".to_string()))
}

pub fn hash_one(input: Fr) -> Result<Fr, ZkLoginError> {
    hash_many(&[input])
}

pub fn hash_two(left: Fr, right: Fr) -> Result<Fr, ZkLoginError> {
    hash_many(&[left, right])
}

/// Hash a sequence of elements.
///
/// Elements are absorbed one at a time; absorbing them as one slice produces
/// different hashes, and every derivation in this crate relies on the former.
pub fn hash_many(inputs: &[Fr]) -> Result<Fr, ZkLoginError> {
    if inputs.is_empty() {
        return Err(ZkLoginError::Poseidon("no inputs to hash".to_string()));
    }

    let mut sponge = PoseidonSponge::<Fr>::new(get_poseidon_config());
    for input in inputs {
        let element = [*input];
        sponge.absorb(&element.as_slice());
    }
    squeeze_single_element(&mut sponge)
}

/// Check an ASCII claim value against its circuit budget without hashing it.
pub fn check_ascii_claim(claim: &str, value: &str, max_len: usize) -> Result<(), ZkLoginError> {
    if !value.is_ascii() {
        return Err(ZkLoginError::InvalidInput(format!(
            "claim {claim} contains non-ASCII characters"
        )));
    }

    if value.len() > max_len {
        return Err(ZkLoginError::ClaimTooLong {
            claim: claim.to_string(),
            length: value.len(),
            max: max_len,
        });
    }
    Ok(())
}

/// Hash an ASCII claim value into a single field element.
///
/// The value is zero-padded to `max_len` bytes, packed into 31-byte
/// big-endian chunks and hashed. Values longer than `max_len` are rejected:
/// truncating would silently commit to a different claim.
pub fn hash_ascii_str_to_field(claim: &str, value: &str, max_len: usize) -> Result<Fr, ZkLoginError> {
    check_ascii_claim(claim, value, max_len)?;

    let mut padded = value.as_bytes().to_vec();
    padded.resize(max_len, 0);

    let packed: Vec<Fr> = padded
        .chunks(PACK_WIDTH_BYTES)
        .map(Fr::from_be_bytes_mod_order)
        .collect();

    hash_many(&packed)
}

// ============================================================================
// Conversions
// ============================================================================

/// Interpret big-endian bytes as a field element (reduced modulo the field order).
pub fn field_from_be_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Canonical 32-byte big-endian encoding of a field element.
pub fn field_to_be_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    let take = bytes.len().min(32);
    out[32 - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// Decimal string form, as exchanged with proving services.
pub fn field_to_decimal(value: &Fr) -> String {
    value.into_bigint().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_one_deterministic() {
        let input = Fr::from(5u64);
        assert_eq!(hash_one(input).unwrap(), hash_one(input).unwrap());
        assert_ne!(hash_one(input).unwrap(), hash_one(Fr::from(42u64)).unwrap());
    }

    #[test]
    fn test_hash_two_order_matters() {
        let (left, right) = (Fr::from(3u64), Fr::from(4u64));
        assert_ne!(hash_two(left, right).unwrap(), hash_two(right, left).unwrap());
    }

    #[test]
    fn test_hash_many_matches_pairwise_absorb() {
        let (left, right) = (Fr::from(10u64), Fr::from(20u64));
        assert_eq!(hash_many(&[left, right]).unwrap(), hash_two(left, right).unwrap());
        assert!(hash_many(&[]).is_err());
    }

    #[test]
    fn test_ascii_hash_rejects_overlong_claims() {
        let err = hash_ascii_str_to_field("aud", &"a".repeat(146), 145).unwrap_err();
        assert_eq!(
            err,
            ZkLoginError::ClaimTooLong {
                claim: "aud".to_string(),
                length: 146,
                max: 145
            }
        );
        assert!(hash_ascii_str_to_field("aud", &"a".repeat(145), 145).is_ok());
    }

    #[test]
    fn test_ascii_hash_is_padding_sensitive_to_budget() {
        let short = hash_ascii_str_to_field("sub", "1234", 32).unwrap();
        let wide = hash_ascii_str_to_field("sub", "1234", 64).unwrap();
        assert_ne!(short, wide);
    }

    #[test]
    fn test_field_bytes_round_trip() {
        let value = Fr::from(0x0102_0304u64);
        let bytes = field_to_be_bytes(&value);
        assert_eq!(&bytes[28..], &[1, 2, 3, 4]);
        assert_eq!(field_from_be_bytes(&bytes), value);
        assert_eq!(field_to_decimal(&value), "16909060");
    }
}
