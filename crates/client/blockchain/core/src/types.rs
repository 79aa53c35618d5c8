//! Common types for blockchain interactions.
//!
//! Identifiers serialize as hex (addresses, object ids) or base58 (digests) in
//! human-readable formats such as JSON, and as raw bytes under BCS so that the
//! transaction model in [`crate::transaction`] matches the on-chain layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors raised while parsing identifiers and type tags from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid hex identifier {value:?}: {reason}")]
    InvalidHex { value: String, reason: String },

    #[error("Invalid digest {0:?}")]
    InvalidDigest(String),

    #[error("Invalid coin type {0:?}: expected <address>::<module>::<name>")]
    InvalidCoinType(String),
}

// ============================================================================
// 32-byte Identifiers
// ============================================================================

macro_rules! hex_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_padded_hex(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(serde::de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

hex_identifier!(
    /// Account address (Blake2b-256 of a signature scheme flag and public key).
    SuiAddress
);

hex_identifier!(
    /// On-chain object identifier.
    ObjectId
);

/// Parse `0x`-prefixed (or bare) hex, left-padding short forms such as `0x2`.
fn parse_padded_hex(s: &str) -> Result<[u8; 32], ParseError> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 64 {
        return Err(ParseError::InvalidHex {
            value: s.to_string(),
            reason: format!("expected 1..=64 hex digits, got {}", digits.len()),
        });
    }

    let padded = format!("{:0>64}", digits);
    let bytes = hex::decode(&padded).map_err(|e| ParseError::InvalidHex {
        value: s.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

// ============================================================================
// Digests
// ============================================================================

/// 32-byte digest of an object or transaction, displayed in base58.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; 32]);

/// Digest of an object version.
pub type ObjectDigest = Digest;

/// Digest identifying an executed transaction.
pub type TransactionDigest = Digest;

impl Digest {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_base58())
    }
}

impl FromStr for Digest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s.trim())
            .into_vec()
            .map_err(|_| ParseError::InvalidDigest(s.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseError::InvalidDigest(s.to_string()))?;
        Ok(Self(array))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            // Length-prefixed bytes, as the chain encodes digests.
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            let array: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                serde::de::Error::custom(format!("digest must be 32 bytes, got {}", b.len()))
            })?;
            Ok(Self(array))
        }
    }
}

// ============================================================================
// Object References
// ============================================================================

/// Reference to a specific version of an object.
///
/// Serialized as the `(id, version, digest)` triple the chain expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: ObjectId,
    pub version: u64,
    pub digest: ObjectDigest,
}

impl ObjectRef {
    pub fn new(object_id: ObjectId, version: u64, digest: ObjectDigest) -> Self {
        Self {
            object_id,
            version,
            digest,
        }
    }
}

// ============================================================================
// Coin Types
// ============================================================================

const SUI_COIN_TYPE: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI";
const COIN_STRUCT_PREFIX: &str = "0x2::coin::Coin<";

/// Normalized Move struct tag of a coin type (`<64-hex address>::module::Name`).
///
/// Only the leading address is normalized; generic arguments are kept verbatim.
/// Ordering follows the normalized string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoinType(String);

impl CoinType {
    /// The chain's native gas coin.
    pub fn sui() -> Self {
        Self(SUI_COIN_TYPE.to_string())
    }

    pub fn is_gas(&self) -> bool {
        *self == Self::sui()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the coin type from an object type such as `0x2::coin::Coin<0x2::sui::SUI>`.
    pub fn from_coin_object_type(object_type: &str) -> Option<Self> {
        let (address, rest) = object_type.split_once("::")?;
        let address = parse_padded_hex(address).ok()?;
        let coin_prefix = parse_padded_hex("0x2").ok()?;
        if address != coin_prefix {
            return None;
        }

        let inner = rest
            .strip_prefix(&COIN_STRUCT_PREFIX["0x2::".len()..])?
            .strip_suffix('>')?;
        Self::normalize(inner).ok()
    }

    /// Object type string of a coin of this type.
    pub fn coin_object_type(&self) -> String {
        format!("{}{}>", COIN_STRUCT_PREFIX, self.0)
    }

    fn normalize(raw: &str) -> Result<Self, ParseError> {
        let raw = raw.trim();
        let (address, rest) = raw
            .split_once("::")
            .ok_or_else(|| ParseError::InvalidCoinType(raw.to_string()))?;

        let (module, name) = rest
            .split_once("::")
            .ok_or_else(|| ParseError::InvalidCoinType(raw.to_string()))?;

        if module.is_empty() || name.is_empty() {
            return Err(ParseError::InvalidCoinType(raw.to_string()));
        }

        let address =
            parse_padded_hex(address).map_err(|_| ParseError::InvalidCoinType(raw.to_string()))?;

        Ok(Self(format!("0x{}::{}::{}", hex::encode(address), module, name)))
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CoinType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl TryFrom<String> for CoinType {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<CoinType> for String {
    fn from(value: CoinType) -> Self {
        value.0
    }
}

// ============================================================================
// Owned Objects
// ============================================================================

/// A coin object owned by a single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinObject {
    pub object_id: ObjectId,
    pub coin_type: CoinType,
    pub balance: u64,
    pub version: u64,
    pub digest: ObjectDigest,
    pub previous_transaction: TransactionDigest,
}

impl CoinObject {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.object_id, self.version, self.digest)
    }
}

/// What an owned object holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Coin { coin_type: CoinType, balance: u64 },
    Other { type_tag: String },
}

/// Object owned by an address, as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedObject {
    pub object_ref: ObjectRef,
    pub kind: ObjectKind,
    pub owner: SuiAddress,
    pub previous_transaction: TransactionDigest,
}

impl OwnedObject {
    pub fn object_id(&self) -> ObjectId {
        self.object_ref.object_id
    }

    pub fn coin_type(&self) -> Option<&CoinType> {
        match &self.kind {
            ObjectKind::Coin { coin_type, .. } => Some(coin_type),
            ObjectKind::Other { .. } => None,
        }
    }

    pub fn is_gas_coin(&self) -> bool {
        self.coin_type().is_some_and(CoinType::is_gas)
    }

    /// View this object as a coin, if it is one.
    pub fn as_coin(&self) -> Option<CoinObject> {
        match &self.kind {
            ObjectKind::Coin { coin_type, balance } => Some(CoinObject {
                object_id: self.object_ref.object_id,
                coin_type: coin_type.clone(),
                balance: *balance,
                version: self.object_ref.version,
                digest: self.object_ref.digest,
                previous_transaction: self.previous_transaction,
            }),
            ObjectKind::Other { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hex_is_left_padded() {
        let address: SuiAddress = "0x2".parse().unwrap();
        assert_eq!(address.0[31], 2);
        assert!(address.0[..31].iter().all(|b| *b == 0));
        assert_eq!(address.to_string().len(), 66);
    }

    #[test]
    fn test_overlong_hex_rejected() {
        let too_long = format!("0x{}", "1".repeat(65));
        assert!(too_long.parse::<ObjectId>().is_err());
        assert!("0xzz".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_coin_type_normalization() {
        let short: CoinType = "0x2::sui::SUI".parse().unwrap();
        let long: CoinType =
            "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI"
                .parse()
                .unwrap();
        assert_eq!(short, long);
        assert!(short.is_gas());
        assert!("0x2::sui".parse::<CoinType>().is_err());
    }

    #[test]
    fn test_coin_type_from_object_type() {
        let coin_type = CoinType::from_coin_object_type("0x2::coin::Coin<0xabc::usdc::USDC>").unwrap();
        assert_eq!(coin_type, "0xabc::usdc::USDC".parse().unwrap());
        assert!(CoinType::from_coin_object_type("0x2::kiosk::Kiosk").is_none());
        assert_eq!(
            CoinType::from_coin_object_type(&coin_type.coin_object_type()),
            Some(coin_type)
        );
    }

    #[test]
    fn test_identifier_serde_formats() {
        let id: ObjectId = "0xff".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));

        let bytes = bcs::to_bytes(&id).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bcs::from_bytes::<ObjectId>(&bytes).unwrap(), id);
    }

    #[test]
    fn test_digest_text_and_bcs() {
        let digest = Digest::new([7u8; 32]);
        let parsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);

        let bytes = bcs::to_bytes(&digest).unwrap();
        assert_eq!(bytes.len(), 33);
        assert_eq!(bcs::from_bytes::<Digest>(&bytes).unwrap(), digest);
    }
}
