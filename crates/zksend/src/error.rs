//! Error types for link creation and claiming.

use client_blockchain_core::{
    CoinType, ObjectId, SigningError, SuiAddress, TransactionError, TransportError,
};
use zk::ZkLoginError;

/// Errors surfaced by the link builder, encoder and claim flow.
///
/// Nothing here is retried internally. Callers decide between retrying,
/// topping up, or reporting, based on the structured fields.
#[derive(Debug, thiserror::Error)]
pub enum ZkSendError {
    #[error("Insufficient {coin_type}: requested {requested}, available {available}")]
    InsufficientFunds {
        coin_type: CoinType,
        requested: u64,
        available: u64,
    },

    /// The gas coin covers the claimable amount but not the gas reservation on top.
    #[error("Insufficient gas: required {required}, available {available}")]
    InsufficientGas { required: u64, available: u64 },

    #[error("Claimable amount of {coin_type} overflows u64")]
    AmountOverflow { coin_type: CoinType },

    #[error("Link is sealed; no further changes are accepted")]
    LinkSealed,

    #[error("Link has no claimable assets")]
    EmptyLink,

    #[error("Object {object_id} cannot be transferred: {reason}")]
    ObjectNotTransferable { object_id: ObjectId, reason: String },

    #[error("Malformed link: {0}")]
    MalformedLink(String),

    #[error("Claim {claim} is {length} bytes, limit is {max}")]
    ClaimTooLong {
        claim: String,
        length: usize,
        max: usize,
    },

    /// An input object changed since the snapshot was taken.
    #[error("Object version conflict: {0}")]
    VersionConflict(String),

    #[error("Nothing to claim at {address}")]
    NothingToClaim { address: SuiAddress },

    #[error("Proof generation failed: {0}")]
    ProofFailure(String),

    #[error("zkLogin error: {0}")]
    ZkLogin(ZkLoginError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction construction failed: {0}")]
    Transaction(String),

    #[error(transparent)]
    Transport(TransportError),
}

impl ZkSendError {
    /// Missing amount for `InsufficientFunds` and `InsufficientGas`.
    pub fn shortfall(&self) -> Option<u64> {
        match self {
            Self::InsufficientFunds {
                requested,
                available,
                ..
            } => Some(requested.saturating_sub(*available)),
            Self::InsufficientGas {
                required,
                available,
            } => Some(required.saturating_sub(*available)),
            _ => None,
        }
    }

    /// Whether rebuilding from a fresh snapshot may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict(_))
    }

    /// A second claim of the same link ends here.
    pub fn is_already_claimed(&self) -> bool {
        matches!(self, Self::NothingToClaim { .. })
    }
}

impl From<TransportError> for ZkSendError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::VersionConflict(message) => Self::VersionConflict(message),
            other => Self::Transport(other),
        }
    }
}

impl From<ZkLoginError> for ZkSendError {
    fn from(error: ZkLoginError) -> Self {
        match error {
            ZkLoginError::ClaimTooLong {
                claim,
                length,
                max,
            } => Self::ClaimTooLong { claim, length, max },
            ZkLoginError::ProofFailure(message) => Self::ProofFailure(message),
            other => Self::ZkLogin(other),
        }
    }
}

impl From<SigningError> for ZkSendError {
    fn from(error: SigningError) -> Self {
        Self::Signing(error.to_string())
    }
}

impl From<TransactionError> for ZkSendError {
    fn from(error: TransactionError) -> Self {
        Self::Transaction(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZkSendError>;
