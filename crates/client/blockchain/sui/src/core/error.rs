//! Error types for Sui network operations.

use client_blockchain_core::TransportError;
use thiserror::Error;

/// Errors that can occur while talking to a Sui full node or prover.
#[derive(Debug, Error)]
pub enum SuiError {
    #[error("Network error: {0}")]
    Network(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SuiError>;

/// Substrings the node uses when an input object version is stale or locked.
const VERSION_CONFLICT_MARKERS: &[&str] = &[
    "ObjectVersionUnavailableForConsumption",
    "not available for consumption",
    "ObjectLockConflict",
    "equivocated",
    "ObjectNotFound",
];

pub(crate) fn is_version_conflict(message: &str) -> bool {
    VERSION_CONFLICT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

impl From<reqwest::Error> for SuiError {
    fn from(err: reqwest::Error) -> Self {
        SuiError::Network(err.to_string())
    }
}

impl From<SuiError> for TransportError {
    fn from(err: SuiError) -> Self {
        match err {
            SuiError::Network(message) => TransportError::NetworkError(message),
            SuiError::Rpc { message, .. } | SuiError::TransactionFailed(message)
                if is_version_conflict(&message) =>
            {
                TransportError::VersionConflict(message)
            }
            SuiError::Rpc { code, message } => {
                TransportError::BackendError(format!("RPC error {code}: {message}"))
            }
            SuiError::TransactionFailed(message) => TransportError::TransactionFailed(message),
            SuiError::InvalidConfig(message) => TransportError::ConfigError(message),
            SuiError::Serialization(message) => TransportError::SerializationError(message),
            SuiError::ObjectNotFound(message) => TransportError::BackendError(message),
            SuiError::Other(err) => TransportError::BackendError(err.to_string()),
        }
    }
}
