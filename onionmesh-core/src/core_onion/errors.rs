//! Error types for circuit construction and layer peeling

use crate::core_crypto::CryptoError;
use crate::core_router::{AddressError, TransportError};
use thiserror::Error;

/// Result type for onion operations
pub type OnionResult<T> = Result<T, OnionError>;

/// Errors that can occur while building, peeling or forwarding a layered message
#[derive(Error, Debug)]
pub enum OnionError {
    /// Missing or malformed caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough relays registered to build a circuit
    #[error("Insufficient nodes: {available} registered, {required} required")]
    InsufficientNodes { available: usize, required: usize },

    /// A circuit was assembled from an invalid hop list
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// The layer could not be peeled (corrupt, truncated or mis-routed)
    #[error("Decryption failure: {0}")]
    DecryptionFailure(String),

    /// The routing prefix does not name a known participant
    #[error("Routing error: {0}")]
    Address(#[from] AddressError),

    /// Key material could not be used while wrapping a layer
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A downstream hop was unreachable or rejected the message
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),
}

impl OnionError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            OnionError::InvalidInput(_) => "invalid_input",
            OnionError::InsufficientNodes { .. } => "insufficient_nodes",
            OnionError::InvalidCircuit(_) => "invalid_circuit",
            OnionError::DecryptionFailure(_) => "decryption_failure",
            OnionError::Address(_) => "unknown_address",
            OnionError::Crypto(_) => "crypto",
            OnionError::TransportFailure(_) => "transport_failure",
        }
    }

    pub(crate) fn decryption(err: impl std::fmt::Display) -> Self {
        OnionError::DecryptionFailure(err.to_string())
    }
}
