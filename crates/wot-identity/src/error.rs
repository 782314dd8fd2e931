//! Error types for identity operations.

use thiserror::Error;

/// Errors that can occur during identity operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Public key is not a well-formed base58 key.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Reason for invalidity.
        reason: String,
    },

    /// Uid does not satisfy the identifier rules.
    #[error("Invalid uid: {reason}")]
    InvalidUid {
        /// Reason for invalidity.
        reason: String,
    },

    /// Invalid identity state transition.
    #[error("Invalid identity state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
