//! Error types for block application.

use thiserror::Error;
use wot_identity::IdentityError;

/// Errors that can occur while validating or applying a block.
///
/// Every variant returned by the block applier rejects the whole block;
/// no partial state survives a rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Public key or uid is already held (or retired, under the forbid policy).
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// An event references an identity that does not exist.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// An identity tried to certify itself.
    #[error("Self-certification is not allowed: {0}")]
    SelfCertification(String),

    /// A membership was requested below the certification quorum.
    #[error("Insufficient certifications for {pubkey}: required {required}, have {actual}")]
    InsufficientCertifications {
        /// Identity requesting membership.
        pubkey: String,
        /// Required number of valid certifications.
        required: u32,
        /// Valid certifications held at block time.
        actual: u32,
    },

    /// Join for a current member, or renewal without a current membership.
    #[error("Membership conflict for {pubkey}: {reason}")]
    MembershipConflict {
        /// Identity concerned.
        pubkey: String,
        /// Why the membership event does not apply.
        reason: String,
    },

    /// Block header does not extend the current head.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Network parameter out of range.
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        field: String,
        /// Reason it is invalid.
        reason: String,
    },

    /// Malformed identifier.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl ChainError {
    /// Check whether this error comes from a lifecycle event of the block
    /// (as opposed to the block header or configuration).
    pub fn is_event_rejection(&self) -> bool {
        matches!(
            self,
            ChainError::DuplicateIdentity(_)
                | ChainError::UnknownIdentity(_)
                | ChainError::SelfCertification(_)
                | ChainError::InsufficientCertifications { .. }
                | ChainError::MembershipConflict { .. }
        )
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
