//! Error types for engine operations.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Identity error.
    #[error("Identity error: {0}")]
    Identity(#[from] wot_identity::IdentityError),

    /// Chain error.
    #[error("Chain error: {0}")]
    Chain(#[from] wot_chain::ChainError),
}

impl CoreError {
    /// Check whether the error rejected a block.
    pub fn is_block_rejection(&self) -> bool {
        match self {
            CoreError::Chain(e) => !matches!(e, wot_chain::ChainError::InvalidParameter { .. }),
            _ => false,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, CoreError>;
