//! # wot-identity
//!
//! Identity primitives for the Web of Trust engine.
//!
//! Provides:
//! - Public key identifiers (base58 ed25519 keys)
//! - Unique textual identifiers (uids)
//! - Lookup references by key or uid
//! - The identity lifecycle state machine and validity windows

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod identity_ref;
pub mod lifecycle;
pub mod pubkey;
pub mod uid;

#[cfg(test)]
mod proptests;

pub use error::{IdentityError, Result};
pub use identity_ref::IdentityRef;
pub use lifecycle::{IdentityState, Validity};
pub use pubkey::{PublicKey, MAX_PUBKEY_LEN, MIN_PUBKEY_LEN};
pub use uid::{Uid, MAX_UID_LEN, MIN_UID_LEN};
