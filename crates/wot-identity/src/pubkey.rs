//! Public key identifiers.
//!
//! Every identity is anchored to an ed25519 public key, written on-chain in
//! base58. The key is the globally unique identifier of an identity; the uid
//! is only a human-readable alias.
//!
//! ## Validation Rules
//!
//! - Length: 43-44 characters
//! - Alphabet: base58 (no `0`, `O`, `I`, `l`)
//!
//! Signature checks are performed before documents reach this crate, so a
//! `PublicKey` only guarantees the textual shape of the key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{IdentityError, Result};

/// Minimum length of a base58-encoded ed25519 public key.
pub const MIN_PUBKEY_LEN: usize = 43;

/// Maximum length of a base58-encoded ed25519 public key.
pub const MAX_PUBKEY_LEN: usize = 44;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A validated base58 public key.
///
/// Only the text is checked: length and alphabet. The key is not decoded,
/// so a string such as 44 `1`s is accepted even though it is not the
/// encoding of a 32-byte ed25519 point. Keys reach the engine from
/// documents whose signatures were already verified against them.
///
/// Ordering is lexicographic on the encoded text, which gives every node the
/// same iteration order over identities.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    /// Create a new validated public key.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidPublicKey` if the key has the wrong
    /// length or contains characters outside the base58 alphabet.
    ///
    /// # Examples
    ///
    /// ```
    /// use wot_identity::PublicKey;
    ///
    /// let key = PublicKey::new("HgTTJLAQ5sqfknMq7yLPZbehtuLSsKj9CxWN7k8QvYJd").unwrap();
    /// assert_eq!(key.short(), "HgTTJLAQ");
    ///
    /// assert!(PublicKey::new("too-short").is_err());
    /// ```
    pub fn new(key: &str) -> Result<Self> {
        Self::validate(key)?;
        Ok(Self(key.to_string()))
    }

    /// Validate a public key string without creating a `PublicKey`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidPublicKey` with a reason if validation fails.
    pub fn validate(key: &str) -> Result<()> {
        let len = key.len();
        if !(MIN_PUBKEY_LEN..=MAX_PUBKEY_LEN).contains(&len) {
            return Err(IdentityError::InvalidPublicKey {
                reason: format!(
                    "expected {}-{} characters, got {}",
                    MIN_PUBKEY_LEN, MAX_PUBKEY_LEN, len
                ),
            });
        }

        if let Some((i, c)) = key
            .chars()
            .enumerate()
            .find(|(_, c)| !BASE58_ALPHABET.contains(*c))
        {
            return Err(IdentityError::InvalidPublicKey {
                reason: format!("invalid base58 character '{}' at position {}", c, i),
            });
        }

        Ok(())
    }

    /// Check whether a string has the shape of a public key.
    pub fn is_valid(key: &str) -> bool {
        Self::validate(key).is_ok()
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", self.short())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PublicKey {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl AsRef<str> for PublicKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
