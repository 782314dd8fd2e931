//! Unique textual identifiers.
//!
//! A uid is the human-chosen name published in an identity's
//! self-certification. At any point in time a uid belongs to at most one
//! identity; whether it can be claimed again after the owner was pruned is a
//! per-network policy enforced by the trust graph store.
//!
//! ## Validation Rules
//!
//! - Length: 2-100 characters
//! - Allowed characters: alphanumeric (a-z, A-Z, 0-9), underscore (_), hyphen (-)
//! - Lookups are exact (case-sensitive)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{IdentityError, Result};

/// Minimum uid length in characters.
pub const MIN_UID_LEN: usize = 2;

/// Maximum uid length in characters.
pub const MAX_UID_LEN: usize = 100;

/// A validated uid.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Create a new validated uid.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidUid` if the length is out of bounds or
    /// the uid contains characters other than alphanumerics, `_` and `-`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wot_identity::Uid;
    ///
    /// let uid = Uid::new("cat").unwrap();
    /// assert_eq!(uid.as_str(), "cat");
    ///
    /// assert!(Uid::new("c").is_err()); // Too short
    /// assert!(Uid::new("cat tac").is_err()); // Invalid character
    /// ```
    pub fn new(uid: &str) -> Result<Self> {
        Self::validate(uid)?;
        Ok(Self(uid.to_string()))
    }

    /// Validate a uid string without creating a `Uid` instance.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidUid` with a reason if validation fails.
    pub fn validate(uid: &str) -> Result<()> {
        let len = uid.chars().count();

        if len < MIN_UID_LEN {
            return Err(IdentityError::InvalidUid {
                reason: format!(
                    "uid too short: minimum {} characters, got {}",
                    MIN_UID_LEN, len
                ),
            });
        }

        if len > MAX_UID_LEN {
            return Err(IdentityError::InvalidUid {
                reason: format!(
                    "uid too long: maximum {} characters, got {}",
                    MAX_UID_LEN, len
                ),
            });
        }

        for (i, c) in uid.chars().enumerate() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '-' {
                return Err(IdentityError::InvalidUid {
                    reason: format!(
                        "invalid character '{}' at position {}: only alphanumeric, underscore, and hyphen allowed",
                        c, i
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid(\"{}\")", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
