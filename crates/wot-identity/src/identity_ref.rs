//! Identity lookup keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IdentityError, PublicKey, Result, Uid};

/// A reference to an identity, either by public key or by uid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRef {
    /// Lookup by public key.
    Pubkey(PublicKey),
    /// Lookup by uid.
    Uid(Uid),
}

impl IdentityRef {
    /// Parse a search string.
    ///
    /// Key-shaped strings become [`IdentityRef::Pubkey`]; anything else that
    /// is a valid uid becomes [`IdentityRef::Uid`].
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidUid` if the string is neither a public
    /// key nor a valid uid.
    pub fn parse(search: &str) -> Result<Self> {
        if PublicKey::is_valid(search) {
            return Ok(IdentityRef::Pubkey(PublicKey::new(search)?));
        }
        Uid::new(search).map(IdentityRef::Uid).map_err(|e| match e {
            IdentityError::InvalidUid { reason } => IdentityError::InvalidUid {
                reason: format!("'{}' is neither a public key nor a uid: {}", search, reason),
            },
            other => other,
        })
    }

    /// The raw search text.
    pub fn as_str(&self) -> &str {
        match self {
            IdentityRef::Pubkey(key) => key.as_str(),
            IdentityRef::Uid(uid) => uid.as_str(),
        }
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRef::Pubkey(key) => write!(f, "pubkey {}", key),
            IdentityRef::Uid(uid) => write!(f, "uid {}", uid),
        }
    }
}

impl From<PublicKey> for IdentityRef {
    fn from(key: PublicKey) -> Self {
        IdentityRef::Pubkey(key)
    }
}

impl From<Uid> for IdentityRef {
    fn from(uid: Uid) -> Self {
        IdentityRef::Uid(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pubkey() {
        let parsed = IdentityRef::parse("DNann1Lh55eZMEDXeYt59bzHbA3NJR46DeQYCS2qQdLV").unwrap();
        assert!(matches!(parsed, IdentityRef::Pubkey(_)));
    }

    #[test]
    fn test_parse_uid() {
        let parsed = IdentityRef::parse("tic").unwrap();
        assert_eq!(parsed, IdentityRef::Uid(Uid::new("tic").unwrap()));
        assert_eq!(parsed.as_str(), "tic");
    }

    #[test]
    fn test_parse_garbage() {
        let err = IdentityRef::parse("no spaces allowed").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidUid { .. }));
    }
}
