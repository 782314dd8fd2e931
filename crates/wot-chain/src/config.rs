//! Network parameters for the Web of Trust.
//!
//! This module provides [`WotParams`], the windows and quorum fixed at
//! genesis for a currency network. Every node of a network must run with the
//! same parameters or it will compute different expiry decisions.
//!
//! ## Default Configuration
//!
//! The defaults follow the reference currency network:
//! - Identity window: 7 days
//! - Membership validity: 1 year
//! - Certification validity: 2 years
//! - 5 certifications required for membership
//! - Fork window of 100 blocks
//!
//! ## Example
//!
//! ```
//! use wot_chain::config::{IdentityReusePolicy, WotParams};
//!
//! // A fast test network
//! let params = WotParams {
//!     idty_window: 1,
//!     ms_validity: 10_000,
//!     sig_qty: 1,
//!     ..WotParams::default()
//! };
//! assert!(params.validate().is_ok());
//! assert_eq!(params.reuse_policy, IdentityReusePolicy::Forbid);
//! ```

use serde::{Deserialize, Serialize};

use crate::{ChainError, Result};

/// Default seconds a self-certified identity may wait for membership (7 days).
pub const DEFAULT_IDTY_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Default seconds a membership remains valid (365.25 days).
pub const DEFAULT_MS_VALIDITY_SECS: u64 = 31_557_600;

/// Default seconds a certification remains valid (2 x 365.25 days).
pub const DEFAULT_CERT_VALIDITY_SECS: u64 = 63_115_200;

/// Default number of valid certifications required for membership.
pub const DEFAULT_SIG_QTY: u32 = 5;

/// Default fork window, in blocks.
pub const DEFAULT_FORKSIZE: u64 = 100;

/// Upper bound on `sig_qty`; larger values can never be satisfied in practice.
pub const MAX_SIG_QTY: u32 = 1_000;

/// Whether a pruned public key or uid may be claimed again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityReusePolicy {
    /// Pruned keys and uids stay retired forever.
    #[default]
    Forbid,
    /// Pruned keys and uids become available again.
    Allow,
}

impl IdentityReusePolicy {
    /// Check if re-creation after pruning is permitted.
    pub fn allows_reuse(&self) -> bool {
        matches!(self, IdentityReusePolicy::Allow)
    }
}

impl std::fmt::Display for IdentityReusePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityReusePolicy::Forbid => write!(f, "forbid"),
            IdentityReusePolicy::Allow => write!(f, "allow"),
        }
    }
}

/// Web of Trust parameters, fixed per network at genesis.
///
/// Field names deserialize from the camelCase keys used in network
/// configuration files (`idtyWindow`, `msValidity`, `sigValidity`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WotParams {
    /// Seconds an identity may stay pending before it is pruned.
    pub idty_window: u64,

    /// Seconds a membership remains valid after it is written.
    pub ms_validity: u64,

    /// Seconds a certification remains valid after it is written.
    #[serde(alias = "sigValidity")]
    pub cert_validity_period: u64,

    /// Valid certifications from current members required to hold membership.
    pub sig_qty: u32,

    /// Fork window in blocks.
    ///
    /// Consumed by fork choice, which lives outside this crate. It is carried
    /// and validated here so the whole parameter set travels together.
    pub forksize: u64,

    /// Reuse policy for pruned keys and uids.
    pub reuse_policy: IdentityReusePolicy,
}

impl Default for WotParams {
    fn default() -> Self {
        Self {
            idty_window: DEFAULT_IDTY_WINDOW_SECS,
            ms_validity: DEFAULT_MS_VALIDITY_SECS,
            cert_validity_period: DEFAULT_CERT_VALIDITY_SECS,
            sig_qty: DEFAULT_SIG_QTY,
            forksize: DEFAULT_FORKSIZE,
            reuse_policy: IdentityReusePolicy::default(),
        }
    }
}

impl WotParams {
    /// Create parameters with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identity window.
    pub fn with_idty_window(mut self, secs: u64) -> Self {
        self.idty_window = secs;
        self
    }

    /// Set the membership validity.
    pub fn with_ms_validity(mut self, secs: u64) -> Self {
        self.ms_validity = secs;
        self
    }

    /// Set the certification validity.
    pub fn with_cert_validity_period(mut self, secs: u64) -> Self {
        self.cert_validity_period = secs;
        self
    }

    /// Set the certification quorum.
    pub fn with_sig_qty(mut self, sig_qty: u32) -> Self {
        self.sig_qty = sig_qty;
        self
    }

    /// Set the fork window.
    pub fn with_forksize(mut self, forksize: u64) -> Self {
        self.forksize = forksize;
        self
    }

    /// Set the reuse policy.
    pub fn with_reuse_policy(mut self, policy: IdentityReusePolicy) -> Self {
        self.reuse_policy = policy;
        self
    }

    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidParameter` for a zero-length window, a
    /// zero fork window, or a quorum above [`MAX_SIG_QTY`].
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("idtyWindow", self.idty_window),
            ("msValidity", self.ms_validity),
            ("certValidityPeriod", self.cert_validity_period),
        ];
        for (field, value) in windows {
            if value == 0 {
                return Err(ChainError::InvalidParameter {
                    field: field.to_string(),
                    reason: "window must be greater than zero".to_string(),
                });
            }
        }

        if self.sig_qty > MAX_SIG_QTY {
            return Err(ChainError::InvalidParameter {
                field: "sigQty".to_string(),
                reason: format!("must be at most {}, got {}", MAX_SIG_QTY, self.sig_qty),
            });
        }

        if self.forksize == 0 {
            return Err(ChainError::InvalidParameter {
                field: "forksize".to_string(),
                reason: "fork window must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
