//! Identity lifecycle management.
//!
//! Provides the identity state machine and the validity windows used for
//! memberships, certifications and the pending identity window.
//!
//! ## State Machine
//!
//! ```text
//! Pending ──► Member ──► ExpiredMember ──► Pruned
//!    │          ▲  │           │
//!    │          │  └ renew ─┐  │
//!    │          └── rejoin ─┴──┘
//!    └──────────────────────────────────► Pruned
//! ```
//!
//! `Pruned` is terminal. An identity never goes from `Member` straight to
//! `Pruned`: an expired member is reported as expired for at least one block
//! before it can be removed.
//!
//! ## Time
//!
//! All times are block times in seconds. Every window is half-open: a record
//! issued at `t` with period `p` is valid for `t <= now < t + p`, so a record
//! is already expired at exactly `t + p`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IdentityError, Result};

/// Lifecycle state of an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityState {
    /// Self-certified, never held a membership.
    Pending,
    /// Holds a membership valid at the reference time.
    Member,
    /// Held a membership that has since expired.
    ExpiredMember,
    /// Removed from state. Terminal.
    Pruned,
}

impl IdentityState {
    /// Check if the identity still exists in state.
    pub fn is_live(&self) -> bool {
        !matches!(self, IdentityState::Pruned)
    }

    /// Check if the identity has reached the terminal state.
    pub fn is_terminated(&self) -> bool {
        matches!(self, IdentityState::Pruned)
    }

    /// Check if the identity holds a valid membership.
    pub fn is_member(&self) -> bool {
        matches!(self, IdentityState::Member)
    }

    /// Check if the identity has ever held a membership.
    pub fn was_member(&self) -> bool {
        matches!(self, IdentityState::Member | IdentityState::ExpiredMember)
    }

    /// Get a string representation for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityState::Pending => "Pending",
            IdentityState::Member => "Member",
            IdentityState::ExpiredMember => "ExpiredMember",
            IdentityState::Pruned => "Pruned",
        }
    }

    /// Check whether moving to `next` is allowed.
    ///
    /// Staying in the same state is allowed for every live state (a pending
    /// identity waiting, a member renewing, an expired member waiting for
    /// its prune block).
    pub fn can_transition_to(&self, next: IdentityState) -> bool {
        use IdentityState::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Member)
                | (Pending, Pruned)
                | (Member, Member)
                | (Member, ExpiredMember)
                | (ExpiredMember, ExpiredMember)
                | (ExpiredMember, Member)
                | (ExpiredMember, Pruned)
        )
    }

    /// Move to `next`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidStateTransition` if the move is not
    /// an edge of the state machine.
    pub fn transition(self, next: IdentityState) -> Result<IdentityState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(IdentityError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A half-open validity window `[issued_on, expires_on)`.
///
/// Used for memberships, certifications and the pending identity window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Validity {
    /// Block time at which the record was written.
    pub issued_on: u64,
    /// First block time at which the record no longer counts.
    pub expires_on: u64,
}

impl Validity {
    /// Create a window starting at `issued_on` and lasting `period` seconds.
    pub fn new(issued_on: u64, period: u64) -> Self {
        Self {
            issued_on,
            expires_on: issued_on.saturating_add(period),
        }
    }

    /// Check if the window is open at `reference_time`.
    pub fn is_valid_at(&self, reference_time: u64) -> bool {
        reference_time < self.expires_on
    }

    /// Check if the window has closed at `reference_time`.
    pub fn is_expired_at(&self, reference_time: u64) -> bool {
        !self.is_valid_at(reference_time)
    }

    /// Get seconds until expiry.
    ///
    /// Returns 0 if already expired.
    pub fn seconds_until_expiry(&self, reference_time: u64) -> u64 {
        self.expires_on.saturating_sub(reference_time)
    }
}
