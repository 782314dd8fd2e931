//! Lifecycle evaluation.
//!
//! A pure function of (store, reference point, parameters). It never mutates
//! the store; the applier and the sweeper write back what it decides.
//!
//! ## Rules
//!
//! - A certification counts iff it is not expired AND its issuer holds a
//!   valid membership at the reference time. The issuer's own certifications
//!   are not looked at (one hop).
//! - Only the most recent certification per issuer exists in the store, so
//!   every issuer counts at most once.
//! - A never-member is prunable once its pending window has closed. From
//!   that time on, events treat it as absent even before a sweep removes it.
//! - An expired member is prunable only if it was already flagged expired by
//!   an earlier block and still lacks `sig_qty` valid certifications.
//! - Every boundary is strict: at `expires_on` a record is expired.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use wot_identity::{IdentityState, PublicKey, Validity};

use crate::config::WotParams;
use crate::store::{CertificationRecord, IdentityRecord, TrustGraph};
use crate::time::ReferencePoint;
use crate::{ChainError, Result};

/// Status of one received certification at a reference time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationStatus {
    /// Issuer.
    pub from: PublicKey,
    /// Block time of inclusion.
    pub issued_on: u64,
    /// First block time at which it no longer counts.
    pub expires_on: u64,
    /// The certification itself has expired.
    pub expired: bool,
    /// The issuer holds a valid membership.
    pub issuer_is_member: bool,
    /// Counts toward the quorum.
    pub counts: bool,
}

impl CertificationStatus {
    /// Seconds until the certification expires, 0 if expired.
    pub fn expires_in(&self, reference_time: u64) -> u64 {
        self.expires_on.saturating_sub(reference_time)
    }
}

/// Result of evaluating one identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// Lifecycle state at the reference time.
    pub state: IdentityState,
    /// Holds a valid membership.
    pub member: bool,
    /// Has held a membership at some point.
    pub was_member: bool,
    /// Membership has lapsed.
    pub expired: bool,
    /// Latest membership window.
    pub membership: Option<Validity>,
    /// Pending identity window.
    pub pending_window: Validity,
    /// Received certifications, ordered by issuer.
    pub certifications: Vec<CertificationStatus>,
    /// Certifications that count toward the quorum.
    pub valid_certifications: u32,
    /// The identity must be removed by the sweep at this reference point.
    pub prunable: bool,
}

/// Evaluates identities against the network parameters.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleEvaluator<'a> {
    params: &'a WotParams,
}

impl<'a> LifecycleEvaluator<'a> {
    /// Create an evaluator.
    pub fn new(params: &'a WotParams) -> Self {
        Self { params }
    }

    /// Check if the record's membership window is open at `time`.
    pub fn is_member_at(&self, record: &IdentityRecord, time: u64) -> bool {
        record
            .membership
            .map(|ms| ms.is_valid_at(time))
            .unwrap_or(false)
    }

    /// Check if the record has ever held a membership.
    pub fn was_member(&self, record: &IdentityRecord) -> bool {
        record.was_member || record.membership.is_some()
    }

    /// Check if `record` never joined and its pending window has closed at
    /// `time`.
    pub fn is_lapsed_pending(&self, record: &IdentityRecord, time: u64) -> bool {
        !self.was_member(record)
            && record
                .pending_window(self.params.idty_window)
                .is_expired_at(time)
    }

    /// Look up an identity that block events may still refer to at `time`.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::UnknownIdentity` if the key is absent, or if it
    /// belongs to a never-member whose pending window has closed.
    pub fn live_identity<'g>(
        &self,
        graph: &'g TrustGraph,
        pubkey: &PublicKey,
        time: u64,
    ) -> Result<&'g IdentityRecord> {
        match graph.get(pubkey) {
            Some(record) if !self.is_lapsed_pending(record, time) => Ok(record),
            _ => Err(ChainError::UnknownIdentity(pubkey.to_string())),
        }
    }

    /// Status of a single certification at `time`.
    pub fn certification_status(
        &self,
        graph: &TrustGraph,
        cert: &CertificationRecord,
        time: u64,
    ) -> CertificationStatus {
        self.certification_status_with(graph, cert, time, &BTreeSet::new())
    }

    /// Statuses of every certification received by `record`.
    pub fn certifications(
        &self,
        graph: &TrustGraph,
        record: &IdentityRecord,
        time: u64,
    ) -> Vec<CertificationStatus> {
        record
            .certifications_received()
            .map(|cert| self.certification_status(graph, &cert, time))
            .collect()
    }

    /// Number of certifications counting toward the quorum at `time`.
    pub fn valid_certifications(
        &self,
        graph: &TrustGraph,
        record: &IdentityRecord,
        time: u64,
    ) -> u32 {
        self.valid_certifications_with(graph, record, time, &BTreeSet::new())
    }

    /// Like [`Self::valid_certifications`], also counting issuers listed in
    /// `co_joiners` as members.
    ///
    /// Used for the genesis block, where the first members certify each
    /// other and join together.
    pub fn valid_certifications_with(
        &self,
        graph: &TrustGraph,
        record: &IdentityRecord,
        time: u64,
        co_joiners: &BTreeSet<PublicKey>,
    ) -> u32 {
        let count = record
            .certifications_received()
            .filter(|cert| {
                self.certification_status_with(graph, cert, time, co_joiners)
                    .counts
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Evaluate an identity at a reference point.
    ///
    /// Returns `None` if the identity is not in the store.
    pub fn evaluate(
        &self,
        graph: &TrustGraph,
        pubkey: &PublicKey,
        at: ReferencePoint,
    ) -> Option<Evaluation> {
        graph.get(pubkey).map(|record| self.evaluate_record(graph, record, at))
    }

    /// Evaluate a record at a reference point.
    pub fn evaluate_record(
        &self,
        graph: &TrustGraph,
        record: &IdentityRecord,
        at: ReferencePoint,
    ) -> Evaluation {
        let member = self.is_member_at(record, at.time);
        let was_member = self.was_member(record);
        let expired = was_member && !member;
        let pending_window = record.pending_window(self.params.idty_window);

        let certifications = self.certifications(graph, record, at.time);
        let valid_certifications = certifications.iter().filter(|c| c.counts).count();
        let valid_certifications = u32::try_from(valid_certifications).unwrap_or(u32::MAX);

        let prunable = if was_member {
            // Flagged by an earlier block's sweep, never by this one.
            let flagged_earlier = record
                .expired_since
                .map(|since| since < at.height)
                .unwrap_or(false);
            expired && flagged_earlier && valid_certifications < self.params.sig_qty
        } else {
            self.is_lapsed_pending(record, at.time)
        };

        let state = if member {
            IdentityState::Member
        } else if was_member {
            IdentityState::ExpiredMember
        } else {
            IdentityState::Pending
        };

        Evaluation {
            state,
            member,
            was_member,
            expired,
            membership: record.membership,
            pending_window,
            certifications,
            valid_certifications,
            prunable,
        }
    }

    fn certification_status_with(
        &self,
        graph: &TrustGraph,
        cert: &CertificationRecord,
        time: u64,
        co_joiners: &BTreeSet<PublicKey>,
    ) -> CertificationStatus {
        let validity = cert.validity(self.params.cert_validity_period);
        let expired = validity.is_expired_at(time);
        let issuer_is_member = co_joiners.contains(&cert.from)
            || graph
                .get(&cert.from)
                .map(|issuer| self.is_member_at(issuer, time))
                .unwrap_or(false);

        CertificationStatus {
            from: cert.from.clone(),
            issued_on: cert.issued_on,
            expires_on: validity.expires_on,
            expired,
            issuer_is_member,
            counts: !expired && issuer_is_member,
        }
    }
}
