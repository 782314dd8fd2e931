//! Requirements queries.
//!
//! Answers "is this identity a member, and what does it still need" against
//! one committed state. Never-seen and pruned identities are both
//! [`RequirementsResult::NotFound`]; they cannot be told apart.

use serde::{Deserialize, Serialize};
use wot_chain::{ChainState, LifecycleEvaluator, WotParams};
use wot_identity::{IdentityRef, IdentityState, PublicKey, Uid};

/// A received certification as reported to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRequirement {
    /// Issuer.
    pub from: PublicKey,
    /// Block time of inclusion.
    pub issued_on: u64,
    /// Block time at which it stops counting.
    pub expires_on: u64,
    /// Seconds left, 0 if expired.
    pub expires_in: u64,
    /// The issuer holds a valid membership.
    pub issuer_is_member: bool,
    /// Counts toward the quorum.
    pub counts: bool,
}

/// Requirements snapshot of one identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRequirements {
    /// Public key.
    pub pubkey: PublicKey,
    /// Uid.
    pub uid: Uid,
    /// Lifecycle state.
    pub state: IdentityState,
    /// Holds a valid membership.
    pub member: bool,
    /// Membership has lapsed.
    pub expired: bool,
    /// Has held a membership.
    pub was_member: bool,
    /// Block time of the self-certification.
    pub created_on: u64,
    /// Received certifications, ordered by issuer.
    pub certifications: Vec<CertificationRequirement>,
    /// Certifications counting toward the quorum.
    pub valid_certifications: u32,
    /// Certifications still needed to reach the quorum.
    pub missing_certifications: u32,
    /// Seconds until the membership lapses, if the identity ever joined.
    pub membership_expires_in: Option<u64>,
    /// Seconds left in the pending window, for never-members.
    pub pending_expires_in: Option<u64>,
    /// Block time the snapshot was computed at.
    pub reference_time: u64,
    /// Block height the snapshot was computed at.
    pub head_height: u64,
}

/// Outcome of a requirements query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum RequirementsResult {
    /// The identity exists.
    Found(IdentityRequirements),
    /// The identity never existed or was pruned.
    NotFound,
}

impl RequirementsResult {
    /// Check if the identity was found.
    pub fn is_found(&self) -> bool {
        matches!(self, RequirementsResult::Found(_))
    }

    /// The snapshot, if found.
    pub fn found(&self) -> Option<&IdentityRequirements> {
        match self {
            RequirementsResult::Found(req) => Some(req),
            RequirementsResult::NotFound => None,
        }
    }

    /// Convert into an option.
    pub fn into_option(self) -> Option<IdentityRequirements> {
        match self {
            RequirementsResult::Found(req) => Some(req),
            RequirementsResult::NotFound => None,
        }
    }
}

/// Computes requirements from a committed state.
#[derive(Debug, Clone, Copy)]
pub struct RequirementsService<'a> {
    params: &'a WotParams,
}

impl<'a> RequirementsService<'a> {
    /// Create a service for the given parameters.
    pub fn new(params: &'a WotParams) -> Self {
        Self { params }
    }

    /// Requirements of `id` as of the head of `state`.
    ///
    /// Before genesis nothing is found.
    pub fn query(&self, state: &ChainState, id: &IdentityRef) -> RequirementsResult {
        let at = match state.reference_point() {
            Some(at) => at,
            None => return RequirementsResult::NotFound,
        };
        let graph = state.graph();
        let record = match graph.find(id) {
            Some(record) => record,
            None => return RequirementsResult::NotFound,
        };

        let eval = LifecycleEvaluator::new(self.params).evaluate_record(graph, record, at);

        let certifications = eval
            .certifications
            .iter()
            .map(|c| CertificationRequirement {
                from: c.from.clone(),
                issued_on: c.issued_on,
                expires_on: c.expires_on,
                expires_in: c.expires_in(at.time),
                issuer_is_member: c.issuer_is_member,
                counts: c.counts,
            })
            .collect();

        let pending_expires_in = if eval.was_member {
            None
        } else {
            Some(eval.pending_window.seconds_until_expiry(at.time))
        };

        RequirementsResult::Found(IdentityRequirements {
            pubkey: record.pubkey.clone(),
            uid: record.uid.clone(),
            state: eval.state,
            member: eval.member,
            expired: eval.expired,
            was_member: eval.was_member,
            created_on: record.created_on,
            certifications,
            valid_certifications: eval.valid_certifications,
            missing_certifications: self.params.sig_qty.saturating_sub(eval.valid_certifications),
            membership_expires_in: eval.membership.map(|ms| ms.seconds_until_expiry(at.time)),
            pending_expires_in,
            reference_time: at.time,
            head_height: at.height,
        })
    }
}
