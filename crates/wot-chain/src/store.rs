//! Trust graph store.
//!
//! Holds every identity, certification and membership with their temporal
//! attributes. The store is owned by the chain state and mutated only by the
//! block applier; everything else reads it through shared references.
//!
//! ## Graph Layout
//!
//! Certifications are directed edges kept as adjacency on both endpoints:
//! - the receiver owns `issuer -> issued_on` (only the most recent
//!   certification per issuer is kept, it is the only one that counts)
//! - the issuer owns the set of keys it has certified
//!
//! Nodes never hold references to each other. The status of an issuer is
//! always resolved by a fresh lookup, so pruning a node cannot leave a
//! dangling edge behind: [`TrustGraph::remove`] clears both sides.
//!
//! ## Ordering
//!
//! All maps are ordered by key, so iteration order (and therefore every
//! sweep and the state digest) is identical on every node.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;
use wot_identity::{IdentityRef, IdentityState, PublicKey, Uid, Validity};

use crate::config::IdentityReusePolicy;
use crate::{ChainError, Result};

/// Domain separation tag for state digests.
const STATE_DIGEST_DOMAIN: &[u8] = b"wot-state-v1";

// ============================================================================
// Records
// ============================================================================

/// A certification edge as stored.
///
/// The expiry is derived from the network's certification validity, it is
/// never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRecord {
    /// Issuer.
    pub from: PublicKey,
    /// Receiver.
    pub to: PublicKey,
    /// Block time of inclusion.
    pub issued_on: u64,
}

impl CertificationRecord {
    /// Validity window of this certification.
    pub fn validity(&self, cert_validity_period: u64) -> Validity {
        Validity::new(self.issued_on, cert_validity_period)
    }
}

/// An identity and its adjacency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Key of the identity.
    pub pubkey: PublicKey,
    /// Uid of the identity.
    pub uid: Uid,
    /// Block time of the self-certification.
    pub created_on: u64,
    /// Block height of the self-certification.
    pub created_at_height: u64,
    /// Latest membership window, if the identity ever joined.
    pub membership: Option<Validity>,
    /// Holds a valid membership as of the last evaluation.
    pub member: bool,
    /// Has held a membership at some point.
    pub was_member: bool,
    /// Membership expired as of the last evaluation.
    pub expired: bool,
    /// Height of the block whose sweep first saw the membership expired.
    pub expired_since: Option<u64>,
    /// Issuer -> block time of the most recent certification received.
    certs_received: BTreeMap<PublicKey, u64>,
    /// Keys this identity has certified.
    certs_issued: BTreeSet<PublicKey>,
}

impl IdentityRecord {
    fn new(pubkey: PublicKey, uid: Uid, created_on: u64, created_at_height: u64) -> Self {
        Self {
            pubkey,
            uid,
            created_on,
            created_at_height,
            membership: None,
            member: false,
            was_member: false,
            expired: false,
            expired_since: None,
            certs_received: BTreeMap::new(),
            certs_issued: BTreeSet::new(),
        }
    }

    /// Lifecycle state as of the last evaluation.
    pub fn state(&self) -> IdentityState {
        if self.member {
            IdentityState::Member
        } else if self.was_member {
            IdentityState::ExpiredMember
        } else {
            IdentityState::Pending
        }
    }

    /// Pending identity window of this identity.
    pub fn pending_window(&self, idty_window: u64) -> Validity {
        Validity::new(self.created_on, idty_window)
    }

    /// Certifications received, one per issuer, ordered by issuer key.
    pub fn certifications_received(&self) -> impl Iterator<Item = CertificationRecord> + '_ {
        self.certs_received
            .iter()
            .map(|(from, issued_on)| CertificationRecord {
                from: from.clone(),
                to: self.pubkey.clone(),
                issued_on: *issued_on,
            })
    }

    /// The most recent certification from `issuer`, if any.
    pub fn certification_from(&self, issuer: &PublicKey) -> Option<CertificationRecord> {
        self.certs_received
            .get(issuer)
            .map(|issued_on| CertificationRecord {
                from: issuer.clone(),
                to: self.pubkey.clone(),
                issued_on: *issued_on,
            })
    }

    /// Keys that have certified this identity.
    pub fn certifiers(&self) -> impl Iterator<Item = &PublicKey> {
        self.certs_received.keys()
    }

    /// Keys this identity has certified.
    pub fn certified(&self) -> impl Iterator<Item = &PublicKey> {
        self.certs_issued.iter()
    }
}

// ============================================================================
// Trust Graph
// ============================================================================

/// The trust graph: identities indexed by key and uid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustGraph {
    /// Identities by key.
    identities: BTreeMap<PublicKey, IdentityRecord>,

    /// Uid -> key of the identity currently holding it.
    uid_index: BTreeMap<Uid, PublicKey>,

    /// Keys of pruned identities, kept only under the forbid policy.
    ///
    /// Never consulted by lookups: a pruned identity is not found.
    retired_pubkeys: BTreeSet<PublicKey>,

    /// Uids of pruned identities, kept only under the forbid policy.
    retired_uids: BTreeSet<Uid>,

    /// Reuse policy for pruned keys and uids.
    reuse_policy: IdentityReusePolicy,
}

impl TrustGraph {
    /// Create an empty graph.
    pub fn new(reuse_policy: IdentityReusePolicy) -> Self {
        Self {
            reuse_policy,
            ..Self::default()
        }
    }

    /// The reuse policy in force.
    pub fn reuse_policy(&self) -> IdentityReusePolicy {
        self.reuse_policy
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Record a self-certified identity.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::DuplicateIdentity` if the key or uid is held by a
    /// live identity, or was retired by pruning under the forbid policy.
    pub fn record_identity(
        &mut self,
        pubkey: PublicKey,
        uid: Uid,
        issued_on: u64,
        height: u64,
    ) -> Result<()> {
        if self.identities.contains_key(&pubkey) {
            return Err(ChainError::DuplicateIdentity(format!(
                "pubkey {} is already registered",
                pubkey
            )));
        }
        if let Some(holder) = self.uid_index.get(&uid) {
            return Err(ChainError::DuplicateIdentity(format!(
                "uid {} is already held by {}",
                uid, holder
            )));
        }
        if !self.reuse_policy.allows_reuse() {
            if self.retired_pubkeys.contains(&pubkey) {
                return Err(ChainError::DuplicateIdentity(format!(
                    "pubkey {} was pruned and cannot be reused",
                    pubkey
                )));
            }
            if self.retired_uids.contains(&uid) {
                return Err(ChainError::DuplicateIdentity(format!(
                    "uid {} was pruned and cannot be reused",
                    uid
                )));
            }
        }

        trace!(pubkey = %pubkey, uid = %uid, issued_on, "Recording identity");
        self.uid_index.insert(uid.clone(), pubkey.clone());
        self.identities
            .insert(pubkey.clone(), IdentityRecord::new(pubkey, uid, issued_on, height));
        Ok(())
    }

    /// Record a certification from `from` to `to`.
    ///
    /// A newer certification between the same pair replaces the older one.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::SelfCertification` if `from == to` and
    /// `ChainError::UnknownIdentity` if either endpoint is absent.
    pub fn record_certification(
        &mut self,
        from: &PublicKey,
        to: &PublicKey,
        issued_on: u64,
    ) -> Result<()> {
        if from == to {
            return Err(ChainError::SelfCertification(from.to_string()));
        }
        if !self.identities.contains_key(from) {
            return Err(ChainError::UnknownIdentity(format!("issuer {}", from)));
        }

        let receiver = self
            .identities
            .get_mut(to)
            .ok_or_else(|| ChainError::UnknownIdentity(format!("receiver {}", to)))?;
        let entry = receiver.certs_received.entry(from.clone()).or_insert(issued_on);
        *entry = (*entry).max(issued_on);

        if let Some(issuer) = self.identities.get_mut(from) {
            issuer.certs_issued.insert(to.clone());
        }

        trace!(from = %from, to = %to, issued_on, "Recording certification");
        Ok(())
    }

    /// Record a membership window, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::UnknownIdentity` if the identity is absent.
    pub fn record_membership(&mut self, pubkey: &PublicKey, validity: Validity) -> Result<()> {
        let record = self
            .identities
            .get_mut(pubkey)
            .ok_or_else(|| ChainError::UnknownIdentity(pubkey.to_string()))?;
        record.membership = Some(validity);
        trace!(pubkey = %pubkey, expires_on = validity.expires_on, "Recording membership");
        Ok(())
    }

    /// Remove an identity with every certification it issued or received.
    ///
    /// The uid is released. Under the forbid policy the key and uid are
    /// retired and can never be registered again.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::UnknownIdentity` if the identity is absent.
    pub fn remove(&mut self, pubkey: &PublicKey) -> Result<IdentityRecord> {
        let record = self
            .identities
            .remove(pubkey)
            .ok_or_else(|| ChainError::UnknownIdentity(pubkey.to_string()))?;

        self.uid_index.remove(&record.uid);

        for issuer in record.certs_received.keys() {
            if let Some(node) = self.identities.get_mut(issuer) {
                node.certs_issued.remove(pubkey);
            }
        }
        for receiver in &record.certs_issued {
            if let Some(node) = self.identities.get_mut(receiver) {
                node.certs_received.remove(pubkey);
            }
        }

        if !self.reuse_policy.allows_reuse() {
            self.retired_pubkeys.insert(record.pubkey.clone());
            self.retired_uids.insert(record.uid.clone());
        }

        Ok(record)
    }

    /// Mutable access for status refreshes by the applier.
    pub(crate) fn record_mut(&mut self, pubkey: &PublicKey) -> Option<&mut IdentityRecord> {
        self.identities.get_mut(pubkey)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Get an identity by key.
    pub fn get(&self, pubkey: &PublicKey) -> Option<&IdentityRecord> {
        self.identities.get(pubkey)
    }

    /// Get an identity by uid.
    pub fn get_by_uid(&self, uid: &Uid) -> Option<&IdentityRecord> {
        self.uid_index.get(uid).and_then(|key| self.identities.get(key))
    }

    /// Resolve an identity reference.
    ///
    /// Key-shaped references fall back to the uid index when no identity has
    /// that key, since a uid may look like a key.
    pub fn find(&self, id: &IdentityRef) -> Option<&IdentityRecord> {
        match id {
            IdentityRef::Pubkey(key) => self.get(key).or_else(|| {
                Uid::new(key.as_str())
                    .ok()
                    .and_then(|uid| self.get_by_uid(&uid))
            }),
            IdentityRef::Uid(uid) => self.get_by_uid(uid),
        }
    }

    /// Check if an identity with this key exists.
    pub fn contains(&self, pubkey: &PublicKey) -> bool {
        self.identities.contains_key(pubkey)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Check if the graph holds no identities.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Iterate identities in key order.
    pub fn iter(&self) -> impl Iterator<Item = &IdentityRecord> {
        self.identities.values()
    }

    /// All keys in order.
    pub fn pubkeys(&self) -> Vec<PublicKey> {
        self.identities.keys().cloned().collect()
    }

    /// Number of current members as of the last evaluation.
    pub fn member_count(&self) -> usize {
        self.identities.values().filter(|r| r.member).count()
    }

    /// Check if a key was retired by pruning.
    ///
    /// Always false under the allow policy.
    pub fn is_retired(&self, pubkey: &PublicKey) -> bool {
        self.retired_pubkeys.contains(pubkey)
    }

    // ========================================================================
    // Digest
    // ========================================================================

    /// BLAKE3 digest of the complete store contents.
    ///
    /// Two nodes that applied the same blocks have equal digests.
    pub fn state_digest(&self) -> [u8; 32] {
        fn put_str(hasher: &mut blake3::Hasher, s: &str) {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        fn put_u64(hasher: &mut blake3::Hasher, v: u64) {
            hasher.update(&v.to_le_bytes());
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(STATE_DIGEST_DOMAIN);
        hasher.update(&[self.reuse_policy.allows_reuse() as u8]);

        put_u64(&mut hasher, self.identities.len() as u64);
        for record in self.identities.values() {
            put_str(&mut hasher, record.pubkey.as_str());
            put_str(&mut hasher, record.uid.as_str());
            put_u64(&mut hasher, record.created_on);
            put_u64(&mut hasher, record.created_at_height);
            match record.membership {
                Some(ms) => {
                    hasher.update(&[1]);
                    put_u64(&mut hasher, ms.issued_on);
                    put_u64(&mut hasher, ms.expires_on);
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            hasher.update(&[
                record.member as u8,
                record.was_member as u8,
                record.expired as u8,
            ]);
            match record.expired_since {
                Some(height) => {
                    hasher.update(&[1]);
                    put_u64(&mut hasher, height);
                }
                None => {
                    hasher.update(&[0]);
                }
            }
            put_u64(&mut hasher, record.certs_received.len() as u64);
            for (issuer, issued_on) in &record.certs_received {
                put_str(&mut hasher, issuer.as_str());
                put_u64(&mut hasher, *issued_on);
            }
            put_u64(&mut hasher, record.certs_issued.len() as u64);
            for receiver in &record.certs_issued {
                put_str(&mut hasher, receiver.as_str());
            }
        }

        put_u64(&mut hasher, self.retired_pubkeys.len() as u64);
        for key in &self.retired_pubkeys {
            put_str(&mut hasher, key.as_str());
        }
        put_u64(&mut hasher, self.retired_uids.len() as u64);
        for uid in &self.retired_uids {
            put_str(&mut hasher, uid.as_str());
        }

        *hasher.finalize().as_bytes()
    }
}
