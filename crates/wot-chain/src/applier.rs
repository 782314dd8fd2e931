//! Block application.
//!
//! [`BlockApplier`] is the only code path that mutates a trust graph. A block
//! is applied to a staged copy of the current [`ChainState`]; the caller gets
//! the new state back only if every event succeeded, so a rejected block
//! leaves nothing behind.
//!
//! ## Order
//!
//! 1. Header validation against the current head
//! 2. `CreateIdentity` events, in block order
//! 3. `Certify` events, in block order
//! 4. `Join` / `Renew` events
//! 5. Flag refresh of every touched identity, its certifiers and the
//!    identities it certifies
//! 6. Full sweep at the block's declared time
//! 7. Head advance
//!
//! Membership events are checked against the graph as it stands after the
//! certification phase, so their order inside a block does not matter.
//!
//! A never-member whose pending window has closed at the block's time is
//! treated as absent by certification and membership events, whether or not
//! an earlier sweep has removed it yet.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;
use wot_identity::{PublicKey, Validity};

use crate::block::{Block, BlockHash, EventPhase, LifecycleEvent};
use crate::config::WotParams;
use crate::evaluator::LifecycleEvaluator;
use crate::pruner::ExpirySweeper;
use crate::store::{CertificationRecord, TrustGraph};
use crate::time::{ChainHead, ReferencePoint, TimeBase};
use crate::{ChainError, Result};

// ============================================================================
// Chain State
// ============================================================================

/// Everything consensus derives from the committed blocks.
///
/// Immutable once published: a new block produces a new state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    time_base: TimeBase,
    graph: TrustGraph,
}

impl ChainState {
    /// State before genesis.
    pub fn new(params: &WotParams) -> Self {
        Self {
            time_base: TimeBase::new(),
            graph: TrustGraph::new(params.reuse_policy),
        }
    }

    /// The trust graph.
    pub fn graph(&self) -> &TrustGraph {
        &self.graph
    }

    /// The time base.
    pub fn time_base(&self) -> &TimeBase {
        &self.time_base
    }

    /// The last applied block, if any.
    pub fn head(&self) -> Option<&ChainHead> {
        self.time_base.head()
    }

    /// Reference point of the last applied block.
    pub fn reference_point(&self) -> Option<ReferencePoint> {
        self.time_base.current()
    }

    /// Digest of the trust graph.
    pub fn state_digest(&self) -> [u8; 32] {
        self.graph.state_digest()
    }
}

// ============================================================================
// Apply Report
// ============================================================================

/// What a block changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Block height.
    pub height: u64,
    /// Block time.
    pub time: u64,
    /// Block hash.
    pub hash: BlockHash,
    /// Identities created.
    pub created: Vec<PublicKey>,
    /// Certifications recorded.
    pub certified: Vec<CertificationRecord>,
    /// Identities that joined.
    pub joined: Vec<PublicKey>,
    /// Identities that renewed.
    pub renewed: Vec<PublicKey>,
    /// Identities newly flagged expired.
    pub expired: Vec<PublicKey>,
    /// Identities removed.
    pub pruned: Vec<PublicKey>,
}

impl ApplyReport {
    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.created.len() + self.certified.len() + self.joined.len() + self.renewed.len()
    }
}

// ============================================================================
// Block Applier
// ============================================================================

/// Applies blocks to chain states.
#[derive(Debug, Clone)]
pub struct BlockApplier {
    params: WotParams,
}

impl BlockApplier {
    /// Create an applier.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidParameter` if the parameters are invalid.
    pub fn new(params: WotParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Network parameters.
    pub fn params(&self) -> &WotParams {
        &self.params
    }

    /// Empty state for this network.
    pub fn initial_state(&self) -> ChainState {
        ChainState::new(&self.params)
    }

    /// Apply `block` on top of `state`.
    ///
    /// Returns the new state and a report. `state` is never modified.
    ///
    /// # Errors
    ///
    /// Any header or event violation rejects the whole block.
    pub fn apply(&self, state: &ChainState, block: &Block) -> Result<(ChainState, ApplyReport)> {
        let at = state.time_base.validate_candidate(block)?;
        let mut staged = state.clone();
        let mut report = ApplyReport {
            height: at.height,
            time: at.time,
            hash: block.hash(),
            ..ApplyReport::default()
        };
        let mut touched = BTreeSet::new();

        self.apply_identities(&mut staged.graph, block, at, &mut report, &mut touched)?;
        self.apply_certifications(&mut staged.graph, block, at, &mut report, &mut touched)?;
        self.apply_memberships(&mut staged.graph, block, at, &mut report, &mut touched)?;

        let refresh = refresh_set(&staged.graph, touched);
        let sweeper = ExpirySweeper::new(&self.params);
        report
            .expired
            .extend(sweeper.refresh(&mut staged.graph, &refresh, at)?);

        let stats = sweeper.sweep(&mut staged.graph, at)?;
        report.expired.extend(stats.expired);
        report.pruned = stats.pruned;

        staged.time_base.advance(block);

        debug!(
            height = report.height,
            time = report.time,
            created = report.created.len(),
            certified = report.certified.len(),
            joined = report.joined.len(),
            renewed = report.renewed.len(),
            expired = report.expired.len(),
            pruned = report.pruned.len(),
            "Block applied"
        );

        Ok((staged, report))
    }

    fn apply_identities(
        &self,
        graph: &mut TrustGraph,
        block: &Block,
        at: ReferencePoint,
        report: &mut ApplyReport,
        touched: &mut BTreeSet<PublicKey>,
    ) -> Result<()> {
        for event in block.events_in_phase(EventPhase::Identity) {
            if let LifecycleEvent::CreateIdentity { pubkey, uid } = event {
                graph.record_identity(pubkey.clone(), uid.clone(), at.time, at.height)?;
                report.created.push(pubkey.clone());
                touched.insert(pubkey.clone());
            }
        }
        Ok(())
    }

    fn apply_certifications(
        &self,
        graph: &mut TrustGraph,
        block: &Block,
        at: ReferencePoint,
        report: &mut ApplyReport,
        touched: &mut BTreeSet<PublicKey>,
    ) -> Result<()> {
        let evaluator = LifecycleEvaluator::new(&self.params);

        for event in block.events_in_phase(EventPhase::Certification) {
            if let LifecycleEvent::Certify { from, to } = event {
                if from != to {
                    evaluator.live_identity(graph, from, at.time)?;
                    evaluator.live_identity(graph, to, at.time)?;
                }
                graph.record_certification(from, to, at.time)?;
                report.certified.push(CertificationRecord {
                    from: from.clone(),
                    to: to.clone(),
                    issued_on: at.time,
                });
                touched.insert(from.clone());
                touched.insert(to.clone());
            }
        }
        Ok(())
    }

    fn apply_memberships(
        &self,
        graph: &mut TrustGraph,
        block: &Block,
        at: ReferencePoint,
        report: &mut ApplyReport,
        touched: &mut BTreeSet<PublicKey>,
    ) -> Result<()> {
        let evaluator = LifecycleEvaluator::new(&self.params);

        // The first members of a network certify each other in genesis.
        let co_joiners: BTreeSet<PublicKey> = if block.is_genesis() {
            block
                .events_in_phase(EventPhase::Membership)
                .filter_map(|event| match event {
                    LifecycleEvent::Join { pubkey } => Some(pubkey.clone()),
                    _ => None,
                })
                .collect()
        } else {
            BTreeSet::new()
        };

        let mut accepted: Vec<(PublicKey, bool)> = Vec::new();
        let mut seen = BTreeSet::new();

        for event in block.events_in_phase(EventPhase::Membership) {
            let (pubkey, is_join) = match event {
                LifecycleEvent::Join { pubkey } => (pubkey, true),
                LifecycleEvent::Renew { pubkey } => (pubkey, false),
                _ => continue,
            };

            if !seen.insert(pubkey.clone()) {
                return Err(ChainError::MembershipConflict {
                    pubkey: pubkey.to_string(),
                    reason: "more than one membership event in the block".to_string(),
                });
            }

            let record = evaluator.live_identity(graph, pubkey, at.time)?;

            let member_now = evaluator.is_member_at(record, at.time);
            if is_join && member_now {
                return Err(ChainError::MembershipConflict {
                    pubkey: pubkey.to_string(),
                    reason: "already a member".to_string(),
                });
            }
            if !is_join && !member_now {
                return Err(ChainError::MembershipConflict {
                    pubkey: pubkey.to_string(),
                    reason: "no current membership to renew".to_string(),
                });
            }

            let valid = evaluator.valid_certifications_with(graph, record, at.time, &co_joiners);
            if valid < self.params.sig_qty {
                return Err(ChainError::InsufficientCertifications {
                    pubkey: pubkey.to_string(),
                    required: self.params.sig_qty,
                    actual: valid,
                });
            }

            accepted.push((pubkey.clone(), is_join));
        }

        for (pubkey, is_join) in accepted {
            graph.record_membership(&pubkey, Validity::new(at.time, self.params.ms_validity))?;
            if is_join {
                report.joined.push(pubkey.clone());
            } else {
                report.renewed.push(pubkey.clone());
            }
            touched.insert(pubkey);
        }

        Ok(())
    }
}

/// Identities whose flags a block may have moved: the touched ones plus
/// everything on either side of their certifications.
fn refresh_set(graph: &TrustGraph, touched: BTreeSet<PublicKey>) -> BTreeSet<PublicKey> {
    let mut refresh = BTreeSet::new();
    for key in &touched {
        if let Some(record) = graph.get(key) {
            refresh.extend(record.certifiers().cloned());
            refresh.extend(record.certified().cloned());
        }
    }
    refresh.extend(touched);
    refresh
}
