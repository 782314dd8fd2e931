//! Expiry sweeps over the trust graph.
//!
//! This module provides [`ExpirySweeper`], which refreshes the `member` /
//! `expired` flags of identities and removes those that have run out of
//! time.
//!
//! ## Two-Phase Expiry
//!
//! - A never-member is pruned by the first sweep at or past the end of its
//!   pending window.
//! - A member whose membership lapses is only flagged `expired` by the sweep
//!   of block `h`. It stays queryable for that block. A sweep of a later
//!   block prunes it if it still lacks `sig_qty` valid certifications.
//!
//! ## Determinism
//!
//! Every decision of a sweep is taken against the graph as it was before
//! the sweep started, in key order. Removing an identity can only lower
//! other identities' counts; those effects are seen by the next block.
//!
//! ## Example
//!
//! ```
//! use wot_chain::config::WotParams;
//! use wot_chain::pruner::ExpirySweeper;
//! use wot_chain::store::TrustGraph;
//! use wot_chain::time::ReferencePoint;
//!
//! let params = WotParams::default();
//! let mut graph = TrustGraph::default();
//! let stats = ExpirySweeper::new(&params)
//!     .sweep(&mut graph, ReferencePoint::new(0, 0))
//!     .unwrap();
//! assert!(!stats.pruned_any());
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wot_identity::{IdentityState, PublicKey};

use crate::config::WotParams;
use crate::evaluator::LifecycleEvaluator;
use crate::store::{IdentityRecord, TrustGraph};
use crate::time::ReferencePoint;
use crate::Result;

/// Outcome of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Identities evaluated.
    pub evaluated: u64,

    /// Identities newly flagged expired, in key order.
    pub expired: Vec<PublicKey>,

    /// Identities removed, in key order.
    pub pruned: Vec<PublicKey>,
}

impl SweepStats {
    /// Check if any identity was removed.
    pub fn pruned_any(&self) -> bool {
        !self.pruned.is_empty()
    }
}

/// Refreshes identity flags and prunes at a reference point.
#[derive(Debug, Clone, Copy)]
pub struct ExpirySweeper<'a> {
    params: &'a WotParams,
}

impl<'a> ExpirySweeper<'a> {
    /// Create a sweeper.
    pub fn new(params: &'a WotParams) -> Self {
        Self { params }
    }

    /// Refresh the flags of the given identities without pruning.
    ///
    /// Unknown keys are skipped. Returns the identities newly flagged
    /// expired.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::Identity` if a refresh would break the lifecycle
    /// state machine.
    pub fn refresh<'k, I>(
        &self,
        graph: &mut TrustGraph,
        keys: I,
        at: ReferencePoint,
    ) -> Result<Vec<PublicKey>>
    where
        I: IntoIterator<Item = &'k PublicKey>,
    {
        let evaluator = LifecycleEvaluator::new(self.params);
        let mut newly_expired = Vec::new();

        for key in keys {
            let member = match graph.get(key) {
                Some(record) => evaluator.is_member_at(record, at.time),
                None => continue,
            };
            if let Some(record) = graph.record_mut(key) {
                if update_flags(record, member, at)? {
                    newly_expired.push(key.clone());
                }
            }
        }

        Ok(newly_expired)
    }

    /// Sweep the whole graph at `at`.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::Identity` if a decision would break the lifecycle
    /// state machine.
    pub fn sweep(&self, graph: &mut TrustGraph, at: ReferencePoint) -> Result<SweepStats> {
        let evaluator = LifecycleEvaluator::new(self.params);

        // Decide everything on the pre-sweep graph.
        let view: &TrustGraph = graph;
        let decisions: Vec<(PublicKey, bool, bool)> = view
            .iter()
            .map(|record| {
                let eval = evaluator.evaluate_record(view, record, at);
                (record.pubkey.clone(), eval.member, eval.prunable)
            })
            .collect();

        let mut stats = SweepStats {
            evaluated: decisions.len() as u64,
            ..SweepStats::default()
        };

        for (key, member, prunable) in decisions {
            if prunable {
                if let Some(record) = graph.get(&key) {
                    record.state().transition(IdentityState::Pruned)?;
                }
                let record = graph.remove(&key)?;
                info!(
                    pubkey = %record.pubkey,
                    uid = %record.uid,
                    height = at.height,
                    was_member = record.was_member,
                    "Pruned identity"
                );
                stats.pruned.push(key);
                continue;
            }

            if let Some(record) = graph.record_mut(&key) {
                if update_flags(record, member, at)? {
                    info!(
                        pubkey = %record.pubkey,
                        uid = %record.uid,
                        height = at.height,
                        "Membership expired"
                    );
                    stats.expired.push(key);
                }
            }
        }

        debug!(
            height = at.height,
            evaluated = stats.evaluated,
            expired = stats.expired.len(),
            pruned = stats.pruned.len(),
            "Sweep complete"
        );

        Ok(stats)
    }
}

/// Write evaluated membership into the record. Returns true when the
/// record becomes expired.
fn update_flags(record: &mut IdentityRecord, member: bool, at: ReferencePoint) -> Result<bool> {
    let previous = record.state();
    let mut newly_expired = false;

    if member {
        record.member = true;
        record.was_member = true;
        record.expired = false;
        record.expired_since = None;
    } else {
        record.member = false;
        if record.was_member || record.membership.is_some() {
            record.was_member = true;
            if !record.expired {
                record.expired = true;
                record.expired_since = Some(at.height);
                newly_expired = true;
            }
        }
    }

    previous.transition(record.state())?;
    Ok(newly_expired)
}
