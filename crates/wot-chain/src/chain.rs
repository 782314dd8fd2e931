//! The committed chain.
//!
//! [`WotChain`] holds the current [`ChainState`] behind an `Arc` and swaps it
//! for the applier's output once a block is accepted. Snapshots handed out
//! before the swap keep seeing the state they were taken from.

use std::sync::Arc;

use tracing::{info, warn};

use crate::applier::{ApplyReport, BlockApplier, ChainState};
use crate::block::{Block, LifecycleEvent};
use crate::config::WotParams;
use crate::time::ChainHead;
use crate::Result;

/// A chain of applied blocks and the state they produced.
#[derive(Debug, Clone)]
pub struct WotChain {
    applier: BlockApplier,
    state: Arc<ChainState>,
}

impl WotChain {
    /// Create an empty chain.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidParameter` if the parameters are invalid.
    pub fn new(params: WotParams) -> Result<Self> {
        let applier = BlockApplier::new(params)?;
        let state = Arc::new(applier.initial_state());
        Ok(Self { applier, state })
    }

    /// Network parameters.
    pub fn params(&self) -> &WotParams {
        self.applier.params()
    }

    /// Current state.
    pub fn snapshot(&self) -> Arc<ChainState> {
        Arc::clone(&self.state)
    }

    /// Last applied block, if any.
    pub fn head(&self) -> Option<ChainHead> {
        self.state.head().copied()
    }

    /// Height the next block must have.
    pub fn next_height(&self) -> u64 {
        self.state.time_base().expected_height()
    }

    /// Build the block that would extend the current head.
    pub fn next_block(&self, time: u64, events: Vec<LifecycleEvent>) -> Block {
        Block::new(
            self.next_height(),
            time,
            self.head().map(|h| h.hash),
            events,
        )
    }

    /// Apply a block and publish the resulting state.
    ///
    /// # Errors
    ///
    /// Returns the rejection cause; the current state is unchanged.
    pub fn apply_block(&mut self, block: &Block) -> Result<ApplyReport> {
        match self.applier.apply(&self.state, block) {
            Ok((state, report)) => {
                self.state = Arc::new(state);
                info!(
                    height = report.height,
                    time = report.time,
                    hash = %report.hash,
                    events = report.event_count(),
                    expired = report.expired.len(),
                    pruned = report.pruned.len(),
                    identities = self.state.graph().len(),
                    "Block committed"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    height = block.height,
                    time = block.time,
                    error = %e,
                    "Block rejected"
                );
                Err(e)
            }
        }
    }

    /// Build the next block from `events` and apply it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply_block`].
    pub fn commit(&mut self, time: u64, events: Vec<LifecycleEvent>) -> Result<ApplyReport> {
        let block = self.next_block(time, events);
        self.apply_block(&block)
    }
}
