//! Chain-derived reference time.
//!
//! Consensus decisions never read the wall clock. The reference time is the
//! declared time of the most recently committed block, or, while a candidate
//! block is being applied, the candidate's own declared time.
//!
//! [`TimeBase`] also owns the header rules a candidate must satisfy before
//! any of its events are looked at:
//! - Height is head height + 1 (0 for genesis)
//! - Parent hash matches the head hash (absent only for genesis)
//! - Time is not before the head time

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockHash};
use crate::{ChainError, Result};

/// A (height, time) pair at which the Web of Trust is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Block height.
    pub height: u64,
    /// Block time in seconds.
    pub time: u64,
}

impl ReferencePoint {
    /// Create a reference point.
    pub fn new(height: u64, time: u64) -> Self {
        Self { height, time }
    }
}

/// The last committed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Height of the head block.
    pub height: u64,
    /// Declared time of the head block.
    pub time: u64,
    /// Digest of the head block.
    pub hash: BlockHash,
}

impl ChainHead {
    /// The head as a reference point.
    pub fn reference(&self) -> ReferencePoint {
        ReferencePoint::new(self.height, self.time)
    }
}

/// Reference time derived from committed history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBase {
    head: Option<ChainHead>,
}

impl TimeBase {
    /// A time base before genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last committed block, if any.
    pub fn head(&self) -> Option<&ChainHead> {
        self.head.as_ref()
    }

    /// Current reference time, `None` before genesis.
    pub fn current_time(&self) -> Option<u64> {
        self.head.map(|h| h.time)
    }

    /// Current reference point, `None` before genesis.
    pub fn current(&self) -> Option<ReferencePoint> {
        self.head.map(|h| h.reference())
    }

    /// Height the next block must have.
    pub fn expected_height(&self) -> u64 {
        self.head.map(|h| h.height + 1).unwrap_or(0)
    }

    /// Validate a candidate block header and return its reference point.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidBlock` if the candidate does not extend
    /// the head: wrong height, wrong parent hash, or time going backwards.
    pub fn validate_candidate(&self, block: &Block) -> Result<ReferencePoint> {
        let expected = self.expected_height();
        if block.height != expected {
            return Err(ChainError::InvalidBlock(format!(
                "invalid height: expected {}, got {}",
                expected, block.height
            )));
        }

        match (&self.head, &block.previous_hash) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(ChainError::InvalidBlock(
                    "genesis block must not reference a parent".to_string(),
                ));
            }
            (Some(_), None) => {
                return Err(ChainError::InvalidBlock(
                    "non-genesis block is missing its parent hash".to_string(),
                ));
            }
            (Some(head), Some(parent)) => {
                if parent != &head.hash {
                    return Err(ChainError::InvalidBlock(format!(
                        "parent hash mismatch: expected {}, got {}",
                        head.hash, parent
                    )));
                }
                if block.time < head.time {
                    return Err(ChainError::InvalidBlock(format!(
                        "time {} is before parent time {}",
                        block.time, head.time
                    )));
                }
            }
        }

        Ok(ReferencePoint::new(block.height, block.time))
    }

    /// Move the head to a block that has been fully applied.
    pub fn advance(&mut self, block: &Block) {
        self.head = Some(ChainHead {
            height: block.height,
            time: block.time,
            hash: block.hash(),
        });
    }
}
