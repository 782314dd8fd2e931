//! Block structure and lifecycle events.
//!
//! A block carries a height, a declared time, a link to its parent and an
//! ordered list of lifecycle events. The events arrive already signature
//! checked; this module only gives them a canonical shape and a digest.
//!
//! ## Event Phases
//!
//! Events are applied in three phases regardless of their position in the
//! block, keeping their relative order inside each phase:
//!
//! 1. [`EventPhase::Identity`]: `CreateIdentity`
//! 2. [`EventPhase::Certification`]: `Certify`
//! 3. [`EventPhase::Membership`]: `Join` and `Renew`
//!
//! ## Example
//!
//! ```
//! use wot_chain::block::{Block, LifecycleEvent};
//! use wot_identity::{PublicKey, Uid};
//!
//! let cat = PublicKey::new("HgTTJLAQ5sqfknMq7yLPZbehtuLSsKj9CxWN7k8QvYJd").unwrap();
//! let genesis = Block::genesis(
//!     1_480_000_000,
//!     vec![LifecycleEvent::CreateIdentity { pubkey: cat, uid: Uid::new("cat").unwrap() }],
//! );
//! assert!(genesis.is_genesis());
//!
//! let next = Block::next(&genesis, 1_480_000_010, vec![]);
//! assert_eq!(next.height, 1);
//! assert_eq!(next.previous_hash, Some(genesis.hash()));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use wot_identity::{PublicKey, Uid};

use crate::{ChainError, Result};

/// Domain separation tag for block digests.
const BLOCK_HASH_DOMAIN: &[u8] = b"wot-block-v1";

// ============================================================================
// Block Hash
// ============================================================================

/// A 256-bit BLAKE3 block digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Hash size in bytes.
    pub const SIZE: usize = 32;

    /// Create a hash from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidBlock` if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            ChainError::InvalidBlock(format!(
                "block hash must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the hash as a byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Format as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::InvalidBlock` if the string is not valid hex of
    /// the right length.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| ChainError::InvalidBlock(format!("malformed block hash: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for BlockHash {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<BlockHash> for String {
    fn from(hash: BlockHash) -> Self {
        hash.to_hex()
    }
}

// ============================================================================
// Lifecycle Events
// ============================================================================

/// Application phase of an event inside a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPhase {
    /// Self-certifications.
    Identity,
    /// Certifications between identities.
    Certification,
    /// Membership joins and renewals.
    Membership,
}

/// A lifecycle event carried by a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Self-certification of a new identity.
    CreateIdentity {
        /// Key of the new identity.
        pubkey: PublicKey,
        /// Uid claimed by the identity.
        uid: Uid,
    },

    /// Certification of `to` by `from`.
    Certify {
        /// Issuer.
        from: PublicKey,
        /// Receiver.
        to: PublicKey,
    },

    /// First membership (or membership after expiry).
    Join {
        /// Identity joining.
        pubkey: PublicKey,
    },

    /// Renewal of a current membership.
    Renew {
        /// Identity renewing.
        pubkey: PublicKey,
    },
}

impl LifecycleEvent {
    /// The phase in which this event is applied.
    pub fn phase(&self) -> EventPhase {
        match self {
            LifecycleEvent::CreateIdentity { .. } => EventPhase::Identity,
            LifecycleEvent::Certify { .. } => EventPhase::Certification,
            LifecycleEvent::Join { .. } | LifecycleEvent::Renew { .. } => EventPhase::Membership,
        }
    }

    /// The identity the event is written for (the receiver for certifications).
    pub fn subject(&self) -> &PublicKey {
        match self {
            LifecycleEvent::CreateIdentity { pubkey, .. }
            | LifecycleEvent::Join { pubkey }
            | LifecycleEvent::Renew { pubkey } => pubkey,
            LifecycleEvent::Certify { to, .. } => to,
        }
    }

    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::CreateIdentity { .. } => "create_identity",
            LifecycleEvent::Certify { .. } => "certify",
            LifecycleEvent::Join { .. } => "join",
            LifecycleEvent::Renew { .. } => "renew",
        }
    }

    /// Canonical byte encoding used in the block digest.
    ///
    /// A one-byte tag followed by length-prefixed fields.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        fn push_field(out: &mut Vec<u8>, field: &str) {
            out.extend_from_slice(&(field.len() as u64).to_le_bytes());
            out.extend_from_slice(field.as_bytes());
        }

        let mut out = Vec::with_capacity(128);
        match self {
            LifecycleEvent::CreateIdentity { pubkey, uid } => {
                out.push(0x01);
                push_field(&mut out, pubkey.as_str());
                push_field(&mut out, uid.as_str());
            }
            LifecycleEvent::Certify { from, to } => {
                out.push(0x02);
                push_field(&mut out, from.as_str());
                push_field(&mut out, to.as_str());
            }
            LifecycleEvent::Join { pubkey } => {
                out.push(0x03);
                push_field(&mut out, pubkey.as_str());
            }
            LifecycleEvent::Renew { pubkey } => {
                out.push(0x04);
                push_field(&mut out, pubkey.as_str());
            }
        }
        out
    }
}

// ============================================================================
// Block
// ============================================================================

/// A committed block as seen by the Web of Trust.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Height in the chain, genesis is 0.
    pub height: u64,

    /// Declared block time in seconds.
    pub time: u64,

    /// Hash of the parent block, `None` for genesis.
    #[serde(default)]
    pub previous_hash: Option<BlockHash>,

    /// Lifecycle events in block order.
    #[serde(default)]
    pub events: Vec<LifecycleEvent>,
}

impl Block {
    /// Create a block with explicit header fields.
    pub fn new(
        height: u64,
        time: u64,
        previous_hash: Option<BlockHash>,
        events: Vec<LifecycleEvent>,
    ) -> Self {
        Self {
            height,
            time,
            previous_hash,
            events,
        }
    }

    /// Create a genesis block.
    pub fn genesis(time: u64, events: Vec<LifecycleEvent>) -> Self {
        Self::new(0, time, None, events)
    }

    /// Create the block that extends `parent`.
    pub fn next(parent: &Block, time: u64, events: Vec<LifecycleEvent>) -> Self {
        Self::new(parent.height + 1, time, Some(parent.hash()), events)
    }

    /// Check if this is a genesis block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.previous_hash.is_none()
    }

    /// Compute the block digest.
    ///
    /// Covers height, time, parent hash and the canonical encoding of every
    /// event in order.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(BLOCK_HASH_DOMAIN);
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&self.time.to_le_bytes());
        match &self.previous_hash {
            Some(parent) => {
                hasher.update(&[1]);
                hasher.update(parent.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&(self.events.len() as u64).to_le_bytes());
        for event in &self.events {
            let bytes = event.canonical_bytes();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        BlockHash(*hasher.finalize().as_bytes())
    }

    /// Events of one phase, in block order.
    pub fn events_in_phase(&self, phase: EventPhase) -> impl Iterator<Item = &LifecycleEvent> {
        self.events.iter().filter(move |e| e.phase() == phase)
    }

    /// Number of events in the block.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
