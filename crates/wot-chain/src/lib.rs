//! # wot-chain
//!
//! Consensus core of the Web of Trust engine.
//!
//! Provides:
//! - Network parameters fixed at genesis
//! - Blocks of lifecycle events and their hash linkage
//! - The chain-derived reference time
//! - The trust graph store of identities, certifications and memberships
//! - The lifecycle evaluator and the expiry sweeper
//! - All-or-nothing block application

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod applier;
pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod pruner;
pub mod store;
pub mod time;

#[cfg(test)]
mod proptests;

pub use applier::{ApplyReport, BlockApplier, ChainState};
pub use block::{Block, BlockHash, LifecycleEvent};
pub use chain::WotChain;
pub use config::{IdentityReusePolicy, WotParams};
pub use error::{ChainError, Result};
pub use evaluator::{CertificationStatus, Evaluation, LifecycleEvaluator};
pub use store::TrustGraph;
pub use time::ReferencePoint;
