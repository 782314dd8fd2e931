//! The Web of Trust engine.
//!
//! [`WotEngine`] is the entry point for the node: it applies committed
//! blocks one at a time and answers requirements queries concurrently.
//!
//! # Concurrency
//!
//! ```text
//!   apply_block ──► writer (Mutex<WotChain>) ──► apply on staged copy
//!                                                   │
//!                                         success   ▼
//!                              published (RwLock<Arc<ChainState>>) ◄── swap
//!                                                   │
//!   requirements ◄──────────── clone Arc ◄─────────┘
//! ```
//!
//! - Only one block is applied at a time; the next waits on the writer lock.
//! - Queries take the published `Arc` and release the lock immediately, so
//!   they see either the state before a block or the state after it.
//! - A rejected block never reaches the published state.
//!
//! # Example
//!
//! ```ignore
//! use wot_core::{EngineConfig, WotEngine};
//!
//! let engine = WotEngine::new(EngineConfig::default())?;
//! engine.apply_block(&block).await?;
//! let result = engine.requirements_for("cat").await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use wot_chain::time::ChainHead;
use wot_chain::{ApplyReport, Block, ChainState, LifecycleEvent, WotChain};
use wot_identity::IdentityRef;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::requirements::{RequirementsResult, RequirementsService};

// ============================================================================
// Engine
// ============================================================================

/// Applies blocks and serves requirements queries.
pub struct WotEngine {
    /// Engine configuration.
    config: EngineConfig,

    /// Sole writer; holds the chain while a block is applied.
    writer: Mutex<WotChain>,

    /// Last committed state, shared with readers.
    published: RwLock<Arc<ChainState>>,
}

impl WotEngine {
    /// Create an engine with an empty chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let chain = WotChain::new(config.params.clone())?;
        let published = RwLock::new(chain.snapshot());

        info!(
            currency = %config.currency,
            sig_qty = config.params.sig_qty,
            idty_window = config.params.idty_window,
            ms_validity = config.params.ms_validity,
            cert_validity = config.params.cert_validity_period,
            reuse_policy = %config.params.reuse_policy,
            "Engine created"
        );

        Ok(Self {
            config,
            writer: Mutex::new(chain),
            published,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Apply a committed block.
    ///
    /// # Errors
    ///
    /// Returns the rejection cause. Readers keep seeing the previous state.
    pub async fn apply_block(&self, block: &Block) -> Result<ApplyReport> {
        let mut chain = self.writer.lock().await;
        let report = chain.apply_block(block)?;
        *self.published.write().await = chain.snapshot();
        debug!(height = report.height, "Published new state");
        Ok(report)
    }

    /// Build the next block from `events` at `time` and apply it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::apply_block`].
    pub async fn commit(&self, time: u64, events: Vec<LifecycleEvent>) -> Result<ApplyReport> {
        let mut chain = self.writer.lock().await;
        let report = chain.commit(time, events)?;
        *self.published.write().await = chain.snapshot();
        debug!(height = report.height, "Published new state");
        Ok(report)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// The last committed state.
    pub async fn snapshot(&self) -> Arc<ChainState> {
        Arc::clone(&*self.published.read().await)
    }

    /// The last committed block, if any.
    pub async fn head(&self) -> Option<ChainHead> {
        self.snapshot().await.head().copied()
    }

    /// Digest of the committed trust graph.
    pub async fn state_digest(&self) -> [u8; 32] {
        self.snapshot().await.state_digest()
    }

    /// Requirements of an identity as of the last committed block.
    pub async fn requirements(&self, id: &IdentityRef) -> RequirementsResult {
        let state = self.snapshot().await;
        RequirementsService::new(&self.config.params).query(&state, id)
    }

    /// Requirements for a search string (public key or uid).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Identity` if the string is neither a valid key
    /// nor a valid uid.
    pub async fn requirements_for(&self, search: &str) -> Result<RequirementsResult> {
        let id = IdentityRef::parse(search)?;
        Ok(self.requirements(&id).await)
    }
}

impl fmt::Debug for WotEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WotEngine")
            .field("currency", &self.config.currency)
            .field("params", &self.config.params)
            .finish_non_exhaustive()
    }
}
