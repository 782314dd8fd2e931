//! Block replay.
//!
//! Reads a JSON array of blocks and feeds them to the engine in order.
//! A block may give its full header (`height`, `previousHash`) or only its
//! `time`, in which case it is linked to the current head.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use wot_chain::{Block, BlockHash, LifecycleEvent, WotParams};
use wot_core::{RequirementsResult, WotEngine};

/// A block as written in a replay file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    /// Explicit height; linked to the head when absent.
    #[serde(default)]
    pub height: Option<u64>,

    /// Declared block time.
    pub time: u64,

    /// Explicit parent hash.
    #[serde(default)]
    pub previous_hash: Option<BlockHash>,

    /// Lifecycle events in block order.
    #[serde(default)]
    pub events: Vec<LifecycleEvent>,
}

impl BlockInput {
    /// Check if the input carries its own header.
    pub fn has_header(&self) -> bool {
        self.height.is_some() || self.previous_hash.is_some()
    }

    /// Build a full block from an explicit header.
    pub fn to_block(&self) -> Block {
        Block::new(
            self.height.unwrap_or(0),
            self.time,
            self.previous_hash,
            self.events.clone(),
        )
    }
}

/// Summary of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Blocks committed.
    pub applied: usize,
    /// Blocks rejected.
    pub rejected: usize,
}

/// Load blocks from a JSON file.
pub fn load_blocks(path: &Path) -> Result<Vec<BlockInput>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blocks file {}", path.display()))?;
    parse_blocks(&text).with_context(|| format!("Invalid blocks file {}", path.display()))
}

/// Parse blocks from JSON text.
pub fn parse_blocks(text: &str) -> Result<Vec<BlockInput>> {
    Ok(serde_json::from_str(text)?)
}

/// Load network parameters from a JSON file.
pub fn load_params(path: &Path) -> Result<WotParams> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read params file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid params file {}", path.display()))
}

/// Apply every block in order.
///
/// Stops at the first rejection unless `continue_on_reject` is set.
pub async fn replay(
    engine: &WotEngine,
    blocks: &[BlockInput],
    continue_on_reject: bool,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, input) in blocks.iter().enumerate() {
        let outcome = if input.has_header() {
            engine.apply_block(&input.to_block()).await
        } else {
            engine.commit(input.time, input.events.clone()).await
        };

        match outcome {
            Ok(report) => {
                summary.applied += 1;
                info!(
                    index,
                    height = report.height,
                    time = report.time,
                    created = report.created.len(),
                    joined = report.joined.len(),
                    renewed = report.renewed.len(),
                    expired = report.expired.len(),
                    pruned = report.pruned.len(),
                    "Replayed block"
                );
            }
            Err(e) => {
                summary.rejected += 1;
                if !continue_on_reject {
                    return Err(e).with_context(|| format!("Block #{} rejected", index));
                }
                warn!(index, time = input.time, error = %e, "Skipping rejected block");
            }
        }
    }

    Ok(summary)
}

/// Answer a requirements query as a JSON value.
pub async fn query(engine: &WotEngine, search: &str) -> Result<serde_json::Value> {
    let result: RequirementsResult = engine
        .requirements_for(search)
        .await
        .with_context(|| format!("Invalid identifier '{}'", search))?;
    let mut value = serde_json::to_value(&result)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("query".to_string(), serde_json::Value::from(search));
    }
    Ok(value)
}
