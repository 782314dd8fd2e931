//! Web of Trust Node
//!
//! Replays committed blocks through the Web of Trust engine and prints
//! requirements for the identities asked about.

mod replay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use wot_core::{EngineConfigBuilder, WotEngine};

/// Web of Trust Node
///
/// Membership lifecycle engine for a blockchain currency.
#[derive(Parser, Debug)]
#[command(name = "wot-node")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WOT_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Log format (plain, json)
    #[arg(long, env = "WOT_LOG_FORMAT", default_value = "plain", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON array of blocks and query the resulting state
    Replay {
        /// Path to the blocks file
        #[arg(long, env = "WOT_BLOCKS")]
        blocks: PathBuf,

        /// Path to the network parameters file (defaults when absent)
        #[arg(long, env = "WOT_PARAMS")]
        params: Option<PathBuf>,

        /// Currency name
        #[arg(long, env = "WOT_CURRENCY", default_value = "wot")]
        currency: String,

        /// Identity to query after the replay (public key or uid); repeatable
        #[arg(long = "query", short = 'q')]
        queries: Vec<String>,

        /// Keep going after a rejected block
        #[arg(long, env = "WOT_CONTINUE_ON_REJECT", default_value = "false")]
        continue_on_reject: bool,
    },
}

fn setup_logging(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr; stdout carries query results.
    match log_format.to_lowercase().as_str() {
        "json" => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        _ => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

async fn run_replay(
    blocks: PathBuf,
    params: Option<PathBuf>,
    currency: String,
    queries: Vec<String>,
    continue_on_reject: bool,
) -> Result<()> {
    let mut builder = EngineConfigBuilder::new().with_currency(currency);
    if let Some(path) = &params {
        builder = builder.with_params(replay::load_params(path)?);
    }
    let config = builder
        .build_validated()
        .context("Invalid engine configuration")?;

    let engine = WotEngine::new(config).context("Failed to initialize engine")?;
    let inputs = replay::load_blocks(&blocks)?;
    info!(
        blocks = inputs.len(),
        path = %blocks.display(),
        "Replaying blocks"
    );

    let summary = replay::replay(&engine, &inputs, continue_on_reject).await?;
    let head = engine.head().await;
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        height = head.map(|h| h.height),
        state_digest = %hex::encode(engine.state_digest().await),
        "Replay complete"
    );

    for search in &queries {
        let value = replay::query(&engine, search).await?;
        println!("{}", serde_json::to_string(&value)?);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, &args.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Web of Trust node");

    match args.command {
        Command::Replay {
            blocks,
            params,
            currency,
            queries,
            continue_on_reject,
        } => run_replay(blocks, params, currency, queries, continue_on_reject).await,
    }
}
