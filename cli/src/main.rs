//! lendsnap — rebuild the borrower-position snapshot from indexed events.
//!
//! Usage:
//! ```bash
//! DATABASE_URL=postgresql://localhost/ponder lendsnap
//! lendsnap --output borrowers-hyperevm-mainnet.json
//! lendsnap --incremental
//! ```
//!
//! One run is one snapshot: read the checkpoint, replay the borrow and
//! supply streams, write the artifact atomically, exit. A failed run exits
//! non-zero and leaves the previous artifact in place; the process
//! supervisor re-invokes as needed.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lendsnap_core::{replay_full, replay_incremental, EventStore, Snapshot, DEFAULT_SNAPSHOT_FILE};
use lendsnap_store::PostgresEventStore;

/// CLI options.
#[derive(Parser, Debug)]
#[command(
    name = "lendsnap",
    version,
    about = "Build a borrower-position snapshot from indexed lending events"
)]
struct Args {
    /// Event-store connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Artifact path (overwritten atomically on success).
    #[arg(long, default_value = DEFAULT_SNAPSHOT_FILE)]
    output: PathBuf,

    /// Resume from the prior artifact instead of replaying from scratch.
    #[arg(long)]
    incremental: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = PostgresEventStore::connect(&args.database_url).await?;
    // Release the connection on success and on business errors alike.
    let result = run(&args, &store).await;
    store.close().await;
    result
}

async fn run(args: &Args, store: &PostgresEventStore) -> Result<()> {
    let last_block_number = store.latest_block_number().await?;

    let prior = if args.incremental {
        match Snapshot::load(&args.output) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "prior artifact unavailable, replaying from scratch");
                None
            }
        }
    } else {
        None
    };

    let replayer = match prior {
        Some(prior) => replay_incremental(store, prior).await?,
        None => replay_full(store).await?,
    };

    let snapshot = Snapshot::new(
        last_block_number,
        replayer.last_event_time(),
        replayer.into_positions(),
    );
    snapshot.write(&args.output)?;

    info!(
        borrowers = snapshot.borrowers.len(),
        last_block = last_block_number,
        path = %args.output.display(),
        "snapshot written"
    );
    Ok(())
}
