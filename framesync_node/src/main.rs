//! framesync-node entry point.

use eyre::{Result, WrapErr};
use framesync_node::{Config, Replay};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(config_file) = std::env::args().nth(1) else {
        eyre::bail!("Usage: framesync-node /path/to/config.yaml");
    };

    info!(config_file = %config_file, "Loading configuration");

    let config = Config::load(&config_file)?;

    info!(
        required_streams = ?config.sync.required_streams,
        policy = ?config.sync.policy,
        speed = config.replay.speed,
        "Configuration loaded"
    );

    let replay = Replay::new(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    let summary = runtime.block_on(replay.run())?;

    info!(
        tuples = summary.tuples,
        ingested = summary.stats.ingested,
        ignored = summary.stats.ignored,
        replaced = summary.stats.replaced,
        evicted = summary.stats.evicted,
        abandoned = summary.stats.abandoned,
        late = summary.stats.late,
        pending_packets = summary.pending_packets,
        "Replay finished"
    );

    Ok(())
}
