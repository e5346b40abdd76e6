// Path: crates/node/src/bin/nyx-node.rs
//! Runs the Node View Orchestrator against a data directory: opens the
//! history/state stores, constructs the mempool, wires the mining
//! coordinator in if `--mine` is passed, and drives the single-writer
//! command loop until interrupted. The HTTP API, P2P transport and CLI
//! UX a real deployment wraps this binary in are out of scope; this is the
//! minimal process entry point the purpose-and-scope section allows.

use clap::Parser;
use nyx_node::{load_miner_key, open_engines, NodeConfig, Orchestrator, SemanticallySuccessfulModifier};
use std::path::PathBuf;

/// Runs a Nyx node against a local data directory.
#[derive(Parser, Debug)]
#[command(name = "nyx-node", version, about)]
struct Args {
    /// Path to a TOML `NodeConfig` file. If it does not exist, the built-in
    /// defaults are used and a warning is logged.
    #[arg(long, default_value = "node.toml")]
    config: PathBuf,

    /// Starts the mining coordinator once the orchestrator is running.
    /// Requires `miner_key_path` to be set in the config.
    #[arg(long)]
    mine: bool,

    /// Emit JSON-formatted logs instead of plain text.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    nyx_node::telemetry::init(args.json_logs)?;

    let config = if args.config.exists() {
        NodeConfig::load(&args.config)?
    } else {
        tracing::warn!(path = %args.config.display(), "config file not found, using defaults");
        NodeConfig::default()
    };

    let (history, state, mempool) = open_engines(&config)?;

    let miner = if args.mine {
        let key_path = config
            .miner_key_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--mine requires miner_key_path to be set in the config"))?;
        Some(load_miner_key(key_path)?)
    } else {
        None
    };

    let (orchestrator, handle, mut events) = Orchestrator::new(history, state, mempool, &config, miner);

    let events_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SemanticallySuccessfulModifier { id, height, timestamp }) => {
                    tracing::info!(%id, height, timestamp, "block applied");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, dropped oldest events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    let loop_handle = tokio::task::spawn_blocking(move || orchestrator.run());

    if args.mine {
        handle.start_mining()?;
        tracing::info!("mining coordinator started");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    handle.shutdown();

    loop_handle.await?;
    events_task.abort();
    Ok(())
}
