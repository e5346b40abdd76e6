// Path: crates/node/src/bin/nyx-genesis.rs
//! Offline-generates and prints a genesis block for a given (or freshly
//! generated) miner key: the minimal process entry point exercising
//! end-to-end scenario #1 from the testable-properties section without any
//! network dependency. Builds empty history/state engines in a scratch
//! directory, assembles a height-0 candidate through the same
//! `assemble_candidate` path a running node's mining coordinator uses,
//! searches for a winning nonce, applies the result to both engines to
//! prove it round-trips, and prints the mined header and payload as JSON.

use clap::Parser;
use nyx_consensus::{assemble_candidate, ConsensusConfig, WorkerPool};
use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::{HistoryConfig, HistoryEngine, Modifier as HistoryModifier};
use nyx_mempool::{Mempool, MempoolConfig};
use nyx_state::{AuthenticatedStateEngine, Modifier as StateModifier};
use nyx_storage::{HistoryStore, StateStore};
use nyx_types::header::{BlockHeader, BlockPayload};
use rand::RngCore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Generates a genesis block offline and prints it as JSON.
#[derive(Parser, Debug)]
#[command(name = "nyx-genesis", version, about)]
struct Args {
    /// Path to a 32-byte miner key seed file. Generated and written here if
    /// the path does not already exist.
    #[arg(long)]
    miner_key: Option<PathBuf>,

    /// The intrinsic-coin amount the genesis coinbase mints to the miner.
    #[arg(long, default_value_t = 5_000_000)]
    reward: u64,

    /// The PoW target the genesis header must satisfy. Keep low for a fast
    /// offline run; a real network's genesis difficulty is a governance
    /// decision outside this binary's scope.
    #[arg(long, default_value_t = 1)]
    difficulty: u64,

    /// The genesis header's timestamp, in seconds since the epoch. Defaults
    /// to the current wall-clock time.
    #[arg(long)]
    timestamp: Option<u64>,

    /// Number of worker threads to search nonces with.
    #[arg(long, default_value_t = 1)]
    worker_threads: usize,

    /// Write the JSON output to this file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct GenesisOutput {
    header: BlockHeader,
    payload: BlockPayload,
    miner_pub_key_hex: String,
}

fn main() -> anyhow::Result<()> {
    nyx_node::telemetry::init(false).ok();
    let args = Args::parse();

    let miner = resolve_miner_key(args.miner_key.as_deref())?;
    let timestamp = args.timestamp.unwrap_or_else(now);

    let history_dir = tempfile::tempdir()?;
    let history = HistoryEngine::new(
        HistoryStore::open(history_dir.path().join("history.redb"))?,
        HistoryConfig {
            initial_difficulty: args.difficulty,
            ..HistoryConfig::default()
        },
    );
    let state_dir = tempfile::tempdir()?;
    let mut state = AuthenticatedStateEngine::open(
        Arc::new(StateStore::open(state_dir.path().join("state.redb"))?),
        1,
        10,
    )?;
    let mempool = Mempool::new(MempoolConfig::default());

    let consensus_config = ConsensusConfig {
        block_reward: args.reward,
        ..ConsensusConfig::default()
    };
    let assembled = assemble_candidate(&history, &state, &mempool, &miner, &consensus_config, timestamp)?;

    let mut pool = WorkerPool::new(args.worker_threads);
    pool.set_candidate(assembled.candidate);
    let deadline = Instant::now() + Duration::from_secs(30);
    let mined = loop {
        if let Some(mined) = pool.try_recv() {
            break mined;
        }
        if Instant::now() > deadline {
            anyhow::bail!("no worker found a winning nonce within 30s at difficulty {}", args.difficulty);
        }
        std::thread::sleep(Duration::from_millis(5));
    };
    pool.shutdown();

    // Prove the mined block actually round-trips through both engines
    // before printing it, per the genesis-bootstrap scenario.
    history.append(HistoryModifier::Header(mined.header.clone()))?;
    history.append(HistoryModifier::Payload(mined.payload.clone()))?;
    state.apply(&StateModifier::Block {
        header: mined.header.clone(),
        payload: mined.payload.clone(),
    })?;
    anyhow::ensure!(state.height()? == 0, "genesis block did not commit at height 0");
    anyhow::ensure!(
        history.best_full_id()? == Some(mined.header.id()?),
        "genesis block did not become the best full chain tip"
    );

    let output = GenesisOutput {
        header: mined.header,
        payload: mined.payload,
        miner_pub_key_hex: hex::encode(miner.public_key()),
    };
    let json = serde_json::to_string_pretty(&output)?;
    match args.out {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn resolve_miner_key(path: Option<&std::path::Path>) -> anyhow::Result<Ed25519KeyPair> {
    match path {
        Some(path) if path.exists() => Ok(nyx_node::load_miner_key(path)?),
        Some(path) => {
            let mut seed = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut seed);
            std::fs::write(path, seed)?;
            tracing::info!(path = %path.display(), "generated a fresh miner key seed");
            Ok(Ed25519KeyPair::from_seed(&seed)?)
        }
        None => Ok(Ed25519KeyPair::generate()?),
    }
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
