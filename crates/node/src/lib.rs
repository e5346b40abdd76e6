// Path: crates/node/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! The Node View Orchestrator: the single-writer actor loop that wires the
//! History Engine, Authenticated State Engine, Mempool and Mining
//! Coordinator together behind one command queue, plus the configuration
//! and telemetry wiring the two binaries under `src/bin/` need to start a
//! process. The HTTP API, P2P transport, CLI UX and wallet persistence this
//! orchestrator is consumed by remain external collaborators; this crate
//! only defines the `BlockSource`/`ModifierSink` trait boundaries they would
//! be built against.

pub mod config;
pub mod orchestrator;
pub mod telemetry;

pub use config::{ConfigError, NodeConfig};
pub use orchestrator::{
    BlockSource, ModifierSink, NodeHandle, Orchestrator, SemanticallySuccessfulModifier, ViewSnapshot,
};

use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::{HistoryConfig, HistoryEngine};
use nyx_mempool::{Mempool, MempoolConfig};
use nyx_state::AuthenticatedStateEngine;
use nyx_storage::{HistoryStore, StateStore, StorageError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Failures opening the on-disk stores a node needs before it can construct
/// its engines and start the orchestrator loop.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The data directory could not be created.
    #[error("creating data directory {path}: {source}")]
    CreateDataDir {
        /// The directory that could not be created.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The history or state store failed to open.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The authenticated state engine failed to open against its store.
    #[error(transparent)]
    State(#[from] nyx_types::error::StateError),
}

/// Opens both stores under `config.data_dir` (creating the directory if
/// needed) and constructs the three engines the orchestrator owns. Shared
/// by both binaries and by `crates/node/tests/` integration scenarios, so a
/// test harness never has to duplicate the wiring a real process performs.
pub fn open_engines(config: &NodeConfig) -> Result<(HistoryEngine, AuthenticatedStateEngine, Mempool), StartupError> {
    std::fs::create_dir_all(&config.data_dir).map_err(|source| StartupError::CreateDataDir {
        path: config.data_dir.clone(),
        source,
    })?;

    let history_store = HistoryStore::open(config.data_dir.join("history.redb"))?;
    let history = HistoryEngine::new(
        history_store,
        HistoryConfig {
            initial_difficulty: config.initial_difficulty,
            difficulty_window: config.difficulty_window,
            target_block_time_secs: config.target_block_time_secs,
            max_time_drift_secs: config.max_time_drift_secs,
            block_max_size: config.block_max_size,
        },
    );

    let state_store = Arc::new(StateStore::open(config.data_dir.join("state.redb"))?);
    let state = AuthenticatedStateEngine::open(state_store, config.min_fee, config.rollback_window)?;

    let mempool = Mempool::new(MempoolConfig {
        max_size: config.mempool_max_size,
    });

    Ok((history, state, mempool))
}

/// Loads the 32-byte seed at `path` and derives the corresponding miner
/// keypair, per the minimal "sign with the miner's secret" wallet contract
/// named in the purpose-and-scope section.
pub fn load_miner_key(path: &Path) -> Result<Ed25519KeyPair, MinerKeyError> {
    let bytes = std::fs::read(path).map_err(|source| MinerKeyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| MinerKeyError::WrongLength { path: path.to_path_buf() })?;
    Ed25519KeyPair::from_seed(&seed).map_err(|source| MinerKeyError::InvalidSeed { path: path.to_path_buf(), source })
}

/// Failures loading a miner's key seed file.
#[derive(Debug, Error)]
pub enum MinerKeyError {
    /// The key file could not be read.
    #[error("reading miner key file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The key file was not exactly 32 bytes.
    #[error("miner key file {path} must be exactly 32 bytes")]
    WrongLength {
        /// The offending path.
        path: std::path::PathBuf,
    },
    /// The seed did not produce a valid keypair.
    #[error("miner key file {path} does not contain a valid Ed25519 seed: {source}")]
    InvalidSeed {
        /// The offending path.
        path: std::path::PathBuf,
        /// The underlying cryptographic error.
        #[source]
        source: nyx_types::error::CryptoError,
    },
}
