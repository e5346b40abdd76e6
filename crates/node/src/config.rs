// Path: crates/node/src/config.rs
//! `NodeConfig`: the single settings struct this workspace loads, per the
//! ambient-stack configuration section. No settings *framework* beyond this
//! one `toml`-backed struct with `serde(default)` fallbacks is built; full
//! CLI/env-var layering remains out of scope.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one node process: data directory, the rollback/mempool
/// bounds named `K`/`L` in the design, block-size and time-skew limits, the
/// initial difficulty and retarget window, and the miner identity used if
/// `--mine` is passed to the `nyx-node` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Directory holding the history and state `redb` files.
    pub data_dir: PathBuf,
    /// `K`: the number of committed state versions the Authenticated State
    /// Engine retains for rollback.
    pub rollback_window: usize,
    /// `L`: the maximum number of transactions the mempool retains.
    pub mempool_max_size: usize,
    /// The maximum serialized size, in bytes, of a block's payload.
    pub block_max_size: usize,
    /// The maximum number of seconds a header's timestamp may exceed local
    /// wall-clock time and still be accepted.
    pub max_time_drift_secs: u64,
    /// The difficulty assigned to the genesis header.
    pub initial_difficulty: u64,
    /// The number of trailing headers the difficulty retarget averages over.
    pub difficulty_window: usize,
    /// The desired average number of seconds between consecutive blocks.
    pub target_block_time_secs: u64,
    /// The minimum fee a non-coinbase transaction must pay to be admitted
    /// to the mempool or included in a block.
    pub min_fee: u64,
    /// The number of blocks a coinbase output stays locked for after the
    /// block that mints it.
    pub coinbase_maturity: u64,
    /// The intrinsic-coin block subsidy newly minted by each coinbase,
    /// before fees.
    pub block_reward: u64,
    /// The number of OS threads the mining worker pool searches nonces
    /// with, when `--mine` is passed.
    pub worker_threads: usize,
    /// Path to the 32-byte miner key seed file, required to mine.
    pub miner_key_path: Option<PathBuf>,
    /// The timestamp (seconds) at or after which mining may begin once a
    /// block is applied, letting a node catch up to the network tip before
    /// racing to extend it.
    pub mine_start_after: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            rollback_window: 2_000,
            mempool_max_size: 5_000,
            block_max_size: 2 * 1024 * 1024,
            max_time_drift_secs: 15,
            initial_difficulty: 1,
            difficulty_window: 16,
            target_block_time_secs: 30,
            min_fee: 1,
            coinbase_maturity: 100,
            block_reward: 5_000_000,
            worker_threads: 1,
            miner_key_path: None,
            mine_start_after: 0,
        }
    }
}

/// Failures loading or parsing a `NodeConfig` from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("reading config file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents are not valid TOML for `NodeConfig`.
    #[error("parsing config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

impl NodeConfig {
    /// Loads a `NodeConfig` from a TOML file, falling back to
    /// [`NodeConfig::default`] for any field the file omits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "data_dir = \"/var/lib/nyx\"\nmine_start_after = 42\n").expect("write");

        let config = NodeConfig::load(&path).expect("load");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/nyx"));
        assert_eq!(config.mine_start_after, 42);
        assert_eq!(config.rollback_window, NodeConfig::default().rollback_window);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = NodeConfig::load(Path::new("/nonexistent/node.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
