// Path: crates/consensus/src/config.rs
//! Tunable parameters for candidate assembly and the worker pool.

/// Parameters governing candidate-block assembly and mining dispatch.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusConfig {
    /// The intrinsic-coin block subsidy newly minted by each block's
    /// coinbase transaction, before fees. This node implements a flat
    /// reward schedule; a halving schedule is not specified by the design
    /// this crate implements.
    pub block_reward: u64,
    /// The number of blocks a coinbase output stays locked for after the
    /// block that mints it, named `CoinbaseHeightLock` in the design.
    pub coinbase_maturity: u64,
    /// The maximum serialized size, in bytes, of a block's payload.
    pub block_max_size: usize,
    /// Bytes reserved out of `block_max_size` for the coinbase transaction
    /// itself, so the greedy mempool-selection pass never produces a block
    /// the coinbase can't fit into.
    pub reserved_for_coinbase: usize,
    /// The number of OS threads the worker pool searches nonces with.
    pub worker_threads: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_reward: 5_000_000,
            coinbase_maturity: 100,
            block_max_size: 2 * 1024 * 1024,
            reserved_for_coinbase: 512,
            worker_threads: 1,
        }
    }
}
