// Path: crates/history/src/config.rs
//! Tunable parameters the History Engine's acceptance and difficulty-
//! recomputation checks run against. Surfaced as a concrete struct (rather
//! than left implicit) so `nyx-node`'s `NodeConfig` and `nyx-consensus`'s
//! candidate assembly agree on the same numbers.

/// Parameters governing header acceptance and difficulty retargeting.
#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    /// The difficulty assigned to a header with no parent (genesis).
    pub initial_difficulty: u64,
    /// The number of trailing headers (inclusive of the parent) the
    /// difficulty retarget averages over.
    pub difficulty_window: usize,
    /// The desired average number of seconds between consecutive blocks.
    pub target_block_time_secs: u64,
    /// The maximum number of seconds a header's timestamp may exceed the
    /// local wall clock by and still be accepted (network-time skew).
    pub max_time_drift_secs: u64,
    /// The maximum serialized size, in bytes, a block's payload may occupy.
    pub block_max_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 1,
            difficulty_window: 16,
            target_block_time_secs: 30,
            max_time_drift_secs: 600,
            block_max_size: 2 * 1024 * 1024,
        }
    }
}
