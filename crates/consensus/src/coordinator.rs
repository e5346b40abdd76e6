// Path: crates/consensus/src/coordinator.rs
//! The Consensus & Mining Coordinator: candidate assembly plus the reactive
//! triggers that keep a dispatched candidate aligned with the chain tip.

use crate::candidate::{assemble_candidate, CandidateBlock};
use crate::config::ConsensusConfig;
use crate::worker::{MinedBlock, WorkerPool};
use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::HistoryEngine;
use nyx_mempool::Mempool;
use nyx_state::AuthenticatedStateEngine;
use nyx_types::error::ConsensusError;
use nyx_types::ids::ModifierId;

/// Coordinates candidate assembly and worker dispatch against a read
/// snapshot of (history, state, mempool) supplied by the caller on every
/// trigger. Holds no lock on any subsystem itself; the Node View
/// Orchestrator is responsible for serializing the snapshot it hands in.
pub struct MiningCoordinator {
    config: ConsensusConfig,
    miner: Ed25519KeyPair,
    pool: WorkerPool,
    current: Option<CandidateBlock>,
    started: bool,
    start_after: u64,
}

impl MiningCoordinator {
    /// Builds an idle coordinator. Mining does not begin until `start` is
    /// called directly (the offline-generation path) or until
    /// `on_block_applied` observes a block timestamped at or after
    /// `start_after` (the catch-up-then-mine path).
    pub fn new(config: ConsensusConfig, miner: Ed25519KeyPair, start_after: u64) -> Self {
        let pool = WorkerPool::new(config.worker_threads);
        Self {
            config,
            miner,
            pool,
            current: None,
            started: false,
            start_after,
        }
    }

    /// Whether mining has begun (a candidate has been dispatched at least
    /// once).
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The parent id this coordinator's in-flight candidate extends, if any
    /// candidate has been assembled yet.
    pub fn current_parent(&self) -> Option<ModifierId> {
        self.current.as_ref().and_then(CandidateBlock::parent_id)
    }

    /// Unconditionally assembles a fresh candidate from the given snapshot
    /// and dispatches it to the worker pool, marking mining as started.
    /// Assembly failures are logged and returned, never panicked on; the
    /// caller retries on the next trigger per the failure semantics.
    #[tracing::instrument(skip_all)]
    pub fn start(
        &mut self,
        history: &HistoryEngine,
        state: &AuthenticatedStateEngine,
        mempool: &Mempool,
        now: u64,
    ) -> Result<(), ConsensusError> {
        self.started = true;
        self.regenerate(history, state, mempool, now)
    }

    /// Reactive trigger: call once a block has been applied and published.
    /// Regenerates the candidate if its parent no longer matches the new
    /// tip; if mining hasn't started yet, begins it once the applied
    /// block's timestamp reaches `start_after`.
    #[tracing::instrument(skip_all, fields(block_id = %block_id))]
    pub fn on_block_applied(
        &mut self,
        block_id: ModifierId,
        block_timestamp: u64,
        history: &HistoryEngine,
        state: &AuthenticatedStateEngine,
        mempool: &Mempool,
        now: u64,
    ) -> Result<(), ConsensusError> {
        if !self.started {
            if block_timestamp >= self.start_after {
                return self.start(history, state, mempool, now);
            }
            return Ok(());
        }

        if self.current_parent() != Some(block_id) {
            self.regenerate(history, state, mempool, now)?;
        }
        Ok(())
    }

    fn regenerate(
        &mut self,
        history: &HistoryEngine,
        state: &AuthenticatedStateEngine,
        mempool: &Mempool,
        now: u64,
    ) -> Result<(), ConsensusError> {
        match assemble_candidate(history, state, mempool, &self.miner, &self.config, now) {
            Ok(assembled) => {
                self.pool.set_candidate(assembled.candidate.clone());
                self.current = Some(assembled.candidate);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "candidate assembly failed; retrying on next trigger");
                Err(e)
            }
        }
    }

    /// Non-blocking poll for a block a worker finished mining. The caller
    /// (the Node View Orchestrator) is responsible for submitting it back
    /// through the same apply path as a network-received block.
    pub fn poll_solved(&self) -> Option<MinedBlock> {
        self.pool.try_recv()
    }

    /// Terminates every worker without dispatching a replacement.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_history::HistoryConfig;
    use nyx_mempool::MempoolConfig;
    use nyx_test_utils::{genesis_keypair, open_state_store};
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn harness() -> (HistoryEngine, tempfile::TempDir, AuthenticatedStateEngine, tempfile::TempDir, Mempool) {
        let hdir = tempdir().expect("tempdir");
        let hstore = nyx_storage::HistoryStore::open(hdir.path().join("history.redb")).expect("open history store");
        let history = HistoryEngine::new(hstore, HistoryConfig::default());
        let (state_store, sdir) = open_state_store();
        let state = AuthenticatedStateEngine::open(state_store, 1, 10).expect("open state");
        let mempool = Mempool::new(MempoolConfig::default());
        (history, hdir, state, sdir, mempool)
    }

    fn poll_until_solved(coordinator: &MiningCoordinator) -> MinedBlock {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(mined) = coordinator.poll_solved() {
                return mined;
            }
            assert!(Instant::now() < deadline, "no candidate was mined in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn coordinator_does_not_mine_until_started_or_triggered() {
        let (_history, _hdir, _state, _sdir, _mempool) = harness();
        let coordinator = MiningCoordinator::new(ConsensusConfig::default(), genesis_keypair(3), 1_000);
        assert!(!coordinator.is_started());
        assert_eq!(coordinator.current_parent(), None);
    }

    #[test]
    fn start_dispatches_and_mines_a_genesis_candidate() {
        let (history, _hdir, state, _sdir, mempool) = harness();
        let mut coordinator = MiningCoordinator::new(ConsensusConfig::default(), genesis_keypair(4), 0);

        coordinator.start(&history, &state, &mempool, 1).expect("start");
        assert!(coordinator.is_started());
        assert_eq!(coordinator.current_parent(), None);

        let mined = poll_until_solved(&coordinator);
        assert_eq!(mined.header.height, 0);
        assert!(mined.header.satisfies_difficulty().expect("hash"));
        coordinator.shutdown();
    }

    #[test]
    fn on_block_applied_defers_start_until_the_threshold_timestamp() {
        let (history, _hdir, state, _sdir, mempool) = harness();
        let mut coordinator = MiningCoordinator::new(ConsensusConfig::default(), genesis_keypair(5), 100);

        coordinator
            .on_block_applied(ModifierId::new([1u8; 32]), 10, &history, &state, &mempool, 10)
            .expect("trigger below threshold");
        assert!(!coordinator.is_started());

        coordinator
            .on_block_applied(ModifierId::new([2u8; 32]), 100, &history, &state, &mempool, 100)
            .expect("trigger at threshold");
        assert!(coordinator.is_started());
        coordinator.shutdown();
    }

    #[test]
    fn on_block_applied_regenerates_when_the_candidates_parent_is_stale() {
        let (history, _hdir, state, _sdir, mempool) = harness();
        let mut coordinator = MiningCoordinator::new(ConsensusConfig::default(), genesis_keypair(6), 0);
        coordinator.start(&history, &state, &mempool, 1).expect("start");
        let _ = poll_until_solved(&coordinator);

        let unrelated_block = ModifierId::new([9u8; 32]);
        coordinator
            .on_block_applied(unrelated_block, 2, &history, &state, &mempool, 2)
            .expect("regenerate trigger");

        assert_eq!(coordinator.current_parent(), None);
        let _ = poll_until_solved(&coordinator);
        coordinator.shutdown();
    }
}
