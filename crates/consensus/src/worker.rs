// Path: crates/consensus/src/worker.rs
//! The PoW worker pool: a fixed set of OS threads, each searching a
//! disjoint nonce stride over the current candidate, reporting back through
//! a channel the first time one of them finds a satisfying nonce.

use crate::candidate::CandidateBlock;
use nyx_types::header::{BlockHeader, BlockPayload};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A header for which some worker found a nonce satisfying its declared
/// difficulty, paired with the payload it commits to.
#[derive(Debug, Clone)]
pub struct MinedBlock {
    /// The completed, PoW-satisfying header.
    pub header: BlockHeader,
    /// The payload the header's `transactions_root` commits to.
    pub payload: BlockPayload,
}

struct Shared {
    generation: AtomicU64,
}

/// Drives a fixed-size pool of OS threads against the current candidate.
///
/// Workers never share mutable state; they only read a cloned header and
/// race to find a satisfying nonce. A monotonic generation counter is the
/// poisoning mechanism: replacing the candidate bumps it, and every worker
/// still searching the previous generation notices on its next hash attempt
/// and exits without reporting anything, leaving no partial state behind.
/// Stale `JoinHandle`s are dropped rather than joined — the threads are left
/// to exit on their own, never blocking the coordinator.
pub struct WorkerPool {
    shared: Arc<Shared>,
    thread_count: usize,
    sender: Sender<MinedBlock>,
    receiver: Receiver<MinedBlock>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Builds an idle pool with no candidate yet loaded.
    pub fn new(thread_count: usize) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
            }),
            thread_count: thread_count.max(1),
            sender,
            receiver,
            handles: Vec::new(),
        }
    }

    /// Poisons every worker searching the previous candidate and spawns a
    /// fresh set over `candidate`, each offset by its worker index so the
    /// pool searches disjoint nonce ranges.
    #[tracing::instrument(skip_all, fields(height = candidate.header.height))]
    pub fn set_candidate(&mut self, candidate: CandidateBlock) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.handles.clear();

        for worker_index in 0..self.thread_count {
            let shared = self.shared.clone();
            let mut header = candidate.header.clone();
            let payload = candidate.payload.clone();
            let sender = self.sender.clone();
            let stride = self.thread_count as u64;
            header.nonce = worker_index as u64;
            let handle = thread::spawn(move || search(&shared, generation, header, payload, stride, &sender));
            self.handles.push(handle);
        }
        tracing::debug!(workers = self.thread_count, "dispatched candidate to worker pool");
    }

    /// Poisons every running worker without dispatching a replacement,
    /// per the shutdown cancellation rule.
    pub fn shutdown(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.handles.clear();
    }

    /// Non-blocking poll for a solved block from any worker.
    pub fn try_recv(&self) -> Option<MinedBlock> {
        self.receiver.try_recv().ok()
    }
}

fn search(shared: &Shared, generation: u64, mut header: BlockHeader, payload: BlockPayload, stride: u64, sender: &Sender<MinedBlock>) {
    loop {
        if shared.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        match header.satisfies_difficulty() {
            Ok(true) => {
                // `header_id` was stamped by candidate assembly against the
                // pre-mining nonce; since `id()` mixes in the nonce, it must
                // be recomputed against the winning one before the payload
                // is fit to submit anywhere.
                let payload = match header.id() {
                    Ok(header_id) => BlockPayload { header_id, ..payload },
                    Err(e) => {
                        tracing::warn!(error = %e, "worker abandoned search after hashing its own winning header");
                        return;
                    }
                };
                let _ = sender.send(MinedBlock { header, payload });
                return;
            }
            Ok(false) => {
                header.nonce = header.nonce.wrapping_add(stride);
            }
            Err(e) => {
                tracing::warn!(error = %e, "worker abandoned search after a hashing failure");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_types::header::ADDigest;
    use nyx_types::ids::ModifierId;
    use std::time::{Duration, Instant};

    fn low_difficulty_candidate() -> CandidateBlock {
        let header = BlockHeader {
            version: 1,
            parent_id: None,
            state_root: ADDigest::new([0u8; 32], 0),
            ad_proofs_root: [0u8; 32],
            transactions_root: [0u8; 32],
            timestamp: 1,
            height: 0,
            difficulty: 1,
            nonce: 0,
            miner_pub_key: [0u8; 32],
            signature: [0u8; 64],
        };
        let payload = BlockPayload {
            header_id: ModifierId::new([0u8; 32]),
            transactions: vec![],
        };
        CandidateBlock { header, payload }
    }

    #[test]
    fn pool_finds_a_satisfying_nonce() {
        let mut pool = WorkerPool::new(2);
        pool.set_candidate(low_difficulty_candidate());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mined = loop {
            if let Some(mined) = pool.try_recv() {
                break mined;
            }
            assert!(Instant::now() < deadline, "no worker found a nonce in time");
            thread::sleep(Duration::from_millis(5));
        };

        assert!(mined.header.satisfies_difficulty().expect("hash"));
        pool.shutdown();
    }

    #[test]
    fn replacing_the_candidate_poisons_the_previous_generation() {
        let mut pool = WorkerPool::new(1);
        let first_generation = pool.shared.generation.load(Ordering::SeqCst);
        pool.set_candidate(low_difficulty_candidate());
        assert!(pool.shared.generation.load(Ordering::SeqCst) > first_generation);

        pool.set_candidate(low_difficulty_candidate());
        let second_generation = pool.shared.generation.load(Ordering::SeqCst);
        pool.shutdown();
        assert!(pool.shared.generation.load(Ordering::SeqCst) > second_generation);
    }
}
