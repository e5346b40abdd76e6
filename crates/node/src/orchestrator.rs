// Path: crates/node/src/orchestrator.rs
//! The Node View Orchestrator: a single-writer actor loop owning the
//! history engine, the state engine, the mempool, and (optionally) the
//! mining coordinator. Every mutation is serialized through one command
//! queue; reads run a caller-supplied closure against a coherent snapshot
//! without ever blocking a concurrent apply, since only the loop thread
//! ever touches the owned engines.

use crate::config::NodeConfig;
use nyx_consensus::{ConsensusConfig, MiningCoordinator};
use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::{HistoryEngine, Modifier as HistoryModifier, ProgressInfo};
use nyx_mempool::Mempool;
use nyx_state::{AuthenticatedStateEngine, Modifier as StateModifier};
use nyx_tx::validate::{validate_transaction, BoxLookup, ValidationContext};
use nyx_types::boxes::{Box as UtxoBox, BoxId};
use nyx_types::error::{ChainError, NodeError, StateError, TxError};
use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::ids::{Height, ModifierId};
use nyx_types::tx::Transaction;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

/// Published after a block's apply-progress-info cycle commits
/// successfully, per the `SemanticallySuccessfulModifier` contract.
#[derive(Debug, Clone)]
pub struct SemanticallySuccessfulModifier {
    /// The applied block's id.
    pub id: ModifierId,
    /// The applied block's height.
    pub height: Height,
    /// The applied block's timestamp.
    pub timestamp: u64,
}

/// A point-in-time, read-only view over the three owned engines, handed to
/// a `get_data_from_current_view` closure. Valid only for the duration of
/// that call: the orchestrator does not apply anything else while the
/// closure runs, since both run on the same loop thread.
pub struct ViewSnapshot<'a> {
    /// The History Engine.
    pub history: &'a HistoryEngine,
    /// The Authenticated State Engine.
    pub state: &'a AuthenticatedStateEngine,
    /// The mempool.
    pub mempool: &'a Mempool,
}

enum Command {
    SubmitHeader(BlockHeader, Sender<Result<(), NodeError>>),
    SubmitPayload(BlockPayload, Sender<Result<(), NodeError>>),
    SubmitTransaction(Transaction, Sender<Result<(), NodeError>>),
    StartMining(Sender<Result<(), NodeError>>),
    View(Box<dyn FnOnce(&ViewSnapshot) + Send>),
    Shutdown,
}

/// A cheap-to-clone handle to a running orchestrator. The orchestrator
/// itself owns no public API beyond `run`; every other operation goes
/// through a handle's methods, which round-trip a command through the
/// actor's queue and block the calling thread on the reply.
#[derive(Clone)]
pub struct NodeHandle {
    commands: Sender<Command>,
}

/// A minimal entry point a network or wallet layer feeds blocks through.
/// The P2P transport that drives this is out of scope for this workspace;
/// only the trait boundary is defined here.
pub trait BlockSource {
    /// Returns the next (header, payload) pair to submit, if any is ready.
    fn next_block(&mut self) -> Option<(BlockHeader, BlockPayload)>;
}

/// A minimal entry point a network, wallet, or API layer subscribes
/// through to learn about newly confirmed blocks.
pub trait ModifierSink {
    /// Called once per successfully applied block, in apply order.
    fn on_modifier_applied(&mut self, event: &SemanticallySuccessfulModifier);
}

impl NodeHandle {
    /// Submits a bare header for acceptance. Errors classified
    /// `NotApplicable` mean the header's parent is not yet known; the
    /// caller (an eventual P2P layer) is responsible for queuing and
    /// retrying once the prerequisite arrives, per the error-handling
    /// design's deferred-modifier policy.
    pub fn submit_header(&self, header: BlockHeader) -> Result<(), NodeError> {
        self.roundtrip(|reply| Command::SubmitHeader(header, reply))
    }

    /// Submits a payload completing a previously accepted header.
    pub fn submit_payload(&self, payload: BlockPayload) -> Result<(), NodeError> {
        self.roundtrip(|reply| Command::SubmitPayload(payload, reply))
    }

    /// Submits a transaction for mempool admission.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), NodeError> {
        self.roundtrip(|reply| Command::SubmitTransaction(tx, reply))
    }

    /// Starts the mining coordinator, if one was configured.
    pub fn start_mining(&self) -> Result<(), NodeError> {
        self.roundtrip(Command::StartMining)
    }

    /// Runs `f` against a coherent snapshot of (history, state, mempool)
    /// and returns whatever it returns. Mirrors `GetDataFromCurrentView`.
    pub fn get_data_from_current_view<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&ViewSnapshot) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, rx) = mpsc::channel();
        let cmd = Command::View(Box::new(move |view| {
            let _ = reply.send(f(view));
        }));
        self.commands.send(cmd).ok()?;
        rx.recv().ok()
    }

    /// Requests the orchestrator shut down after draining its current
    /// command. Does not wait for the loop thread to exit.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    fn roundtrip(&self, build: impl FnOnce(Sender<Result<(), NodeError>>) -> Command) -> Result<(), NodeError> {
        let (reply, rx) = mpsc::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| NodeError::State(StateError::Invariant("orchestrator loop has stopped".into())))?;
        rx.recv()
            .map_err(|_| NodeError::State(StateError::Invariant("orchestrator dropped the reply channel".into())))?
    }
}

/// Owns the engines and runs the single-writer loop. Constructed once per
/// process; `run` consumes it on the thread that should host the loop.
pub struct Orchestrator {
    history: HistoryEngine,
    state: AuthenticatedStateEngine,
    mempool: Mempool,
    mining: Option<MiningCoordinator>,
    max_time_drift_secs: u64,
    events: broadcast::Sender<SemanticallySuccessfulModifier>,
    commands: Receiver<Command>,
}

impl Orchestrator {
    /// Builds an orchestrator over already-open engines, plus a handle
    /// callers use to submit work and an event receiver for
    /// `SemanticallySuccessfulModifier` notifications (bounded at 256
    /// entries; slow subscribers lose the oldest undelivered event rather
    /// than stall the publisher, per the design's drop-oldest policy).
    pub fn new(
        history: HistoryEngine,
        state: AuthenticatedStateEngine,
        mempool: Mempool,
        config: &NodeConfig,
        miner: Option<Ed25519KeyPair>,
    ) -> (Self, NodeHandle, broadcast::Receiver<SemanticallySuccessfulModifier>) {
        let (commands_tx, commands_rx) = mpsc::channel();
        let (events_tx, events_rx) = broadcast::channel(256);

        let mining = miner.map(|key| {
            let consensus_config = ConsensusConfig {
                block_reward: config.block_reward,
                coinbase_maturity: config.coinbase_maturity,
                block_max_size: config.block_max_size,
                reserved_for_coinbase: 512,
                worker_threads: config.worker_threads,
            };
            MiningCoordinator::new(consensus_config, key, config.mine_start_after)
        });

        let orchestrator = Self {
            history,
            state,
            mempool,
            mining,
            max_time_drift_secs: config.max_time_drift_secs,
            events: events_tx,
            commands: commands_rx,
        };
        (orchestrator, NodeHandle { commands: commands_tx }, events_rx)
    }

    /// Runs the command loop until a [`Command::Shutdown`] is received.
    /// Between commands, the loop also polls the mining coordinator (if
    /// any) for a solved block and submits it through the same apply path
    /// network-received blocks use.
    pub fn run(mut self) {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        loop {
            match self.commands.recv_timeout(POLL_INTERVAL) {
                Ok(Command::Shutdown) => {
                    if let Some(mining) = &mut self.mining {
                        mining.shutdown();
                    }
                    return;
                }
                Ok(Command::SubmitHeader(header, reply)) => {
                    let _ = reply.send(self.submit_header(header));
                }
                Ok(Command::SubmitPayload(payload, reply)) => {
                    let _ = reply.send(self.submit_payload(payload));
                }
                Ok(Command::SubmitTransaction(tx, reply)) => {
                    let _ = reply.send(self.submit_transaction(tx));
                }
                Ok(Command::StartMining(reply)) => {
                    let _ = reply.send(self.start_mining());
                }
                Ok(Command::View(f)) => {
                    let view = ViewSnapshot {
                        history: &self.history,
                        state: &self.state,
                        mempool: &self.mempool,
                    };
                    f(&view);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            self.drain_mined_block();
        }
    }

    fn start_mining(&mut self) -> Result<(), NodeError> {
        let Some(mining) = &mut self.mining else {
            return Err(NodeError::Consensus(nyx_types::error::ConsensusError::NoMinerKey));
        };
        mining.start(&self.history, &self.state, &self.mempool, now())?;
        Ok(())
    }

    fn drain_mined_block(&mut self) {
        let Some(mined) = self.mining.as_ref().and_then(|m| m.poll_solved()) else {
            return;
        };
        let header = mined.header;
        let payload = mined.payload;
        if let Err(e) = self.submit_header(header.clone()) {
            tracing::warn!(error = %e, "mined header rejected by the history engine");
            return;
        }
        if let Err(e) = self.submit_payload(payload) {
            tracing::warn!(error = %e, "mined payload rejected by the history engine");
        }
    }

    /// Rejects a header whose declared timestamp lies too far in the future
    /// of wall-clock time before handing it to the history engine, which has
    /// no notion of "now" of its own (it only enforces that a header's
    /// timestamp strictly exceeds its parent's).
    fn submit_header(&mut self, header: BlockHeader) -> Result<(), NodeError> {
        if header.timestamp > now().saturating_add(self.max_time_drift_secs) {
            return Err(NodeError::Chain(ChainError::InvalidTimestamp));
        }
        let progress = self.history.append(HistoryModifier::Header(header))?;
        self.apply_progress(progress)
    }

    fn submit_payload(&mut self, payload: BlockPayload) -> Result<(), NodeError> {
        let progress = self.history.append(HistoryModifier::Payload(payload))?;
        self.apply_progress(progress)
    }

    fn submit_transaction(&mut self, tx: Transaction) -> Result<(), NodeError> {
        let lookup = StateLookup(&self.state);
        let ctx = ValidationContext {
            height: self.state.height()?.saturating_add(1),
            last_block_timestamp: self.state.last_block_timestamp()?,
            root_hash: self.state.current_version().unwrap_or_else(|| ModifierId::new([0u8; 32])),
            min_fee: 1,
        };
        self.mempool.put(tx, &lookup, &ctx)?;
        Ok(())
    }

    /// Applies the rollback/apply sequence a history-engine `append` call
    /// produced, atomically from the caller's point of view: any failure
    /// partway through is reported, and the offending header is marked
    /// semantically invalid so the history engine can recompute its best
    /// full chain away from it on its next call.
    ///
    /// The history store's own best-full pointer is updated by `append`
    /// itself, ahead of this call; if the state-side apply below fails
    /// (most plausibly because the reorg's branch point fell outside the
    /// retained rollback window), the two stores can disagree until the
    /// next successful apply. Out-of-window reorgs are operationally rare
    /// given the retained window is sized in the thousands of versions;
    /// making `HistoryEngine::append` and this apply transactional with
    /// each other is future hardening, not attempted here.
    fn apply_progress(&mut self, progress: ProgressInfo) -> Result<(), NodeError> {
        if progress.is_empty() {
            return Ok(());
        }

        if !progress.to_remove.is_empty() {
            let branch_point = progress.branch_point.ok_or_else(|| {
                NodeError::State(StateError::Invariant("rollback with no branch point".into()))
            })?;
            let header = self.history.header_by_id(branch_point)?.ok_or_else(|| {
                NodeError::State(StateError::Invariant(format!("branch point {branch_point} not found")))
            })?;
            self.state.rollback_to(branch_point, header.height, header.timestamp)?;
        }

        for (header, payload) in &progress.to_apply {
            let id = header.id().map_err(nyx_types::error::NodeError::Crypto)?;
            match self.state.apply(&StateModifier::Block { header: header.clone(), payload: payload.clone() }) {
                Ok(()) => {
                    self.history.mark_valid(id)?;
                    let confirmed: Vec<ModifierId> = payload
                        .transactions
                        .iter()
                        .filter(|tx| !tx.is_coinbase())
                        .filter_map(|tx| tx.id().ok())
                        .collect();
                    self.mempool.remove(&confirmed);

                    let event = SemanticallySuccessfulModifier {
                        id,
                        height: header.height,
                        timestamp: header.timestamp,
                    };
                    let _ = self.events.send(event);

                    if let Some(mining) = &mut self.mining {
                        if let Err(e) = mining.on_block_applied(id, header.timestamp, &self.history, &self.state, &self.mempool, now()) {
                            tracing::warn!(error = %e, "mining coordinator failed to regenerate after apply");
                        }
                    }
                }
                Err(e) => {
                    self.history.invalidate(id)?;
                    return Err(e.into());
                }
            }
        }

        self.readmit_best_effort(&progress.to_remove)?;
        Ok(())
    }

    /// Best-effort re-admission of transactions carried by rolled-back
    /// blocks: each non-coinbase transaction is re-validated against the
    /// (now post-reorg) state and re-admitted to the mempool if it still
    /// passes, silently dropped otherwise.
    fn readmit_best_effort(&mut self, removed: &[ModifierId]) -> Result<(), NodeError> {
        if removed.is_empty() {
            return Ok(());
        }
        let height = self.state.height()?.saturating_add(1);
        let last_block_timestamp = self.state.last_block_timestamp()?;
        let root_hash = self.state.current_version().unwrap_or_else(|| ModifierId::new([0u8; 32]));

        for id in removed {
            let Some(payload) = self.history.payload_by_id(*id)? else {
                continue;
            };
            for tx in payload.transactions.into_iter().filter(|tx| !tx.is_coinbase()) {
                let lookup = StateLookup(&self.state);
                let ctx = ValidationContext {
                    height,
                    last_block_timestamp,
                    root_hash,
                    min_fee: 1,
                };
                if validate_transaction(&tx, &lookup, &ctx).is_ok() {
                    let _ = self.mempool.put(tx, &lookup, &ctx);
                }
            }
        }
        Ok(())
    }
}

struct StateLookup<'a>(&'a AuthenticatedStateEngine);

impl BoxLookup for StateLookup<'_> {
    fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, TxError> {
        self.0.get_box(id).map_err(|e: StateError| TxError::Malformed(e.to_string()))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
