// Path: crates/node/tests/end_to_end.rs
//! End-to-end scenarios driving the orchestrator the way a real process
//! would: through `NodeHandle`, against engines opened the same way
//! `nyx-node`'s binary opens them. Mining itself is never exercised through
//! the reactive `MiningCoordinator` here (its regeneration is triggered only
//! by chain-tip changes, not by mempool admissions, so a test racing it
//! would be nondeterministic); instead each scenario assembles a candidate
//! against a live snapshot via `get_data_from_current_view` and mines it
//! inline before submitting it back.

use nyx_consensus::{assemble_candidate, ConsensusConfig};
use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::{HistoryConfig, HistoryEngine, Modifier as HistoryModifier};
use nyx_mempool::{Mempool, MempoolConfig};
use nyx_node::{NodeConfig, Orchestrator, SemanticallySuccessfulModifier};
use nyx_state::{AuthenticatedStateEngine, Modifier as StateModifier};
use nyx_storage::HistoryStore;
use nyx_test_utils::{genesis_keypair, open_state_store};
use nyx_types::boxes::{derive_box_id, AssetBox, AssetId};
use nyx_types::error::{MempoolError, NodeError, StateError};
use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::proposition::Proposition;
use nyx_types::tx::{Directive, Transaction, Unlocker};
use tempfile::tempdir;

fn test_config(rollback_window: usize) -> NodeConfig {
    NodeConfig {
        data_dir: tempdir().expect("tempdir").into_path(),
        rollback_window,
        mempool_max_size: 100,
        block_max_size: 2 * 1024 * 1024,
        max_time_drift_secs: 600,
        initial_difficulty: 1,
        difficulty_window: 16,
        target_block_time_secs: 30,
        min_fee: 1,
        coinbase_maturity: 0,
        block_reward: 100,
        worker_threads: 1,
        miner_key_path: None,
        mine_start_after: 0,
    }
}

/// Brute-forces the candidate's nonce at difficulty 1 (near-instant) and
/// fixes up the payload's `header_id` to match the winning header, mirroring
/// the fixup `WorkerPool` itself performs once a nonce is found.
fn mine(mut header: BlockHeader, payload: BlockPayload) -> (BlockHeader, BlockPayload) {
    while !header.satisfies_difficulty().expect("pow hash") {
        header.nonce = header.nonce.wrapping_add(1);
    }
    let header_id = header.id().expect("header id");
    let payload = BlockPayload { header_id, ..payload };
    (header, payload)
}

/// Runs a started orchestrator on a background thread and returns a handle
/// to it plus its event stream. The caller is responsible for calling
/// `handle.shutdown()` before the test exits.
fn spawn_orchestrator(
    config: &NodeConfig,
    miner: Option<Ed25519KeyPair>,
) -> (nyx_node::NodeHandle, tokio::sync::broadcast::Receiver<SemanticallySuccessfulModifier>, std::thread::JoinHandle<()>) {
    let (history, state, mempool) = nyx_node::open_engines(config).expect("open engines");
    let (orchestrator, handle, events) = Orchestrator::new(history, state, mempool, config, miner);
    let join = std::thread::spawn(move || orchestrator.run());
    (handle, events, join)
}

fn assemble_and_mine_next(handle: &nyx_node::NodeHandle, miner_seed: u8, config: ConsensusConfig, timestamp: u64) -> (BlockHeader, BlockPayload) {
    let assembled = handle
        .get_data_from_current_view(move |view| {
            let miner = genesis_keypair(miner_seed);
            assemble_candidate(view.history, view.state, view.mempool, &miner, &config, timestamp)
        })
        .expect("orchestrator alive")
        .expect("assemble candidate");
    mine(assembled.candidate.header, assembled.candidate.payload)
}

#[test]
fn genesis_bootstraps_the_chain() {
    let config = test_config(2_000);
    let (handle, mut events, join) = spawn_orchestrator(&config, None);

    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };
    let (header, payload) = assemble_and_mine_next(&handle, 1, consensus_config, 1_000);
    let genesis_id = header.id().expect("id");

    handle.submit_header(header).expect("submit genesis header");
    handle.submit_payload(payload).expect("submit genesis payload");

    let event = events.try_recv().expect("genesis applied event");
    assert_eq!(event.id, genesis_id);
    assert_eq!(event.height, 0);

    let height = handle.get_data_from_current_view(|view| view.state.height()).expect("view").expect("height");
    assert_eq!(height, 0);
    let best_full = handle.get_data_from_current_view(|view| view.history.best_full_id()).expect("view").expect("best full");
    assert_eq!(best_full, Some(genesis_id));

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

#[test]
fn a_payment_transaction_is_mined_and_confirmed() {
    let config = test_config(2_000);
    let (handle, mut events, join) = spawn_orchestrator(&config, None);
    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };

    let (genesis_header, genesis_payload) = assemble_and_mine_next(&handle, 2, consensus_config, 1_000);
    let coinbase_tx = genesis_payload.transactions[0].clone();
    handle.submit_header(genesis_header).expect("submit genesis header");
    handle.submit_payload(genesis_payload).expect("submit genesis payload");
    events.try_recv().expect("genesis applied");

    let coinbase_tx_id = coinbase_tx.id().expect("coinbase id");
    let coinbase_box = coinbase_tx.directives[0].to_box();
    let spent_box_id = derive_box_id(coinbase_tx_id, 0, &coinbase_box).expect("box id");

    let recipient = genesis_keypair(3);
    let mut spend = Transaction {
        fee: 10,
        timestamp: 1_010,
        unlockers: vec![Unlocker { box_id: spent_box_id, proof: None }],
        directives: vec![Directive::Transfer(AssetBox {
            amount: 90,
            asset: AssetId::Intrinsic,
            proposition: Proposition::PublicKey25519 { pubkey: recipient.public_key() },
        })],
        signature: [0u8; 64],
    };
    // The box being spent is the genesis coinbase, minted to miner seed 2;
    // only that key's signature can unlock it.
    spend.signature = genesis_keypair(2).sign(&spend.signing_digest().expect("digest")).expect("sign");
    let spend_id = spend.id().expect("spend id");
    handle.submit_transaction(spend).expect("admit spend");

    let (header, payload) = assemble_and_mine_next(&handle, 2, consensus_config, 1_020);
    assert_eq!(payload.transactions.len(), 2, "block should carry the spend plus its coinbase");
    assert!(payload.transactions.iter().any(|tx| tx.id().expect("id") == spend_id));

    handle.submit_header(header.clone()).expect("submit block1 header");
    handle.submit_payload(payload).expect("submit block1 payload");
    let event = events.try_recv().expect("block1 applied");
    assert_eq!(event.height, 1);

    let height = handle.get_data_from_current_view(|view| view.state.height()).expect("view").expect("height");
    assert_eq!(height, 1);
    let pool_size = handle.get_data_from_current_view(|view| view.mempool.size()).expect("view");
    assert_eq!(pool_size, 0, "confirmed spend must be removed from the mempool");

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

#[test]
fn double_spend_is_rejected_by_the_mempool() {
    let config = test_config(2_000);
    let (handle, mut events, join) = spawn_orchestrator(&config, None);
    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };

    let (genesis_header, genesis_payload) = assemble_and_mine_next(&handle, 4, consensus_config, 1_000);
    let coinbase_tx = genesis_payload.transactions[0].clone();
    handle.submit_header(genesis_header).expect("submit genesis header");
    handle.submit_payload(genesis_payload).expect("submit genesis payload");
    events.try_recv().expect("genesis applied");

    let coinbase_tx_id = coinbase_tx.id().expect("coinbase id");
    let coinbase_box = coinbase_tx.directives[0].to_box();
    let spent_box_id = derive_box_id(coinbase_tx_id, 0, &coinbase_box).expect("box id");

    // The box being spent is the genesis coinbase, minted to miner seed 4;
    // only that key's signature can unlock it.
    let make_spend = |fee: u64, timestamp: u64| {
        let mut tx = Transaction {
            fee,
            timestamp,
            unlockers: vec![Unlocker { box_id: spent_box_id, proof: None }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 100 - fee,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        };
        tx.signature = genesis_keypair(4).sign(&tx.signing_digest().expect("digest")).expect("sign");
        tx
    };

    handle.submit_transaction(make_spend(10, 1_010)).expect("first spend admitted");
    let err = handle.submit_transaction(make_spend(20, 1_011)).expect_err("second spend over the same box must be rejected");
    assert!(matches!(err, NodeError::Mempool(MempoolError::DoubleSpend(_))), "unexpected error: {err:?}");

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

/// Builds a fresh, fully independent (history, state, mempool) triple seeded
/// with `genesis`, then extends it with one block per entry in `timestamps`,
/// assembling and mining each through the same path a live node uses. Used
/// to construct a sibling branch offline, without disturbing the
/// orchestrator under test.
fn build_offline_branch(
    genesis: &(BlockHeader, BlockPayload),
    miner_seed: u8,
    consensus_config: ConsensusConfig,
    history_config: HistoryConfig,
    timestamps: &[u64],
) -> Vec<(BlockHeader, BlockPayload)> {
    let history_dir = tempdir().expect("tempdir");
    let history = HistoryEngine::new(
        HistoryStore::open(history_dir.path().join("history.redb")).expect("open history store"),
        history_config,
    );
    let (state_store, _state_dir) = open_state_store();
    let mut state = AuthenticatedStateEngine::open(state_store, 1, 10_000).expect("open state");
    let mempool = Mempool::new(MempoolConfig::default());
    let miner = genesis_keypair(miner_seed);

    history.append(HistoryModifier::Header(genesis.0.clone())).expect("append genesis header");
    history.append(HistoryModifier::Payload(genesis.1.clone())).expect("append genesis payload");
    state
        .apply(&StateModifier::Block { header: genesis.0.clone(), payload: genesis.1.clone() })
        .expect("apply genesis");

    let mut chain = vec![genesis.clone()];
    for &timestamp in timestamps {
        let assembled = assemble_candidate(&history, &state, &mempool, &miner, &consensus_config, timestamp).expect("assemble");
        let (header, payload) = mine(assembled.candidate.header, assembled.candidate.payload);
        history.append(HistoryModifier::Header(header.clone())).expect("append header");
        history.append(HistoryModifier::Payload(payload.clone())).expect("append payload");
        state
            .apply(&StateModifier::Block { header: header.clone(), payload: payload.clone() })
            .expect("apply block");
        chain.push((header, payload));
    }
    chain
}

#[test]
fn a_longer_sibling_branch_reorgs_the_chain() {
    let config = test_config(2_000);
    let history_config = HistoryConfig {
        initial_difficulty: config.initial_difficulty,
        difficulty_window: config.difficulty_window,
        target_block_time_secs: config.target_block_time_secs,
        max_time_drift_secs: config.max_time_drift_secs,
        block_max_size: config.block_max_size,
    };
    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };

    let genesis = build_offline_branch(
        &{
            // A throwaway branch builder also works to mint a standalone
            // genesis: it is just "a branch with zero extensions".
            let history_dir = tempdir().expect("tempdir");
            let history = HistoryEngine::new(
                HistoryStore::open(history_dir.path().join("history.redb")).expect("open history store"),
                history_config,
            );
            let (state_store, _state_dir) = open_state_store();
            let state = AuthenticatedStateEngine::open(state_store, 1, 10_000).expect("open state");
            let mempool = Mempool::new(MempoolConfig::default());
            let miner = genesis_keypair(5);
            let assembled = assemble_candidate(&history, &state, &mempool, &miner, &consensus_config, 1_000).expect("assemble genesis");
            mine(assembled.candidate.header, assembled.candidate.payload)
        },
        5,
        consensus_config,
        history_config,
        &[],
    )
    .remove(0);

    let branch_a = build_offline_branch(&genesis, 5, consensus_config, history_config, &[1_010, 1_020]);
    let branch_b = build_offline_branch(&genesis, 5, consensus_config, history_config, &[1_011, 1_021, 1_031]);

    let (handle, mut events, join) = spawn_orchestrator(&config, None);

    handle.submit_header(genesis.0.clone()).expect("submit genesis header");
    handle.submit_payload(genesis.1.clone()).expect("submit genesis payload");
    events.try_recv().expect("genesis applied");

    for (header, payload) in branch_a.iter().skip(1) {
        handle.submit_header(header.clone()).expect("submit branch a header");
        handle.submit_payload(payload.clone()).expect("submit branch a payload");
    }
    let a_tip_id = branch_a.last().expect("branch a has blocks").0.id().expect("id");
    let best_full = handle.get_data_from_current_view(|view| view.history.best_full_id()).expect("view").expect("best full");
    assert_eq!(best_full, Some(a_tip_id));

    for (header, payload) in branch_b.iter().skip(1) {
        handle.submit_header(header.clone()).expect("submit branch b header");
        handle.submit_payload(payload.clone()).expect("submit branch b payload");
    }
    let b_tip_id = branch_b.last().expect("branch b has blocks").0.id().expect("id");
    let best_full = handle.get_data_from_current_view(|view| view.history.best_full_id()).expect("view").expect("best full");
    assert_eq!(best_full, Some(b_tip_id), "the longer branch b must become the best full chain");

    let height = handle.get_data_from_current_view(|view| view.state.height()).expect("view").expect("height");
    assert_eq!(height, 2, "state must have rolled forward onto branch b's tip");

    let mut removed_count = 0;
    while events.try_recv().is_ok() {
        removed_count += 1;
    }
    assert!(removed_count >= branch_b.len() - 1, "every branch b block should have published an applied event");

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

#[test]
fn reorg_past_the_retained_rollback_window_is_reported_not_silently_applied() {
    let config = test_config(1);
    let history_config = HistoryConfig {
        initial_difficulty: config.initial_difficulty,
        difficulty_window: config.difficulty_window,
        target_block_time_secs: config.target_block_time_secs,
        max_time_drift_secs: config.max_time_drift_secs,
        block_max_size: config.block_max_size,
    };
    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };

    let (handle, mut events, join) = spawn_orchestrator(&config, None);
    let (genesis_header, genesis_payload) = assemble_and_mine_next(&handle, 6, consensus_config, 1_000);
    let genesis = (genesis_header, genesis_payload);
    handle.submit_header(genesis.0.clone()).expect("submit genesis header");
    handle.submit_payload(genesis.1.clone()).expect("submit genesis payload");
    events.try_recv().expect("genesis applied");

    let (block1_header, block1_payload) = assemble_and_mine_next(&handle, 6, consensus_config, 1_010);
    handle.submit_header(block1_header).expect("submit block1 header");
    handle.submit_payload(block1_payload).expect("submit block1 payload");
    events.try_recv().expect("block1 applied");

    // Genesis's committed version has now been evicted (keep_versions == 1),
    // so a reorg whose branch point is genesis can no longer roll back.
    let branch_b = build_offline_branch(&genesis, 6, consensus_config, history_config, &[1_011, 1_021]);

    handle.submit_header(branch_b[1].0.clone()).expect("submit b1 header");
    let progress = handle.submit_payload(branch_b[1].1.clone());
    assert!(progress.is_ok(), "a lone b1 cannot yet outscore the existing tip");

    handle.submit_header(branch_b[2].0.clone()).expect("submit b2 header");
    let err = handle.submit_payload(branch_b[2].1.clone()).expect_err("rollback past the retained window must fail");
    assert!(
        matches!(err, NodeError::State(StateError::NotApplicableVersion(_))),
        "unexpected error: {err:?}"
    );

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

#[test]
fn sync_compare_reports_the_remote_as_behind() {
    let config = test_config(2_000);
    let consensus_config = ConsensusConfig { block_reward: 100, ..ConsensusConfig::default() };
    let (handle, mut events, join) = spawn_orchestrator(&config, None);

    let (genesis_header, genesis_payload) = assemble_and_mine_next(&handle, 7, consensus_config, 1_000);
    let genesis_id = genesis_header.id().expect("id");
    handle.submit_header(genesis_header).expect("submit genesis header");
    handle.submit_payload(genesis_payload).expect("submit genesis payload");
    events.try_recv().expect("genesis applied");

    let (block1_header, block1_payload) = assemble_and_mine_next(&handle, 7, consensus_config, 1_010);
    handle.submit_header(block1_header).expect("submit block1 header");
    handle.submit_payload(block1_payload).expect("submit block1 payload");
    events.try_recv().expect("block1 applied");

    let remote = nyx_types::sync::SyncInfo::new(vec![genesis_id]).expect("sync info");
    let compare = handle.get_data_from_current_view(move |view| view.history.compare(&remote)).expect("view").expect("compare");
    assert_eq!(compare, nyx_types::sync::ChainCompare::Younger);

    handle.shutdown();
    join.join().expect("orchestrator thread");
}

