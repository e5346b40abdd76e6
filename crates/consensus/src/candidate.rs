// Path: crates/consensus/src/candidate.rs
//! Candidate-block assembly: the deterministic, single-pass algorithm that
//! turns a (history, state, mempool, miner key) snapshot into a signed,
//! nonce-less block ready for worker search.

use crate::config::ConsensusConfig;
use nyx_crypto::sign::Ed25519KeyPair;
use nyx_history::HistoryEngine;
use nyx_mempool::Mempool;
use nyx_state::AuthenticatedStateEngine;
use nyx_types::boxes::CoinbaseBox;
use nyx_types::error::ConsensusError;
use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::ids::{Height, ModifierId};
use nyx_types::tx::{Directive, Transaction};
use parity_scale_codec::Encode;

/// A fully assembled, signed block missing only a winning nonce: the unit
/// worker threads search over.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    /// The header, signed and PoW-incomplete (`nonce` is `0`, not yet a
    /// winning value).
    pub header: BlockHeader,
    /// The payload this header's `transactions_root` commits to.
    pub payload: BlockPayload,
}

impl CandidateBlock {
    /// The candidate's declared parent, `None` only for a genesis candidate.
    pub fn parent_id(&self) -> Option<ModifierId> {
        self.header.parent_id
    }
}

/// The outcome of one assembly pass: the candidate plus any mempool
/// transactions found invalid against the current state snapshot and
/// dropped during selection.
pub struct AssembledCandidate {
    /// The assembled candidate.
    pub candidate: CandidateBlock,
    /// Mempool transaction ids rejected by state re-validation during
    /// selection (`toDrop` in the design), already removed from the pool.
    pub dropped: Vec<ModifierId>,
}

/// Runs the eight-step candidate-assembly algorithm: resolves the parent and
/// target difficulty, greedily selects a fee-ordered, size-bounded,
/// state-valid prefix of the mempool, mints a coinbase transaction paying
/// the block subsidy plus collected fees to `miner`, requests an AD-proof
/// for the full transaction set, and signs the resulting header.
#[tracing::instrument(skip_all)]
pub fn assemble_candidate(
    history: &HistoryEngine,
    state: &AuthenticatedStateEngine,
    mempool: &Mempool,
    miner: &Ed25519KeyPair,
    config: &ConsensusConfig,
    timestamp: u64,
) -> Result<AssembledCandidate, ConsensusError> {
    let (parent, height) = resolve_parent(history, state)?;
    let difficulty = history.required_difficulty_after(parent.as_ref())?;

    let (selected, dropped, total_fees) = select_transactions(state, mempool, height, config)?;
    if !dropped.is_empty() {
        mempool.remove(&dropped);
    }

    let reward = config.block_reward.saturating_add(total_fees);
    let coinbase = Transaction {
        fee: 0,
        timestamp,
        unlockers: vec![],
        directives: vec![Directive::Coinbase(CoinbaseBox {
            height_lock: height.saturating_add(config.coinbase_maturity),
            nonce: 0,
            amount: reward,
            pubkey: miner.public_key(),
        })],
        signature: [0u8; 64],
    };

    let mut transactions = selected;
    transactions.push(coinbase);

    let (ad_proof, ad_digest) = state.proofs_for_transactions(&transactions, height)?;
    let ad_proofs_root = ad_proof.hash()?;

    let payload = BlockPayload {
        header_id: ModifierId::new([0u8; 32]),
        transactions,
    };
    let transactions_root = payload.transactions_root()?;

    let unsigned = BlockHeader {
        version: 1,
        parent_id: parent.as_ref().map(|h| h.id()).transpose()?,
        state_root: ad_digest,
        ad_proofs_root,
        transactions_root,
        timestamp,
        height,
        difficulty,
        nonce: 0,
        miner_pub_key: miner.public_key(),
        signature: [0u8; 64],
    };
    let signature = miner.sign(&unsigned.pre_hash()?)?;
    let header = BlockHeader { signature, ..unsigned };

    let payload = BlockPayload {
        header_id: header.id()?,
        transactions: payload.transactions,
    };

    tracing::debug!(height, txs = payload.transactions.len(), dropped = dropped.len(), "assembled candidate");
    Ok(AssembledCandidate {
        candidate: CandidateBlock { header, payload },
        dropped,
    })
}

fn resolve_parent(
    history: &HistoryEngine,
    state: &AuthenticatedStateEngine,
) -> Result<(Option<BlockHeader>, Height), ConsensusError> {
    if state.current_version().is_none() {
        return Ok((None, 0));
    }
    let tip_id = history.best_full_id()?.ok_or_else(|| {
        ConsensusError::SnapshotUnavailable("state is committed but history has no full tip".into())
    })?;
    let header = history.header_by_id(tip_id)?.ok_or_else(|| {
        ConsensusError::SnapshotUnavailable(format!("best full header {tip_id} not found"))
    })?;
    let next_height = header.height.saturating_add(1);
    Ok((Some(header), next_height))
}

/// Greedily selects a fee-ordered, size-bounded prefix of the mempool: each
/// candidate is re-validated against the current state snapshot (the
/// mempool's own admission check may be stale), and the first one that
/// doesn't fit the remaining size budget ends the prefix. No two selected
/// transactions can share an input, since the mempool itself never admits a
/// conflicting pair.
fn select_transactions(
    state: &AuthenticatedStateEngine,
    mempool: &Mempool,
    height: Height,
    config: &ConsensusConfig,
) -> Result<(Vec<Transaction>, Vec<ModifierId>, u64), ConsensusError> {
    let last_block_timestamp = state.last_block_timestamp()?;
    let budget = config.block_max_size.saturating_sub(config.reserved_for_coinbase);

    let mut selected = Vec::new();
    let mut dropped = Vec::new();
    let mut size_used = 0usize;
    let mut total_fees: u64 = 0;

    for tx in mempool.take(usize::MAX) {
        let size = tx.encode().len();
        if size_used.saturating_add(size) > budget {
            break;
        }
        match state.validate(&tx, height, last_block_timestamp) {
            Ok(()) => {
                size_used += size;
                total_fees = total_fees.saturating_add(tx.fee);
                selected.push(tx);
            }
            Err(e) => {
                tracing::debug!(error = %e, "dropping mempool transaction rejected by state");
                if let Ok(id) = tx.id() {
                    dropped.push(id);
                }
            }
        }
    }

    Ok((selected, dropped, total_fees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_history::{HistoryConfig, HistoryEngine};
    use nyx_mempool::MempoolConfig;
    use nyx_state::Modifier as AseModifier;
    use nyx_storage::HistoryStore;
    use nyx_tx::validate::{BoxLookup, ValidationContext};
    use nyx_types::boxes::{AssetBox, AssetId, Box as UtxoBox, BoxId};
    use nyx_types::error::{StateError, TxError};
    use nyx_types::proposition::Proposition;
    use nyx_types::tx::Unlocker;
    use nyx_test_utils::{build_and_apply_genesis, genesis_keypair, open_state_store};
    use tempfile::tempdir;

    fn history_engine() -> (HistoryEngine, tempfile::TempDir) {
        let dir = tempdir().expect("tempdir");
        let store = HistoryStore::open(dir.path().join("history.redb")).expect("open history store");
        (HistoryEngine::new(store, HistoryConfig::default()), dir)
    }

    struct StateLookup<'a>(&'a AuthenticatedStateEngine);

    impl BoxLookup for StateLookup<'_> {
        fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, TxError> {
            self.0.get_box(id).map_err(|e: StateError| TxError::Malformed(e.to_string()))
        }
    }

    #[test]
    fn genesis_candidate_mints_the_configured_block_reward() {
        let (history, _hdir) = history_engine();
        let (state_store, _sdir) = open_state_store();
        let state = AuthenticatedStateEngine::open(state_store, 1, 10).expect("open state");
        let mempool = Mempool::new(MempoolConfig::default());
        let miner = genesis_keypair(1);
        let config = ConsensusConfig {
            block_reward: 42,
            ..ConsensusConfig::default()
        };

        let assembled = assemble_candidate(&history, &state, &mempool, &miner, &config, 1).expect("assemble");
        assert!(assembled.dropped.is_empty());
        assert_eq!(assembled.candidate.header.height, 0);
        assert_eq!(assembled.candidate.header.parent_id, None);
        assert_eq!(assembled.candidate.payload.transactions.len(), 1);

        let coinbase = &assembled.candidate.payload.transactions[0];
        assert!(coinbase.is_coinbase());
        match &coinbase.directives[0] {
            Directive::Coinbase(cb) => assert_eq!(cb.amount, 42),
            other => panic!("expected a coinbase directive, got {other:?}"),
        }

        nyx_crypto::sign::verify(
            &miner.public_key(),
            &assembled.candidate.header.pre_hash().expect("pre_hash"),
            &assembled.candidate.header.signature,
        )
        .expect("candidate header signature verifies");
    }

    #[test]
    fn candidate_includes_a_mempool_transaction_and_collects_its_fee() {
        let (mut history, _hdir) = history_engine();
        let (state_store, _sdir) = open_state_store();
        let mut state = AuthenticatedStateEngine::open(state_store, 1, 10).expect("open state");
        let miner = genesis_keypair(2);

        let genesis = build_and_apply_genesis(&mut state, &miner, 5_000_000, 1, 1);
        history
            .append(nyx_history::Modifier::Header(genesis.header.clone()))
            .expect("append genesis header");
        history
            .append(nyx_history::Modifier::Payload(genesis.payload.clone()))
            .expect("append genesis payload");
        assert_eq!(
            history.best_full_id().expect("best full"),
            Some(genesis.header.id().expect("genesis id"))
        );

        let coinbase_tx = &genesis.payload.transactions[0];
        let coinbase_tx_id = coinbase_tx.id().expect("coinbase id");
        let coinbase_box = coinbase_tx.directives[0].to_box();
        let box_id = nyx_types::boxes::derive_box_id(coinbase_tx_id, 0, &coinbase_box).expect("box id");

        let mut spend = Transaction {
            fee: 10,
            timestamp: 2,
            unlockers: vec![Unlocker {
                box_id,
                proof: None,
            }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 4_999_990,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        };
        spend.signature = miner.sign(&spend.signing_digest().expect("digest")).expect("sign");

        let mempool = Mempool::new(MempoolConfig::default());
        let lookup = StateLookup(&state);
        let ctx = ValidationContext {
            height: 1,
            last_block_timestamp: state.last_block_timestamp().expect("last ts"),
            root_hash: state.current_version().expect("version"),
            min_fee: 1,
        };
        mempool.put(spend.clone(), &lookup, &ctx).expect("admit spend");

        let config = ConsensusConfig::default();
        let assembled = assemble_candidate(&history, &state, &mempool, &miner, &config, 3).expect("assemble");

        assert!(assembled.dropped.is_empty());
        assert_eq!(assembled.candidate.header.height, 1);
        assert_eq!(
            assembled.candidate.header.parent_id,
            Some(genesis.header.id().expect("genesis id"))
        );
        assert_eq!(assembled.candidate.payload.transactions.len(), 2);
        let spend_id = spend.id().expect("spend id");
        assert!(assembled
            .candidate
            .payload
            .transactions
            .iter()
            .any(|tx| tx.id().expect("id") == spend_id));

        let coinbase = assembled
            .candidate
            .payload
            .transactions
            .iter()
            .find(|tx| tx.is_coinbase())
            .expect("coinbase present");
        match &coinbase.directives[0] {
            Directive::Coinbase(cb) => {
                assert_eq!(cb.amount, config.block_reward + 10);
                assert_eq!(cb.height_lock, 1 + config.coinbase_maturity);
            }
            other => panic!("expected a coinbase directive, got {other:?}"),
        }

        // The candidate's AD-proof must actually apply against the real state.
        state
            .apply(&AseModifier::Block {
                header: assembled.candidate.header.clone(),
                payload: assembled.candidate.payload.clone(),
            })
            .expect("candidate applies cleanly");
    }
}
