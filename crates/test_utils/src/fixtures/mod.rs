// Path: crates/test_utils/src/fixtures/mod.rs
//! Reproducible building blocks for cross-crate tests: a deterministic
//! miner keypair, a genesis-block builder that exercises the same
//! candidate-assembly/mining path a real node runs, and `tempfile`-backed
//! store helpers.

use nyx_crypto::sign::Ed25519KeyPair;
use nyx_state::{AuthenticatedStateEngine, Modifier};
use nyx_storage::StateStore;
use nyx_types::boxes::CoinbaseBox;
use nyx_types::error::CryptoError;
use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::ids::ModifierId;
use nyx_types::tx::{Directive, Transaction};
use std::sync::Arc;
use tempfile::TempDir;

/// A deterministic Ed25519 keypair, seeded with `seed` repeated across all
/// 32 bytes, for tests that need a stable miner/owner identity across runs.
pub fn genesis_keypair(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[seed; 32])
        .unwrap_or_else(|_| panic!("deterministic seed {seed} must produce a valid keypair"))
}

/// Opens a fresh [`StateStore`] backed by a temporary directory, returning
/// the store alongside the guard that keeps the directory alive.
pub fn open_state_store() -> (Arc<StateStore>, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::open(dir.path().join("state.redb")).expect("open state store");
    (Arc::new(store), dir)
}

/// Iterates `nonce` from zero until `header` satisfies its own declared
/// difficulty, mutating it in place. Intended for low-difficulty test
/// fixtures only; a real miner's worker pool runs the same search in
/// parallel across threads.
pub fn mine_header(header: &mut BlockHeader) -> Result<(), CryptoError> {
    loop {
        if header.satisfies_difficulty()? {
            return Ok(());
        }
        header.nonce = header.nonce.wrapping_add(1);
    }
}

/// A fully assembled, mined genesis block, built and applied against
/// `ase`: exercises end-to-end scenario #1 (genesis bootstrap) without any
/// network dependency.
pub struct GenesisFixture {
    /// The mined genesis header.
    pub header: BlockHeader,
    /// The genesis payload (a single coinbase transaction).
    pub payload: BlockPayload,
}

/// Builds, mines, and applies a genesis block paying `reward` to `miner`'s
/// public key against `ase`.
pub fn build_and_apply_genesis(
    ase: &mut AuthenticatedStateEngine,
    miner: &Ed25519KeyPair,
    reward: u64,
    difficulty: u64,
    timestamp: u64,
) -> GenesisFixture {
    let coinbase = Transaction {
        fee: 0,
        timestamp,
        unlockers: vec![],
        directives: vec![Directive::Coinbase(CoinbaseBox {
            height_lock: 0,
            nonce: 0,
            amount: reward,
            pubkey: miner.public_key(),
        })],
        signature: [0u8; 64],
    };
    let payload = BlockPayload {
        header_id: ModifierId::new([0u8; 32]),
        transactions: vec![coinbase],
    };

    let (proof, digest) = ase
        .proofs_for_transactions(&payload.transactions, 0)
        .expect("proofs_for_transactions");
    let ad_proofs_root = proof.hash().expect("proof hash");
    let transactions_root = payload.transactions_root().expect("transactions root");

    let unsigned = BlockHeader {
        version: 1,
        parent_id: None,
        state_root: digest,
        ad_proofs_root,
        transactions_root,
        timestamp,
        height: 0,
        difficulty,
        nonce: 0,
        miner_pub_key: miner.public_key(),
        signature: [0u8; 64],
    };
    let signature = miner
        .sign(&unsigned.pre_hash().expect("pre_hash"))
        .expect("sign");
    let mut header = BlockHeader {
        signature,
        ..unsigned
    };
    mine_header(&mut header).expect("mine genesis");

    ase.apply(&Modifier::Block {
        header: header.clone(),
        payload: payload.clone(),
    })
    .expect("apply genesis");

    GenesisFixture { header, payload }
}
