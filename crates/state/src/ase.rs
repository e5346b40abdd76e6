// Path: crates/state/src/ase.rs
//! The Authenticated State Engine: the UTXO dictionary, its apply/rollback
//! lifecycle, transaction validation, and AD-proof construction.
//!
//! The dictionary itself lives in [`crate::IAVLTree`]; this module layers
//! the block-application algorithm, the `hash(stateRoot) -> versionId`
//! bookkeeping, and the proof-bundle format on top of it.

use crate::tree::iavl::IavlProof;
use crate::IAVLTree;
use nyx_storage::StateStore;
use nyx_types::boxes::{derive_box_id, Box as UtxoBox, BoxId};
use nyx_types::codec::{from_bytes_canonical, to_bytes_canonical};
use nyx_types::error::{StateError, TxError};
use nyx_types::header::{ADDigest, ADProof, BlockHeader, BlockPayload};
use nyx_types::ids::{Height, ModifierId, VersionTag};
use nyx_types::tx::Transaction;
use nyx_tx::validate::{validate_transaction, BoxLookup, ValidationContext};
use parity_scale_codec::{Decode, Encode};
use std::sync::Arc;

/// What `AuthenticatedStateEngine::apply` accepts: either a full block, or a
/// bare header advancing the version marker without touching the
/// dictionary (the "digest-only" mode named in the component design).
#[derive(Debug, Clone)]
pub enum Modifier {
    /// A header with no accompanying payload.
    Header(BlockHeader),
    /// A header plus the payload it commits to.
    Block {
        /// The header committing to `payload`.
        header: BlockHeader,
        /// The transactions to validate and apply.
        payload: BlockPayload,
    },
}

/// One entry in an AD-proof: the membership (spend) or non-membership
/// (create) claim made against the tree as of the moment this key was
/// touched during block application.
#[derive(Encode, Decode, Clone, Debug)]
struct ProofEntry {
    box_id: [u8; 33],
    proof: IavlProof,
}

#[derive(Encode, Decode, Clone, Debug, Default)]
struct ProofBundle {
    entries: Vec<ProofEntry>,
}

fn backend<E: ToString>(e: E) -> StateError {
    StateError::Backend(e.to_string())
}

/// Read access to the tree for `nyx-tx`'s `BoxLookup` trait.
struct TreeLookup<'a> {
    tree: &'a IAVLTree,
}

impl BoxLookup for TreeLookup<'_> {
    fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, TxError> {
        match self
            .tree
            .get(id.as_ref())
            .map_err(|e| TxError::Malformed(e.to_string()))?
        {
            Some(bytes) => {
                let b = from_bytes_canonical(&bytes).map_err(TxError::Malformed)?;
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }
}

/// The Authenticated State Engine: a persistent batched AVL+ prover over the
/// UTXO set, backed by a [`StateStore`].
pub struct AuthenticatedStateEngine {
    store: Arc<StateStore>,
    tree: IAVLTree,
    min_fee: u64,
    keep_versions: usize,
    current_version: Option<VersionTag>,
}

impl AuthenticatedStateEngine {
    /// Opens the engine against `store`, loading whatever version is
    /// currently committed (or starting empty, for a fresh store).
    pub fn open(store: Arc<StateStore>, min_fee: u64, keep_versions: usize) -> Result<Self, StateError> {
        let tree = IAVLTree::with_store(store.clone())?;
        let current_version = store
            .best_state_version()
            .map_err(backend)?
            .map(VersionTag::new);
        Ok(Self {
            store,
            tree,
            min_fee,
            keep_versions,
            current_version,
        })
    }

    /// The engine's current digest: the dictionary's root hash plus tree height.
    pub fn digest(&self) -> Result<ADDigest, StateError> {
        Ok(ADDigest::new(self.tree.root_hash_or_empty(), self.tree.tree_height()?))
    }

    /// The height of the state currently committed.
    pub fn height(&self) -> Result<Height, StateError> {
        self.store.state_height().map_err(backend)
    }

    /// The timestamp of the most recently applied block.
    pub fn last_block_timestamp(&self) -> Result<u64, StateError> {
        self.store.last_block_timestamp().map_err(backend)
    }

    /// The version marker of the state currently committed, if any block has
    /// been applied yet.
    pub fn current_version(&self) -> Option<VersionTag> {
        self.current_version
    }

    /// An unauthenticated lookup of a box by id against the current
    /// dictionary, used by callers (mempool admission, candidate assembly)
    /// that don't need an accompanying proof.
    pub fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, StateError> {
        match self.tree.get(id.as_ref())? {
            Some(bytes) => Ok(Some(from_bytes_canonical(&bytes).map_err(StateError::Decode)?)),
            None => Ok(None),
        }
    }

    /// Runs the three-step `validate` algorithm against the current digest.
    pub fn validate(&self, tx: &Transaction, height: Height, last_block_timestamp: u64) -> Result<(), StateError> {
        let lookup = TreeLookup { tree: &self.tree };
        let ctx = ValidationContext {
            height,
            last_block_timestamp,
            root_hash: self.current_version.unwrap_or_else(|| VersionTag::new([0u8; 32])),
            min_fee: self.min_fee,
        };
        validate_transaction(tx, &lookup, &ctx)?;
        Ok(())
    }

    /// Accepts `modifier`, persisting the resulting version atomically.
    /// On any error the engine is left exactly at its pre-call digest: a
    /// full block is applied against a scratch clone of the dictionary and
    /// only swapped in once every check has passed.
    #[tracing::instrument(skip_all, fields(height))]
    pub fn apply(&mut self, modifier: &Modifier) -> Result<(), StateError> {
        match modifier {
            Modifier::Header(header) => {
                tracing::Span::current().record("height", header.height);
                let version = header.id().map_err(backend)?;
                let digest = header.state_root;
                let digest_hash = digest.hash().map_err(backend)?;
                self.store
                    .commit_version(
                        *version.as_bytes(),
                        digest.0,
                        digest_hash,
                        &[],
                        header.height,
                        header.timestamp,
                        self.keep_versions,
                    )
                    .map_err(backend)?;
                self.current_version = Some(version);
                Ok(())
            }
            Modifier::Block { header, payload } => {
                tracing::Span::current().record("height", header.height);
                let mut working = self.tree.clone();
                let last_ts = self.store.last_block_timestamp().map_err(backend)?;
                let proof = apply_payload(
                    &mut working,
                    header.height,
                    last_ts,
                    self.min_fee,
                    self.current_version,
                    &payload.transactions,
                )?;

                let digest = ADDigest::new(working.root_hash_or_empty(), working.tree_height()?);
                if digest.0 != header.state_root.0 {
                    return Err(StateError::DigestMismatch {
                        expected: hex::encode(header.state_root.0),
                        got: hex::encode(digest.0),
                    });
                }
                let proof_hash = proof.hash().map_err(backend)?;
                if proof_hash != header.ad_proofs_root {
                    return Err(StateError::ProofHashMismatch);
                }

                let version = header.id().map_err(backend)?;
                let digest_hash = digest.hash().map_err(backend)?;
                let new_nodes = working.new_nodes()?;
                self.store
                    .commit_version(
                        *version.as_bytes(),
                        digest.0,
                        digest_hash,
                        &new_nodes,
                        header.height,
                        header.timestamp,
                        self.keep_versions,
                    )
                    .map_err(backend)?;

                working.clear_cache();
                self.tree = working;
                self.current_version = Some(version);
                tracing::debug!(txs = payload.transactions.len(), "applied block");
                Ok(())
            }
        }
    }

    /// Resets the engine to a previously committed version. `state_height`
    /// and `last_block_timestamp` are the values the History Engine recorded
    /// for that version's header, since the store only retains the most
    /// recent values under those keys.
    pub fn rollback_to(
        &mut self,
        version: VersionTag,
        state_height: Height,
        last_block_timestamp: u64,
    ) -> Result<(), StateError> {
        let digest = self
            .store
            .digest_for_version(version.as_bytes())
            .map_err(backend)?
            .ok_or_else(|| StateError::NotApplicableVersion(version.to_string()))?;

        self.store
            .rewind_to(*version.as_bytes(), state_height, last_block_timestamp)
            .map_err(backend)?;

        let mut root = [0u8; 32];
        root.copy_from_slice(&digest[..32]);
        let root = (root != [0u8; 32]).then_some(root);
        self.tree.load_root(root);
        self.current_version = Some(version);
        Ok(())
    }

    /// Speculatively applies `txs` at `height` against a scratch clone of
    /// the dictionary, returning the resulting proof and digest without
    /// mutating the committed state.
    pub fn proofs_for_transactions(
        &self,
        txs: &[Transaction],
        height: Height,
    ) -> Result<(ADProof, ADDigest), StateError> {
        let mut working = self.tree.clone();
        let last_ts = self.store.last_block_timestamp().map_err(backend)?;
        let proof = apply_payload(
            &mut working,
            height,
            last_ts,
            self.min_fee,
            self.current_version,
            txs,
        )?;
        let digest = ADDigest::new(working.root_hash_or_empty(), working.tree_height()?);
        Ok((proof, digest))
    }

    /// Every retained version, oldest first.
    pub fn rollback_versions(&self) -> Result<Vec<VersionTag>, StateError> {
        self.store
            .rollback_versions()
            .map(|versions| versions.into_iter().map(VersionTag::new).collect())
            .map_err(backend)
    }
}

/// Validates and applies `transactions` against `working`, in order,
/// returning the AD-proof witnessing every spend/create performed. Shared by
/// `apply` (against a scratch clone, swapped in on success) and
/// `proofs_for_transactions` (against a scratch clone, always discarded).
fn apply_payload(
    working: &mut IAVLTree,
    height: Height,
    last_block_timestamp: u64,
    min_fee: u64,
    root_tag: Option<VersionTag>,
    transactions: &[Transaction],
) -> Result<ADProof, StateError> {
    working.set_version(height);
    let ctx = ValidationContext {
        height,
        last_block_timestamp,
        root_hash: root_tag.unwrap_or_else(|| VersionTag::new([0u8; 32])),
        min_fee,
    };

    let mut entries = Vec::new();
    for tx in transactions {
        {
            let lookup = TreeLookup { tree: working };
            validate_transaction(tx, &lookup, &ctx)?;
        }

        let tx_id = tx.id().map_err(backend)?;
        for u in &tx.unlockers {
            let proof = working.create_proof(u.box_id.as_ref())?;
            entries.push(ProofEntry { box_id: u.box_id.0, proof });
            working.remove(u.box_id.as_ref())?;
        }
        for (index, d) in tx.directives.iter().enumerate() {
            let created = d.to_box();
            let box_id = derive_box_id(tx_id, index as u32, &created)?;
            let proof = working.create_proof(box_id.as_ref())?;
            entries.push(ProofEntry { box_id: box_id.0, proof });
            let bytes = to_bytes_canonical(&created).map_err(StateError::Decode)?;
            working.insert(box_id.as_ref(), &bytes)?;
        }
    }

    Ok(ADProof(ProofBundle { entries }.encode()))
}
