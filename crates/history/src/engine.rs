// Path: crates/history/src/engine.rs
//! The History Engine façade: header and payload ingestion share one
//! store and one best-chain selection algorithm, exposed as a single
//! struct rather than as inheriting `HeadersProcessor`/`PayloadProcessor`
//! types, per the trait-composition design note.

use crate::config::HistoryConfig;
use crate::progress::{Modifier, ProgressInfo, SemanticValidity};
use nyx_crypto::sign::verify as verify_signature;
use nyx_storage::history_store::Validity;
use nyx_storage::HistoryStore;
use nyx_types::codec::{from_bytes_canonical, to_bytes_canonical};
use nyx_types::error::ChainError;
use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::ids::{Height, ModifierId};
use nyx_types::sync::{ChainCompare, SyncInfo};
use std::collections::HashSet;

fn decode_header(bytes: &[u8]) -> Result<BlockHeader, ChainError> {
    from_bytes_canonical(bytes).map_err(ChainError::MalformedHeader)
}

fn decode_payload(bytes: &[u8]) -> Result<BlockPayload, ChainError> {
    from_bytes_canonical(bytes).map_err(ChainError::MalformedHeader)
}

fn encode<T: parity_scale_codec::Encode>(v: &T) -> Result<Vec<u8>, ChainError> {
    to_bytes_canonical(v).map_err(ChainError::MalformedHeader)
}

/// The History Engine: accepts headers and payloads, persists them, tracks
/// the best header chain and the best *full* (payload-backed) chain, and
/// reports the `ProgressInfo` instructions that drive the Authenticated
/// State Engine.
pub struct HistoryEngine {
    store: HistoryStore,
    config: HistoryConfig,
}

impl HistoryEngine {
    /// Wraps an already-opened store with the given acceptance parameters.
    pub fn new(store: HistoryStore, config: HistoryConfig) -> Self {
        Self { store, config }
    }

    /// The current best header-chain tip, if any header has been accepted.
    pub fn best_header_id(&self) -> Result<Option<ModifierId>, ChainError> {
        Ok(self.store.best_header().map_err(storage_err)?.map(ModifierId::new))
    }

    /// The current best full-chain tip, if any block has been fully applied.
    pub fn best_full_id(&self) -> Result<Option<ModifierId>, ChainError> {
        Ok(self.store.best_full().map_err(storage_err)?.map(ModifierId::new))
    }

    /// Looks up a header by id.
    pub fn header_by_id(&self, id: ModifierId) -> Result<Option<BlockHeader>, ChainError> {
        match self.store.get_header(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode_header(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Looks up a payload by its header's id.
    pub fn payload_by_id(&self, id: ModifierId) -> Result<Option<BlockPayload>, ChainError> {
        match self.store.get_payload(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(decode_payload(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether `modifier` can be applied right now without queuing: a
    /// header is applicable if its parent is known (or it declares no
    /// parent at all); a payload is applicable if its header is known.
    pub fn applicable(&self, modifier: &Modifier) -> Result<bool, ChainError> {
        match modifier {
            Modifier::Header(h) => match h.parent_id {
                None => Ok(true),
                Some(parent) => Ok(self.store.has_header(parent.as_bytes()).map_err(storage_err)?),
            },
            Modifier::Payload(p) => Ok(self
                .store
                .has_header(p.header_id.as_bytes())
                .map_err(storage_err)?),
        }
    }

    /// Accepts `modifier`, returning the resulting `ProgressInfo`. Calling
    /// this twice with the same already-known modifier is a no-op that
    /// returns an empty `ProgressInfo`, matching the idempotence property.
    #[tracing::instrument(skip_all)]
    pub fn append(&self, modifier: Modifier) -> Result<ProgressInfo, ChainError> {
        match modifier {
            Modifier::Header(header) => self.append_header(header),
            Modifier::Payload(payload) => self.append_payload(payload),
        }
    }

    fn append_header(&self, header: BlockHeader) -> Result<ProgressInfo, ChainError> {
        let id = header.id().map_err(|_| ChainError::InvalidSignature)?;
        if self.store.has_header(id.as_bytes()).map_err(storage_err)? {
            return Ok(ProgressInfo::empty());
        }

        let parent = match header.parent_id {
            None => None,
            Some(parent_id) => {
                let bytes = self
                    .store
                    .get_header(parent_id.as_bytes())
                    .map_err(storage_err)?
                    .ok_or_else(|| ChainError::UnknownParent(parent_id.to_string()))?;
                Some(decode_header(&bytes)?)
            }
        };

        self.validate_header_fields(&header, parent.as_ref())?;

        let parent_score = match header.parent_id {
            None => 0u128,
            Some(p) => self.store.score(p.as_bytes()).map_err(storage_err)?.unwrap_or(0),
        };
        let score = parent_score + u128::from(header.difficulty);

        self.store
            .put_header(
                *id.as_bytes(),
                header.parent_id.map(|p| *p.as_bytes()),
                &encode(&header)?,
                score,
            )
            .map_err(storage_err)?;
        self.store
            .set_validity(*id.as_bytes(), Validity::Unknown)
            .map_err(storage_err)?;

        let current_best = self.store.best_header().map_err(storage_err)?;
        let becomes_best = match current_best {
            None => true,
            Some(cur) => score > self.store.score(&cur).map_err(storage_err)?.unwrap_or(0),
        };
        if becomes_best {
            self.store.set_best_header(*id.as_bytes()).map_err(storage_err)?;
        }

        self.try_advance_full_chain()
    }

    fn append_payload(&self, payload: BlockPayload) -> Result<ProgressInfo, ChainError> {
        let header_bytes = self
            .store
            .get_header(payload.header_id.as_bytes())
            .map_err(storage_err)?
            .ok_or_else(|| ChainError::UnknownParent(payload.header_id.to_string()))?;
        let header = decode_header(&header_bytes)?;

        if self
            .store
            .get_payload(payload.header_id.as_bytes())
            .map_err(storage_err)?
            .is_some()
        {
            return Ok(ProgressInfo::empty());
        }

        let transactions_root = payload
            .transactions_root()
            .map_err(|_| ChainError::MalformedHeader("payload digest failed".into()))?;
        if transactions_root != header.transactions_root {
            return Err(ChainError::MalformedHeader(
                "payload transactions_root does not match its header".into(),
            ));
        }

        let size = encode(&payload)?.len();
        if size > self.config.block_max_size {
            return Err(ChainError::BlockTooLarge {
                got: size,
                max: self.config.block_max_size,
            });
        }

        self.store
            .put_payload(*payload.header_id.as_bytes(), &encode(&payload)?)
            .map_err(storage_err)?;

        self.try_advance_full_chain()
    }

    /// Marks `id` semantically invalid (a `StateInvalid` failure observed by
    /// the Authenticated State Engine after acceptance) and recomputes the
    /// best full chain, which may fall back to a sibling branch.
    pub fn invalidate(&self, id: ModifierId) -> Result<ProgressInfo, ChainError> {
        self.store.set_validity(*id.as_bytes(), Validity::Invalid).map_err(storage_err)?;
        self.try_advance_full_chain()
    }

    /// Marks `id` semantically valid, following a successful Authenticated
    /// State Engine apply.
    pub fn mark_valid(&self, id: ModifierId) -> Result<(), ChainError> {
        self.store.set_validity(*id.as_bytes(), Validity::Valid).map_err(storage_err)
    }

    /// The semantic-validity classification of `id`.
    pub fn is_semantically_valid(&self, id: ModifierId) -> Result<SemanticValidity, ChainError> {
        if !self.store.has_header(id.as_bytes()).map_err(storage_err)? {
            return Ok(SemanticValidity::Absent);
        }
        Ok(match self.store.validity(id.as_bytes()).map_err(storage_err)?.unwrap_or(Validity::Unknown) {
            Validity::Unknown => SemanticValidity::Unknown,
            Validity::Valid => SemanticValidity::Valid,
            Validity::Invalid => SemanticValidity::Invalid,
        })
    }

    /// Compares `remote` against our best header chain, from our own point
    /// of view: whether we hold headers the remote lacks (`Younger`), the
    /// remote holds headers we lack (`Older`), the chains agree (`Equal`),
    /// or share no common point at all (`Nonsense`).
    pub fn compare(&self, remote: &SyncInfo) -> Result<ChainCompare, ChainError> {
        let our_tip = self.store.best_header().map_err(storage_err)?;
        if remote.is_empty() {
            return Ok(if our_tip.is_none() {
                ChainCompare::Equal
            } else {
                ChainCompare::Younger
            });
        }
        let Some(our_tip) = our_tip else {
            return Ok(ChainCompare::Older);
        };
        if remote.tip() == Some(ModifierId::new(our_tip)) {
            return Ok(ChainCompare::Equal);
        }

        let ancestors: HashSet<[u8; 32]> = self.chain_to_genesis(our_tip)?.into_iter().collect();
        if let Some(tip) = remote.tip() {
            if ancestors.contains(tip.as_bytes()) {
                return Ok(ChainCompare::Younger);
            }
        }
        let found_older = remote
            .header_ids()
            .iter()
            .rev()
            .any(|id| ancestors.contains(id.as_bytes()));
        Ok(if found_older {
            ChainCompare::Older
        } else {
            ChainCompare::Nonsense
        })
    }

    /// The next `size` header ids the remote must download, anchored at the
    /// most recent id of `remote` that lies on our best chain.
    pub fn continuation_ids(
        &self,
        remote: &SyncInfo,
        size: usize,
    ) -> Result<Option<Vec<ModifierId>>, ChainError> {
        let our_tip = self.store.best_header().map_err(storage_err)?;
        let Some(our_tip) = our_tip else {
            return Ok(Some(remote.starting_points().iter().take(size).copied().collect()));
        };
        let forward: Vec<[u8; 32]> = {
            let mut c = self.chain_to_genesis(our_tip)?;
            c.reverse();
            c
        };
        if remote.is_empty() {
            return Ok(Some(forward.iter().take(size).map(|b| ModifierId::new(*b)).collect()));
        }
        let ancestor_set: HashSet<[u8; 32]> = forward.iter().copied().collect();
        let anchor = remote
            .header_ids()
            .iter()
            .rev()
            .find(|id| ancestor_set.contains(id.as_bytes()));
        let Some(anchor) = anchor else {
            return Ok(None);
        };
        let pos = forward
            .iter()
            .position(|id| id == anchor.as_bytes())
            .unwrap_or(forward.len());
        Ok(Some(
            forward
                .iter()
                .skip(pos + 1)
                .take(size)
                .map(|b| ModifierId::new(*b))
                .collect(),
        ))
    }

    /// Every maximal forward chain of known headers starting at `header`,
    /// used for fork analysis.
    pub fn continuation_header_chains(&self, header: ModifierId) -> Result<Vec<Vec<ModifierId>>, ChainError> {
        let children = self.store.children_of(header.as_bytes()).map_err(storage_err)?;
        if children.is_empty() {
            return Ok(vec![vec![header]]);
        }
        let mut chains = Vec::new();
        for child in children {
            for mut sub in self.continuation_header_chains(ModifierId::new(child))? {
                let mut chain = vec![header];
                chain.append(&mut sub);
                chains.push(chain);
            }
        }
        Ok(chains)
    }

    /// Computes `requiredDifficultyAfter(parent)`: the PoW target a header
    /// extending `parent` must declare. `None` means genesis.
    pub fn required_difficulty_after(&self, parent: Option<&BlockHeader>) -> Result<u64, ChainError> {
        let Some(parent) = parent else {
            return Ok(self.config.initial_difficulty);
        };
        let window = self.collect_window(parent, self.config.difficulty_window)?;
        if window.len() < 2 {
            return Ok(parent.difficulty);
        }
        let oldest = window.first().ok_or_else(|| ChainError::MalformedHeader("empty window".into()))?;
        let newest = window.last().ok_or_else(|| ChainError::MalformedHeader("empty window".into()))?;
        let actual_span = newest.timestamp.saturating_sub(oldest.timestamp).max(1);
        let expected_span = self.config.target_block_time_secs * (window.len() as u64 - 1);
        let avg_difficulty: u128 =
            window.iter().map(|h| u128::from(h.difficulty)).sum::<u128>() / window.len() as u128;
        let retargeted = avg_difficulty
            .saturating_mul(u128::from(expected_span))
            / u128::from(actual_span);
        let retargeted = u64::try_from(retargeted).unwrap_or(u64::MAX);
        let max_next = parent.difficulty.saturating_mul(4);
        let min_next = (parent.difficulty / 4).max(1);
        Ok(retargeted.clamp(min_next, max_next))
    }

    fn collect_window(&self, parent: &BlockHeader, window: usize) -> Result<Vec<BlockHeader>, ChainError> {
        let mut out = vec![parent.clone()];
        let mut current = parent.clone();
        while out.len() < window {
            let Some(parent_id) = current.parent_id else { break };
            let bytes = self
                .store
                .get_header(parent_id.as_bytes())
                .map_err(storage_err)?
                .ok_or_else(|| ChainError::UnknownParent(parent_id.to_string()))?;
            current = decode_header(&bytes)?;
            out.push(current.clone());
        }
        out.reverse();
        Ok(out)
    }

    fn validate_header_fields(&self, header: &BlockHeader, parent: Option<&BlockHeader>) -> Result<(), ChainError> {
        if let Some(parent) = parent {
            if header.timestamp <= parent.timestamp {
                return Err(ChainError::InvalidTimestamp);
            }
        }
        // Network-time skew (max_time_drift_secs) is checked by the caller,
        // which knows wall-clock "now"; this only enforces monotonicity.

        let expected_difficulty = self.required_difficulty_after(parent)?;
        if header.difficulty != expected_difficulty {
            return Err(ChainError::DifficultyMismatch {
                expected: expected_difficulty,
                got: header.difficulty,
            });
        }

        let satisfies = header.satisfies_difficulty().map_err(|_| ChainError::PowNotSatisfied)?;
        if !satisfies {
            return Err(ChainError::PowNotSatisfied);
        }

        let pre_hash = header.pre_hash().map_err(|_| ChainError::InvalidSignature)?;
        verify_signature(&header.miner_pub_key, &pre_hash, &header.signature)
            .map_err(|_| ChainError::InvalidSignature)?;

        Ok(())
    }

    /// The ids from `tip` back to genesis, inclusive, most recent first.
    fn chain_to_genesis(&self, tip: [u8; 32]) -> Result<Vec<[u8; 32]>, ChainError> {
        let mut out = vec![tip];
        let mut current = tip;
        loop {
            let bytes = self
                .store
                .get_header(&current)
                .map_err(storage_err)?
                .ok_or_else(|| ChainError::UnknownParent(hex::encode(current)))?;
            let header = decode_header(&bytes)?;
            match header.parent_id {
                None => break,
                Some(parent) => {
                    current = *parent.as_bytes();
                    out.push(current);
                }
            }
        }
        Ok(out)
    }

    /// Recomputes the best *full* chain from the best header chain: the
    /// longest payload-backed, non-invalid prefix reachable from genesis
    /// along the current best header chain, switching to it (and emitting
    /// the `ProgressInfo` that drives the rollback/apply sequence) only if
    /// it scores strictly higher than the chain we are currently on.
    fn try_advance_full_chain(&self) -> Result<ProgressInfo, ChainError> {
        let Some(best_header_id) = self.store.best_header().map_err(storage_err)? else {
            return Ok(ProgressInfo::empty());
        };
        let mut forward = self.chain_to_genesis(best_header_id)?;
        forward.reverse(); // genesis .. tip

        let mut full_tip_index = None;
        for (i, id) in forward.iter().enumerate() {
            let invalid = matches!(
                self.store.validity(id).map_err(storage_err)?,
                Some(Validity::Invalid)
            );
            if invalid || self.store.get_payload(id).map_err(storage_err)?.is_none() {
                break;
            }
            full_tip_index = Some(i);
        }
        let Some(full_tip_index) = full_tip_index else {
            return Ok(ProgressInfo::empty());
        };
        let desired_tip = forward[full_tip_index];
        let desired_score = self.store.score(&desired_tip).map_err(storage_err)?.unwrap_or(0);

        let current_full = self.store.best_full().map_err(storage_err)?;
        if current_full == Some(desired_tip) {
            return Ok(ProgressInfo::empty());
        }

        // `apply_start` is the index in `forward` of the first header to
        // apply; `to_remove`/`branch_idx` are only meaningful when we are
        // replacing an already-applied chain rather than bootstrapping.
        let (to_remove, apply_start, branch_idx) = match current_full {
            None => (Vec::new(), 0usize, None),
            Some(cur) => {
                let current_score = self.store.score(&cur).map_err(storage_err)?.unwrap_or(0);
                if desired_score <= current_score {
                    return Ok(ProgressInfo::empty());
                }
                let current_chain = self.chain_to_genesis(cur)?; // tip .. genesis
                let current_set: HashSet<[u8; 32]> = current_chain.iter().copied().collect();
                let branch_idx = (0..=full_tip_index)
                    .rev()
                    .find(|i| current_set.contains(&forward[*i]))
                    .unwrap_or(0);
                let to_remove: Vec<ModifierId> = current_chain
                    .into_iter()
                    .take_while(|id| *id != forward[branch_idx])
                    .map(ModifierId::new)
                    .collect();
                (to_remove, branch_idx + 1, Some(branch_idx))
            }
        };

        for id in &to_remove {
            if let Some(header) = self.header_by_id(*id)? {
                self.store.set_best_chain_at(header.height, None).map_err(storage_err)?;
            }
        }

        let mut to_apply = Vec::with_capacity(full_tip_index.saturating_sub(apply_start) + 1);
        for i in apply_start..=full_tip_index {
            let id = forward[i];
            let header_bytes = self
                .store
                .get_header(&id)
                .map_err(storage_err)?
                .ok_or_else(|| ChainError::UnknownParent(hex::encode(id)))?;
            let payload_bytes = self
                .store
                .get_payload(&id)
                .map_err(storage_err)?
                .ok_or_else(|| ChainError::UnknownParent(hex::encode(id)))?;
            let header = decode_header(&header_bytes)?;
            let payload = decode_payload(&payload_bytes)?;
            self.store.set_best_chain_at(header.height, Some(id)).map_err(storage_err)?;
            to_apply.push((header, payload));
        }

        self.store.set_best_full(desired_tip).map_err(storage_err)?;

        let branch_point = if to_remove.is_empty() {
            None
        } else {
            branch_idx.map(|i| ModifierId::new(forward[i]))
        };

        Ok(ProgressInfo {
            to_remove,
            to_apply,
            branch_point,
        })
    }

    /// The height of the best full chain, or `0` if nothing has been
    /// applied yet.
    pub fn best_full_height(&self) -> Result<Height, ChainError> {
        match self.best_full_id()? {
            None => Ok(0),
            Some(id) => Ok(self.header_by_id(id)?.map(|h| h.height).unwrap_or(0)),
        }
    }
}

fn storage_err(e: nyx_storage::StorageError) -> ChainError {
    ChainError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_crypto::sign::Ed25519KeyPair;
    use nyx_types::boxes::CoinbaseBox;
    use nyx_types::header::{ADDigest, BlockPayload};
    use nyx_types::ids::ModifierId;
    use nyx_types::tx::{Directive, Transaction};
    use tempfile::tempdir;

    fn engine() -> (HistoryEngine, tempfile::TempDir) {
        let dir = tempdir().expect("tempdir");
        let store = HistoryStore::open(dir.path().join("history.redb")).expect("open");
        (HistoryEngine::new(store, HistoryConfig::default()), dir)
    }

    /// Builds and mines a block extending `parent` (or genesis if `None`),
    /// deriving its difficulty from `engine` so it always passes
    /// `validate_header_fields`'s retarget check.
    fn block(
        engine: &HistoryEngine,
        miner: &Ed25519KeyPair,
        parent: Option<&BlockHeader>,
        height: Height,
        timestamp: u64,
    ) -> (BlockHeader, BlockPayload) {
        let difficulty = engine.required_difficulty_after(parent).expect("required difficulty");
        let coinbase = Transaction {
            fee: 0,
            timestamp,
            unlockers: vec![],
            directives: vec![Directive::Coinbase(CoinbaseBox {
                height_lock: 0,
                nonce: height,
                amount: 1,
                pubkey: miner.public_key(),
            })],
            signature: [0u8; 64],
        };
        let payload = BlockPayload {
            header_id: ModifierId::new([0u8; 32]),
            transactions: vec![coinbase],
        };
        let transactions_root = payload.transactions_root().expect("root");
        let unsigned = BlockHeader {
            version: 1,
            parent_id: parent.map(|p| p.id().expect("parent id")),
            state_root: ADDigest::new([0u8; 32], 0),
            ad_proofs_root: [0u8; 32],
            transactions_root,
            timestamp,
            height,
            difficulty,
            nonce: 0,
            miner_pub_key: miner.public_key(),
            signature: [0u8; 64],
        };
        let signature = miner.sign(&unsigned.pre_hash().expect("pre_hash")).expect("sign");
        let mut header = BlockHeader { signature, ..unsigned };
        nyx_test_utils::mine_header(&mut header).expect("mine");
        (header, payload)
    }

    #[test]
    fn genesis_header_and_payload_become_best_full_chain() {
        let (engine, _dir) = engine();
        let miner = nyx_test_utils::genesis_keypair(1);
        let (header, payload) = block(&engine, &miner, None, 0, 1);
        let header_id = header.id().expect("id");

        let progress = engine.append(Modifier::Header(header.clone())).expect("append header");
        assert!(progress.is_empty());
        assert_eq!(engine.best_header_id().expect("best header"), Some(header_id));

        let progress = engine.append(Modifier::Payload(payload)).expect("append payload");
        assert_eq!(progress.to_apply.len(), 1);
        assert!(progress.to_remove.is_empty());
        assert_eq!(engine.best_full_id().expect("best full"), Some(header_id));
    }

    #[test]
    fn reorg_to_a_longer_branch_emits_remove_and_apply() {
        let (engine, _dir) = engine();
        let miner = nyx_test_utils::genesis_keypair(2);

        let (g, gp) = block(&engine, &miner, None, 0, 0);
        let g_id = g.id().expect("id");
        engine.append(Modifier::Header(g.clone())).expect("append g");
        engine.append(Modifier::Payload(gp)).expect("append gp");

        let (a1, a1p) = block(&engine, &miner, Some(&g), 1, 30);
        engine.append(Modifier::Header(a1.clone())).expect("append a1");
        engine.append(Modifier::Payload(a1p)).expect("append a1p");

        let (a2, a2p) = block(&engine, &miner, Some(&a1), 2, 60);
        engine.append(Modifier::Header(a2.clone())).expect("append a2");
        engine.append(Modifier::Payload(a2p)).expect("append a2p");
        assert_eq!(engine.best_full_id().expect("best"), Some(a2.id().expect("id")));

        let (b1, b1p) = block(&engine, &miner, Some(&g), 1, 31);
        engine.append(Modifier::Header(b1.clone())).expect("append b1");
        let progress = engine.append(Modifier::Payload(b1p)).expect("append b1p");
        assert!(progress.is_empty(), "a lone b1 cannot yet outscore a1+a2");

        let (b2, b2p) = block(&engine, &miner, Some(&b1), 2, 62);
        engine.append(Modifier::Header(b2.clone())).expect("append b2");
        engine.append(Modifier::Payload(b2p)).expect("append b2p");

        let (b3, b3p) = block(&engine, &miner, Some(&b2), 3, 93);
        let b3_id = b3.id().expect("id");
        engine.append(Modifier::Header(b3.clone())).expect("append b3");
        let progress = engine.append(Modifier::Payload(b3p)).expect("append b3p");

        assert_eq!(progress.branch_point, Some(g_id));
        assert_eq!(progress.to_remove.len(), 2);
        assert_eq!(progress.to_apply.len(), 3);
        assert_eq!(engine.best_full_id().expect("best"), Some(b3_id));
    }

    #[test]
    fn sync_compare_and_continuation_ids() {
        let (engine, _dir) = engine();
        let miner = nyx_test_utils::genesis_keypair(3);

        let (g, gp) = block(&engine, &miner, None, 0, 0);
        let g_id = g.id().expect("id");
        engine.append(Modifier::Header(g.clone())).expect("g");
        engine.append(Modifier::Payload(gp)).expect("gp");

        let (a1, a1p) = block(&engine, &miner, Some(&g), 1, 30);
        let a1_id = a1.id().expect("id");
        engine.append(Modifier::Header(a1.clone())).expect("a1");
        engine.append(Modifier::Payload(a1p)).expect("a1p");

        let (a2, a2p) = block(&engine, &miner, Some(&a1), 2, 60);
        let a2_id = a2.id().expect("id");
        engine.append(Modifier::Header(a2.clone())).expect("a2");
        engine.append(Modifier::Payload(a2p)).expect("a2p");

        let (a3, a3p) = block(&engine, &miner, Some(&a2), 3, 90);
        let a3_id = a3.id().expect("id");
        engine.append(Modifier::Header(a3.clone())).expect("a3");
        engine.append(Modifier::Payload(a3p)).expect("a3p");

        let remote = SyncInfo::new(vec![g_id, a1_id]).expect("sync info");
        assert_eq!(engine.compare(&remote).expect("compare"), ChainCompare::Younger);

        let ids = engine.continuation_ids(&remote, 2).expect("continuation").expect("some");
        assert_eq!(ids, vec![a2_id, a3_id]);
    }
}
