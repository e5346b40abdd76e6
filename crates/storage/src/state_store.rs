// Path: crates/storage/src/state_store.rs
//! The state store: the Authenticated State Engine's persisted content-addressed
//! tree nodes plus the small amount of per-version metadata named in the
//! external-interfaces section (`best_state_version`, `state_height`,
//! `last_block_timestamp`, `hash(stateRoot) -> versionId`, `versionId ->
//! stateRoot`).
//!
//! Box values themselves are never stored independent of the tree: a lookup
//! by `BoxId` is a normal (unauthenticated, in the sense that no audit path
//! is requested) traversal of the tree rooted at the current committed
//! root, which `nyx-state` performs by fetching nodes from here.

use crate::error::StorageError;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

const NODES: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("STATE_NODES");
/// versionId -> ADDigest bytes (32-byte root hash ++ 1 tree-height byte).
const VERSIONS: TableDefinition<&[u8; 32], &[u8; 33]> = TableDefinition::new("STATE_VERSIONS");
/// hash(ADDigest bytes) -> versionId, the reverse lookup named in section 6.
/// The hash itself is computed by the caller (`nyx-state`, via `nyx-crypto`)
/// so that this crate has no cryptographic dependency of its own.
const ROOT_INDEX: TableDefinition<&[u8; 32], &[u8; 32]> = TableDefinition::new("STATE_ROOT_INDEX");
/// Insertion order of committed versions, oldest first; used to enforce the
/// retained rollback window and to answer `rollbackVersions`.
const VERSION_ORDER: TableDefinition<u64, &[u8; 32]> = TableDefinition::new("STATE_VERSION_ORDER");
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("STATE_META");

const KEY_BEST_VERSION: &str = "best_state_version";
const KEY_STATE_HEIGHT: &str = "state_height";
const KEY_LAST_BLOCK_TIMESTAMP: &str = "last_block_timestamp";
const KEY_VERSION_ORDER_NEXT: &str = "version_order_next_seq";
const KEY_VERSION_ORDER_BASE: &str = "version_order_base_seq";

fn u64_bytes(v: u64) -> [u8; 8] {
    v.to_le_bytes()
}

fn parse_u64(bytes: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    let n = bytes.len().min(8);
    a[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(a)
}

/// The persisted half of the Authenticated State Engine.
pub struct StateStore {
    db: Database,
}

impl StateStore {
    /// Opens (creating if absent) the state store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path)?;
        {
            let w = db.begin_write()?;
            {
                let _ = w.open_table(NODES)?;
                let _ = w.open_table(VERSIONS)?;
                let _ = w.open_table(ROOT_INDEX)?;
                let _ = w.open_table(VERSION_ORDER)?;
                let _ = w.open_table(META)?;
            }
            w.commit()?;
        }
        Ok(Self { db })
    }

    /// Fetches a persisted tree node by its content hash.
    pub fn get_node(&self, hash: &[u8; 32]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(NODES)?;
        Ok(t.get(hash)?.map(|v| v.value().to_vec()))
    }

    /// Persists a batch of new tree nodes, the committed version's digest,
    /// and (if `keep_versions` is exceeded) evicts the oldest retained
    /// version from the rollback-window indices. Node bytes themselves are
    /// never evicted: the tree is persistent and older roots stay
    /// reachable even once their version entry ages out of the window.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_version(
        &self,
        version: [u8; 32],
        digest: [u8; 33],
        digest_hash: [u8; 32],
        new_nodes: &[([u8; 32], Vec<u8>)],
        state_height: u64,
        last_block_timestamp: u64,
        keep_versions: usize,
    ) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut nodes = w.open_table(NODES)?;
            for (hash, bytes) in new_nodes {
                if nodes.get(hash)?.is_none() {
                    nodes.insert(hash, bytes.as_slice())?;
                }
            }

            let mut versions = w.open_table(VERSIONS)?;
            versions.insert(&version, &digest)?;

            let mut root_index = w.open_table(ROOT_INDEX)?;
            root_index.insert(&digest_hash, &version)?;

            let mut order = w.open_table(VERSION_ORDER)?;
            let mut meta = w.open_table(META)?;
            let next_seq = meta.get(KEY_VERSION_ORDER_NEXT)?.map_or(0, |v| parse_u64(v.value()));
            let mut base_seq = meta.get(KEY_VERSION_ORDER_BASE)?.map_or(0, |v| parse_u64(v.value()));
            order.insert(next_seq, &version)?;
            meta.insert(KEY_VERSION_ORDER_NEXT, u64_bytes(next_seq + 1).as_slice())?;

            let retained = (next_seq + 1).saturating_sub(base_seq);
            if keep_versions > 0 && retained as usize > keep_versions {
                let to_evict = retained as usize - keep_versions;
                for seq in base_seq..base_seq + to_evict as u64 {
                    if let Some(old_version) = order.get(seq)?.map(|v| *v.value()) {
                        versions.remove(&old_version)?;
                        order.remove(seq)?;
                    }
                }
                base_seq += to_evict as u64;
                meta.insert(KEY_VERSION_ORDER_BASE, u64_bytes(base_seq).as_slice())?;
            }

            meta.insert(KEY_BEST_VERSION, version.as_slice())?;
            meta.insert(KEY_STATE_HEIGHT, u64_bytes(state_height).as_slice())?;
            meta.insert(
                KEY_LAST_BLOCK_TIMESTAMP,
                u64_bytes(last_block_timestamp).as_slice(),
            )?;
        }
        w.commit()?;
        Ok(())
    }

    /// Looks up the digest committed for `version`, if it is still within
    /// the retained rollback window.
    pub fn digest_for_version(&self, version: &[u8; 32]) -> Result<Option<[u8; 33]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(VERSIONS)?;
        Ok(t.get(version)?.map(|v| *v.value()))
    }

    /// The version id whose digest hashes to `digest_hash`, if known.
    pub fn version_for_digest_hash(
        &self,
        digest_hash: &[u8; 32],
    ) -> Result<Option<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(ROOT_INDEX)?;
        Ok(t.get(digest_hash)?.map(|v| *v.value()))
    }

    /// Every retained version, oldest first, per `rollbackVersions`.
    pub fn rollback_versions(&self) -> Result<Vec<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(VERSION_ORDER)?;
        let mut out = Vec::new();
        for entry in t.iter()? {
            let (_, v) = entry?;
            out.push(*v.value());
        }
        Ok(out)
    }

    /// The currently committed best version, if any version has been committed.
    pub fn best_state_version(&self) -> Result<Option<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(META)?;
        Ok(t.get(KEY_BEST_VERSION)?.and_then(|v| {
            let bytes = v.value();
            <[u8; 32]>::try_from(bytes).ok()
        }))
    }

    /// The height of the currently committed state.
    pub fn state_height(&self) -> Result<u64, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(META)?;
        Ok(t.get(KEY_STATE_HEIGHT)?.map_or(0, |v| parse_u64(v.value())))
    }

    /// The timestamp of the most recently applied block.
    pub fn last_block_timestamp(&self) -> Result<u64, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(META)?;
        Ok(t
            .get(KEY_LAST_BLOCK_TIMESTAMP)?
            .map_or(0, |v| parse_u64(v.value())))
    }

    /// Rewinds the committed-version pointers back to `version` without
    /// touching persisted node bytes (which remain valid, since the tree
    /// is content-addressed and persistent). Fails if `version` is not
    /// within the retained window.
    pub fn rewind_to(
        &self,
        version: [u8; 32],
        state_height: u64,
        last_block_timestamp: u64,
    ) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut meta = w.open_table(META)?;
            meta.insert(KEY_BEST_VERSION, version.as_slice())?;
            meta.insert(KEY_STATE_HEIGHT, u64_bytes(state_height).as_slice())?;
            meta.insert(
                KEY_LAST_BLOCK_TIMESTAMP,
                u64_bytes(last_block_timestamp).as_slice(),
            )?;
        }
        w.commit()?;
        Ok(())
    }
}
