// Path: crates/storage/src/history_store.rs
//! The history store: persisted headers and payloads plus the per-header
//! indices the History Engine needs (height, cumulative difficulty,
//! best-chain marker, semantic-validity flag) and the `CHILDREN` index used
//! to enumerate forks forward from a given header.

use crate::error::StorageError;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

const HEADERS: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("HIST_HEADERS");
const PAYLOADS: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("HIST_PAYLOADS");
/// height -> header id, populated only for headers currently on the best chain.
const BEST_CHAIN: TableDefinition<u64, &[u8; 32]> = TableDefinition::new("HIST_BEST_CHAIN");
/// header id -> cumulative difficulty (16-byte big-endian u128), the
/// `chainScore(headerId)` key from the external-interfaces section.
const SCORE: TableDefinition<&[u8; 32], &[u8; 16]> = TableDefinition::new("HIST_SCORE");
/// header id -> 1 (valid) | 2 (invalid); absence means "known but not yet
/// classified", which `HistoryStore::validity` reports as `Unknown`.
const VALIDITY: TableDefinition<&[u8; 32], u8> = TableDefinition::new("HIST_VALIDITY");
/// (parentId ++ childId) -> (), enumerable by prefix to answer
/// `continuationHeaderChains`.
const CHILDREN: TableDefinition<&[u8; 64], ()> = TableDefinition::new("HIST_CHILDREN");
const META: TableDefinition<&str, &[u8; 32]> = TableDefinition::new("HIST_META");

const KEY_BEST_HEADER: &str = "best_header_id";
const KEY_BEST_FULL: &str = "best_full_id";

/// Semantic-validity classification of a header, per `isSemanticallyValid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Not yet classified (structurally accepted, payload not yet fully validated).
    Unknown,
    /// Passed every check in the Authenticated State Engine's `apply`.
    Valid,
    /// Failed validation after acceptance; the header is excluded from best-chain selection.
    Invalid,
}

fn children_key(parent: &[u8; 32], child: &[u8; 32]) -> [u8; 64] {
    let mut k = [0u8; 64];
    k[..32].copy_from_slice(parent);
    k[32..].copy_from_slice(child);
    k
}

/// The persisted half of the History Engine.
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    /// Opens (creating if absent) the history store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path)?;
        {
            let w = db.begin_write()?;
            {
                let _ = w.open_table(HEADERS)?;
                let _ = w.open_table(PAYLOADS)?;
                let _ = w.open_table(BEST_CHAIN)?;
                let _ = w.open_table(SCORE)?;
                let _ = w.open_table(VALIDITY)?;
                let _ = w.open_table(CHILDREN)?;
                let _ = w.open_table(META)?;
            }
            w.commit()?;
        }
        Ok(Self { db })
    }

    /// Persists a newly accepted header, its cumulative difficulty, and the
    /// `CHILDREN` edge from its parent (if any).
    pub fn put_header(
        &self,
        id: [u8; 32],
        parent: Option<[u8; 32]>,
        bytes: &[u8],
        score: u128,
    ) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut headers = w.open_table(HEADERS)?;
            headers.insert(&id, bytes)?;
            let mut scores = w.open_table(SCORE)?;
            scores.insert(&id, &score.to_be_bytes())?;
            if let Some(parent_id) = parent {
                let mut children = w.open_table(CHILDREN)?;
                children.insert(&children_key(&parent_id, &id), ())?;
            }
        }
        w.commit()?;
        Ok(())
    }

    /// Fetches a header's raw bytes.
    pub fn get_header(&self, id: &[u8; 32]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(HEADERS)?;
        Ok(t.get(id)?.map(|v| v.value().to_vec()))
    }

    /// Whether a header with this id has been accepted.
    pub fn has_header(&self, id: &[u8; 32]) -> Result<bool, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(HEADERS)?;
        Ok(t.get(id)?.is_some())
    }

    /// Persists a payload attached to `header_id`.
    pub fn put_payload(&self, header_id: [u8; 32], bytes: &[u8]) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut payloads = w.open_table(PAYLOADS)?;
            payloads.insert(&header_id, bytes)?;
        }
        w.commit()?;
        Ok(())
    }

    /// Fetches the payload attached to `header_id`, if present (i.e. the
    /// header is `PayloadKnown`).
    pub fn get_payload(&self, header_id: &[u8; 32]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(PAYLOADS)?;
        Ok(t.get(header_id)?.map(|v| v.value().to_vec()))
    }

    /// The cumulative difficulty recorded for `id`.
    pub fn score(&self, id: &[u8; 32]) -> Result<Option<u128>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(SCORE)?;
        Ok(t.get(id)?.map(|v| u128::from_be_bytes(*v.value())))
    }

    /// The ids of every known child of `parent`.
    pub fn children_of(&self, parent: &[u8; 32]) -> Result<Vec<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(CHILDREN)?;
        let start = children_key(parent, &[0u8; 32]);
        let end = children_key(parent, &[0xFFu8; 32]);
        let mut out = Vec::new();
        for entry in t.range(start..=end)? {
            let (k, _) = entry?;
            let key = *k.value();
            let mut child = [0u8; 32];
            child.copy_from_slice(&key[32..]);
            out.push(child);
        }
        Ok(out)
    }

    /// Sets the semantic-validity classification for `id`.
    pub fn set_validity(&self, id: [u8; 32], validity: Validity) -> Result<(), StorageError> {
        let tag: u8 = match validity {
            Validity::Unknown => 0,
            Validity::Valid => 1,
            Validity::Invalid => 2,
        };
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(VALIDITY)?;
            t.insert(&id, tag)?;
        }
        w.commit()?;
        Ok(())
    }

    /// The semantic-validity classification for `id`, or `None` if `id` is
    /// not a known header at all (the `Absent` case is the caller's to
    /// distinguish from `Unknown`).
    pub fn validity(&self, id: &[u8; 32]) -> Result<Option<Validity>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(VALIDITY)?;
        let tag = t.get(id)?.map(|v| v.value());
        Ok(tag.map(|t| match t {
            1 => Validity::Valid,
            2 => Validity::Invalid,
            _ => Validity::Unknown,
        }))
    }

    /// Replaces the best-chain marker for `height` with `id`, or clears it
    /// if `id` is `None`. Used to apply/undo a segment during a reorg.
    pub fn set_best_chain_at(&self, height: u64, id: Option<[u8; 32]>) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(BEST_CHAIN)?;
            match id {
                Some(id) => {
                    t.insert(height, &id)?;
                }
                None => {
                    t.remove(height)?;
                }
            }
        }
        w.commit()?;
        Ok(())
    }

    /// The header id on the best chain at `height`, if any.
    pub fn best_chain_at(&self, height: u64) -> Result<Option<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(BEST_CHAIN)?;
        Ok(t.get(height)?.map(|v| *v.value()))
    }

    /// Sets the current best-header marker.
    pub fn set_best_header(&self, id: [u8; 32]) -> Result<(), StorageError> {
        self.set_meta(KEY_BEST_HEADER, id)
    }

    /// The current best-header marker.
    pub fn best_header(&self) -> Result<Option<[u8; 32]>, StorageError> {
        self.get_meta(KEY_BEST_HEADER)
    }

    /// Sets the current best-full-block marker.
    pub fn set_best_full(&self, id: [u8; 32]) -> Result<(), StorageError> {
        self.set_meta(KEY_BEST_FULL, id)
    }

    /// The current best-full-block marker.
    pub fn best_full(&self) -> Result<Option<[u8; 32]>, StorageError> {
        self.get_meta(KEY_BEST_FULL)
    }

    fn set_meta(&self, key: &str, id: [u8; 32]) -> Result<(), StorageError> {
        let w = self.db.begin_write()?;
        {
            let mut t = w.open_table(META)?;
            t.insert(key, &id)?;
        }
        w.commit()?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<[u8; 32]>, StorageError> {
        let r = self.db.begin_read()?;
        let t = r.open_table(META)?;
        Ok(t.get(key)?.map(|v| *v.value()))
    }
}
