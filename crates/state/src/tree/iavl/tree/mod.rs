// Path: crates/state/src/tree/iavl/tree/mod.rs

//! The core IAVL+ tree implementation: a persistent, content-addressed
//! binary search tree keyed by `BoxId` bytes, used by the Authenticated
//! State Engine as its UTXO dictionary.
//!
//! Children are referenced by hash rather than by pointer, so a node can be
//! reconstructed identically whether it was just created in memory this
//! version or lazily faulted in from `nyx-storage::StateStore`. The tree is
//! cheap to clone (an `Arc`-backed node cache plus a root hash), which is
//! what lets `AuthenticatedStateEngine::proofs_for_transactions` speculate
//! without ever mutating the committed tree.

use super::node::{IAVLNode, NodeHash, EMPTY_HASH};
use super::{encode, proof_builder};
use nyx_storage::StateStore;
use nyx_types::error::StateError;
use std::cmp::{max, Ordering};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A persistent IAVL+ tree. Reads consult an in-memory cache of nodes
/// touched this version before falling back to the attached store, so a
/// freshly loaded tree (cache empty, `root_hash` set from a committed
/// version) behaves identically to one still holding its speculative edits.
#[derive(Clone)]
pub struct IAVLTree {
    root_hash: Option<NodeHash>,
    node_cache: HashMap<NodeHash, Arc<IAVLNode>>,
    current_version: u64,
    store: Option<Arc<StateStore>>,
}

impl fmt::Debug for IAVLTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IAVLTree")
            .field("root_hash", &self.root_hash.map(hex::encode))
            .field("node_cache_len", &self.node_cache.len())
            .field("current_version", &self.current_version)
            .field("store_is_some", &self.store.is_some())
            .finish()
    }
}

impl Default for IAVLTree {
    fn default() -> Self {
        Self::new()
    }
}

impl IAVLTree {
    /// An empty tree with no backing store, usable for pure in-memory tests.
    pub fn new() -> Self {
        Self {
            root_hash: None,
            node_cache: HashMap::new(),
            current_version: 0,
            store: None,
        }
    }

    /// A tree that lazily faults in nodes from `store` and starts at
    /// whatever root `store.best_state_version` currently commits to.
    pub fn with_store(store: Arc<StateStore>) -> Result<Self, StateError> {
        let mut tree = Self::new();
        tree.store = Some(store);
        tree.reload_from_store()?;
        Ok(tree)
    }

    /// Re-reads the current committed root from the attached store and
    /// discards every in-memory node. Used after a commit or rollback so the
    /// tree reflects exactly the persisted state.
    pub fn reload_from_store(&mut self) -> Result<(), StateError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let root = match store
            .best_state_version()
            .map_err(|e| StateError::Backend(e.to_string()))?
        {
            Some(version) => store
                .digest_for_version(&version)
                .map_err(|e| StateError::Backend(e.to_string()))?
                .map(|digest| {
                    let mut root = [0u8; 32];
                    root.copy_from_slice(&digest[..32]);
                    root
                })
                .filter(|root| *root != EMPTY_HASH),
            None => None,
        };
        self.load_root(root);
        Ok(())
    }

    /// Points the tree at a specific already-committed root, discarding
    /// every in-memory node. Used by `rollbackTo`.
    pub fn load_root(&mut self, root: Option<NodeHash>) {
        self.root_hash = root;
        self.node_cache.clear();
    }

    /// The tree's current root hash, or `EMPTY_HASH` if empty.
    pub fn root_hash_or_empty(&self) -> NodeHash {
        self.root_hash.unwrap_or(EMPTY_HASH)
    }

    /// The committed root hash, if the tree holds anything.
    pub fn root_hash(&self) -> Option<NodeHash> {
        self.root_hash
    }

    /// The AVL height of the root node, `0` for an empty tree, used as the
    /// tree-height byte of an `ADDigest`.
    pub fn tree_height(&self) -> Result<u8, StateError> {
        let h = self.node_height(self.root_hash)?;
        Ok(h.max(0).min(u8::MAX as i32) as u8)
    }

    /// Sets the version new nodes are stamped with for subsequent
    /// mutations. Every block application calls this once before its first
    /// `insert`/`remove`.
    pub fn set_version(&mut self, version: u64) {
        self.current_version = version;
    }

    /// Looks up `key`, consulting the in-memory cache first.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.get_recursive(self.root_hash, key)
    }

    /// Inserts or overwrites `key` with `value`.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.root_hash = Some(self.insert_recursive(self.root_hash, key, value)?);
        Ok(())
    }

    /// Removes `key`, a no-op if it is already absent.
    pub fn remove(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.root_hash = self.remove_recursive(self.root_hash, key)?;
        Ok(())
    }

    /// Builds a membership or non-membership proof for `key` against the
    /// current root.
    pub fn create_proof(&self, key: &[u8]) -> Result<super::proof::IavlProof, StateError> {
        proof_builder::build_proof_for_root(self, self.root_hash, key)
    }

    /// Every node touched since the tree was last pointed at a committed
    /// root, encoded for persistence. Nodes already present in the store are
    /// harmless to re-submit: `StateStore::commit_version` only inserts
    /// nodes it doesn't already have.
    pub fn new_nodes(&self) -> Result<Vec<(NodeHash, Vec<u8>)>, StateError> {
        self.node_cache
            .values()
            .map(|n| Ok((n.hash, encode::encode_node_canonical(n)?)))
            .collect()
    }

    /// Drops every in-memory node, keeping only the root hash. Called after
    /// a successful commit, once `new_nodes` has been persisted.
    pub fn clear_cache(&mut self) {
        self.node_cache.clear();
    }

    pub(super) fn get_node(&self, hash: NodeHash) -> Result<Option<Arc<IAVLNode>>, StateError> {
        if hash == EMPTY_HASH {
            return Ok(None);
        }
        if let Some(node) = self.node_cache.get(&hash) {
            return Ok(Some(node.clone()));
        }
        if let Some(store) = &self.store {
            if let Some(bytes) = store
                .get_node(&hash)
                .map_err(|e| StateError::Backend(e.to_string()))?
            {
                let decoded = encode::decode_node(&bytes)
                    .ok_or_else(|| StateError::Decode("invalid node encoding in store".into()))?;
                let node = IAVLNode::from_decoded(decoded)?;
                return Ok(Some(Arc::new(node)));
            }
        }
        Ok(None)
    }

    fn node_height(&self, hash_opt: Option<NodeHash>) -> Result<i32, StateError> {
        Ok(match hash_opt {
            Some(h) => self.get_node(h)?.map_or(-1, |n| n.height),
            None => -1,
        })
    }

    fn node_size(&self, hash_opt: Option<NodeHash>) -> Result<u64, StateError> {
        Ok(match hash_opt {
            Some(h) => self.get_node(h)?.map_or(0, |n| n.size),
            None => 0,
        })
    }

    /// The node with the largest key in the subtree rooted at `hash`, if any.
    pub(super) fn find_max(&self, hash: NodeHash) -> Result<Option<Arc<IAVLNode>>, StateError> {
        let Some(mut node) = self.get_node(hash)? else {
            return Ok(None);
        };
        while let Some(right_hash) = node.right_hash {
            node = self
                .get_node(right_hash)?
                .ok_or_else(|| StateError::Invariant("dangling right-child hash".into()))?;
        }
        Ok(Some(node))
    }

    /// The node with the smallest key in the subtree rooted at `hash`, if any.
    pub(super) fn find_min(&self, hash: NodeHash) -> Result<Option<Arc<IAVLNode>>, StateError> {
        let Some(mut node) = self.get_node(hash)? else {
            return Ok(None);
        };
        while let Some(left_hash) = node.left_hash {
            node = self
                .get_node(left_hash)?
                .ok_or_else(|| StateError::Invariant("dangling left-child hash".into()))?;
        }
        Ok(Some(node))
    }

    fn create_inner_node(
        &mut self,
        left_hash: Option<NodeHash>,
        right_hash: Option<NodeHash>,
    ) -> Result<NodeHash, StateError> {
        let key = match left_hash {
            Some(lh) => self
                .find_max(lh)?
                .ok_or_else(|| StateError::Invariant("empty left child in inner node".into()))?
                .key
                .clone(),
            None => Vec::new(),
        };
        let height = 1 + max(self.node_height(left_hash)?, self.node_height(right_hash)?);
        let size = 1 + self.node_size(left_hash)? + self.node_size(right_hash)?;
        let mut node = IAVLNode {
            key,
            value: Vec::new(),
            version: self.current_version,
            height,
            size,
            hash: EMPTY_HASH,
            left_hash,
            right_hash,
        };
        node.hash = node.compute_hash()?;
        let hash = node.hash;
        self.node_cache.insert(hash, Arc::new(node));
        Ok(hash)
    }

    pub(super) fn get_recursive(
        &self,
        node_hash_opt: Option<NodeHash>,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StateError> {
        let Some(node_hash) = node_hash_opt else {
            return Ok(None);
        };
        let Some(node) = self.get_node(node_hash)? else {
            return Ok(None);
        };
        if node.is_leaf() {
            if key == node.key.as_slice() {
                Ok(Some(node.value.clone()))
            } else {
                Ok(None)
            }
        } else if key <= node.key.as_slice() {
            self.get_recursive(node.left_hash, key)
        } else {
            self.get_recursive(node.right_hash, key)
        }
    }

    fn insert_recursive(
        &mut self,
        node_hash_opt: Option<NodeHash>,
        key: &[u8],
        value: &[u8],
    ) -> Result<NodeHash, StateError> {
        let Some(node_hash) = node_hash_opt else {
            let leaf = IAVLNode::new_leaf(key.to_vec(), value.to_vec(), self.current_version)?;
            let hash = leaf.hash;
            self.node_cache.insert(hash, Arc::new(leaf));
            return Ok(hash);
        };

        let node = self
            .get_node(node_hash)?
            .ok_or_else(|| StateError::Invariant("dangling node hash during insert".into()))?;

        if node.is_leaf() {
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    let leaf =
                        IAVLNode::new_leaf(key.to_vec(), value.to_vec(), self.current_version)?;
                    let hash = leaf.hash;
                    self.node_cache.insert(hash, Arc::new(leaf));
                    Ok(hash)
                }
                Ordering::Less => {
                    let leaf =
                        IAVLNode::new_leaf(key.to_vec(), value.to_vec(), self.current_version)?;
                    self.node_cache.insert(leaf.hash, Arc::new(leaf.clone()));
                    self.create_inner_node(Some(leaf.hash), Some(node.hash))
                }
                Ordering::Greater => {
                    let leaf =
                        IAVLNode::new_leaf(key.to_vec(), value.to_vec(), self.current_version)?;
                    self.node_cache.insert(leaf.hash, Arc::new(leaf.clone()));
                    self.create_inner_node(Some(node.hash), Some(leaf.hash))
                }
            }
        } else {
            let (new_left, new_right) = if key <= node.key.as_slice() {
                (
                    Some(self.insert_recursive(node.left_hash, key, value)?),
                    node.right_hash,
                )
            } else {
                (
                    node.left_hash,
                    Some(self.insert_recursive(node.right_hash, key, value)?),
                )
            };
            let new_hash = self.create_inner_node(new_left, new_right)?;
            self.balance(new_hash)
        }
    }

    fn remove_recursive(
        &mut self,
        node_hash_opt: Option<NodeHash>,
        key: &[u8],
    ) -> Result<Option<NodeHash>, StateError> {
        let Some(node_hash) = node_hash_opt else {
            return Ok(None);
        };
        let node = self
            .get_node(node_hash)?
            .ok_or_else(|| StateError::Invariant("dangling node hash during remove".into()))?;

        match key.cmp(&node.key) {
            Ordering::Less if !node.is_leaf() => {
                let new_left = self.remove_recursive(node.left_hash, key)?;
                if new_left == node.left_hash {
                    return Ok(Some(node_hash));
                }
                let new_hash = self.create_inner_node(new_left, node.right_hash)?;
                self.balance(new_hash).map(Some)
            }
            Ordering::Greater if !node.is_leaf() => {
                let new_right = self.remove_recursive(node.right_hash, key)?;
                if new_right == node.right_hash {
                    return Ok(Some(node_hash));
                }
                let new_hash = self.create_inner_node(node.left_hash, new_right)?;
                self.balance(new_hash).map(Some)
            }
            Ordering::Equal => {
                if node.is_leaf() {
                    Ok(None)
                } else {
                    match (node.left_hash, node.right_hash) {
                        (Some(left), None) => Ok(Some(left)),
                        (None, Some(right)) => Ok(Some(right)),
                        (Some(left), Some(right)) => {
                            let successor = self.find_min(right)?.ok_or_else(|| {
                                StateError::Invariant("empty right child in remove".into())
                            })?;
                            let new_right =
                                self.remove_recursive(Some(right), &successor.key)?;
                            let new_height = 1
                                + max(
                                    self.node_height(Some(left))?,
                                    self.node_height(new_right)?,
                                );
                            let new_size =
                                1 + self.node_size(Some(left))? + self.node_size(new_right)?;
                            let mut new_node = IAVLNode {
                                key: successor.key.clone(),
                                value: successor.value.clone(),
                                version: self.current_version,
                                height: new_height,
                                size: new_size,
                                hash: EMPTY_HASH,
                                left_hash: Some(left),
                                right_hash: new_right,
                            };
                            new_node.hash = new_node.compute_hash()?;
                            let new_hash = new_node.hash;
                            self.node_cache.insert(new_hash, Arc::new(new_node));
                            self.balance(new_hash).map(Some)
                        }
                        (None, None) => Ok(None),
                    }
                }
            }
            _ => Ok(Some(node_hash)),
        }
    }

    fn balance(&mut self, node_hash: NodeHash) -> Result<NodeHash, StateError> {
        let node = self
            .get_node(node_hash)?
            .ok_or_else(|| StateError::Invariant("dangling node hash during balance".into()))?;
        let bf = self.node_height(node.right_hash)? - self.node_height(node.left_hash)?;

        if bf > 1 {
            let right_node = node
                .right_hash
                .and_then(|h| self.get_node(h).ok().flatten())
                .ok_or_else(|| StateError::Invariant("missing right child to rebalance".into()))?;
            if self.node_height(right_node.right_hash)? - self.node_height(right_node.left_hash)? < 0 {
                let new_right_hash = self.rotate_right(right_node.hash)?;
                let new_root_hash = self.create_inner_node(node.left_hash, Some(new_right_hash))?;
                return self.rotate_left(new_root_hash);
            }
            return self.rotate_left(node.hash);
        }
        if bf < -1 {
            let left_node = node
                .left_hash
                .and_then(|h| self.get_node(h).ok().flatten())
                .ok_or_else(|| StateError::Invariant("missing left child to rebalance".into()))?;
            if self.node_height(left_node.right_hash)? - self.node_height(left_node.left_hash)? > 0 {
                let new_left_hash = self.rotate_left(left_node.hash)?;
                let new_root_hash = self.create_inner_node(Some(new_left_hash), node.right_hash)?;
                return self.rotate_right(new_root_hash);
            }
            return self.rotate_right(node.hash);
        }
        Ok(node_hash)
    }

    fn rotate_left(&mut self, node_hash: NodeHash) -> Result<NodeHash, StateError> {
        let node = self
            .get_node(node_hash)?
            .ok_or_else(|| StateError::Invariant("dangling node hash during rotate_left".into()))?;
        let r_hash = node
            .right_hash
            .ok_or_else(|| StateError::Invariant("rotate_left without a right child".into()))?;
        let r_node = self
            .get_node(r_hash)?
            .ok_or_else(|| StateError::Invariant("dangling right-child hash".into()))?;
        let new_left_hash = self.create_inner_node(node.left_hash, r_node.left_hash)?;
        self.create_inner_node(Some(new_left_hash), r_node.right_hash)
    }

    fn rotate_right(&mut self, node_hash: NodeHash) -> Result<NodeHash, StateError> {
        let node = self
            .get_node(node_hash)?
            .ok_or_else(|| StateError::Invariant("dangling node hash during rotate_right".into()))?;
        let l_hash = node
            .left_hash
            .ok_or_else(|| StateError::Invariant("rotate_right without a left child".into()))?;
        let l_node = self
            .get_node(l_hash)?
            .ok_or_else(|| StateError::Invariant("dangling left-child hash".into()))?;
        let new_right_hash = self.create_inner_node(l_node.right_hash, node.right_hash)?;
        self.create_inner_node(l_node.left_hash, Some(new_right_hash))
    }
}

#[cfg(test)]
mod tests;
