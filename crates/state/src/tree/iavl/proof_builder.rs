// Path: crates/state/src/tree/iavl/proof_builder.rs
//! Store-aware proof construction logic for the IAVL tree.
//!
//! This module contains the functions responsible for building proofs of existence
//! and non-existence by traversing the tree structure by hash, lazily loading
//! nodes from the `IAVLTree`'s cache or the underlying persistent store.

use super::node::{NodeHash, EMPTY_HASH};
use super::proof::{self, ExistenceProof, HashOp, InnerOp, LeafOp, LengthOp, NonExistenceProof, Side};
use super::tree::IAVLTree;
use nyx_types::error::StateError;

/// The canonical `LeafOp` profile for this tree. Must be kept in sync with
/// `IAVLNode::compute_hash`'s leaf hashing logic.
fn leaf_op() -> LeafOp {
    LeafOp {
        hash: HashOp::Blake2b256,
        prehash_key: HashOp::NoHash,
        prehash_value: HashOp::Blake2b256,
        length: LengthOp::VarProto,
        prefix: vec![0x00],
    }
}

/// Builds a proof of existence or non-existence for `key` against the subtree
/// rooted at `root_hash`.
pub(super) fn build_proof_for_root(
    tree: &IAVLTree,
    root_hash: Option<NodeHash>,
    key: &[u8],
) -> Result<proof::IavlProof, StateError> {
    if tree.get_recursive(root_hash, key)?.is_some() {
        build_existence_proof_from_root(tree, root_hash, key)?
            .map(proof::IavlProof::Existence)
            .ok_or_else(|| {
                StateError::Invariant("key present by lookup but absent while tracing proof path".into())
            })
    } else {
        Ok(proof::IavlProof::NonExistence(build_non_existence_proof_from_root(
            tree, root_hash, key,
        )?))
    }
}

/// Builds a proof of existence for the given key by traversing the tree by hash from a starting root.
fn build_existence_proof_from_root(
    tree: &IAVLTree,
    start_hash: Option<NodeHash>,
    key: &[u8],
) -> Result<Option<ExistenceProof>, StateError> {
    let mut path = Vec::new();
    let mut current_hash_opt = start_hash;

    while let Some(current_hash) = current_hash_opt {
        let current_node = match tree.get_node(current_hash)? {
            Some(n) => n,
            None => {
                return Err(StateError::Invariant(format!(
                    "dangling node hash {} during proof traversal",
                    hex::encode(current_hash)
                )))
            }
        };

        if current_node.is_leaf() {
            if current_node.key == key {
                path.reverse();
                return Ok(Some(ExistenceProof {
                    key: current_node.key.clone(),
                    value: current_node.value.clone(),
                    leaf: leaf_op(),
                    path,
                }));
            }
            return Ok(None);
        }

        let (next_hash, side, sibling_hash) = if key <= current_node.key.as_slice() {
            (
                current_node.left_hash,
                Side::Right,
                current_node.right_hash.unwrap_or(EMPTY_HASH),
            )
        } else {
            (
                current_node.right_hash,
                Side::Left,
                current_node.left_hash.unwrap_or(EMPTY_HASH),
            )
        };

        path.push(InnerOp {
            version: current_node.version,
            height: current_node.height,
            size: current_node.size,
            split_key: current_node.key.clone(),
            side,
            sibling_hash,
        });
        current_hash_opt = next_hash;
    }
    Ok(None)
}

/// Builds a proof of non-existence by finding the key's immediate neighbors (if they exist)
/// and constructing existence proofs for them.
fn build_non_existence_proof_from_root(
    tree: &IAVLTree,
    start_hash: Option<NodeHash>,
    key: &[u8],
) -> Result<NonExistenceProof, StateError> {
    let left_key = find_predecessor(tree, start_hash, key)?;
    let right_key = find_successor(tree, start_hash, key)?;

    if left_key.is_none() && right_key.is_none() {
        return Ok(NonExistenceProof {
            missing_key: key.to_vec(),
            left: None,
            right: None,
        });
    }

    let left_proof = left_key
        .map(|k| build_existence_proof_from_root(tree, start_hash, &k))
        .transpose()?
        .flatten();
    let right_proof = right_key
        .map(|k| build_existence_proof_from_root(tree, start_hash, &k))
        .transpose()?
        .flatten();

    Ok(NonExistenceProof {
        missing_key: key.to_vec(),
        left: left_proof,
        right: right_proof,
    })
}

/// Helper to find the largest key smaller than the given key. Traverses by hash.
fn find_predecessor(
    tree: &IAVLTree,
    start_hash: Option<NodeHash>,
    key: &[u8],
) -> Result<Option<Vec<u8>>, StateError> {
    let mut current_hash_opt = start_hash;
    let mut predecessor = None;

    while let Some(hash) = current_hash_opt {
        let node = match tree.get_node(hash)? {
            Some(n) => n,
            None => break,
        };
        if node.is_leaf() {
            if node.key.as_slice() < key {
                predecessor = Some(node.key.clone());
            }
            break;
        }

        if key > node.key.as_slice() {
            if let Some(lh) = node.left_hash {
                if let Some(max_of_left) = tree.find_max(lh)? {
                    predecessor = Some(max_of_left.key.clone());
                }
            }
            current_hash_opt = node.right_hash;
        } else {
            current_hash_opt = node.left_hash;
        }
    }
    Ok(predecessor)
}

/// Helper to find the smallest key larger than the given key. Traverses by hash.
fn find_successor(
    tree: &IAVLTree,
    start_hash: Option<NodeHash>,
    key: &[u8],
) -> Result<Option<Vec<u8>>, StateError> {
    let mut current_hash_opt = start_hash;
    let mut successor = None;

    while let Some(hash) = current_hash_opt {
        let node = match tree.get_node(hash)? {
            Some(n) => n,
            None => break,
        };
        if node.is_leaf() {
            if node.key.as_slice() > key {
                successor = Some(node.key.clone());
            }
            break;
        }
        if key < node.key.as_slice() {
            if let Some(rh) = node.right_hash {
                if let Some(min_of_right) = tree.find_min(rh)? {
                    successor = Some(min_of_right.key.clone());
                }
            }
            current_hash_opt = node.left_hash;
        } else {
            current_hash_opt = node.right_hash;
        }
    }
    Ok(successor)
}
