// Path: crates/state/src/tree/iavl/proof.rs
//! ICS-23-inspired proof construction and verification for the IAVL tree.
//! This module contains the proof data structures and the pure, stateless verifier function.

use nyx_crypto::hash::blake2b256;
use nyx_types::error::StateError;
use parity_scale_codec::{Decode, Encode};

/// The canonical hash function used for all IAVL operations.
fn hash(data: &[u8]) -> Result<[u8; 32], StateError> {
    blake2b256(data).map_err(|e| StateError::Backend(e.to_string()))
}

// --- ICS-23 Style Hashing Primitives ---

/// Defines the hash operation to apply to a key or value before concatenation.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub enum HashOp {
    /// Do not hash the data; use it directly.
    NoHash,
    /// Apply BLAKE2b-256 to the data.
    Blake2b256,
}

/// Defines how the length of a key or value is encoded in the preimage.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub enum LengthOp {
    /// No length prefix is used.
    NoPrefix,
    /// A protobuf-style varint length prefix is used.
    VarProto,
}

// --- Canonical Hashing Rules ---

/// Computes the hash of a leaf node by interpreting a `LeafOp` structure.
/// This function is designed to be directly compatible with ICS-23-style verifiers.
pub(super) fn hash_leaf(leaf_op: &LeafOp, key: &[u8], value: &[u8]) -> Result<[u8; 32], StateError> {
    fn apply_hash(op: &HashOp, data: &[u8]) -> Result<Vec<u8>, StateError> {
        match op {
            HashOp::NoHash => Ok(data.to_vec()),
            HashOp::Blake2b256 => hash(data).map(|h| h.to_vec()),
        }
    }

    fn apply_length(op: &LengthOp, data: &[u8]) -> Result<Vec<u8>, StateError> {
        match op {
            LengthOp::NoPrefix => Ok(data.to_vec()),
            LengthOp::VarProto => {
                let mut len_prefixed =
                    Vec::with_capacity(prost::length_delimiter_len(data.len()) + data.len());
                prost::encode_length_delimiter(data.len(), &mut len_prefixed)
                    .map_err(|e| StateError::Backend(format!("encode varint length: {e}")))?;
                len_prefixed.extend_from_slice(data);
                Ok(len_prefixed)
            }
        }
    }

    let hashed_key = apply_hash(&leaf_op.prehash_key, key)?;
    let hashed_value = apply_hash(&leaf_op.prehash_value, value)?;

    let mut data = Vec::new();
    data.extend_from_slice(&leaf_op.prefix);
    data.extend_from_slice(&apply_length(&leaf_op.length, &hashed_key)?);
    data.extend_from_slice(&apply_length(&leaf_op.length, &hashed_value)?);

    match leaf_op.hash {
        HashOp::Blake2b256 => hash(&data),
        HashOp::NoHash => hash(&data),
    }
}

/// Computes the hash of an inner node according to the canonical encoding.
/// H(tag || version || height || size || len(key) || key || left_hash || right_hash)
pub(super) fn hash_inner(
    op: &InnerOp,
    left_hash: &[u8; 32],
    right_hash: &[u8; 32],
) -> Result<[u8; 32], StateError> {
    let mut data = Vec::with_capacity(
        1 + 8 + 4 + 8 + 4 + op.split_key.len() + left_hash.len() + right_hash.len(),
    );
    data.push(0x01); // Inner node tag
    data.extend_from_slice(&op.version.to_le_bytes());
    data.extend_from_slice(&op.height.to_le_bytes());
    data.extend_from_slice(&op.size.to_le_bytes());
    data.extend_from_slice(&(op.split_key.len() as u32).to_le_bytes());
    data.extend_from_slice(&op.split_key);
    data.extend_from_slice(left_hash);
    data.extend_from_slice(right_hash);
    hash(&data)
}

// --- Proof Data Structures ---

/// A membership or non-membership proof against a single IAVL root hash.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub enum IavlProof {
    /// Proves that `key` maps to `value` under the root.
    Existence(ExistenceProof),
    /// Proves that `key` is absent, by exhibiting its in-order neighbors.
    NonExistence(NonExistenceProof),
}

/// A proof that `key` maps to `value` in the tree rooted at a known hash.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct ExistenceProof {
    /// The key being proven.
    pub key: Vec<u8>,
    /// The value at `key`.
    pub value: Vec<u8>,
    /// The leaf hashing parameters used to hash `(key, value)`.
    pub leaf: LeafOp,
    /// The path of inner-node hashing steps from the leaf up to the root.
    pub path: Vec<InnerOp>,
}

/// A proof that `missing_key` is absent, via its immediate left/right neighbors.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct NonExistenceProof {
    /// The key asserted to be absent.
    pub missing_key: Vec<u8>,
    /// An existence proof for the largest key strictly less than `missing_key`, if any.
    pub left: Option<ExistenceProof>,
    /// An existence proof for the smallest key strictly greater than `missing_key`, if any.
    pub right: Option<ExistenceProof>,
}

/// Parameters describing how a leaf's `(key, value)` pair is hashed.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct LeafOp {
    /// The final hash applied to the assembled preimage.
    pub hash: HashOp,
    /// The hash applied to the key before it enters the preimage.
    pub prehash_key: HashOp,
    /// The hash applied to the value before it enters the preimage.
    pub prehash_value: HashOp,
    /// The length-prefixing convention for the (pre-hashed) key and value.
    pub length: LengthOp,
    /// A fixed domain-separation prefix prepended to the preimage.
    pub prefix: Vec<u8>,
}

/// Which side of a split an inner-node proof step's subject fell on.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub enum Side {
    /// The subject hash is the left child; `sibling_hash` is the right child.
    Left,
    /// The subject hash is the right child; `sibling_hash` is the left child.
    Right,
}

/// A single step in an inner-node path from a leaf to the root.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct InnerOp {
    /// The tree version at which this inner node was created.
    pub version: u64,
    /// The inner node's height.
    pub height: i32,
    /// The inner node's subtree size.
    pub size: u64,
    /// The split key recorded at this inner node.
    pub split_key: Vec<u8>,
    /// Which side the proof's subject hash occupies at this step.
    pub side: Side,
    /// The hash of the sibling subtree.
    pub sibling_hash: [u8; 32],
}

// --- Public Root Computation API ---

/// Computes the Merkle root hash implied by the given proof.
///
/// This function does not verify the proof against a known root or key;
/// it simply calculates the root hash that this proof asserts.
pub fn compute_root_from_proof(proof: &IavlProof) -> Result<[u8; 32], StateError> {
    match proof {
        IavlProof::Existence(p) => compute_root_from_existence(p),
        IavlProof::NonExistence(p) => compute_root_from_non_existence(p),
    }
}

/// Computes the root hash from an ExistenceProof using the key and value contained within it.
pub fn compute_root_from_existence(p: &ExistenceProof) -> Result<[u8; 32], StateError> {
    let mut current_hash = hash_leaf(&p.leaf, &p.key, &p.value)?;

    for step in &p.path {
        let (left, right) = match step.side {
            Side::Left => (step.sibling_hash, current_hash),
            Side::Right => (current_hash, step.sibling_hash),
        };
        current_hash = hash_inner(step, &left, &right)?;
    }
    Ok(current_hash)
}

/// Computes the root hash from a NonExistenceProof.
///
/// A NonExistenceProof implies a specific root hash by proving the existence of
/// the left and/or right neighbors of the missing key.
pub fn compute_root_from_non_existence(p: &NonExistenceProof) -> Result<[u8; 32], StateError> {
    if p.left.is_none() && p.right.is_none() {
        return hash(&[]);
    }

    let left_root = p.left.as_ref().map(compute_root_from_existence).transpose()?;
    let right_root = p.right.as_ref().map(compute_root_from_existence).transpose()?;

    match (left_root, right_root) {
        (Some(l), None) => Ok(l),
        (None, Some(r)) => Ok(r),
        (Some(l), Some(r)) => {
            if l != r {
                return Err(StateError::ProofHashMismatch);
            }
            Ok(l)
        }
        (None, None) => Err(StateError::Invariant(
            "non-existence proof with no neighbors and no empty-tree root".into(),
        )),
    }
}

// --- Verifier Logic ---

/// The single, canonical entry point for all IAVL proof verification.
pub fn verify_iavl_proof(
    root: &[u8; 32],
    key: &[u8],
    expected_value: Option<&[u8]>,
    proof: &IavlProof,
) -> Result<bool, StateError> {
    // 1. Structure and Semantics Check
    match (expected_value, proof) {
        (Some(val), IavlProof::Existence(p)) => {
            if p.key != key || p.value != val {
                return Ok(false);
            }
        }
        (None, IavlProof::NonExistence(p)) => {
            if p.missing_key != key {
                return Ok(false);
            }
            if let Some(l) = &p.left {
                if l.key >= p.missing_key {
                    return Ok(false);
                }
            }
            if let Some(r) = &p.right {
                if r.key <= p.missing_key {
                    return Ok(false);
                }
            }
            if let (Some(l), Some(r)) = (&p.left, &p.right) {
                if l.key >= r.key {
                    return Ok(false);
                }
            }
        }
        // Mismatched expectations (e.g., expecting a value but got a NonExistence proof).
        _ => return Ok(false),
    }

    // 2. Cryptographic verification: recompute the root hash asserted by the proof.
    let calculated_root = compute_root_from_proof(proof)?;

    // 3. Root match.
    Ok(calculated_root == *root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_op() -> LeafOp {
        LeafOp {
            hash: HashOp::Blake2b256,
            prehash_key: HashOp::NoHash,
            prehash_value: HashOp::Blake2b256,
            length: LengthOp::VarProto,
            prefix: vec![0x00],
        }
    }

    #[test]
    fn single_leaf_root_matches_node_hash() {
        use super::super::node::IAVLNode;

        let node = IAVLNode::new_leaf(b"k".to_vec(), b"v".to_vec(), 1).unwrap();
        let proof = ExistenceProof {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
            leaf: leaf_op(),
            path: vec![],
        };
        let root = compute_root_from_existence(&proof).unwrap();
        assert_eq!(root, node.hash);
    }

    #[test]
    fn non_existence_with_no_neighbors_is_empty_root() {
        let proof = NonExistenceProof {
            missing_key: b"x".to_vec(),
            left: None,
            right: None,
        };
        let root = compute_root_from_non_existence(&proof).unwrap();
        assert_eq!(root, hash(&[]).unwrap());
    }

    #[test]
    fn verify_rejects_mismatched_key() {
        let proof = ExistenceProof {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
            leaf: leaf_op(),
            path: vec![],
        };
        let root = compute_root_from_existence(&proof).unwrap();
        let ok = verify_iavl_proof(&root, b"other", Some(b"v"), &IavlProof::Existence(proof)).unwrap();
        assert!(!ok);
    }
}
