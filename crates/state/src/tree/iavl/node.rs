// Path: crates/state/src/tree/iavl/node.rs

use super::encode;
use nyx_crypto::hash::blake2b256;
use nyx_types::error::StateError;

/// A hash representing a child node.
pub(crate) type NodeHash = [u8; 32];
/// A canonical hash for an empty/nil child node.
pub(crate) const EMPTY_HASH: NodeHash = [0; 32];

/// IAVL+ tree node. Children are referenced by hash rather than by pointer,
/// so a node can be reconstructed identically whether it was just created in
/// memory or lazily faulted in from the state store.
#[derive(Debug, Clone)]
pub(crate) struct IAVLNode {
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
    pub(crate) version: u64,
    pub(crate) height: i32,
    pub(crate) size: u64,
    /// The hash of this node's canonical representation.
    pub hash: NodeHash,
    /// The hash of the left child, if it exists.
    pub left_hash: Option<NodeHash>,
    /// The hash of the right child, if it exists.
    pub right_hash: Option<NodeHash>,
}

impl IAVLNode {
    /// Creates a new leaf node and computes its hash.
    pub(crate) fn new_leaf(key: Vec<u8>, value: Vec<u8>, version: u64) -> Result<Self, StateError> {
        let mut node = Self {
            key,
            value,
            version,
            height: 0,
            size: 1,
            hash: EMPTY_HASH,
            left_hash: None,
            right_hash: None,
        };
        node.hash = node.compute_hash()?;
        Ok(node)
    }

    /// Computes the hash of this node per the canonical (ICS-23-inspired)
    /// leaf/inner preimage rules in [`super::proof`].
    pub(crate) fn compute_hash(&self) -> Result<NodeHash, StateError> {
        if self.is_leaf() {
            let value_hash = blake2b256(&self.value).map_err(|e| StateError::Backend(e.to_string()))?;

            let mut preimage = vec![0x00];
            prost::encode_length_delimiter(self.key.len(), &mut preimage)
                .map_err(|e| StateError::Backend(format!("encode key len: {e}")))?;
            preimage.extend_from_slice(&self.key);
            prost::encode_length_delimiter(value_hash.len(), &mut preimage)
                .map_err(|e| StateError::Backend(format!("encode value_hash len: {e}")))?;
            preimage.extend_from_slice(&value_hash);

            blake2b256(&preimage).map_err(|e| StateError::Backend(e.to_string()))
        } else {
            let data = encode::encode_node_canonical(self)?;
            blake2b256(&data).map_err(|e| StateError::Backend(e.to_string()))
        }
    }

    /// Whether this node is a leaf (carries a key/value directly rather than
    /// splitting into two children).
    pub(crate) fn is_leaf(&self) -> bool {
        self.left_hash.is_none() && self.right_hash.is_none()
    }

    /// Reconstructs an `IAVLNode` from the raw parts produced by [`encode::decode_node`].
    pub(crate) fn from_decoded(decoded: encode::DecodedNode) -> Result<Self, StateError> {
        let mut node = IAVLNode {
            key: if decoded.is_leaf {
                decoded.key
            } else {
                decoded.split_key
            },
            value: decoded.value,
            version: decoded.version,
            height: decoded.height,
            size: decoded.size,
            hash: EMPTY_HASH,
            left_hash: (decoded.left_hash != EMPTY_HASH).then_some(decoded.left_hash),
            right_hash: (decoded.right_hash != EMPTY_HASH).then_some(decoded.right_hash),
        };
        node.hash = node.compute_hash()?;
        Ok(node)
    }
}
