//! Identity and height types shared across the node.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte opaque identifier: the content hash of a modifier's canonical
/// bytes. Used for both headers and payloads.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModifierId(pub [u8; 32]);

impl ModifierId {
    /// Wraps a raw 32-byte digest.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModifierId({})", hex::encode(self.0))
    }
}

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifies a committed ASE version. Same width as [`ModifierId`]; by
/// convention the `VersionTag` of a block's post-state equals that block's
/// [`ModifierId`].
pub type VersionTag = ModifierId;

/// Non-negative chain height. `0` is genesis. The pre-genesis sentinel
/// (`-1` in the semantic data model) is represented as `Option<Height>::None`
/// on the parent link rather than as a signed value, since nothing in this
/// crate needs to express "minus one" outside of that one relationship.
pub type Height = u64;
