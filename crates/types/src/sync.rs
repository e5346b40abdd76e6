//! Peer chain-comparison messages and the comparison result they produce.

use crate::ids::ModifierId;
use crate::MAX_SYNC_INFO_IDS;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A peer-sync message summarizing the last K header ids along a node's best
/// chain, oldest first, with the tip as the final element.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInfo {
    last_header_ids: Vec<ModifierId>,
}

impl SyncInfo {
    /// Builds a `SyncInfo`, rejecting id sequences longer than
    /// [`MAX_SYNC_INFO_IDS`].
    pub fn new(last_header_ids: Vec<ModifierId>) -> Result<Self, String> {
        if last_header_ids.len() > MAX_SYNC_INFO_IDS {
            return Err(format!(
                "SyncInfo carries {} ids, exceeding the {} maximum",
                last_header_ids.len(),
                MAX_SYNC_INFO_IDS
            ));
        }
        Ok(Self { last_header_ids })
    }

    /// The ordered header ids this message carries, oldest first.
    pub fn header_ids(&self) -> &[ModifierId] {
        &self.last_header_ids
    }

    /// Whether this message carries no header ids at all, i.e. the sender's
    /// history is empty.
    pub fn is_empty(&self) -> bool {
        self.last_header_ids.is_empty()
    }

    /// The sender's best-chain tip, i.e. the most recent id carried, if any.
    pub fn tip(&self) -> Option<ModifierId> {
        self.last_header_ids.last().copied()
    }

    /// The oldest ids carried, used as download starting points when the
    /// receiver's own history is empty.
    pub fn starting_points(&self) -> &[ModifierId] {
        &self.last_header_ids
    }
}

/// The result of comparing a remote peer's [`SyncInfo`] against the local
/// best chain, from the local node's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainCompare {
    /// The remote's best-chain tip equals ours.
    Equal,
    /// We hold headers the remote does not: the remote should sync from us.
    Younger,
    /// The remote holds headers we do not: we should sync from the remote.
    Older,
    /// Neither chain shares any common ancestor found in the exchanged ids.
    Nonsense,
}
