// Path: crates/history/src/progress.rs
//! The types `HistoryEngine::append` exchanges with its caller: the
//! modifier kinds it accepts, the instruction it emits, and the semantic-
//! validity classification of a header.

use nyx_types::header::{BlockHeader, BlockPayload};
use nyx_types::ids::ModifierId;

/// What `HistoryEngine::append` accepts: a bare header or a payload
/// completing a previously accepted header.
#[derive(Debug, Clone)]
pub enum Modifier {
    /// A newly received or locally produced header.
    Header(BlockHeader),
    /// A payload attaching to an already-known header.
    Payload(BlockPayload),
}

/// The instruction `HistoryEngine::append` (or `invalidate`) emits, directing
/// the Authenticated State Engine to roll back and re-apply along the
/// best-full-chain transition this call produced.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Header ids to roll back, most recent first.
    pub to_remove: Vec<ModifierId>,
    /// Full blocks to apply, in chain order, oldest first.
    pub to_apply: Vec<(BlockHeader, BlockPayload)>,
    /// The common ancestor of the removed and applied segments, or `None`
    /// when this is a pure extension with nothing to roll back.
    pub branch_point: Option<ModifierId>,
}

impl ProgressInfo {
    /// The instruction that changes nothing: no rollback, nothing to apply.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this instruction has any effect at all.
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_apply.is_empty()
    }
}

/// The semantic-validity classification of a header, per `isSemanticallyValid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticValidity {
    /// Passed every check in the Authenticated State Engine's `apply`.
    Valid,
    /// Failed validation after acceptance.
    Invalid,
    /// Accepted but not yet classified (its payload hasn't been applied).
    Unknown,
    /// Not a header this engine has ever seen.
    Absent,
}
