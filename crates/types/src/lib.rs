#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Nyx Node Types
//!
//! Foundational data structures and error types for the Nyx node: the
//! consensus-critical wire types (`BlockHeader`, `BlockPayload`, `Transaction`,
//! `Box`, `Proposition`, `SyncInfo`) plus the canonical codec and the
//! per-domain error enums shared by every other crate in the workspace.
//!
//! As the base crate, `nyx-types` has minimal dependencies and is itself a
//! dependency for almost every other crate, which avoids circular
//! dependencies and gives a single, stable definition for shared types.

/// A top-level, crate-wide `Result` alias is deliberately not provided here:
/// each domain error type in [`error`] is returned directly by the crate that
/// owns the relevant operation.
pub mod boxes;
/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// A unified set of error types used across the workspace.
pub mod error;
/// Header, payload and modifier identity types.
pub mod header;
/// Well-known, crate-wide constants.
pub mod ids;
/// Proposition (spending condition) types.
pub mod proposition;
/// `SyncInfo` and the chain-comparison result it produces.
pub mod sync;
/// Transaction and its constituent unlockers/directives.
pub mod tx;

pub use boxes::{AssetId, Box, BoxId};
pub use header::{ADDigest, ADProof, BlockHeader, BlockPayload};
pub use ids::{Height, ModifierId, VersionTag};
pub use proposition::Proposition;
pub use sync::{ChainCompare, SyncInfo};
pub use tx::{Directive, Transaction, Unlocker};

/// The maximum number of header ids carried in a single `SyncInfo` message.
pub const MAX_SYNC_INFO_IDS: usize = 1000;
