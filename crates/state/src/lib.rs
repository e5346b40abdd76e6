// Path: crates/state/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! The Authenticated State Engine (ASE): a persistent batched AVL+ prover
//! (PBAVL) over `nyx-storage`'s state store, holding the UTXO set keyed by
//! `BoxId` and exposing `apply`/`rollbackTo`/`validate`/
//! `proofsForTransactions`/`rollbackVersions`.
//!
//! `tree` holds the content-addressed IAVL+ tree itself (hashing, balancing,
//! proof construction); `ase` layers transaction validation, block
//! application and persistence on top.

pub mod ase;
pub mod tree;

pub use ase::{AuthenticatedStateEngine, Modifier};
pub use tree::iavl::IAVLTree;
