// Path: crates/tx/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! Transaction semantic validation: `Proposition::unlock` dispatch plumbing
//! and the `ASE.validate` algorithm, consumed by `nyx-state` and by
//! `nyx-consensus`'s candidate-assembly re-validation pass.

pub mod validate;

pub use validate::{validate_transaction, BoxLookup, ValidationContext};
