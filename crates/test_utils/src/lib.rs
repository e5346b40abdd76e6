// Path: crates/test_utils/src/lib.rs
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

//! Shared fixtures for the Nyx node's test suites: deterministic keypairs, a
//! minimal genesis-block builder, and `tempfile`-backed store helpers, used
//! by the `#[cfg(test)]` modules and `tests/` integration suites across the
//! workspace.

pub mod fixtures;

pub use fixtures::{build_and_apply_genesis, genesis_keypair, mine_header, open_state_store, GenesisFixture};
