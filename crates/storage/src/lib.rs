// Path: crates/storage/src/lib.rs
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

//! The two versioned key-value stores named in the external-interfaces
//! section: a history store (headers, payloads, best-chain indices) and a
//! state store (the authenticated dictionary's content-addressed nodes plus
//! an unauthenticated box index), both built on `redb`. Each commit goes
//! through a single `redb` write transaction, so durability is the backend's
//! own guarantee rather than a separate log this crate maintains.

pub mod error;
pub mod history_store;
pub mod state_store;

pub use error::StorageError;
pub use history_store::HistoryStore;
pub use state_store::StateStore;
