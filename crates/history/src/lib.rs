// Path: crates/history/src/lib.rs
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

//! The History Engine: accepts headers and payloads, persists them via
//! [`nyx_storage::HistoryStore`], tracks the best header chain and the best
//! payload-backed ("full") chain, and reports the [`ProgressInfo`]
//! instructions that drive the Authenticated State Engine's rollback/apply
//! sequence. Also answers peer sync-comparison queries
//! (`compare`/`continuationIds`) used by the networking layer this crate
//! does not itself implement.

mod config;
mod engine;
mod progress;

pub use config::HistoryConfig;
pub use engine::HistoryEngine;
pub use progress::{Modifier, ProgressInfo, SemanticValidity};
