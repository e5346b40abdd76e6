// Path: crates/state/src/tree/mod.rs
//! State commitment trees. The workspace carries a single tree
//! implementation — the IAVL+ variant — since the spec's purpose-and-scope
//! section is parametric only in the hash function, not the tree shape.

pub mod iavl;
