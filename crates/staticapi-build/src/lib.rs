//! Recursive route tree materialization for staticapi.
//!
//! Walks an in-memory route tree and, for each node, creates a mirrored
//! output directory, materializes children concurrently, and writes a JSON
//! document for the node with child links rewritten to point at the
//! generated files. The output is meant to be served by any static file
//! server in place of a live API.
//!
//! # Ordering
//!
//! Sibling subtrees are materialized concurrently (one task per node), but a
//! node's own document is written only after its entire subtree is on disk.
//! A published link therefore never points at a document that does not exist
//! yet.

mod builder;
mod link;

pub use builder::{BuildConfig, BuildError, BuildReport, Builder, ChildLink};
