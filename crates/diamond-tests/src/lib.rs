//! Cross-crate test suite for DiamondPad.
//!
//! Drives buys through the full pipeline (ingest, detect, graph, rewards)
//! and checks the invariants that only hold when the crates work together.

pub mod helpers;
