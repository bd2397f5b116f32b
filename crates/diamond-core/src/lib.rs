//! # diamond-core
//! Foundation types, collaborator traits, and configuration for DiamondPad.
//!
//! - [`types`]: buy events, evidence flags, analyses, penalties
//! - [`traits`]: contracts with the ledger indexer, registry, and sinks
//! - [`config`]: detector, graph, and rewards thresholds
//! - [`stats`]: integer interval statistics shared by detector and graph
//! - [`protocol`]: launch registry and protocol-wide totals

pub mod config;
pub mod constants;
pub mod error;
pub mod launch;
pub mod protocol;
pub mod stats;
pub mod time;
pub mod traits;
pub mod types;
