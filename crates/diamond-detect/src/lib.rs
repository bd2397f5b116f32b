//! # diamond-detect: Coordinated-buy detection.
//!
//! Evaluates each purchase against the launch's recent buys with a weighted,
//! additive evidence model:
//! - **Known bundler** (critical), **same slot** and **shared funding** (high),
//!   **new-wallet cluster**, **similar amounts**, and **timing regularity** (medium).
//! - Severity weights sum to a confidence in `[0, 100]` that selects a
//!   remediation action and penalty.
//! - Collaborator failures degrade to "no evidence"; detection never blocks
//!   the purchase itself.
//!
//! [`LaunchMonitor`] serializes evaluations per launch and feeds the
//! relationship graph and the audit sink.

pub mod detector;
pub mod memory;
pub mod pipeline;
pub mod registry;
pub mod scoring;
pub mod window;

pub use detector::{BundleDetector, Collaborators};
pub use memory::{MemoryLedger, MemorySink};
pub use pipeline::LaunchMonitor;
pub use registry::MemoryBundlerRegistry;
pub use window::RecentBuys;
