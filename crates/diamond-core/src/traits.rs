//! Trait interfaces between the analytical core and its collaborators.
//!
//! - [`TransactionResolver`]: signature lookup (ledger indexer implements)
//! - [`FundingLookup`]: incoming transfers per account (ledger indexer implements)
//! - [`AccountAgeLookup`]: first recorded activity per account (ledger indexer implements)
//! - [`BundlerRegistry`]: persistent set of flagged actors (storage implements)
//! - [`AnalysisSink`]: audit log of analyses and claims (storage implements)
//!
//! The lookups are the only calls expected to block on external I/O, so they
//! are `async`. The registry and sink are in-process and synchronous.

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::types::{BundleAnalysis, BundlerRecord, ClaimRecord, ResolvedTransaction, Transfer};

/// Resolves a transaction signature to its ledger data.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TransactionResolver: Send + Sync {
    /// `Ok(None)` when the signature is unknown to the ledger.
    async fn resolve(&self, signature: &str)
    -> Result<Option<ResolvedTransaction>, CollaboratorError>;
}

/// Lists value transferred into an account.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FundingLookup: Send + Sync {
    /// Transfers into `address` within the last `lookback_hours`.
    async fn recent_incoming_transfers(
        &self,
        address: &str,
        lookback_hours: u64,
    ) -> Result<Vec<Transfer>, CollaboratorError>;
}

/// Reports when an account was first active.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccountAgeLookup: Send + Sync {
    /// `Ok(None)` when the account has no recorded activity.
    async fn first_activity(&self, address: &str) -> Result<Option<i64>, CollaboratorError>;
}

/// Process-wide registry of wallets previously flagged as bundlers.
///
/// Membership only grows. Re-registering a wallet bumps its incident count.
pub trait BundlerRegistry: Send + Sync {
    fn contains(&self, wallet: &str) -> bool;

    fn get(&self, wallet: &str) -> Option<BundlerRecord>;

    /// Add `wallet`, or bump its incident count if already present.
    fn register(&self, wallet: &str, evidence: &str, now: i64) -> BundlerRecord;

    /// All registered wallets, sorted.
    fn wallets(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.wallets().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Destination for analysis results and reward computations.
pub trait AnalysisSink: Send + Sync {
    fn record_analysis(&self, analysis: &BundleAnalysis);

    fn record_claim(&self, claim: &ClaimRecord);
}
