//! In-memory collaborators.
//!
//! [`MemoryLedger`] answers all three ledger lookups from maps filled by the
//! caller (fixtures, tests, the replay binary). [`MemorySink`] keeps the
//! audit log in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use diamond_core::error::CollaboratorError;
use diamond_core::time::{hours_to_ms, Clock};
use diamond_core::traits::{AccountAgeLookup, AnalysisSink, FundingLookup, TransactionResolver};
use diamond_core::types::{BundleAnalysis, BuyEvent, ClaimRecord, ResolvedTransaction, Transfer};

#[derive(Default)]
struct LedgerState {
    transactions: HashMap<String, ResolvedTransaction>,
    transfers: HashMap<String, Vec<Transfer>>,
    first_activity: HashMap<String, i64>,
}

pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            clock,
        }
    }

    pub fn insert_transaction(&self, tx: ResolvedTransaction) {
        self.state.write().transactions.insert(tx.signature.clone(), tx);
    }

    /// Register the ledger view of a buy so the resolver can find it.
    pub fn insert_buy(&self, event: &BuyEvent) {
        let sol_delta = i64::try_from(event.amount).map_or(i64::MIN, |a| -a);
        self.insert_transaction(ResolvedTransaction {
            signature: event.signature.clone(),
            slot: event.slot,
            block_time: event.timestamp,
            buyer: event.wallet.clone(),
            sol_delta,
            instructions: vec!["buy".to_string()],
        });
    }

    pub fn add_transfer(&self, to: &str, transfer: Transfer) {
        self.state
            .write()
            .transfers
            .entry(to.to_string())
            .or_default()
            .push(transfer);
    }

    /// Record first activity, keeping the earliest value seen.
    pub fn set_first_activity(&self, address: &str, at: i64) {
        self.state
            .write()
            .first_activity
            .entry(address.to_string())
            .and_modify(|t| *t = (*t).min(at))
            .or_insert(at);
    }
}

#[async_trait]
impl TransactionResolver for MemoryLedger {
    async fn resolve(
        &self,
        signature: &str,
    ) -> Result<Option<ResolvedTransaction>, CollaboratorError> {
        Ok(self.state.read().transactions.get(signature).cloned())
    }
}

#[async_trait]
impl FundingLookup for MemoryLedger {
    async fn recent_incoming_transfers(
        &self,
        address: &str,
        lookback_hours: u64,
    ) -> Result<Vec<Transfer>, CollaboratorError> {
        let cutoff = self.clock.now_ms().saturating_sub(hours_to_ms(lookback_hours));
        Ok(self
            .state
            .read()
            .transfers
            .get(address)
            .map(|ts| ts.iter().filter(|t| t.timestamp >= cutoff).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AccountAgeLookup for MemoryLedger {
    async fn first_activity(&self, address: &str) -> Result<Option<i64>, CollaboratorError> {
        Ok(self.state.read().first_activity.get(address).copied())
    }
}

/// Audit log kept in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemorySink {
    analyses: Mutex<Vec<BundleAnalysis>>,
    claims: Mutex<Vec<ClaimRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyses(&self) -> Vec<BundleAnalysis> {
        self.analyses.lock().clone()
    }

    pub fn claims(&self) -> Vec<ClaimRecord> {
        self.claims.lock().clone()
    }
}

impl AnalysisSink for MemorySink {
    fn record_analysis(&self, analysis: &BundleAnalysis) {
        self.analyses.lock().push(analysis.clone());
    }

    fn record_claim(&self, claim: &ClaimRecord) {
        self.claims.lock().push(claim.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diamond_core::time::ManualClock;

    const NOW: i64 = 1_700_000_000_000;

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(Arc::new(ManualClock::new(NOW)))
    }

    #[tokio::test]
    async fn resolves_inserted_buy() {
        let l = ledger();
        let ev = BuyEvent {
            signature: "s1".into(),
            wallet: "w".into(),
            launch_id: "L".into(),
            amount: 500,
            tokens_received: 1,
            slot: 9,
            timestamp: NOW,
        };
        l.insert_buy(&ev);
        let tx = l.resolve("s1").await.unwrap().unwrap();
        assert_eq!(tx.buyer, "w");
        assert_eq!(tx.slot, 9);
        assert_eq!(tx.amount(), 500);
        assert!(l.resolve("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transfers_filtered_by_lookback() {
        let l = ledger();
        let recent = Transfer {
            source: "f".into(),
            amount: 1,
            timestamp: NOW - 1_000,
        };
        let stale = Transfer {
            source: "old".into(),
            amount: 1,
            timestamp: NOW - hours_to_ms(48),
        };
        l.add_transfer("w", recent.clone());
        l.add_transfer("w", stale);
        assert_eq!(l.recent_incoming_transfers("w", 24).await.unwrap(), vec![recent]);
        assert!(l.recent_incoming_transfers("nobody", 24).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_activity_keeps_earliest() {
        let l = ledger();
        l.set_first_activity("w", 200);
        l.set_first_activity("w", 100);
        l.set_first_activity("w", 300);
        assert_eq!(l.first_activity("w").await.unwrap(), Some(100));
        assert_eq!(l.first_activity("x").await.unwrap(), None);
    }

    #[test]
    fn sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record_analysis(&BundleAnalysis::clean("a", "L", 1));
        sink.record_analysis(&BundleAnalysis::clean("b", "L", 2));
        let sigs: Vec<_> = sink.analyses().into_iter().map(|a| a.signature).collect();
        assert_eq!(sigs, vec!["a", "b"]);
        assert!(sink.claims().is_empty());
    }
}
