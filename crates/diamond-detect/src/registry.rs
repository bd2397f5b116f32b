//! In-process known-bundler registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use diamond_core::protocol::ProtocolTotals;
use diamond_core::traits::BundlerRegistry;
use diamond_core::types::BundlerRecord;

/// `DashMap`-backed [`BundlerRegistry`]. Grows for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryBundlerRegistry {
    records: DashMap<String, BundlerRecord>,
    totals: Option<Arc<ProtocolTotals>>,
}

impl MemoryBundlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with previously flagged wallets.
    pub fn with_wallets<I, S>(wallets: I, now: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = Self::new();
        for w in wallets {
            registry.register(w.as_ref(), "seeded", now);
        }
        registry
    }

    /// Count every wallet flagged from now on in `totals`. Wallets already
    /// present, seeded ones included, are not counted.
    pub fn with_totals(mut self, totals: Arc<ProtocolTotals>) -> Self {
        self.totals = Some(totals);
        self
    }
}

impl BundlerRegistry for MemoryBundlerRegistry {
    fn contains(&self, wallet: &str) -> bool {
        self.records.contains_key(wallet)
    }

    fn get(&self, wallet: &str) -> Option<BundlerRecord> {
        self.records.get(wallet).map(|r| r.value().clone())
    }

    fn register(&self, wallet: &str, evidence: &str, now: i64) -> BundlerRecord {
        let mut entry = self
            .records
            .entry(wallet.to_string())
            .and_modify(|r| {
                r.incident_count = r.incident_count.saturating_add(1);
                debug!(wallet, incidents = r.incident_count, "registry: repeat incident");
            })
            .or_insert_with(|| {
                info!(wallet, evidence, "registry: bundler flagged");
                if let Some(totals) = &self.totals {
                    totals.record_bundler();
                }
                BundlerRecord {
                    wallet: wallet.to_string(),
                    flagged_at: now,
                    evidence: evidence.to_string(),
                    incident_count: 0,
                }
            });
        if entry.incident_count == 0 {
            entry.incident_count = 1;
        }
        entry.value().clone()
    }

    fn wallets(&self) -> Vec<String> {
        let mut wallets: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        wallets.sort();
        wallets
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
