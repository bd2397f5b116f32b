//! Per-launch ingest pipeline.
//!
//! Each launch owns a [`RecentBuys`] window behind an async mutex. Ingesting a
//! buy holds that launch's mutex for the whole append → evaluate step, so two
//! buys of one launch never see a history missing the other. Different
//! launches hold different mutexes and run in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use diamond_core::traits::AnalysisSink;
use diamond_core::types::{BundleAnalysis, BuyEvent, Penalty, StandingPenalty};

use crate::detector::BundleDetector;
use crate::window::RecentBuys;

pub struct LaunchMonitor {
    detector: Arc<BundleDetector>,
    sink: Arc<dyn AnalysisSink>,
    windows: DashMap<String, Arc<Mutex<RecentBuys>>>,
    /// Most severe penalty per (wallet, launch).
    penalties: DashMap<(String, String), StandingPenalty>,
}

impl LaunchMonitor {
    pub fn new(detector: Arc<BundleDetector>, sink: Arc<dyn AnalysisSink>) -> Self {
        Self {
            detector,
            sink,
            windows: DashMap::new(),
            penalties: DashMap::new(),
        }
    }

    pub fn detector(&self) -> &Arc<BundleDetector> {
        &self.detector
    }

    fn window_for(&self, launch_id: &str) -> Arc<Mutex<RecentBuys>> {
        let capacity = self.detector.config().recent_window;
        self.windows
            .entry(launch_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RecentBuys::new(capacity))))
            .clone()
    }

    /// Append `event` to its launch window, evaluate it, record the buy in
    /// the graph, and emit the analysis to the sink.
    pub async fn ingest(&self, event: BuyEvent) -> BundleAnalysis {
        let window = self.window_for(&event.launch_id);
        let mut guard = window.lock().await;
        if !guard.push(event.clone()) {
            debug!(signature = %event.signature, "monitor: duplicate buy, re-evaluating");
        }
        self.detector
            .graph()
            .record_buy(&event.wallet, event.amount, event.timestamp);
        let recent = guard.snapshot();
        let analysis = self
            .detector
            .evaluate(&event.signature, &event.launch_id, &recent)
            .await;
        drop(guard);

        if let Some(standing) = analysis.standing_penalty() {
            self.record_penalty(&event.wallet, &event.launch_id, standing);
        }
        self.sink.record_analysis(&analysis);
        analysis
    }

    fn record_penalty(&self, wallet: &str, launch_id: &str, standing: StandingPenalty) {
        self.penalties
            .entry((wallet.to_string(), launch_id.to_string()))
            .and_modify(|current| {
                if severity(standing.penalty) >= severity(current.penalty) {
                    *current = standing;
                }
            })
            .or_insert(standing);
    }

    /// The penalty standing against `wallet` in `launch_id`.
    ///
    /// Registry membership blocks regardless of what any single analysis said.
    pub fn penalty_for(&self, wallet: &str, launch_id: &str) -> Option<StandingPenalty> {
        let recorded = self
            .penalties
            .get(&(wallet.to_string(), launch_id.to_string()))
            .map(|p| *p);
        match self.detector.registry().get(wallet) {
            Some(record) => Some(StandingPenalty {
                penalty: Penalty::Blocked,
                issued_at: recorded.map_or(record.flagged_at, |p| p.issued_at),
            }),
            None => recorded,
        }
    }

    /// Buys currently held in the window of `launch_id`, oldest first.
    pub async fn recent_buys(&self, launch_id: &str) -> Vec<BuyEvent> {
        let window = self.windows.get(launch_id).map(|w| w.value().clone());
        match window {
            Some(w) => w.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.windows.len()
    }
}

fn severity(p: Penalty) -> u8 {
    match p {
        Penalty::DelayRewards { .. } => 1,
        Penalty::ReduceRewards { .. } => 2,
        Penalty::Blocked => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diamond_core::config::{DetectorConfig, GraphConfig};
    use diamond_core::time::{Clock, ManualClock};
    use diamond_core::traits::BundlerRegistry;
    use diamond_core::types::{Action, Transfer};
    use diamond_graph::WalletGraph;

    use crate::detector::Collaborators;
    use crate::memory::{MemoryLedger, MemorySink};
    use crate::registry::MemoryBundlerRegistry;

    const NOW: i64 = 1_700_000_000_000;

    fn monitor(config: DetectorConfig) -> (LaunchMonitor, Arc<MemoryLedger>, Arc<MemorySink>) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
        let ledger = Arc::new(MemoryLedger::new(clock.clone()));
        let detector = Arc::new(BundleDetector::new(
            config,
            Collaborators::single(ledger.clone()),
            Arc::new(MemoryBundlerRegistry::new()),
            Arc::new(WalletGraph::new(GraphConfig::default(), clock.clone())),
            clock,
        ));
        let sink = Arc::new(MemorySink::new());
        (LaunchMonitor::new(detector, sink.clone()), ledger, sink)
    }

    fn buy(launch: &str, n: usize, slot: u64) -> BuyEvent {
        BuyEvent {
            signature: format!("{launch}-sig{n}"),
            wallet: format!("{launch}-w{n}"),
            launch_id: launch.into(),
            amount: 1_000_000,
            tokens_received: 1_000,
            slot,
            timestamp: NOW - 5_000,
        }
    }

    fn prepare(ledger: &MemoryLedger, event: &BuyEvent) {
        ledger.insert_buy(event);
        ledger.set_first_activity(&event.wallet, NOW - 86_400_000 * 90);
        ledger.add_transfer(
            &event.wallet,
            Transfer {
                source: format!("{}-funder", event.launch_id),
                amount: 10,
                timestamp: NOW - 60_000,
            },
        );
    }

    #[tokio::test]
    async fn ingest_emits_to_sink_and_records_buy() {
        let (m, ledger, sink) = monitor(DetectorConfig::default());
        let e = buy("A", 0, 1);
        prepare(&ledger, &e);
        let a = m.ingest(e.clone()).await;
        assert_eq!(a.action, Action::None);
        assert_eq!(sink.analyses(), vec![a]);
        assert_eq!(m.recent_buys("A").await, vec![e]);
        let node = m.detector().graph().node("A-w0").unwrap();
        assert_eq!(node.transaction_count, 1);
        assert!(m.penalty_for("A-w0", "A").is_none());
    }

    #[tokio::test]
    async fn window_is_bounded_per_launch() {
        let config = DetectorConfig {
            recent_window: 3,
            ..DetectorConfig::default()
        };
        let (m, ledger, _) = monitor(config);
        for n in 0..5 {
            let e = buy("A", n, n as u64);
            prepare(&ledger, &e);
            m.ingest(e).await;
        }
        let e = buy("B", 0, 0);
        prepare(&ledger, &e);
        m.ingest(e).await;

        assert_eq!(m.recent_buys("A").await.len(), 3);
        assert_eq!(m.recent_buys("B").await.len(), 1);
        assert_eq!(m.launch_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_ingest_same_launch_sees_every_buy() {
        let (m, ledger, sink) = monitor(DetectorConfig::default());
        let m = Arc::new(m);
        let events: Vec<BuyEvent> = (0..5).map(|n| buy("A", n, 9)).collect();
        for e in &events {
            prepare(&ledger, e);
        }
        let handles: Vec<_> = events
            .into_iter()
            .map(|e| {
                let m = m.clone();
                tokio::spawn(async move { m.ingest(e).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        let analyses = sink.analyses();
        assert_eq!(analyses.len(), 5);
        // Serialized: the last evaluation saw the four earlier buys.
        let max_slot_peers = analyses
            .iter()
            .filter_map(|a| {
                a.flags.iter().find_map(|f| match f.evidence {
                    diamond_core::types::Evidence::SameSlot { count, .. } => Some(count),
                    _ => None,
                })
            })
            .max();
        assert_eq!(max_slot_peers, Some(4));
    }

    #[tokio::test]
    async fn launches_evaluated_independently() {
        let (m, ledger, _) = monitor(DetectorConfig::default());
        for n in 0..4 {
            let e = buy("A", n, 3);
            prepare(&ledger, &e);
            m.ingest(e).await;
        }
        let e = buy("B", 0, 3);
        prepare(&ledger, &e);
        let a = m.ingest(e).await;
        assert!(a.flags.is_empty());
    }

    #[tokio::test]
    async fn standing_penalty_keeps_most_severe() {
        let (m, ledger, _) = monitor(DetectorConfig::default());
        let mut last = None;
        for n in 0..5 {
            let e = buy("A", n, 3);
            prepare(&ledger, &e);
            last = Some(m.ingest(e).await);
        }
        let last = last.unwrap();
        assert_eq!(last.action, Action::DelayRewards);
        let standing = m.penalty_for("A-w4", "A").unwrap();
        assert_eq!(standing.penalty, Penalty::DelayRewards { delay_days: 30 });

        m.record_penalty(
            "A-w4",
            "A",
            StandingPenalty {
                penalty: Penalty::ReduceRewards { reduction_bps: 5_000 },
                issued_at: NOW,
            },
        );
        m.record_penalty(
            "A-w4",
            "A",
            StandingPenalty {
                penalty: Penalty::DelayRewards { delay_days: 30 },
                issued_at: NOW + 1,
            },
        );
        assert_eq!(
            m.penalty_for("A-w4", "A").unwrap().penalty,
            Penalty::ReduceRewards { reduction_bps: 5_000 }
        );
    }

    #[tokio::test]
    async fn registry_membership_blocks() {
        let (m, _, _) = monitor(DetectorConfig::default());
        m.detector().registry().register("x", "manual", NOW - 10);
        let p = m.penalty_for("x", "A").unwrap();
        assert_eq!(p.penalty, Penalty::Blocked);
        assert_eq!(p.issued_at, NOW - 10);
    }
}
