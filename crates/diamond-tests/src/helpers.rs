//! Shared builders for the end-to-end tests.

use std::sync::Arc;

use diamond_core::config::Settings;
use diamond_core::constants::{MS_PER_DAY, MS_PER_HOUR};
use diamond_core::protocol::LaunchRegistry;
use diamond_core::time::{Clock, ManualClock};
use diamond_core::types::{BundleAnalysis, BuyEvent, Transfer};
use diamond_detect::{
    BundleDetector, Collaborators, LaunchMonitor, MemoryBundlerRegistry, MemoryLedger, MemorySink,
};
use diamond_graph::WalletGraph;
use diamond_rewards::HolderBook;

/// Fixed start time for every harness.
pub const T0: i64 = 1_700_000_000_000;

/// Every component wired together over in-memory collaborators.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub launches: Arc<LaunchRegistry>,
    pub ledger: Arc<MemoryLedger>,
    pub registry: Arc<MemoryBundlerRegistry>,
    pub graph: Arc<WalletGraph>,
    pub sink: Arc<MemorySink>,
    pub monitor: LaunchMonitor,
    pub book: HolderBook,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let ledger = Arc::new(MemoryLedger::new(dyn_clock.clone()));
        let launches = Arc::new(LaunchRegistry::new());
        let registry = Arc::new(MemoryBundlerRegistry::new().with_totals(launches.totals()));
        let graph = Arc::new(WalletGraph::new(settings.graph.clone(), dyn_clock.clone()));
        let sink = Arc::new(MemorySink::new());
        let detector = Arc::new(BundleDetector::new(
            settings.detector.clone(),
            Collaborators::single(ledger.clone()),
            registry.clone(),
            graph.clone(),
            dyn_clock,
        ));
        let monitor = LaunchMonitor::new(detector, sink.clone());
        let book =
            HolderBook::new(settings.rewards.clone(), sink.clone()).with_launches(launches.clone());
        Self {
            clock,
            launches,
            ledger,
            registry,
            graph,
            sink,
            monitor,
            book,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance(days * MS_PER_DAY);
    }

    /// Wallet whose first on-chain activity was `days` ago.
    pub fn aged_wallet(&self, wallet: &str, days: i64) {
        self.ledger
            .set_first_activity(wallet, self.now() - days * MS_PER_DAY);
    }

    /// `funder` sent value to `wallet` an hour ago.
    pub fn funded_by(&self, wallet: &str, funder: &str) {
        self.ledger.add_transfer(
            wallet,
            Transfer {
                source: funder.to_string(),
                amount: 1_000_000_000,
                timestamp: self.now() - MS_PER_HOUR,
            },
        );
    }

    /// Make the buy resolvable, open the holder position, and run detection.
    pub async fn ingest(&self, event: BuyEvent) -> BundleAnalysis {
        self.ledger.insert_buy(&event);
        self.book.record_buy(&event);
        self.monitor.ingest(event).await
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`BuyEvent`]s with sensible defaults.
#[derive(Debug, Clone)]
pub struct BuyBuilder {
    event: BuyEvent,
}

impl BuyBuilder {
    pub fn new(signature: &str, wallet: &str, launch_id: &str) -> Self {
        Self {
            event: BuyEvent {
                signature: signature.to_string(),
                wallet: wallet.to_string(),
                launch_id: launch_id.to_string(),
                amount: 1_000_000_000,
                tokens_received: 1_000_000,
                slot: 1,
                timestamp: T0,
            },
        }
    }

    pub fn amount(mut self, lamports: u64) -> Self {
        self.event.amount = lamports;
        self
    }

    pub fn tokens(mut self, tokens: u64) -> Self {
        self.event.tokens_received = tokens;
        self
    }

    pub fn slot(mut self, slot: u64) -> Self {
        self.event.slot = slot;
        self
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn build(self) -> BuyEvent {
        self.event
    }
}

/// Shorthand for a default buy.
pub fn buy(signature: &str, wallet: &str, launch_id: &str) -> BuyBuilder {
    BuyBuilder::new(signature, wallet, launch_id)
}
