//! The coordination detector.
//!
//! [`BundleDetector::evaluate`] resolves one transaction, runs every heuristic
//! against the launch's recent window, and returns a [`BundleAnalysis`].
//! The evaluation proceeds in three phases:
//!
//! 1. **Snapshot** what is needed from shared state (registry record, other
//!    buyers' funding histories) and release every guard.
//! 2. **Await** the collaborator lookups, each under `lookup_timeout_ms`.
//!    A failed or slow lookup yields no evidence and a `warn!`.
//! 3. **Merge** the observed funding transfers and same-slot co-purchases
//!    into the relationship graph, and promote high-confidence actors into
//!    the known-bundler registry.
//!
//! Detection never fails the caller: an unresolvable signature produces a
//! zero-confidence analysis with action `none`.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use futures::future::join_all;
use tracing::{debug, info, warn};

use diamond_core::config::DetectorConfig;
use diamond_core::error::CollaboratorError;
use diamond_core::time::{elapsed_hours, Clock};
use diamond_core::traits::{
    AccountAgeLookup, BundlerRegistry, FundingLookup, TransactionResolver,
};
use diamond_core::types::{
    confidence_from_flags, BundleAnalysis, BundlerRecord, BuyEvent, Evidence, Flag, Penalty,
    ResolvedTransaction, Transfer,
};
use diamond_graph::{EdgeKind, WalletEdge, WalletGraph};

use crate::scoring;

/// The three ledger lookups the detector depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn TransactionResolver>,
    pub funding: Arc<dyn FundingLookup>,
    pub ages: Arc<dyn AccountAgeLookup>,
}

impl Collaborators {
    /// Use one implementation for all three lookups.
    pub fn single<L>(ledger: Arc<L>) -> Self
    where
        L: TransactionResolver + FundingLookup + AccountAgeLookup + 'static,
    {
        Self {
            resolver: ledger.clone(),
            funding: ledger.clone(),
            ages: ledger,
        }
    }
}

pub struct BundleDetector {
    config: DetectorConfig,
    lookups: Collaborators,
    registry: Arc<dyn BundlerRegistry>,
    graph: Arc<WalletGraph>,
    clock: Arc<dyn Clock>,
    /// First-activity timestamps already fetched. Only known values are kept.
    first_activity: DashMap<String, i64>,
    /// Transfers already merged into the graph as funding edges.
    merged_transfers: DashSet<(String, String, i64, u64)>,
}

impl BundleDetector {
    pub fn new(
        config: DetectorConfig,
        lookups: Collaborators,
        registry: Arc<dyn BundlerRegistry>,
        graph: Arc<WalletGraph>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            lookups,
            registry,
            graph,
            clock,
            first_activity: DashMap::new(),
            merged_transfers: DashSet::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<WalletGraph> {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<dyn BundlerRegistry> {
        &self.registry
    }

    /// Flag `wallet` by hand.
    pub fn add_known_bundler(&self, wallet: &str) -> BundlerRecord {
        self.registry.register(wallet, "added manually", self.clock.now_ms())
    }

    pub fn known_bundlers(&self) -> Vec<String> {
        self.registry.wallets()
    }

    /// Evaluate one purchase against `recent`, the launch's recent window.
    ///
    /// `recent` may or may not contain the evaluated transaction itself.
    pub async fn evaluate(
        &self,
        signature: &str,
        launch_id: &str,
        recent: &[BuyEvent],
    ) -> BundleAnalysis {
        let now = self.clock.now_ms();
        let Some(tx) = self.resolve(signature).await else {
            return BundleAnalysis::clean(signature, launch_id, now);
        };
        let buyer = tx.buyer.as_str();
        let others: Vec<&BuyEvent> = recent.iter().filter(|b| b.signature != signature).collect();

        let mut flags: Vec<Flag> = Vec::new();
        let mut related: BTreeSet<String> = BTreeSet::new();

        // Known bundler.
        if let Some(record) = self.registry.get(buyer) {
            debug!(wallet = buyer, incidents = record.incident_count, "detector: known bundler");
            flags.push(
                Evidence::KnownBundler {
                    incident_count: record.incident_count,
                }
                .into(),
            );
        }

        // Same slot.
        let mut slot_peers: Vec<String> = Vec::new();
        if let Some((evidence, peers)) = scoring::same_slot(&others, tx.slot, &self.config) {
            debug!(wallet = buyer, slot = tx.slot, peers = peers.len(), "detector: same-slot cluster");
            slot_peers = peers
                .iter()
                .filter(|p| p.wallet != buyer)
                .map(|p| p.wallet.clone())
                .collect();
            related.extend(slot_peers.iter().cloned());
            flags.push(evidence.into());
        }

        // Shared funding. Snapshot the cached histories before awaiting.
        let other_wallets = distinct_wallets(&others, buyer);
        let cached = self.graph.funding_sources_of(&other_wallets);
        let transfers = self.recent_funding(buyer, now).await;
        let buyer_funders: BTreeSet<String> = transfers.iter().map(|t| t.source.clone()).collect();
        let funding_source = match scoring::funding_overlap(&buyer_funders, &cached) {
            Some(overlap) => {
                debug!(
                    wallet = buyer,
                    funder = %overlap.funder,
                    overlap = overlap.wallets.len(),
                    "detector: shared funding"
                );
                related.extend(overlap.wallets.iter().cloned());
                flags.push(
                    Evidence::SharedFunding {
                        funder: overlap.funder.clone(),
                        overlap: overlap.wallets.len(),
                    }
                    .into(),
                );
                Some(overlap.funder)
            }
            None => scoring::most_frequent(transfers.iter().map(|t| t.source.as_str())),
        };

        // New-wallet cluster.
        if let Some(evidence) = self.new_wallet_cluster(buyer, &others, now).await {
            debug!(wallet = buyer, "detector: new-wallet cluster");
            flags.push(evidence.into());
        }

        // Similar amounts.
        if let Some(evidence) = scoring::similar_amounts(&others, tx.amount(), &self.config) {
            debug!(wallet = buyer, amount = tx.amount(), "detector: similar amounts");
            flags.push(evidence.into());
        }

        // Timing regularity over the other buys plus this one.
        let timestamps: Vec<i64> = others
            .iter()
            .map(|b| b.timestamp)
            .chain(std::iter::once(tx.block_time))
            .collect();
        if let Some(evidence) = scoring::timing_regularity(&timestamps, &self.config) {
            debug!(wallet = buyer, "detector: regular cadence");
            flags.push(evidence.into());
        }

        related.remove(buyer);
        let confidence = confidence_from_flags(&flags);
        let action = scoring::select_action(&flags, confidence, &self.config);
        let analysis = BundleAnalysis {
            signature: signature.to_string(),
            launch_id: launch_id.to_string(),
            wallet: Some(tx.buyer.clone()),
            is_bundled: confidence >= self.config.bundle_confidence_threshold,
            confidence,
            flags,
            related_wallets: related.into_iter().collect(),
            funding_source,
            action,
            penalty: Penalty::for_action(action),
            analyzed_at: now,
        };

        if analysis.is_bundled {
            info!(
                signature,
                launch_id,
                wallet = buyer,
                confidence,
                action = ?action,
                related = analysis.related_wallets.len(),
                "detector: coordinated buy"
            );
        } else {
            debug!(signature, wallet = buyer, confidence, "detector: evaluated");
        }

        if confidence >= self.config.auto_register_confidence {
            self.promote(&analysis, now);
        }
        self.merge_observations(&tx, &transfers, &slot_peers);
        analysis
    }

    // -----------------------------------------------------------------------
    // Collaborator calls
    // -----------------------------------------------------------------------

    fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.config.lookup_timeout_ms)
    }

    /// Await `fut` under the lookup timeout. Failures log and yield `None`.
    async fn bounded<T, F>(&self, what: &'static str, address: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.lookup_timeout(), fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(address, error = %e, "detector: {what} failed");
                None
            }
            Err(_) => {
                let e = CollaboratorError::Timeout {
                    millis: self.config.lookup_timeout_ms,
                };
                warn!(address, error = %e, "detector: {what} failed");
                None
            }
        }
    }

    async fn resolve(&self, signature: &str) -> Option<ResolvedTransaction> {
        let resolved = self
            .bounded("resolve", signature, self.lookups.resolver.resolve(signature))
            .await?;
        if resolved.is_none() {
            warn!(signature, "detector: signature not found, skipping detection");
        }
        resolved
    }

    /// Transfers into `address` within the lookback window. Empty on failure.
    async fn recent_funding(&self, address: &str, now: i64) -> Vec<Transfer> {
        let lookback = self.config.funding_lookback_hours;
        let cutoff = now.saturating_sub(self.config.lookback_ms());
        self.bounded(
            "funding lookup",
            address,
            self.lookups.funding.recent_incoming_transfers(address, lookback),
        )
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|t| t.timestamp >= cutoff)
        .collect()
    }

    /// Account age in whole hours. No recorded activity means brand-new;
    /// `None` means the lookup failed.
    async fn account_age_hours(&self, address: &str, now: i64) -> Option<u64> {
        let cached = self.first_activity.get(address).map(|t| *t);
        let first = match cached {
            Some(t) => Some(t),
            None => {
                let fetched = self
                    .bounded("age lookup", address, self.lookups.ages.first_activity(address))
                    .await?;
                if let Some(t) = fetched {
                    self.first_activity.insert(address.to_string(), t);
                }
                fetched
            }
        };
        Some(first.map_or(0, |t| elapsed_hours(t, now)))
    }

    async fn new_wallet_cluster(
        &self,
        buyer: &str,
        others: &[&BuyEvent],
        now: i64,
    ) -> Option<Evidence> {
        let max_age = self.config.new_wallet_max_age_hours;
        let buyer_age = self.account_age_hours(buyer, now).await?;
        if buyer_age >= max_age {
            return None;
        }
        // Sampled lookups run concurrently, each under its own timeout.
        let sample = scoring::latest_wallets(others, buyer, self.config.new_wallet_sample);
        let ages = join_all(sample.iter().map(|w| self.account_age_hours(w, now))).await;
        let young = ages
            .into_iter()
            .filter(|age| age.is_some_and(|age| age < max_age))
            .count();
        (young >= self.config.new_wallet_min_count).then(|| Evidence::NewWalletCluster {
            account_age_hours: buyer_age,
            new_wallets: young,
            sampled: sample.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Merging results into shared state
    // -----------------------------------------------------------------------

    fn promote(&self, analysis: &BundleAnalysis, now: i64) {
        let kinds: Vec<String> = analysis.flags.iter().map(|f| f.kind.to_string()).collect();
        let evidence = format!(
            "{} (confidence {}, signature {})",
            kinds.join(","),
            analysis.confidence,
            analysis.signature
        );
        let wallets = analysis.wallet.iter().chain(analysis.related_wallets.iter());
        for wallet in wallets {
            self.registry.register(wallet, &evidence, now);
        }
        info!(
            signature = %analysis.signature,
            promoted = analysis.related_wallets.len() + 1,
            "detector: wallets promoted to bundler registry"
        );
    }

    /// Funding edges for every transfer not merged before, and co-purchase
    /// edges between the buyer and its same-slot peers.
    fn merge_observations(&self, tx: &ResolvedTransaction, transfers: &[Transfer], slot_peers: &[String]) {
        for t in transfers {
            let key = (t.source.clone(), tx.buyer.clone(), t.timestamp, t.amount);
            if !self.merged_transfers.insert(key) {
                continue;
            }
            self.graph.add_edge(WalletEdge {
                from: t.source.clone(),
                to: tx.buyer.clone(),
                kind: EdgeKind::Funding,
                amount: t.amount,
                timestamp: t.timestamp,
            });
        }
        let now = self.clock.now_ms();
        for peer in slot_peers {
            self.graph.add_edge(WalletEdge {
                from: tx.buyer.clone(),
                to: peer.clone(),
                kind: EdgeKind::Trade,
                amount: 0,
                timestamp: now,
            });
        }
    }
}

fn distinct_wallets(buys: &[&BuyEvent], exclude: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    buys.iter()
        .filter(|b| b.wallet != exclude && seen.insert(b.wallet.as_str()))
        .map(|b| b.wallet.clone())
        .collect()
}
