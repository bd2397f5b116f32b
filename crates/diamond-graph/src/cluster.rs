//! Cluster discovery and suspicion scoring.
//!
//! A cluster is a connected set of at least two wallets. Each cluster is
//! scored once per discovery by summing independent signals:
//!
//! | Signal | Points |
//! |---|---|
//! | average wallet age < 24h (else < 168h) | 30 (else 15) |
//! | each funder shared by ≥ 3 members | 25 per funder |
//! | ≥ 3 buys with mean inter-arrival < 60s | 35 |
//! | stddev < 10% of mean over ≥ 5 intervals | 25 |
//! | size ≥ 10 (else ≥ 5) | 20 (else 10) |
//!
//! Only the total is capped at 100. Several qualifying funders compound.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use diamond_core::config::GraphConfig;
use diamond_core::constants::{MAX_CONFIDENCE, MS_PER_SECOND};
use diamond_core::stats::IntervalStats;
use diamond_core::time::{elapsed_ms, hours_to_ms};

use crate::graph::{WalletGraph, WalletNode};

pub const SCORE_FRESH_WALLETS: u32 = 30;
pub const SCORE_YOUNG_WALLETS: u32 = 15;
pub const SCORE_SHARED_FUNDER: u32 = 25;
pub const SCORE_FAST_CADENCE: u32 = 35;
pub const SCORE_REGULAR_CADENCE: u32 = 25;
pub const SCORE_LARGE_CLUSTER: u32 = 20;
pub const SCORE_MEDIUM_CLUSTER: u32 = 10;

/// Minimum aggregated buy timestamps before cadence is judged.
const MIN_CADENCE_TIMESTAMPS: usize = 3;

/// Why a cluster scored what it did.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterSignal {
    FreshWallets { avg_age_hours: u64 },
    YoungWallets { avg_age_hours: u64 },
    SharedFunder { funder: String, members: usize },
    FastCadence { mean_interval_ms: u64 },
    RegularCadence { stddev_ms: u64, intervals: u64 },
    LargeCluster { size: usize },
    MediumCluster { size: usize },
}

impl ClusterSignal {
    pub fn points(&self) -> u32 {
        match self {
            Self::FreshWallets { .. } => SCORE_FRESH_WALLETS,
            Self::YoungWallets { .. } => SCORE_YOUNG_WALLETS,
            Self::SharedFunder { .. } => SCORE_SHARED_FUNDER,
            Self::FastCadence { .. } => SCORE_FAST_CADENCE,
            Self::RegularCadence { .. } => SCORE_REGULAR_CADENCE,
            Self::LargeCluster { .. } => SCORE_LARGE_CLUSTER,
            Self::MediumCluster { .. } => SCORE_MEDIUM_CLUSTER,
        }
    }
}

/// One discovered cluster.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterResult {
    /// BLAKE3 of the sorted member addresses, hex-encoded.
    pub id: String,
    /// Members in BFS discovery order.
    pub wallets: Vec<String>,
    /// Member with the most adjacency links.
    pub center_wallet: String,
    pub suspicion_score: u8,
    pub signals: Vec<ClusterSignal>,
    pub total_volume: u64,
}

impl ClusterResult {
    pub fn size(&self) -> usize {
        self.wallets.len()
    }

    pub fn contains(&self, wallet: &str) -> bool {
        self.wallets.iter().any(|w| w == wallet)
    }
}

/// Deterministic cluster id: BLAKE3 over the sorted member addresses.
pub fn cluster_id(wallets: &[String]) -> String {
    let mut sorted: Vec<&str> = wallets.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for w in sorted {
        hasher.update(w.as_bytes());
        hasher.update(&[0]);
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// Score a cluster from its member nodes at time `now`.
///
/// # Panics
///
/// Panics if `members` is empty: a score only exists for a discovered cluster.
pub fn score_cluster(
    members: &[&WalletNode],
    now: i64,
    config: &GraphConfig,
) -> (u8, Vec<ClusterSignal>) {
    assert!(!members.is_empty(), "cluster score requires at least one wallet");

    let mut signals = Vec::new();
    let size = members.len();

    // Average wallet age
    let total_age: u128 = members
        .iter()
        .map(|n| elapsed_ms(n.first_seen, now) as u128)
        .sum();
    let avg_age_ms = (total_age / size as u128) as u64;
    let avg_age_hours = avg_age_ms / hours_to_ms(1) as u64;
    if avg_age_ms < hours_to_ms(config.fresh_age_hours) as u64 {
        signals.push(ClusterSignal::FreshWallets { avg_age_hours });
    } else if avg_age_ms < hours_to_ms(config.young_age_hours) as u64 {
        signals.push(ClusterSignal::YoungWallets { avg_age_hours });
    }

    // Shared funders: count distinct members per funder
    let mut funders: BTreeMap<&str, usize> = BTreeMap::new();
    for node in members {
        for source in node.funding_sources.keys() {
            *funders.entry(source.as_str()).or_insert(0) += 1;
        }
    }
    for (funder, count) in funders {
        if count >= config.shared_funder_min_members {
            signals.push(ClusterSignal::SharedFunder {
                funder: funder.to_string(),
                members: count,
            });
        }
    }

    // Buy cadence across the whole cluster
    let timestamps: Vec<i64> = members
        .iter()
        .flat_map(|n| n.buy_timestamps.iter().copied())
        .collect();
    if timestamps.len() >= MIN_CADENCE_TIMESTAMPS {
        let stats = IntervalStats::from_timestamps(&timestamps);
        let fast_limit_ms = config.fast_cadence_secs.saturating_mul(MS_PER_SECOND as u64);
        if stats.mean_below(fast_limit_ms) {
            signals.push(ClusterSignal::FastCadence {
                mean_interval_ms: stats.mean_ms(),
            });
        }
        if stats.count() >= config.regular_cadence_min_intervals as u64
            && stats.stddev_below_pct_of_mean(config.regular_cadence_cv_pct)
        {
            signals.push(ClusterSignal::RegularCadence {
                stddev_ms: stats.stddev_ms(),
                intervals: stats.count(),
            });
        }
    }

    // Size
    if size >= config.large_cluster_size {
        signals.push(ClusterSignal::LargeCluster { size });
    } else if size >= config.medium_cluster_size {
        signals.push(ClusterSignal::MediumCluster { size });
    }

    let total: u32 = signals.iter().map(ClusterSignal::points).sum();
    (total.min(MAX_CONFIDENCE as u32) as u8, signals)
}

impl WalletGraph {
    /// Discover and score every cluster of two or more connected wallets.
    ///
    /// Holds the read guard for the whole scan, so concurrent edge insertions
    /// wait until it finishes. Results are ordered by suspicion score,
    /// highest first; equal scores keep discovery order.
    pub fn find_clusters(&self) -> Vec<ClusterResult> {
        let now = self.clock.now_ms();
        let state = self.state.read();

        let mut clusters: Vec<ClusterResult> = state
            .components()
            .into_iter()
            .filter(|c| c.len() >= 2)
            .map(|wallets| {
                let members: Vec<&WalletNode> =
                    wallets.iter().filter_map(|w| state.nodes.get(w)).collect();

                let mut center = &wallets[0];
                let mut best_degree = state.degree(center);
                for w in &wallets[1..] {
                    let degree = state.degree(w);
                    if degree > best_degree {
                        center = w;
                        best_degree = degree;
                    }
                }

                let (suspicion_score, signals) = score_cluster(&members, now, &self.config);
                let total_volume = members
                    .iter()
                    .fold(0u64, |acc, n| acc.saturating_add(n.total_volume));

                ClusterResult {
                    id: cluster_id(&wallets),
                    center_wallet: center.clone(),
                    wallets,
                    suspicion_score,
                    signals,
                    total_volume,
                }
            })
            .collect();
        drop(state);

        clusters.sort_by(|a, b| b.suspicion_score.cmp(&a.suspicion_score));

        for c in clusters.iter().filter(|c| c.suspicion_score >= 50) {
            info!(
                cluster = %c.id,
                size = c.size(),
                score = c.suspicion_score,
                center = %c.center_wallet,
                "graph: suspicious cluster"
            );
        }
        debug!(clusters = clusters.len(), "graph: cluster scan complete");
        clusters
    }

    /// The cluster containing `wallet`, if it belongs to one.
    pub fn cluster_of(&self, wallet: &str) -> Option<ClusterResult> {
        self.find_clusters().into_iter().find(|c| c.contains(wallet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, WalletEdge};
    use diamond_core::constants::{MS_PER_DAY, MS_PER_HOUR};
    use diamond_core::time::ManualClock;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    const NOW: i64 = 100 * MS_PER_DAY;

    fn graph() -> WalletGraph {
        WalletGraph::new(GraphConfig::default(), Arc::new(ManualClock::new(NOW)))
    }

    fn node(addr: &str, first_seen: i64) -> WalletNode {
        WalletNode {
            address: addr.into(),
            first_seen,
            transaction_count: 0,
            total_volume: 0,
            funding_sources: BTreeMap::new(),
            funding_targets: BTreeMap::new(),
            buy_timestamps: Vec::new(),
        }
    }

    fn link(g: &WalletGraph, a: &str, b: &str, kind: EdgeKind, ts: i64) {
        g.add_edge(WalletEdge {
            from: a.into(),
            to: b.into(),
            kind,
            amount: 1,
            timestamp: ts,
        });
    }

    // --- score_cluster ---

    #[test]
    #[should_panic(expected = "at least one wallet")]
    fn empty_cluster_panics() {
        score_cluster(&[], NOW, &GraphConfig::default());
    }

    #[test]
    fn old_pair_scores_zero() {
        let a = node("a", 0);
        let b = node("b", 0);
        let (score, signals) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 0);
        assert!(signals.is_empty());
    }

    #[test]
    fn fresh_beats_young() {
        let a = node("a", NOW - MS_PER_HOUR);
        let b = node("b", NOW - 2 * MS_PER_HOUR);
        let (score, signals) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 30);
        assert!(matches!(signals[0], ClusterSignal::FreshWallets { .. }));
    }

    #[test]
    fn young_wallets_score_15() {
        let a = node("a", NOW - 48 * MS_PER_HOUR);
        let b = node("b", NOW - 72 * MS_PER_HOUR);
        let (score, _) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 15);
    }

    #[test]
    fn shared_funders_compound() {
        let mut nodes: Vec<WalletNode> = (0..3).map(|i| node(&format!("w{i}"), 0)).collect();
        for n in &mut nodes {
            n.funding_sources.insert("f1".into(), 1);
            n.funding_sources.insert("f2".into(), 3);
        }
        let refs: Vec<&WalletNode> = nodes.iter().collect();
        let (score, signals) = score_cluster(&refs, NOW, &GraphConfig::default());
        assert_eq!(score, 50);
        assert_eq!(
            signals
                .iter()
                .filter(|s| matches!(s, ClusterSignal::SharedFunder { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn funder_shared_by_two_ignored() {
        let mut a = node("a", 0);
        let mut b = node("b", 0);
        a.funding_sources.insert("f".into(), 1);
        b.funding_sources.insert("f".into(), 1);
        let (score, _) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 0);
    }

    #[test]
    fn fast_and_regular_cadence_add_up() {
        let mut a = node("a", 0);
        let mut b = node("b", 0);
        // 6 buys 10s apart across the two wallets: 5 equal intervals
        a.buy_timestamps = vec![0, 20_000, 40_000];
        b.buy_timestamps = vec![10_000, 30_000, 50_000];
        let (score, signals) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 60);
        assert!(signals.contains(&ClusterSignal::FastCadence {
            mean_interval_ms: 10_000
        }));
        assert!(signals.contains(&ClusterSignal::RegularCadence {
            stddev_ms: 0,
            intervals: 5
        }));
    }

    #[test]
    fn regular_needs_five_intervals() {
        let mut a = node("a", 0);
        a.buy_timestamps = vec![0, 10_000, 20_000, 30_000];
        let b = node("b", 0);
        let (score, _) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 35);
    }

    #[test]
    fn slow_regular_cadence_scores_regular_only() {
        let mut a = node("a", 0);
        a.buy_timestamps = (0..6).map(|i| i * 120_000).collect();
        let b = node("b", 0);
        let (score, _) = score_cluster(&[&a, &b], NOW, &GraphConfig::default());
        assert_eq!(score, 25);
    }

    #[test]
    fn size_thresholds() {
        let nodes: Vec<WalletNode> = (0..10).map(|i| node(&format!("w{i}"), 0)).collect();
        let refs: Vec<&WalletNode> = nodes.iter().collect();
        assert_eq!(score_cluster(&refs, NOW, &GraphConfig::default()).0, 20);
        assert_eq!(score_cluster(&refs[..5], NOW, &GraphConfig::default()).0, 10);
        assert_eq!(score_cluster(&refs[..4], NOW, &GraphConfig::default()).0, 0);
    }

    #[test]
    fn score_caps_at_100() {
        let mut nodes: Vec<WalletNode> = (0..12)
            .map(|i| node(&format!("w{i}"), NOW - MS_PER_HOUR))
            .collect();
        for (i, n) in nodes.iter_mut().enumerate() {
            n.funding_sources.insert("f".into(), 1);
            n.buy_timestamps.push(i as i64 * 1_000);
        }
        let refs: Vec<&WalletNode> = nodes.iter().collect();
        assert_eq!(score_cluster(&refs, NOW, &GraphConfig::default()).0, 100);
    }

    // --- find_clusters ---

    #[test]
    fn singletons_are_not_clusters() {
        let g = graph();
        g.add_wallet("alone", 0);
        assert!(g.find_clusters().is_empty());
    }

    #[test]
    fn funder_star_forms_one_cluster() {
        let g = graph();
        for w in ["a", "b", "c"] {
            link(&g, "funder", w, EdgeKind::Funding, NOW - MS_PER_HOUR);
        }
        let clusters = g.find_clusters();
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.size(), 4);
        assert_eq!(c.center_wallet, "funder");
        // fresh (30) + shared funder across a, b, c (25)
        assert_eq!(c.suspicion_score, 55);
    }

    #[test]
    fn center_tie_goes_to_first_in_iteration() {
        let g = graph();
        link(&g, "a", "b", EdgeKind::Trade, 0);
        let c = &g.find_clusters()[0];
        assert_eq!(c.center_wallet, "a");
    }

    #[test]
    fn clusters_sorted_by_score() {
        let g = graph();
        link(&g, "old1", "old2", EdgeKind::Transfer, 0);
        for w in ["x", "y", "z"] {
            link(&g, "hub", w, EdgeKind::Funding, NOW);
        }
        let clusters = g.find_clusters();
        assert_eq!(clusters.len(), 2);
        assert!(clusters[0].contains("hub"));
        assert!(clusters[0].suspicion_score > clusters[1].suspicion_score);
    }

    #[test]
    fn cluster_id_ignores_member_order() {
        let a = cluster_id(&["b".into(), "a".into()]);
        let b = cluster_id(&["a".into(), "b".into()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn cluster_of_finds_membership() {
        let g = graph();
        link(&g, "a", "b", EdgeKind::Trade, 0);
        assert!(g.cluster_of("b").is_some());
        g.add_wallet("c", 0);
        assert!(g.cluster_of("c").is_none());
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn clusters_are_stable_partition(
            edges in proptest::collection::vec((0u8..15, 0u8..15, 0i64..(200 * MS_PER_HOUR)), 0..40)
        ) {
            let g = graph();
            for (a, b, ts) in &edges {
                link(&g, &format!("w{a}"), &format!("w{b}"), EdgeKind::Funding, NOW - ts);
            }
            let first = g.find_clusters();
            let second = g.find_clusters();

            let as_sets = |cs: &[ClusterResult]| -> BTreeSet<(BTreeSet<String>, u8)> {
                cs.iter()
                    .map(|c| (c.wallets.iter().cloned().collect(), c.suspicion_score))
                    .collect()
            };
            prop_assert_eq!(as_sets(&first), as_sets(&second));

            // Disjoint, every member connected to the center.
            let mut seen = BTreeSet::new();
            for c in &first {
                prop_assert!(c.size() >= 2);
                prop_assert!(c.suspicion_score <= 100);
                for w in &c.wallets {
                    prop_assert!(seen.insert(w.clone()));
                    prop_assert!(g.are_connected(w, &c.center_wallet));
                }
            }
        }
    }
}
