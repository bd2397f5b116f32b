//! Pure heuristics and action selection.
//!
//! Nothing here touches collaborators or shared state; the detector gathers
//! inputs, then calls these functions to turn them into evidence.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use diamond_core::config::DetectorConfig;
use diamond_core::stats::{within_pct, IntervalStats};
use diamond_core::types::{Action, BuyEvent, Evidence, Flag, FlagKind};

// ---------------------------------------------------------------------------
// Action selection
// ---------------------------------------------------------------------------

/// Remediation for an analysis, first match wins.
///
/// A known-bundler flag blocks regardless of confidence. Otherwise the
/// confidence is compared against the configured ladder from the top down.
pub fn select_action(flags: &[Flag], confidence: u8, config: &DetectorConfig) -> Action {
    if flags.iter().any(|f| f.kind == FlagKind::KnownBundler) {
        return Action::Block;
    }
    if confidence >= config.block_confidence {
        Action::Block
    } else if confidence >= config.reduce_confidence {
        Action::ReduceRewards
    } else if confidence >= config.delay_confidence {
        Action::DelayRewards
    } else if confidence >= config.flag_confidence {
        Action::Flag
    } else {
        Action::None
    }
}

// ---------------------------------------------------------------------------
// Heuristics over the recent window
// ---------------------------------------------------------------------------

/// Other buys landing in `slot`. `None` below the threshold.
pub fn same_slot<'a>(
    others: &[&'a BuyEvent],
    slot: u64,
    config: &DetectorConfig,
) -> Option<(Evidence, Vec<&'a BuyEvent>)> {
    let peers: Vec<&BuyEvent> = others.iter().copied().filter(|b| b.slot == slot).collect();
    if peers.len() < config.same_slot_threshold {
        return None;
    }
    Some((
        Evidence::SameSlot {
            slot,
            count: peers.len(),
        },
        peers,
    ))
}

/// Other buys whose amount is within the configured relative tolerance of
/// `amount`. A zero amount never matches.
pub fn similar_amounts(
    others: &[&BuyEvent],
    amount: u64,
    config: &DetectorConfig,
) -> Option<Evidence> {
    if amount == 0 {
        return None;
    }
    let count = others
        .iter()
        .filter(|b| within_pct(b.amount, amount, config.similar_amount_pct))
        .count();
    (count >= config.similar_amount_min_count).then(|| Evidence::SimilarAmounts {
        amount,
        count,
        tolerance_pct: config.similar_amount_pct,
    })
}

/// Bot-like cadence across `timestamps`: fast and regular.
pub fn timing_regularity(timestamps: &[i64], config: &DetectorConfig) -> Option<Evidence> {
    if timestamps.len() < config.timing_min_samples {
        return None;
    }
    let stats = IntervalStats::from_timestamps(timestamps);
    let fast = stats.mean_below(config.timing_max_mean_secs.saturating_mul(1_000));
    let regular = stats.stddev_below_pct_of_mean(config.timing_max_cv_pct);
    (fast && regular).then(|| Evidence::TimingRegularity {
        mean_interval_ms: stats.mean_ms(),
        stddev_ms: stats.stddev_ms(),
        intervals: stats.count() as usize,
    })
}

/// Distinct wallets of the most recent other buys, newest first.
pub fn latest_wallets(others: &[&BuyEvent], buyer: &str, limit: usize) -> Vec<String> {
    let mut by_time: Vec<&BuyEvent> = others.to_vec();
    by_time.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let mut seen = BTreeSet::new();
    by_time
        .into_iter()
        .filter(|b| b.wallet != buyer)
        .filter(|b| seen.insert(b.wallet.as_str()))
        .take(limit)
        .map(|b| b.wallet.clone())
        .collect()
}

/// Overlap between the buyer's funders and other buyers' funding histories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingOverlap {
    /// Shared funder with the most overlapping wallets; ties go to the
    /// lexicographically smallest address.
    pub funder: String,
    /// Other wallets sharing at least one funder with the buyer, sorted.
    pub wallets: Vec<String>,
}

pub fn funding_overlap(
    buyer_funders: &BTreeSet<String>,
    others: &HashMap<String, BTreeSet<String>>,
) -> Option<FundingOverlap> {
    let mut per_funder: BTreeMap<&str, usize> = BTreeMap::new();
    let mut wallets = Vec::new();
    for (wallet, sources) in others {
        let mut shared = sources.intersection(buyer_funders).peekable();
        if shared.peek().is_none() {
            continue;
        }
        wallets.push(wallet.clone());
        for funder in shared {
            *per_funder.entry(funder.as_str()).or_default() += 1;
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (funder, count) in per_funder {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((funder, count));
        }
    }
    let (funder, _) = best?;
    wallets.sort();
    Some(FundingOverlap {
        funder: funder.to_string(),
        wallets,
    })
}

/// The funder appearing most often among `sources`, smallest address on ties.
pub fn most_frequent<'a>(sources: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in sources {
        *counts.entry(s).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (s, c) in counts {
        if best.is_none_or(|(_, bc)| c > bc) {
            best = Some((s, c));
        }
    }
    best.map(|(s, _)| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diamond_core::types::confidence_from_flags;
    use proptest::prelude::*;

    fn buy(wallet: &str, slot: u64, amount: u64, ts: i64) -> BuyEvent {
        BuyEvent {
            signature: format!("sig-{wallet}-{ts}"),
            wallet: wallet.into(),
            launch_id: "L".into(),
            amount,
            tokens_received: 0,
            slot,
            timestamp: ts,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // --- action selection ---

    #[test]
    fn action_ladder() {
        let c = DetectorConfig::default();
        assert_eq!(select_action(&[], 100, &c), Action::Block);
        assert_eq!(select_action(&[], 90, &c), Action::Block);
        assert_eq!(select_action(&[], 89, &c), Action::ReduceRewards);
        assert_eq!(select_action(&[], 70, &c), Action::ReduceRewards);
        assert_eq!(select_action(&[], 65, &c), Action::DelayRewards);
        assert_eq!(select_action(&[], 50, &c), Action::DelayRewards);
        assert_eq!(select_action(&[], 30, &c), Action::Flag);
        assert_eq!(select_action(&[], 29, &c), Action::None);
        assert_eq!(select_action(&[], 0, &c), Action::None);
    }

    #[test]
    fn known_bundler_blocks_at_low_confidence() {
        let c = DetectorConfig::default();
        let flags = vec![Flag::from(Evidence::KnownBundler { incident_count: 1 })];
        assert_eq!(select_action(&flags, 40, &c), Action::Block);
    }

    // --- heuristics ---

    #[test]
    fn same_slot_threshold() {
        let c = DetectorConfig::default();
        let buys = [buy("a", 5, 1, 0), buy("b", 5, 1, 0), buy("c", 6, 1, 0)];
        let refs: Vec<&BuyEvent> = buys.iter().collect();
        assert!(same_slot(&refs, 5, &c).is_none());

        let buys = [buy("a", 5, 1, 0), buy("b", 5, 1, 0), buy("c", 5, 1, 0)];
        let refs: Vec<&BuyEvent> = buys.iter().collect();
        let (ev, peers) = same_slot(&refs, 5, &c).unwrap();
        assert_eq!(ev, Evidence::SameSlot { slot: 5, count: 3 });
        assert_eq!(peers.len(), 3);
    }

    #[test]
    fn similar_amounts_tolerance() {
        let c = DetectorConfig::default();
        let buys = [
            buy("a", 1, 1_000, 0),
            buy("b", 2, 1_049, 0),
            buy("c", 3, 951, 0),
            buy("d", 4, 2_000, 0),
        ];
        let refs: Vec<&BuyEvent> = buys.iter().collect();
        match similar_amounts(&refs, 1_000, &c) {
            Some(Evidence::SimilarAmounts { count, .. }) => assert_eq!(count, 3),
            other => panic!("expected similar amounts, got {other:?}"),
        }
        assert!(similar_amounts(&refs, 0, &c).is_none());
        assert!(similar_amounts(&refs, 10_000, &c).is_none());
    }

    #[test]
    fn timing_needs_fast_and_regular() {
        let c = DetectorConfig::default();
        let regular = [0, 10_000, 20_000, 30_000];
        assert!(timing_regularity(&regular, &c).is_some());

        let slow = [0, 120_000, 240_000, 360_000];
        assert!(timing_regularity(&slow, &c).is_none());

        let jittery = [0, 1_000, 30_000, 31_000];
        assert!(timing_regularity(&jittery, &c).is_none());

        let same_instant = [5, 5, 5, 5];
        assert!(timing_regularity(&same_instant, &c).is_none());

        assert!(timing_regularity(&[0, 10_000], &c).is_none());
    }

    #[test]
    fn latest_wallets_dedup_newest_first() {
        let buys = [
            buy("a", 1, 1, 100),
            buy("b", 1, 1, 300),
            buy("a", 1, 1, 400),
            buy("me", 1, 1, 500),
            buy("c", 1, 1, 200),
        ];
        let refs: Vec<&BuyEvent> = buys.iter().collect();
        assert_eq!(latest_wallets(&refs, "me", 2), vec!["a", "b"]);
        assert_eq!(latest_wallets(&refs, "me", 10), vec!["a", "b", "c"]);
    }

    #[test]
    fn funding_overlap_picks_most_shared_funder() {
        let buyer = set(&["f1", "f2"]);
        let mut others = HashMap::new();
        others.insert("x".to_string(), set(&["f2"]));
        others.insert("y".to_string(), set(&["f2", "f1"]));
        others.insert("z".to_string(), set(&["f9"]));
        let o = funding_overlap(&buyer, &others).unwrap();
        assert_eq!(o.funder, "f2");
        assert_eq!(o.wallets, vec!["x", "y"]);
    }

    #[test]
    fn funding_overlap_none_without_intersection() {
        let mut others = HashMap::new();
        others.insert("x".to_string(), set(&["f3"]));
        assert!(funding_overlap(&set(&["f1"]), &others).is_none());
        assert!(funding_overlap(&BTreeSet::new(), &others).is_none());
    }

    #[test]
    fn most_frequent_breaks_ties_by_address() {
        assert_eq!(most_frequent(["b", "a", "b", "a"]), Some("a".into()));
        assert_eq!(most_frequent(["c", "b", "c"]), Some("c".into()));
        assert_eq!(most_frequent(Vec::<&str>::new()), None);
    }

    // --- properties ---

    fn any_evidence() -> impl Strategy<Value = Evidence> {
        prop_oneof![
            (0u32..5).prop_map(|n| Evidence::KnownBundler { incident_count: n }),
            (0u64..10, 3usize..10).prop_map(|(slot, count)| Evidence::SameSlot { slot, count }),
            (1usize..5).prop_map(|overlap| Evidence::SharedFunding {
                funder: "f".into(),
                overlap
            }),
            Just(Evidence::NewWalletCluster {
                account_age_hours: 1,
                new_wallets: 5,
                sampled: 20
            }),
            Just(Evidence::SimilarAmounts {
                amount: 1,
                count: 3,
                tolerance_pct: 5
            }),
            Just(Evidence::TimingRegularity {
                mean_interval_ms: 1,
                stddev_ms: 0,
                intervals: 3
            }),
        ]
    }

    proptest! {
        #[test]
        fn confidence_bounded_and_bundled_iff_threshold(
            evidence in proptest::collection::vec(any_evidence(), 0..12)
        ) {
            let c = DetectorConfig::default();
            let flags: Vec<Flag> = evidence.into_iter().map(Flag::from).collect();
            let confidence = confidence_from_flags(&flags);
            prop_assert!(confidence <= 100);
            let bundled = confidence >= c.bundle_confidence_threshold;
            prop_assert_eq!(bundled, confidence >= 70);
            if flags.iter().any(|f| f.kind == FlagKind::KnownBundler) {
                prop_assert_eq!(select_action(&flags, confidence, &c), Action::Block);
            }
        }

        #[test]
        fn action_monotone_in_confidence(a in 0u8..=100, b in 0u8..=100) {
            let c = DetectorConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(select_action(&[], lo, &c) <= select_action(&[], hi, &c));
        }
    }
}
