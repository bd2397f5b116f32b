//! Holder positions and claim settlement.
//!
//! A [`Holder`] stores only ground truth (balances, timestamps, counters).
//! Hold duration and rank are derived from `(now, first_buy_at)` at every
//! read, so a rank can never disagree with the duration it came from.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use diamond_core::config::RewardsConfig;
use diamond_core::error::RewardError;
use diamond_core::protocol::LaunchRegistry;
use diamond_core::time::{days_to_ms, hold_duration_days};
use diamond_core::traits::AnalysisSink;
use diamond_core::types::{BuyEvent, ClaimRecord, Penalty, StandingPenalty};

use crate::rewards::{apply_penalty, calculate_rewards, RewardBreakdown, RewardPool};
use crate::tiers::DiamondRank;

/// One (wallet, launch) position.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub wallet: String,
    pub launch_id: String,
    /// Tokens held, in base units.
    pub balance: u64,
    /// Lamports paid for the position.
    pub cost_basis: u64,
    pub first_buy_at: i64,
    pub last_activity_at: i64,
    pub rewards_accrued: u64,
    pub rewards_claimed: u64,
    pub global_holder_score: u64,
}

impl Holder {
    pub fn new(wallet: impl Into<String>, launch_id: impl Into<String>, first_buy_at: i64) -> Self {
        Self {
            wallet: wallet.into(),
            launch_id: launch_id.into(),
            balance: 0,
            cost_basis: 0,
            first_buy_at,
            last_activity_at: first_buy_at,
            rewards_accrued: 0,
            rewards_claimed: 0,
            global_holder_score: 0,
        }
    }

    pub fn hold_days(&self, now: i64) -> u64 {
        hold_duration_days(self.first_buy_at, now)
    }

    pub fn rank(&self, now: i64) -> DiamondRank {
        DiamondRank::from_days(self.hold_days(now))
    }
}

type PositionKey = (String, String);

fn key(wallet: &str, launch_id: &str) -> PositionKey {
    (wallet.to_string(), launch_id.to_string())
}

/// All holder positions, keyed by (wallet, launch).
pub struct HolderBook {
    positions: RwLock<HashMap<PositionKey, Holder>>,
    config: RewardsConfig,
    sink: Arc<dyn AnalysisSink>,
    launches: Option<Arc<LaunchRegistry>>,
}

impl HolderBook {
    pub fn new(config: RewardsConfig, sink: Arc<dyn AnalysisSink>) -> Self {
        Self {
            positions: RwLock::new(HashMap::new()),
            config,
            sink,
            launches: None,
        }
    }

    /// Report newly opened positions to `launches`.
    pub fn with_launches(mut self, launches: Arc<LaunchRegistry>) -> Self {
        self.launches = Some(launches);
        self
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    /// Open or extend the buyer's position. The earliest buy seen fixes
    /// `first_buy_at`.
    pub fn record_buy(&self, event: &BuyEvent) -> Holder {
        let mut positions = self.positions.write();
        let holder = positions
            .entry(key(&event.wallet, &event.launch_id))
            .or_insert_with(|| {
                debug!(wallet = %event.wallet, launch_id = %event.launch_id, "holders: position opened");
                if let Some(launches) = &self.launches {
                    if let Err(e) = launches.record_holder(&event.launch_id) {
                        debug!(error = %e, "holders: position not counted");
                    }
                }
                Holder::new(&event.wallet, &event.launch_id, event.timestamp)
            });
        holder.balance = holder.balance.saturating_add(event.tokens_received);
        holder.cost_basis = holder.cost_basis.saturating_add(event.amount);
        holder.first_buy_at = holder.first_buy_at.min(event.timestamp);
        holder.last_activity_at = holder.last_activity_at.max(event.timestamp);
        holder.clone()
    }

    /// Apply a cross-launch loyalty score to every position of `wallet`.
    pub fn set_global_score(&self, wallet: &str, score: u64) {
        let mut positions = self.positions.write();
        for holder in positions.values_mut().filter(|h| h.wallet == wallet) {
            holder.global_holder_score = score;
        }
    }

    pub fn holder(&self, wallet: &str, launch_id: &str) -> Option<Holder> {
        self.positions.read().get(&key(wallet, launch_id)).cloned()
    }

    /// Positions of `launch_id`, or every position when `None`. Sorted by
    /// wallet, then launch.
    pub fn holders(&self, launch_id: Option<&str>) -> Vec<Holder> {
        let mut out: Vec<Holder> = self
            .positions
            .read()
            .values()
            .filter(|h| launch_id.is_none_or(|l| h.launch_id == l))
            .cloned()
            .collect();
        out.sort_by(|a, b| (&a.wallet, &a.launch_id).cmp(&(&b.wallet, &b.launch_id)));
        out
    }

    pub fn holder_count(&self, launch_id: &str) -> usize {
        self.positions
            .read()
            .values()
            .filter(|h| h.launch_id == launch_id)
            .count()
    }

    /// What a claim would pay right now, penalties included.
    pub fn preview(
        &self,
        wallet: &str,
        launch_id: &str,
        pool: &RewardPool,
        penalty: Option<StandingPenalty>,
        now: i64,
    ) -> Result<RewardBreakdown, RewardError> {
        let positions = self.positions.read();
        let holder = positions
            .get(&key(wallet, launch_id))
            .ok_or_else(|| unknown(wallet, launch_id))?;
        Ok(apply_penalty(
            calculate_rewards(holder, pool, now, &self.config)?,
            penalty,
            now,
        ))
    }

    /// Settle one distribution for the position and emit the receipt.
    ///
    /// Refusals are checked in order: blocked, delayed, cooling down,
    /// nothing to pay.
    pub fn claim(
        &self,
        wallet: &str,
        launch_id: &str,
        pool: &RewardPool,
        penalty: Option<StandingPenalty>,
        now: i64,
    ) -> Result<ClaimRecord, RewardError> {
        let record = {
            let mut positions = self.positions.write();
            let holder = positions
                .get_mut(&key(wallet, launch_id))
                .ok_or_else(|| unknown(wallet, launch_id))?;
            let breakdown = apply_penalty(
                calculate_rewards(holder, pool, now, &self.config)?,
                penalty,
                now,
            );

            if !breakdown.claimable {
                return Err(refusal(&breakdown, penalty, wallet, now));
            }
            if breakdown.total == 0 {
                return Err(RewardError::NothingToClaim);
            }

            holder.rewards_accrued = holder.rewards_accrued.saturating_add(breakdown.total);
            holder.rewards_claimed = holder.rewards_claimed.saturating_add(breakdown.total);
            holder.last_activity_at = now;

            ClaimRecord {
                wallet: wallet.to_string(),
                launch_id: launch_id.to_string(),
                amount: breakdown.total,
                multiplier_bps: breakdown.multiplier_bps,
                hold_days: breakdown.hold_days,
                claimed_at: now,
            }
        };

        info!(
            wallet,
            launch_id,
            amount = record.amount,
            hold_days = record.hold_days,
            multiplier_bps = record.multiplier_bps,
            "holders: rewards claimed"
        );
        self.sink.record_claim(&record);
        Ok(record)
    }
}

fn unknown(wallet: &str, launch_id: &str) -> RewardError {
    RewardError::UnknownHolder {
        wallet: wallet.to_string(),
        launch_id: launch_id.to_string(),
    }
}

fn refusal(
    breakdown: &RewardBreakdown,
    penalty: Option<StandingPenalty>,
    wallet: &str,
    now: i64,
) -> RewardError {
    match penalty.map(|p| (p.penalty, p.issued_at)) {
        Some((Penalty::Blocked, _)) => RewardError::Blocked {
            wallet: wallet.to_string(),
        },
        Some((Penalty::DelayRewards { delay_days }, issued_at))
            if issued_at.saturating_add(days_to_ms(delay_days)) > now =>
        {
            RewardError::RewardsDelayed {
                until: issued_at.saturating_add(days_to_ms(delay_days)),
            }
        }
        _ => RewardError::ClaimCooldown {
            next_eligible_at: breakdown.next_claim_at.unwrap_or(now),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diamond_core::constants::MS_PER_DAY;
    use diamond_core::types::BundleAnalysis;
    use parking_lot::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct ClaimLog(Mutex<Vec<ClaimRecord>>);

    impl AnalysisSink for ClaimLog {
        fn record_analysis(&self, _analysis: &BundleAnalysis) {}

        fn record_claim(&self, claim: &ClaimRecord) {
            self.0.lock().push(claim.clone());
        }
    }

    fn book() -> (HolderBook, Arc<ClaimLog>) {
        let log = Arc::new(ClaimLog::default());
        (HolderBook::new(RewardsConfig::default(), log.clone()), log)
    }

    fn buy(wallet: &str, launch: &str, tokens: u64, ts: i64) -> BuyEvent {
        BuyEvent {
            signature: format!("{wallet}-{launch}-{ts}"),
            wallet: wallet.into(),
            launch_id: launch.into(),
            amount: tokens / 10,
            tokens_received: tokens,
            slot: 1,
            timestamp: ts,
        }
    }

    fn pool() -> RewardPool {
        RewardPool {
            launch_id: "L".into(),
            total_supply: Some(100_000_000),
            remaining: 1_000_000,
        }
    }

    // --- positions ---

    #[test]
    fn record_buy_accumulates() {
        let (b, _) = book();
        b.record_buy(&buy("w", "L", 1_000, NOW - 10 * MS_PER_DAY));
        let h = b.record_buy(&buy("w", "L", 500, NOW));
        assert_eq!(h.balance, 1_500);
        assert_eq!(h.cost_basis, 150);
        assert_eq!(h.first_buy_at, NOW - 10 * MS_PER_DAY);
        assert_eq!(h.last_activity_at, NOW);
        assert_eq!(h.hold_days(NOW), 10);
        assert_eq!(h.rank(NOW), DiamondRank::Bronze);
    }

    #[test]
    fn new_positions_update_launch_totals() {
        let launches = Arc::new(LaunchRegistry::new());
        let params = diamond_core::launch::LaunchParams {
            launch_id: "L".into(),
            name: "Diamond".into(),
            symbol: "DIAM".into(),
            total_supply: 1_000_000,
            dev_allocation_bps: 0,
            dev_vesting_days: 180,
            lp_lock_days: 365,
            holder_rewards_bps: 1_000,
            status: Default::default(),
        };
        launches.create_launch(params, NOW).unwrap();
        let (b, _) = book();
        let b = b.with_launches(launches.clone());

        b.record_buy(&buy("w1", "L", 1, NOW));
        b.record_buy(&buy("w1", "L", 1, NOW + 1));
        b.record_buy(&buy("w2", "L", 1, NOW));
        // Not created through the registry.
        b.record_buy(&buy("w1", "other", 1, NOW));

        assert_eq!(launches.launch("L").unwrap().holder_count, 2);
        assert_eq!(launches.stats().total_holders, 2);
        assert_eq!(b.holder_count("other"), 1);
    }

    #[test]
    fn earlier_buy_moves_first_buy_back() {
        let (b, _) = book();
        b.record_buy(&buy("w", "L", 1, NOW));
        let h = b.record_buy(&buy("w", "L", 1, NOW - MS_PER_DAY));
        assert_eq!(h.first_buy_at, NOW - MS_PER_DAY);
    }

    #[test]
    fn counts_and_listing() {
        let (b, _) = book();
        b.record_buy(&buy("b", "L", 1, NOW));
        b.record_buy(&buy("a", "L", 1, NOW));
        b.record_buy(&buy("a", "M", 1, NOW));
        assert_eq!(b.holder_count("L"), 2);
        assert_eq!(b.holder_count("M"), 1);
        assert_eq!(b.holder_count("Z"), 0);
        let all: Vec<_> = b
            .holders(None)
            .into_iter()
            .map(|h| (h.wallet, h.launch_id))
            .collect();
        assert_eq!(
            all,
            vec![
                ("a".to_string(), "L".to_string()),
                ("a".to_string(), "M".to_string()),
                ("b".to_string(), "L".to_string())
            ]
        );
        assert_eq!(b.holders(Some("M")).len(), 1);
    }

    #[test]
    fn global_score_applies_to_all_positions() {
        let (b, _) = book();
        b.record_buy(&buy("a", "L", 1, NOW));
        b.record_buy(&buy("a", "M", 1, NOW));
        b.record_buy(&buy("z", "M", 1, NOW));
        b.set_global_score("a", 7);
        assert_eq!(b.holder("a", "L").unwrap().global_holder_score, 7);
        assert_eq!(b.holder("a", "M").unwrap().global_holder_score, 7);
        assert_eq!(b.holder("z", "M").unwrap().global_holder_score, 0);
    }

    // --- claims ---

    #[test]
    fn first_claim_pays_and_emits() {
        let (b, log) = book();
        b.record_buy(&buy("w", "L", 1_000_000, NOW - 200 * MS_PER_DAY));
        let rec = b.claim("w", "L", &pool(), None, NOW).unwrap();
        assert_eq!(rec.amount, 350);
        assert_eq!(rec.multiplier_bps, 35_000);
        assert_eq!(rec.hold_days, 200);
        assert_eq!(log.0.lock().as_slice(), &[rec]);

        let h = b.holder("w", "L").unwrap();
        assert_eq!(h.rewards_claimed, 350);
        assert_eq!(h.last_activity_at, NOW);
    }

    #[test]
    fn second_claim_waits_for_cooldown() {
        let (b, _) = book();
        b.record_buy(&buy("w", "L", 1_000_000, NOW - 20 * MS_PER_DAY));
        b.claim("w", "L", &pool(), None, NOW).unwrap();
        let err = b.claim("w", "L", &pool(), None, NOW + MS_PER_DAY).unwrap_err();
        assert_eq!(
            err,
            RewardError::ClaimCooldown {
                next_eligible_at: NOW + 7 * MS_PER_DAY
            }
        );
        assert!(b.claim("w", "L", &pool(), None, NOW + 7 * MS_PER_DAY).is_ok());
    }

    #[test]
    fn penalties_refuse_claims() {
        let (b, log) = book();
        b.record_buy(&buy("w", "L", 1_000_000, NOW - 20 * MS_PER_DAY));

        let blocked = Some(StandingPenalty {
            penalty: Penalty::Blocked,
            issued_at: NOW,
        });
        assert_eq!(
            b.claim("w", "L", &pool(), blocked, NOW).unwrap_err(),
            RewardError::Blocked { wallet: "w".into() }
        );

        let delayed = Some(StandingPenalty {
            penalty: Penalty::DelayRewards { delay_days: 30 },
            issued_at: NOW,
        });
        assert_eq!(
            b.claim("w", "L", &pool(), delayed, NOW).unwrap_err(),
            RewardError::RewardsDelayed {
                until: NOW + 30 * MS_PER_DAY
            }
        );
        assert!(log.0.lock().is_empty());
    }

    #[test]
    fn reduced_claim_pays_half() {
        let (b, _) = book();
        b.record_buy(&buy("w", "L", 1_000_000, NOW - 200 * MS_PER_DAY));
        let reduced = Some(StandingPenalty {
            penalty: Penalty::ReduceRewards { reduction_bps: 5_000 },
            issued_at: NOW,
        });
        assert_eq!(b.claim("w", "L", &pool(), reduced, NOW).unwrap().amount, 175);
    }

    #[test]
    fn unknown_and_empty_positions() {
        let (b, _) = book();
        assert_eq!(
            b.claim("nobody", "L", &pool(), None, NOW).unwrap_err(),
            RewardError::UnknownHolder {
                wallet: "nobody".into(),
                launch_id: "L".into()
            }
        );
        b.record_buy(&buy("dust", "L", 1, NOW));
        assert_eq!(
            b.claim("dust", "L", &pool(), None, NOW).unwrap_err(),
            RewardError::NothingToClaim
        );
    }

    #[test]
    fn preview_matches_claim_without_mutating() {
        let (b, _) = book();
        b.record_buy(&buy("w", "L", 1_000_000, NOW - 60 * MS_PER_DAY));
        let preview = b.preview("w", "L", &pool(), None, NOW).unwrap();
        let again = b.preview("w", "L", &pool(), None, NOW).unwrap();
        assert_eq!(preview, again);
        assert_eq!(b.claim("w", "L", &pool(), None, NOW).unwrap().amount, preview.total);
    }
}
