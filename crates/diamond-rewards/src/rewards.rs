//! Per-distribution reward calculation.
//!
//! One distribution pays a holder:
//!
//! ```text
//! base    = balance × remaining × distribution_bps / (supply × 10 000)
//! diamond = base × (multiplier_bps − 10 000) / 10 000
//! loyalty = (base + diamond) × score × 1 000 / 10 000
//! total   = base + diamond + loyalty
//! ```
//!
//! Every intermediate is a checked `u128`; results that do not fit a `u64`
//! surface as [`RewardError::ArithmeticOverflow`]. The pool is never debited
//! here, so repeated calls with the same inputs return the same totals.

use serde::{Deserialize, Serialize};

use diamond_core::config::RewardsConfig;
use diamond_core::constants::{BPS_PRECISION, LOYALTY_BPS_PER_POINT};
use diamond_core::error::{LaunchError, RewardError};
use diamond_core::launch::LaunchParams;
use diamond_core::time::days_to_ms;
use diamond_core::types::{Penalty, StandingPenalty};

use crate::holders::Holder;
use crate::tiers::DiamondRank;

/// Rewards available to the holders of one launch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardPool {
    pub launch_id: String,
    /// Circulating supply the balance is measured against. Falls back to
    /// [`RewardsConfig::total_supply_assumed`] when absent.
    #[serde(default)]
    pub total_supply: Option<u64>,
    pub remaining: u64,
}

impl RewardPool {
    pub fn new(launch_id: impl Into<String>, remaining: u64) -> Self {
        Self {
            launch_id: launch_id.into(),
            total_supply: None,
            remaining,
        }
    }

    /// A full pool sized from the launch's holder-rewards allocation.
    pub fn for_launch(params: &LaunchParams) -> Result<Self, LaunchError> {
        Ok(Self {
            launch_id: params.launch_id.clone(),
            total_supply: Some(params.total_supply),
            remaining: params.holder_rewards_allocation()?,
        })
    }

    fn supply(&self, config: &RewardsConfig) -> Result<u64, RewardError> {
        match self.total_supply.unwrap_or(config.total_supply_assumed) {
            0 => Err(RewardError::ZeroSupply),
            s => Ok(s),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
    pub wallet: String,
    pub launch_id: String,
    pub hold_days: u64,
    pub rank: DiamondRank,
    pub multiplier_bps: u64,
    pub global_score: u64,
    pub base_rewards: u64,
    pub diamond_bonus: u64,
    pub loyalty_bonus: u64,
    /// Amount withheld by a detector penalty.
    pub penalty_deduction: u64,
    pub total: u64,
    pub claimable: bool,
    /// Earliest time a claim is accepted, when one is pending.
    pub next_claim_at: Option<i64>,
    pub penalty: Option<Penalty>,
}

/// Base, diamond and loyalty components of one distribution.
fn components(
    balance: u64,
    multiplier_bps: u64,
    score: u64,
    pool: &RewardPool,
    config: &RewardsConfig,
) -> Result<(u64, u64, u64), RewardError> {
    let supply = pool.supply(config)? as u128;
    let bps = BPS_PRECISION as u128;

    let base = (balance as u128)
        .checked_mul(pool.remaining as u128)
        .and_then(|v| v.checked_mul(config.distribution_bps as u128))
        .ok_or(RewardError::ArithmeticOverflow)?
        / supply.checked_mul(bps).ok_or(RewardError::ArithmeticOverflow)?;

    let bonus_bps = (multiplier_bps as u128).saturating_sub(bps);
    let diamond = base
        .checked_mul(bonus_bps)
        .ok_or(RewardError::ArithmeticOverflow)?
        / bps;

    let loyalty_bps = (score as u128)
        .checked_mul(LOYALTY_BPS_PER_POINT as u128)
        .ok_or(RewardError::ArithmeticOverflow)?;
    let loyalty = (base + diamond)
        .checked_mul(loyalty_bps)
        .ok_or(RewardError::ArithmeticOverflow)?
        / bps;

    Ok((to_u64(base)?, to_u64(diamond)?, to_u64(loyalty)?))
}

fn to_u64(v: u128) -> Result<u64, RewardError> {
    u64::try_from(v).map_err(|_| RewardError::ArithmeticOverflow)
}

/// Rewards `holder` would receive from one distribution of `pool` at `now`.
///
/// The first claim is always eligible. Later claims wait
/// `claim_cooldown_days` after the holder's last activity.
pub fn calculate_rewards(
    holder: &Holder,
    pool: &RewardPool,
    now: i64,
    config: &RewardsConfig,
) -> Result<RewardBreakdown, RewardError> {
    let hold_days = holder.hold_days(now);
    let rank = DiamondRank::from_days(hold_days);
    let multiplier_bps = rank.multiplier_bps();
    let (base, diamond, loyalty) = components(
        holder.balance,
        multiplier_bps,
        holder.global_holder_score,
        pool,
        config,
    )?;
    let total = base
        .checked_add(diamond)
        .and_then(|v| v.checked_add(loyalty))
        .ok_or(RewardError::ArithmeticOverflow)?;

    let next_claim_at = (holder.rewards_claimed > 0).then(|| {
        holder
            .last_activity_at
            .saturating_add(days_to_ms(config.claim_cooldown_days))
    });

    Ok(RewardBreakdown {
        wallet: holder.wallet.clone(),
        launch_id: holder.launch_id.clone(),
        hold_days,
        rank,
        multiplier_bps,
        global_score: holder.global_holder_score,
        base_rewards: base,
        diamond_bonus: diamond,
        loyalty_bonus: loyalty,
        penalty_deduction: 0,
        total,
        claimable: next_claim_at.is_none_or(|t| now >= t),
        next_claim_at,
        penalty: None,
    })
}

/// Apply a standing detector penalty to a breakdown.
///
/// `Blocked` withholds everything. `ReduceRewards` withholds its share of
/// the total. `DelayRewards` keeps the amount but defers claimability until
/// `issued_at + delay_days`.
pub fn apply_penalty(
    mut breakdown: RewardBreakdown,
    standing: Option<StandingPenalty>,
    now: i64,
) -> RewardBreakdown {
    let Some(standing) = standing else {
        return breakdown;
    };
    match standing.penalty {
        Penalty::Blocked => {
            breakdown.penalty_deduction = breakdown.total;
            breakdown.total = 0;
            breakdown.claimable = false;
        }
        Penalty::ReduceRewards { reduction_bps } => {
            let bps = reduction_bps.min(BPS_PRECISION) as u128;
            let cut = (breakdown.total as u128 * bps / BPS_PRECISION as u128) as u64;
            breakdown.penalty_deduction = cut;
            breakdown.total -= cut;
        }
        Penalty::DelayRewards { delay_days } => {
            let until = standing.issued_at.saturating_add(days_to_ms(delay_days));
            if now < until {
                breakdown.claimable = false;
                breakdown.next_claim_at = Some(breakdown.next_claim_at.map_or(until, |t| t.max(until)));
            }
        }
    }
    breakdown.penalty = Some(standing.penalty);
    breakdown
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankMilestone {
    pub rank: DiamondRank,
    /// Days held when the rank is reached.
    pub at_day: u64,
    /// Days from now until it is reached.
    pub in_days: u64,
    pub multiplier_bps: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardProjection {
    pub current_days: u64,
    pub current_rank: DiamondRank,
    pub current_reward: u64,
    pub projected_days: u64,
    pub projected_rank: DiamondRank,
    pub projected_reward: u64,
    /// Ranks reached inside the horizon, in order.
    pub milestones: Vec<RankMilestone>,
}

/// Per-distribution reward for `balance` now and after holding another
/// `horizon_days`, against an unchanged pool and no loyalty bonus.
pub fn project_rewards(
    balance: u64,
    current_days: u64,
    horizon_days: u64,
    pool: &RewardPool,
    config: &RewardsConfig,
) -> Result<RewardProjection, RewardError> {
    let projected_days = current_days.saturating_add(horizon_days);
    let current_rank = DiamondRank::from_days(current_days);
    let projected_rank = DiamondRank::from_days(projected_days);

    let reward_at = |rank: DiamondRank| -> Result<u64, RewardError> {
        let (base, diamond, _) = components(balance, rank.multiplier_bps(), 0, pool, config)?;
        base.checked_add(diamond).ok_or(RewardError::ArithmeticOverflow)
    };

    let milestones = DiamondRank::ALL
        .into_iter()
        .filter(|r| r.min_days() > current_days && r.min_days() <= projected_days)
        .map(|rank| RankMilestone {
            rank,
            at_day: rank.min_days(),
            in_days: rank.min_days() - current_days,
            multiplier_bps: rank.multiplier_bps(),
        })
        .collect();

    Ok(RewardProjection {
        current_days,
        current_rank,
        current_reward: reward_at(current_rank)?,
        projected_days,
        projected_rank,
        projected_reward: reward_at(projected_rank)?,
        milestones,
    })
}
