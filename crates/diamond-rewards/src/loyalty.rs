//! Cross-launch loyalty.
//!
//! A wallet's history across past launches condenses into one global holder
//! score, which feeds the loyalty bonus and airdrop eligibility.

use serde::{Deserialize, Serialize};

/// How a wallet behaved in one past launch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LaunchHistory {
    pub launch_id: String,
    pub hold_days: u64,
    /// Realized profit (positive) or loss (negative), in lamports.
    #[serde(default)]
    pub profit_loss: i64,
    /// Kept the position through a price drawdown.
    #[serde(default)]
    pub held_through_dip: bool,
    /// Sold within one day of buying.
    #[serde(default)]
    pub flipped_within_day: bool,
    #[serde(default)]
    pub rugged: bool,
}

/// Sum of per-launch points, floored at zero.
///
/// Per launch: +5 for ≥180 days, +3 for ≥90, +1 for ≥30; +2 for holding
/// through a dip; −1 for a profitable flip inside a day; +1 if the launch
/// rugged and the wallet still held at least 7 days.
pub fn calculate_global_score(history: &[LaunchHistory]) -> u64 {
    let total: i64 = history
        .iter()
        .map(|h| {
            let mut points: i64 = match h.hold_days {
                180.. => 5,
                90.. => 3,
                30.. => 1,
                _ => 0,
            };
            if h.held_through_dip {
                points += 2;
            }
            if h.flipped_within_day && h.profit_loss > 0 {
                points -= 1;
            }
            if h.rugged && h.hold_days >= 7 {
                points += 1;
            }
            points
        })
        .sum();
    total.max(0) as u64
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AirdropTier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl AirdropTier {
    pub fn from_score(score: u64) -> Self {
        match score {
            20.. => Self::Diamond,
            10.. => Self::Gold,
            5.. => Self::Silver,
            _ => Self::Bronze,
        }
    }

    pub fn multiplier_bps(self) -> u64 {
        match self {
            Self::Diamond => 30_000,
            Self::Gold => 20_000,
            Self::Silver => 15_000,
            Self::Bronze => 12_000,
        }
    }

    pub fn priority_access(self) -> bool {
        matches!(self, Self::Gold | Self::Diamond)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AirdropEligibility {
    pub eligible: bool,
    pub tier: Option<AirdropTier>,
    /// Zero when ineligible.
    pub multiplier_bps: u64,
    pub priority_access: bool,
}

pub fn calculate_airdrop_eligibility(
    score: u64,
    past_launches: u32,
    avg_hold_days: u64,
) -> AirdropEligibility {
    if past_launches < 1 || avg_hold_days < 7 {
        return AirdropEligibility {
            eligible: false,
            tier: None,
            multiplier_bps: 0,
            priority_access: false,
        };
    }
    let tier = AirdropTier::from_score(score);
    AirdropEligibility {
        eligible: true,
        tier: Some(tier),
        multiplier_bps: tier.multiplier_bps(),
        priority_access: tier.priority_access(),
    }
}
