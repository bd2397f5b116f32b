//! # diamond-rewards: Hold-to-earn engine.
//!
//! Converts hold duration and cross-launch history into reward shares:
//! - [`tiers`]: day thresholds to [`DiamondRank`] and BPS multipliers.
//! - [`rewards`]: per-distribution reward calculation, penalty application,
//!   and forward projections.
//! - [`loyalty`]: global holder score and airdrop eligibility.
//! - [`leaderboard`]: ranked holder listings.
//! - [`holders`]: the position book that records buys and settles claims.
//!
//! All amounts are integers. Multipliers are basis points where
//! 10 000 BPS = 1.0×.

pub mod holders;
pub mod leaderboard;
pub mod loyalty;
pub mod rewards;
pub mod tiers;

pub use holders::{Holder, HolderBook};
pub use leaderboard::{generate_leaderboard, LeaderboardEntry};
pub use loyalty::{
    calculate_airdrop_eligibility, calculate_global_score, AirdropEligibility, AirdropTier,
    LaunchHistory,
};
pub use rewards::{
    apply_penalty, calculate_rewards, project_rewards, RankMilestone, RewardBreakdown,
    RewardPool, RewardProjection,
};
pub use tiers::{get_diamond_rank, get_multiplier, DiamondRank};
