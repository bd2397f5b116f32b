//! Error types for DiamondPad.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 100], got {value}")] OutOfRange { field: &'static str, value: u64 },
    #[error("{0} must be greater than zero")] Zero(&'static str),
    #[error("action thresholds must be non-increasing: block {block} >= reduce {reduce} >= delay {delay} >= flag {flag}")] ActionOrdering { block: u8, reduce: u8, delay: u8, flag: u8 },
    #[error("invalid settings source: {0}")] Source(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("not found: {0}")] NotFound(String),
    #[error("timed out after {millis} ms")] Timeout { millis: u64 },
    #[error("unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("zero total supply")] ZeroSupply,
    #[error("no position for {wallet} in launch {launch_id}")] UnknownHolder { wallet: String, launch_id: String },
    #[error("claim cooldown active until {next_eligible_at}")] ClaimCooldown { next_eligible_at: i64 },
    #[error("rewards blocked for {wallet}")] Blocked { wallet: String },
    #[error("rewards delayed until {until}")] RewardsDelayed { until: i64 },
    #[error("nothing to claim")] NothingToClaim,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("dev allocation {0} bps exceeds 1000 bps")] DevAllocationTooHigh(u16),
    #[error("dev vesting {0} days is below 180 days")] VestingTooShort(u16),
    #[error("LP lock {0} days is below 365 days")] LpLockTooShort(u16),
    #[error("name is {0} chars, max 32")] NameTooLong(usize),
    #[error("symbol is {0} chars, max 10")] SymbolTooLong(usize),
    #[error("total supply must be non-zero")] ZeroSupply,
    #[error("holder rewards {0} bps exceeds 10000 bps")] HolderRewardsTooHigh(u16),
    #[error("launch {0} already exists")] DuplicateLaunch(String),
    #[error("unknown launch {0}")] UnknownLaunch(String),
    #[error("launch cannot move from {from:?} to {to:?}")] InvalidTransition { from: crate::launch::LaunchStatus, to: crate::launch::LaunchStatus },
}

#[derive(Error, Debug)]
pub enum DiamondError {
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Collaborator(#[from] CollaboratorError),
    #[error(transparent)] Reward(#[from] RewardError),
    #[error(transparent)] Launch(#[from] LaunchError),
}
