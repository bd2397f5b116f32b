//! Protocol constants. Native amounts are in lamports (1 SOL = 10^9 lamports);
//! token amounts are in base units (1 token = 10^6 base units).

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Base units per whole launch token.
pub const TOKEN_UNIT: u64 = 1_000_000;

/// Basis-point denominator: 10 000 BPS = 100% = 1.0×.
pub const BPS_PRECISION: u64 = 10_000;

pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_DAY: i64 = 86_400_000;

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Confidence at or above which a transaction is reported as bundled.
pub const BUNDLE_CONFIDENCE_THRESHOLD: u8 = 70;

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: u8 = 100;

/// Confidence weight contributed by each flag severity.
pub const WEIGHT_CRITICAL: u32 = 40;
pub const WEIGHT_HIGH: u32 = 25;
pub const WEIGHT_MEDIUM: u32 = 15;
pub const WEIGHT_LOW: u32 = 5;

/// Default size of the per-launch recent-buy window.
pub const DEFAULT_RECENT_WINDOW: usize = 50;

/// Reward reduction attached to a `reduce_rewards` action (50%).
pub const PENALTY_REDUCTION_BPS: u64 = 5_000;

/// Reward deferral attached to a `delay_rewards` action.
pub const PENALTY_DELAY_DAYS: u64 = 30;

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

/// Share of the remaining pool consumed by one distribution event (1%).
pub const DISTRIBUTION_BPS: u64 = 100;

/// Supply assumed when a pool does not carry its own total supply.
pub const DEFAULT_TOTAL_SUPPLY: u64 = 1_000_000_000 * TOKEN_UNIT;

/// Minimum time between claims for a single holder position.
pub const CLAIM_COOLDOWN_DAYS: u64 = 7;

/// Loyalty bonus per global-holder-score point (0.1× per point).
pub const LOYALTY_BPS_PER_POINT: u64 = 1_000;

// ---------------------------------------------------------------------------
// Launch safety limits
// ---------------------------------------------------------------------------

/// Maximum developer allocation (10% of supply).
pub const MAX_DEV_ALLOCATION_BPS: u16 = 1_000;
pub const MIN_DEV_VESTING_DAYS: u16 = 180;
pub const MIN_LP_LOCK_DAYS: u16 = 365;
pub const MAX_LAUNCH_NAME_LEN: usize = 32;
pub const MAX_LAUNCH_SYMBOL_LEN: usize = 10;
