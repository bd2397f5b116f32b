//! Thresholds for the detector, the relationship graph, and the rewards engine.
//!
//! Every struct deserializes with defaults for missing fields, so a settings
//! file only needs to name the values it overrides. [`Settings::validate`]
//! runs once at startup; nothing re-validates at evaluation time.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BUNDLE_CONFIDENCE_THRESHOLD, CLAIM_COOLDOWN_DAYS, DEFAULT_RECENT_WINDOW, DEFAULT_TOTAL_SUPPLY,
    DISTRIBUTION_BPS, MAX_CONFIDENCE,
};
use crate::error::ConfigError;

/// Coordination detector thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// `is_bundled` iff confidence is at or above this value.
    pub bundle_confidence_threshold: u8,
    pub block_confidence: u8,
    pub reduce_confidence: u8,
    pub delay_confidence: u8,
    pub flag_confidence: u8,
    /// Confidence at which the buyer and its related wallets join the
    /// known-bundler registry.
    pub auto_register_confidence: u8,
    /// Minimum number of other buys in the same slot.
    pub same_slot_threshold: usize,
    pub funding_lookback_hours: u64,
    pub new_wallet_max_age_hours: u64,
    /// How many of the most recent other buyers are sampled for age.
    pub new_wallet_sample: usize,
    pub new_wallet_min_count: usize,
    /// Relative tolerance for "similar" amounts, in percent.
    pub similar_amount_pct: u64,
    pub similar_amount_min_count: usize,
    pub timing_max_mean_secs: u64,
    /// Maximum stddev as a percentage of the mean interval.
    pub timing_max_cv_pct: u64,
    /// Minimum number of timestamps before cadence is judged.
    pub timing_min_samples: usize,
    /// Size of the per-launch recent-buy window.
    pub recent_window: usize,
    /// Timeout applied to every collaborator call.
    pub lookup_timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            bundle_confidence_threshold: BUNDLE_CONFIDENCE_THRESHOLD,
            block_confidence: 90,
            reduce_confidence: 70,
            delay_confidence: 50,
            flag_confidence: 30,
            auto_register_confidence: 90,
            same_slot_threshold: 3,
            funding_lookback_hours: 24,
            new_wallet_max_age_hours: 24,
            new_wallet_sample: 20,
            new_wallet_min_count: 5,
            similar_amount_pct: 5,
            similar_amount_min_count: 3,
            timing_max_mean_secs: 60,
            timing_max_cv_pct: 10,
            timing_min_samples: 3,
            recent_window: DEFAULT_RECENT_WINDOW,
            lookup_timeout_ms: 2_000,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("bundle_confidence_threshold", self.bundle_confidence_threshold),
            ("block_confidence", self.block_confidence),
            ("reduce_confidence", self.reduce_confidence),
            ("delay_confidence", self.delay_confidence),
            ("flag_confidence", self.flag_confidence),
            ("auto_register_confidence", self.auto_register_confidence),
        ] {
            check_percent(field, value as u64)?;
        }
        check_percent("similar_amount_pct", self.similar_amount_pct)?;
        check_percent("timing_max_cv_pct", self.timing_max_cv_pct)?;

        if !(self.block_confidence >= self.reduce_confidence
            && self.reduce_confidence >= self.delay_confidence
            && self.delay_confidence >= self.flag_confidence)
        {
            return Err(ConfigError::ActionOrdering {
                block: self.block_confidence,
                reduce: self.reduce_confidence,
                delay: self.delay_confidence,
                flag: self.flag_confidence,
            });
        }

        if self.recent_window == 0 {
            return Err(ConfigError::Zero("recent_window"));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::Zero("lookup_timeout_ms"));
        }
        if self.same_slot_threshold == 0 {
            return Err(ConfigError::Zero("same_slot_threshold"));
        }
        if self.timing_min_samples < 2 {
            return Err(ConfigError::Zero("timing_min_samples"));
        }
        Ok(())
    }

    pub fn lookback_ms(&self) -> i64 {
        crate::time::hours_to_ms(self.funding_lookback_hours)
    }
}

/// Cluster suspicion scoring thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub fresh_age_hours: u64,
    pub young_age_hours: u64,
    pub shared_funder_min_members: usize,
    pub fast_cadence_secs: u64,
    pub regular_cadence_cv_pct: u64,
    pub regular_cadence_min_intervals: usize,
    pub large_cluster_size: usize,
    pub medium_cluster_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fresh_age_hours: 24,
            young_age_hours: 168,
            shared_funder_min_members: 3,
            fast_cadence_secs: 60,
            regular_cadence_cv_pct: 10,
            regular_cadence_min_intervals: 5,
            large_cluster_size: 10,
            medium_cluster_size: 5,
        }
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("regular_cadence_cv_pct", self.regular_cadence_cv_pct)?;
        if self.shared_funder_min_members == 0 {
            return Err(ConfigError::Zero("shared_funder_min_members"));
        }
        if self.medium_cluster_size == 0 {
            return Err(ConfigError::Zero("medium_cluster_size"));
        }
        Ok(())
    }
}

/// Hold-to-earn rewards parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub claim_cooldown_days: u64,
    /// Share of the remaining pool paid out per distribution, in BPS.
    pub distribution_bps: u64,
    /// Supply used for pools that do not state one.
    pub total_supply_assumed: u64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            claim_cooldown_days: CLAIM_COOLDOWN_DAYS,
            distribution_bps: DISTRIBUTION_BPS,
            total_supply_assumed: DEFAULT_TOTAL_SUPPLY,
        }
    }
}

impl RewardsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.distribution_bps == 0 || self.distribution_bps > crate::constants::BPS_PRECISION {
            return Err(ConfigError::OutOfRange {
                field: "distribution_bps",
                value: self.distribution_bps,
            });
        }
        if self.total_supply_assumed == 0 {
            return Err(ConfigError::Zero("total_supply_assumed"));
        }
        Ok(())
    }
}

/// Complete engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub detector: DetectorConfig,
    pub graph: GraphConfig,
    pub rewards: RewardsConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.graph.validate()?;
        self.rewards.validate()
    }
}

fn check_percent(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > MAX_CONFIDENCE as u64 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}
