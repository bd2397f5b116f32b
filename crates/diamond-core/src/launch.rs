//! Launch parameters and the safety limits every launch must respect.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BPS_PRECISION, MAX_DEV_ALLOCATION_BPS, MAX_LAUNCH_NAME_LEN, MAX_LAUNCH_SYMBOL_LEN,
    MIN_DEV_VESTING_DAYS, MIN_LP_LOCK_DAYS,
};
use crate::error::LaunchError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStatus {
    #[default]
    Pending,
    Active,
    Graduated,
    Failed,
}

/// Parameters a creator supplies when opening a launch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchParams {
    pub launch_id: String,
    pub name: String,
    pub symbol: String,
    pub total_supply: u64,
    pub dev_allocation_bps: u16,
    pub dev_vesting_days: u16,
    pub lp_lock_days: u16,
    /// Share of supply set aside for holder rewards. 500–1500 is typical.
    pub holder_rewards_bps: u16,
    #[serde(default)]
    pub status: LaunchStatus,
}

impl LaunchParams {
    /// Check the enforced safety settings.
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.dev_allocation_bps > MAX_DEV_ALLOCATION_BPS {
            return Err(LaunchError::DevAllocationTooHigh(self.dev_allocation_bps));
        }
        if self.dev_vesting_days < MIN_DEV_VESTING_DAYS {
            return Err(LaunchError::VestingTooShort(self.dev_vesting_days));
        }
        if self.lp_lock_days < MIN_LP_LOCK_DAYS {
            return Err(LaunchError::LpLockTooShort(self.lp_lock_days));
        }
        let name_len = self.name.chars().count();
        if name_len > MAX_LAUNCH_NAME_LEN {
            return Err(LaunchError::NameTooLong(name_len));
        }
        let symbol_len = self.symbol.chars().count();
        if symbol_len > MAX_LAUNCH_SYMBOL_LEN {
            return Err(LaunchError::SymbolTooLong(symbol_len));
        }
        if self.total_supply == 0 {
            return Err(LaunchError::ZeroSupply);
        }
        if u64::from(self.holder_rewards_bps) > BPS_PRECISION {
            return Err(LaunchError::HolderRewardsTooHigh(self.holder_rewards_bps));
        }
        Ok(())
    }

    /// Tokens set aside for holder rewards. Never more than the supply.
    pub fn holder_rewards_allocation(&self) -> Result<u64, LaunchError> {
        let bps = self.holder_rewards_bps;
        if u64::from(bps) > BPS_PRECISION {
            return Err(LaunchError::HolderRewardsTooHigh(bps));
        }
        let share = u128::from(self.total_supply) * u128::from(bps) / u128::from(BPS_PRECISION);
        u64::try_from(share).map_err(|_| LaunchError::HolderRewardsTooHigh(bps))
    }
}
