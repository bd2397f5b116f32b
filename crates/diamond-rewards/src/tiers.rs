//! Diamond ranks.
//!
//! Thresholds are inclusive lower bounds on whole days held, checked from the
//! top down:
//!
//! | Rank     | Days | Multiplier |
//! |----------|------|------------|
//! | Diamond  | 180  | 3.5×       |
//! | Platinum | 90   | 3.0×       |
//! | Gold     | 60   | 2.5×       |
//! | Silver   | 30   | 2.0×       |
//! | Bronze   | 7    | 1.5×       |
//! | Paper    | 0    | 1.0×       |

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiamondRank {
    Paper,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl DiamondRank {
    /// Every rank, lowest first.
    pub const ALL: [DiamondRank; 6] = [
        Self::Paper,
        Self::Bronze,
        Self::Silver,
        Self::Gold,
        Self::Platinum,
        Self::Diamond,
    ];

    pub fn from_days(days: u64) -> Self {
        match days {
            180.. => Self::Diamond,
            90.. => Self::Platinum,
            60.. => Self::Gold,
            30.. => Self::Silver,
            7.. => Self::Bronze,
            _ => Self::Paper,
        }
    }

    /// Days held at which this rank begins.
    pub fn min_days(self) -> u64 {
        match self {
            Self::Paper => 0,
            Self::Bronze => 7,
            Self::Silver => 30,
            Self::Gold => 60,
            Self::Platinum => 90,
            Self::Diamond => 180,
        }
    }

    pub fn multiplier_bps(self) -> u64 {
        match self {
            Self::Paper => 10_000,
            Self::Bronze => 15_000,
            Self::Silver => 20_000,
            Self::Gold => 25_000,
            Self::Platinum => 30_000,
            Self::Diamond => 35_000,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Paper => Some(Self::Bronze),
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => Some(Self::Diamond),
            Self::Diamond => None,
        }
    }
}

impl fmt::Display for DiamondRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Paper => "paper",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
            Self::Diamond => "diamond",
        };
        f.write_str(s)
    }
}

pub fn get_diamond_rank(days: u64) -> DiamondRank {
    DiamondRank::from_days(days)
}

/// Multiplier in BPS for `days` held.
pub fn get_multiplier(days: u64) -> u64 {
    DiamondRank::from_days(days).multiplier_bps()
}
