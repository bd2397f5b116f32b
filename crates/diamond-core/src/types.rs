//! Core data types: buy events, evidence flags, bundle analyses, penalties.
//!
//! Native amounts are lamports, token amounts are base units, and every
//! timestamp is epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    MAX_CONFIDENCE, PENALTY_DELAY_DAYS, PENALTY_REDUCTION_BPS, WEIGHT_CRITICAL, WEIGHT_HIGH,
    WEIGHT_LOW, WEIGHT_MEDIUM,
};

/// One ingested purchase. Never mutated after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuyEvent {
    /// Unique transaction signature.
    pub signature: String,
    pub wallet: String,
    pub launch_id: String,
    /// Native amount paid, in lamports.
    pub amount: u64,
    pub tokens_received: u64,
    /// Ledger slot. Several wallets may share one.
    pub slot: u64,
    pub timestamp: i64,
}

/// A transaction as returned by the ledger indexer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTransaction {
    pub signature: String,
    pub slot: u64,
    /// Ledger time of the transaction, epoch milliseconds.
    pub block_time: i64,
    pub buyer: String,
    /// Signed change of the buyer's native balance (negative on a buy).
    pub sol_delta: i64,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl ResolvedTransaction {
    /// Native amount spent by the buyer.
    pub fn amount(&self) -> u64 {
        self.sol_delta.unsigned_abs()
    }
}

/// An incoming value transfer observed on an account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub source: String,
    pub amount: u64,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Flags and evidence
// ---------------------------------------------------------------------------

/// Flag severity, each carrying a fixed confidence weight.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Self::Low => WEIGHT_LOW,
            Self::Medium => WEIGHT_MEDIUM,
            Self::High => WEIGHT_HIGH,
            Self::Critical => WEIGHT_CRITICAL,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    KnownBundler,
    SameSlot,
    SharedFunding,
    NewWalletCluster,
    SimilarAmounts,
    TimingRegularity,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KnownBundler => "known_bundler",
            Self::SameSlot => "same_slot",
            Self::SharedFunding => "shared_funding",
            Self::NewWalletCluster => "new_wallet_cluster",
            Self::SimilarAmounts => "similar_amounts",
            Self::TimingRegularity => "timing_regularity",
        };
        f.write_str(s)
    }
}

/// Evidence backing a flag. One variant per flag kind, each carrying only
/// the fields that kind needs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    KnownBundler {
        incident_count: u32,
    },
    SameSlot {
        slot: u64,
        /// Other buys sharing the slot.
        count: usize,
    },
    SharedFunding {
        /// Most frequent funder shared with other recent buyers.
        funder: String,
        /// Number of recent buyers sharing at least one funder.
        overlap: usize,
    },
    NewWalletCluster {
        account_age_hours: u64,
        new_wallets: usize,
        sampled: usize,
    },
    SimilarAmounts {
        amount: u64,
        count: usize,
        tolerance_pct: u64,
    },
    TimingRegularity {
        mean_interval_ms: u64,
        stddev_ms: u64,
        intervals: usize,
    },
}

impl Evidence {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::KnownBundler { .. } => FlagKind::KnownBundler,
            Self::SameSlot { .. } => FlagKind::SameSlot,
            Self::SharedFunding { .. } => FlagKind::SharedFunding,
            Self::NewWalletCluster { .. } => FlagKind::NewWalletCluster,
            Self::SimilarAmounts { .. } => FlagKind::SimilarAmounts,
            Self::TimingRegularity { .. } => FlagKind::TimingRegularity,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::KnownBundler { .. } => Severity::Critical,
            Self::SameSlot { .. } | Self::SharedFunding { .. } => Severity::High,
            Self::NewWalletCluster { .. }
            | Self::SimilarAmounts { .. }
            | Self::TimingRegularity { .. } => Severity::Medium,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::KnownBundler { incident_count } => {
                format!("wallet is a known bundler ({incident_count} prior incidents)")
            }
            Self::SameSlot { slot, count } => {
                format!("{count} other buys landed in slot {slot}")
            }
            Self::SharedFunding { funder, overlap } => {
                format!("{overlap} recent buyers share funder {funder}")
            }
            Self::NewWalletCluster {
                account_age_hours,
                new_wallets,
                sampled,
            } => format!(
                "wallet is {account_age_hours}h old; {new_wallets} of the last {sampled} buyers are under 24h old"
            ),
            Self::SimilarAmounts {
                amount,
                count,
                tolerance_pct,
            } => format!("{count} recent buys within {tolerance_pct}% of {amount} lamports"),
            Self::TimingRegularity {
                mean_interval_ms,
                stddev_ms,
                ..
            } => format!(
                "bot-like cadence: mean interval {mean_interval_ms} ms, stddev {stddev_ms} ms"
            ),
        }
    }
}

/// A single piece of coordination evidence.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Flag {
    pub kind: FlagKind,
    pub severity: Severity,
    pub description: String,
    pub evidence: Evidence,
}

impl From<Evidence> for Flag {
    fn from(evidence: Evidence) -> Self {
        Self {
            kind: evidence.kind(),
            severity: evidence.severity(),
            description: evidence.describe(),
            evidence,
        }
    }
}

/// Sum the severity weights of `flags`, clamped to [`MAX_CONFIDENCE`].
pub fn confidence_from_flags(flags: &[Flag]) -> u8 {
    let total: u32 = flags.iter().map(|f| f.severity.weight()).sum();
    total.min(MAX_CONFIDENCE as u32) as u8
}

// ---------------------------------------------------------------------------
// Remediation
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    Flag,
    DelayRewards,
    ReduceRewards,
    Block,
}

/// Structured remediation attached to an analysis.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Penalty {
    Blocked,
    ReduceRewards { reduction_bps: u64 },
    DelayRewards { delay_days: u64 },
}

impl Penalty {
    /// The penalty payload mirroring `action`, if it carries one.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Block => Some(Self::Blocked),
            Action::ReduceRewards => Some(Self::ReduceRewards {
                reduction_bps: PENALTY_REDUCTION_BPS,
            }),
            Action::DelayRewards => Some(Self::DelayRewards {
                delay_days: PENALTY_DELAY_DAYS,
            }),
            Action::Flag | Action::None => None,
        }
    }
}

/// A penalty standing against a holder, stamped with when it was issued.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StandingPenalty {
    pub penalty: Penalty,
    pub issued_at: i64,
}

/// Output of one detector evaluation. Immutable once produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleAnalysis {
    pub signature: String,
    pub launch_id: String,
    /// Buyer, when the transaction resolved.
    pub wallet: Option<String>,
    pub is_bundled: bool,
    pub confidence: u8,
    pub flags: Vec<Flag>,
    pub related_wallets: Vec<String>,
    pub funding_source: Option<String>,
    pub action: Action,
    pub penalty: Option<Penalty>,
    pub analyzed_at: i64,
}

impl BundleAnalysis {
    /// A zero-confidence, no-action result.
    pub fn clean(signature: &str, launch_id: &str, analyzed_at: i64) -> Self {
        Self {
            signature: signature.to_string(),
            launch_id: launch_id.to_string(),
            wallet: None,
            is_bundled: false,
            confidence: 0,
            flags: Vec::new(),
            related_wallets: Vec::new(),
            funding_source: None,
            action: Action::None,
            penalty: None,
            analyzed_at,
        }
    }

    pub fn has_flag(&self, kind: FlagKind) -> bool {
        self.flags.iter().any(|f| f.kind == kind)
    }

    /// The penalty as it stands against the buyer, if any.
    pub fn standing_penalty(&self) -> Option<StandingPenalty> {
        self.penalty.map(|penalty| StandingPenalty {
            penalty,
            issued_at: self.analyzed_at,
        })
    }
}

/// A wallet in the known-bundler registry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundlerRecord {
    pub wallet: String,
    pub flagged_at: i64,
    pub evidence: String,
    pub incident_count: u32,
}

/// A completed reward claim, as emitted to the sink.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub wallet: String,
    pub launch_id: String,
    pub amount: u64,
    pub multiplier_bps: u64,
    pub hold_days: u64,
    pub claimed_at: i64,
}
