//! Holder leaderboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::holders::Holder;
use crate::tiers::DiamondRank;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based.
    pub position: usize,
    pub wallet: String,
    /// Set when the board is for a single launch.
    pub launch_id: Option<String>,
    pub hold_days: u64,
    pub rank: DiamondRank,
    pub balance: u64,
    /// Positions aggregated into this entry.
    pub launches: usize,
}

/// Rank holders by hold days, then balance, then wallet address.
///
/// With `launch_id` only that launch's positions are listed. Without it,
/// each wallet gets one entry: its longest hold and its summed balance.
pub fn generate_leaderboard(
    holders: &[Holder],
    launch_id: Option<&str>,
    now: i64,
    limit: Option<usize>,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = match launch_id {
        Some(id) => holders
            .iter()
            .filter(|h| h.launch_id == id)
            .map(|h| entry(&h.wallet, Some(id), h.hold_days(now), h.balance, 1))
            .collect(),
        None => {
            let mut per_wallet: BTreeMap<&str, (u64, u64, usize)> = BTreeMap::new();
            for h in holders {
                let agg = per_wallet.entry(h.wallet.as_str()).or_default();
                agg.0 = agg.0.max(h.hold_days(now));
                agg.1 = agg.1.saturating_add(h.balance);
                agg.2 += 1;
            }
            per_wallet
                .into_iter()
                .map(|(w, (days, balance, n))| entry(w, None, days, balance, n))
                .collect()
        }
    };

    entries.sort_by(|a, b| {
        b.hold_days
            .cmp(&a.hold_days)
            .then(b.balance.cmp(&a.balance))
            .then_with(|| a.wallet.cmp(&b.wallet))
    });
    entries.truncate(limit.unwrap_or(usize::MAX));
    for (i, e) in entries.iter_mut().enumerate() {
        e.position = i + 1;
    }
    entries
}

fn entry(wallet: &str, launch_id: Option<&str>, hold_days: u64, balance: u64, launches: usize) -> LeaderboardEntry {
    LeaderboardEntry {
        position: 0,
        wallet: wallet.to_string(),
        launch_id: launch_id.map(str::to_string),
        hold_days,
        rank: DiamondRank::from_days(hold_days),
        balance,
        launches,
    }
}
