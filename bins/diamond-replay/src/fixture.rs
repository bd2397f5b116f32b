//! Replay fixtures: a JSON description of ledger state plus the buys to ingest.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use diamond_core::launch::LaunchParams;
use diamond_core::types::{BuyEvent, Transfer};
use diamond_detect::MemoryLedger;

/// First recorded activity of one account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountAge {
    pub address: String,
    pub first_activity: i64,
}

/// Value received by `to`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTransfer {
    pub to: String,
    #[serde(flatten)]
    pub transfer: Transfer,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    /// Clock start. Defaults to the earliest buy.
    pub start_at: Option<i64>,
    pub accounts: Vec<AccountAge>,
    pub transfers: Vec<FixtureTransfer>,
    pub known_bundlers: Vec<String>,
    /// Launches to create and activate before any buy is ingested.
    pub launches: Vec<LaunchParams>,
    pub buys: Vec<BuyEvent>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// Buys in ingest order: timestamp, then slot, then signature.
    pub fn ordered_buys(&self) -> Vec<BuyEvent> {
        let mut buys = self.buys.clone();
        buys.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.slot.cmp(&b.slot))
                .then_with(|| a.signature.cmp(&b.signature))
        });
        buys
    }

    pub fn start_time(&self) -> i64 {
        self.start_at
            .or_else(|| self.buys.iter().map(|b| b.timestamp).min())
            .unwrap_or_default()
    }

    /// Load accounts, transfers, and every buy's transaction into `ledger`.
    pub fn seed(&self, ledger: &MemoryLedger) {
        for account in &self.accounts {
            ledger.set_first_activity(&account.address, account.first_activity);
        }
        for t in &self.transfers {
            ledger.add_transfer(&t.to, t.transfer.clone());
        }
        for buy in &self.buys {
            ledger.insert_buy(buy);
        }
    }

    /// Distinct launch ids of the buys in first-seen order.
    pub fn launch_ids(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for buy in self.ordered_buys() {
            if !out.contains(&buy.launch_id) {
                out.push(buy.launch_id);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use diamond_core::time::ManualClock;
    use diamond_core::traits::{AccountAgeLookup, FundingLookup, TransactionResolver};

    const SAMPLE: &str = r#"{
        "accounts": [{ "address": "w1", "firstActivity": 1000 }],
        "transfers": [{ "to": "w1", "source": "funder", "amount": 5, "timestamp": 1500 }],
        "knownBundlers": ["mallory"],
        "launches": [{ "launchId": "L1", "name": "One", "symbol": "ONE", "totalSupply": 1000,
            "devAllocationBps": 0, "devVestingDays": 180, "lpLockDays": 365,
            "holderRewardsBps": 1000 }],
        "buys": [
            { "signature": "b", "wallet": "w2", "launchId": "L2", "amount": 10,
              "tokensReceived": 100, "slot": 9, "timestamp": 3000 },
            { "signature": "a", "wallet": "w1", "launchId": "L1", "amount": 10,
              "tokensReceived": 100, "slot": 7, "timestamp": 2000 }
        ]
    }"#;

    fn sample() -> Fixture {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_and_orders() {
        let f = sample();
        assert_eq!(f.known_bundlers, vec!["mallory".to_string()]);
        assert_eq!(f.launches[0].launch_id, "L1");
        assert_eq!(f.launches[0].holder_rewards_bps, 1000);
        assert_eq!(f.transfers[0].transfer.source, "funder");
        let order: Vec<_> = f.ordered_buys().into_iter().map(|b| b.signature).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(f.launch_ids(), vec!["L1".to_string(), "L2".to_string()]);
        assert_eq!(f.start_time(), 2000);
    }

    #[test]
    fn empty_fixture_is_valid() {
        let f: Fixture = serde_json::from_str("{}").unwrap();
        assert!(f.buys.is_empty());
        assert_eq!(f.start_time(), 0);
    }

    #[tokio::test]
    async fn seeds_ledger() {
        let f = sample();
        let ledger = MemoryLedger::new(Arc::new(ManualClock::new(2000)));
        f.seed(&ledger);

        assert_eq!(ledger.first_activity("w1").await.unwrap(), Some(1000));
        assert_eq!(ledger.first_activity("w2").await.unwrap(), None);
        let transfers = ledger.recent_incoming_transfers("w1", 24).await.unwrap();
        assert_eq!(transfers.len(), 1);
        let tx = ledger.resolve("a").await.unwrap().unwrap();
        assert_eq!(tx.buyer, "w1");
        assert_eq!(tx.amount(), 10);
    }

    #[test]
    fn load_reports_path_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        let err = Fixture::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing fixture"));
    }
}
