//! Launch registry and protocol-wide counters.
//!
//! Launches receive sequential ids in creation order. The counters are
//! shared with the holder book and the bundler registry, which bump them as
//! positions open and wallets are first flagged.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LaunchError;
use crate::launch::{LaunchParams, LaunchStatus};

/// Running protocol totals.
#[derive(Debug, Default)]
pub struct ProtocolTotals {
    launches: AtomicU64,
    holders: AtomicU64,
    bundlers_caught: AtomicU64,
}

/// Point-in-time copy of [`ProtocolTotals`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtocolStats {
    pub total_launches: u64,
    pub total_holders: u64,
    pub total_bundlers_caught: u64,
}

impl ProtocolTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_holder(&self) {
        self.holders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundler(&self) {
        self.bundlers_caught.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProtocolStats {
        ProtocolStats {
            total_launches: self.launches.load(Ordering::Relaxed),
            total_holders: self.holders.load(Ordering::Relaxed),
            total_bundlers_caught: self.bundlers_caught.load(Ordering::Relaxed),
        }
    }
}

/// A created launch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    /// Position in creation order, starting at 0.
    pub sequence: u64,
    pub params: LaunchParams,
    pub created_at: i64,
    pub holder_count: u64,
}

impl Launch {
    pub fn id(&self) -> &str {
        &self.params.launch_id
    }

    pub fn status(&self) -> LaunchStatus {
        self.params.status
    }
}

fn transition_allowed(from: LaunchStatus, to: LaunchStatus) -> bool {
    use LaunchStatus::*;
    matches!(
        (from, to),
        (Pending, Active) | (Pending, Failed) | (Active, Graduated) | (Active, Failed)
    )
}

/// Every launch created in this process.
#[derive(Debug, Default)]
pub struct LaunchRegistry {
    launches: RwLock<BTreeMap<String, Launch>>,
    totals: Arc<ProtocolTotals>,
}

impl LaunchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters to hand to the holder book and bundler registry.
    pub fn totals(&self) -> Arc<ProtocolTotals> {
        self.totals.clone()
    }

    pub fn stats(&self) -> ProtocolStats {
        self.totals.snapshot()
    }

    /// Validate `params` and open a pending launch. An empty `launch_id` is
    /// replaced by the launch's sequence number.
    pub fn create_launch(&self, mut params: LaunchParams, now: i64) -> Result<Launch, LaunchError> {
        params.validate()?;
        let mut launches = self.launches.write();
        let sequence = self.totals.launches.load(Ordering::Relaxed);
        if params.launch_id.is_empty() {
            params.launch_id = sequence.to_string();
        }
        if launches.contains_key(&params.launch_id) {
            return Err(LaunchError::DuplicateLaunch(params.launch_id));
        }
        params.status = LaunchStatus::Pending;
        let launch = Launch {
            sequence,
            params,
            created_at: now,
            holder_count: 0,
        };
        launches.insert(launch.id().to_string(), launch.clone());
        self.totals.launches.fetch_add(1, Ordering::Relaxed);
        info!(launch_id = %launch.id(), sequence, symbol = %launch.params.symbol, "launches: created");
        Ok(launch)
    }

    /// Move a launch along `pending -> active -> graduated`, or to `failed`
    /// from either live state.
    pub fn set_status(&self, launch_id: &str, status: LaunchStatus) -> Result<Launch, LaunchError> {
        let mut launches = self.launches.write();
        let launch = launches
            .get_mut(launch_id)
            .ok_or_else(|| LaunchError::UnknownLaunch(launch_id.to_string()))?;
        let from = launch.params.status;
        if !transition_allowed(from, status) {
            warn!(launch_id, ?from, to = ?status, "launches: rejected status change");
            return Err(LaunchError::InvalidTransition { from, to: status });
        }
        launch.params.status = status;
        info!(launch_id, ?from, to = ?status, "launches: status changed");
        Ok(launch.clone())
    }

    /// Count a newly opened position. Positions in launches this registry
    /// never created are not counted.
    pub fn record_holder(&self, launch_id: &str) -> Result<u64, LaunchError> {
        let mut launches = self.launches.write();
        let launch = launches
            .get_mut(launch_id)
            .ok_or_else(|| LaunchError::UnknownLaunch(launch_id.to_string()))?;
        launch.holder_count += 1;
        self.totals.record_holder();
        debug!(launch_id, holders = launch.holder_count, "launches: holder added");
        Ok(launch.holder_count)
    }

    pub fn launch(&self, launch_id: &str) -> Option<Launch> {
        self.launches.read().get(launch_id).cloned()
    }

    /// All launches in creation order.
    pub fn launches(&self) -> Vec<Launch> {
        let mut out: Vec<Launch> = self.launches.read().values().cloned().collect();
        out.sort_by_key(|l| l.sequence);
        out
    }

    pub fn len(&self) -> usize {
        self.launches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
