//! Wallet graph storage, mutation, and path queries.
//!
//! All state sits behind one `parking_lot::RwLock`. Writers take the write
//! guard for a single mutation; readers (path queries, cluster scans, stats)
//! hold the read guard for the whole call, so each call observes one
//! consistent edge set.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use diamond_core::config::GraphConfig;
use diamond_core::time::{Clock, SystemClock};

/// The relation an edge records.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `from` sent value that funded `to`.
    Funding,
    Transfer,
    /// `from` and `to` bought together (same slot or shared funder).
    Trade,
}

/// One directed, typed relation between two wallets.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WalletEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub amount: u64,
    pub timestamp: i64,
}

/// Everything observed about one wallet.
///
/// # Invariants
///
/// * Counts, volume, and the funding multisets only grow.
/// * `buy_timestamps` is sorted ascending.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WalletNode {
    pub address: String,
    pub first_seen: i64,
    pub transaction_count: u64,
    pub total_volume: u64,
    /// Funder address to number of funding edges received from it.
    pub funding_sources: BTreeMap<String, u32>,
    /// Funded address to number of funding edges sent to it.
    pub funding_targets: BTreeMap<String, u32>,
    pub buy_timestamps: Vec<i64>,
}

impl WalletNode {
    fn new(address: &str, first_seen: i64) -> Self {
        Self {
            address: address.to_string(),
            first_seen,
            transaction_count: 0,
            total_volume: 0,
            funding_sources: BTreeMap::new(),
            funding_targets: BTreeMap::new(),
            buy_timestamps: Vec::new(),
        }
    }
}

/// Aggregate counters over the whole graph.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub wallets: usize,
    pub edges: usize,
    pub funding_edges: usize,
    pub transfer_edges: usize,
    pub trade_edges: usize,
    pub total_volume: u64,
    pub clusters: usize,
    pub largest_cluster: usize,
}

#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub(crate) nodes: HashMap<String, WalletNode>,
    /// Wallet addresses in insertion order. Seeds cluster discovery.
    pub(crate) order: Vec<String>,
    pub(crate) edges: Vec<WalletEdge>,
    /// Undirected view of `edges`.
    pub(crate) adjacency: HashMap<String, BTreeSet<String>>,
}

impl GraphState {
    fn ensure_node(&mut self, address: &str, first_seen: i64) -> &mut WalletNode {
        let order = &mut self.order;
        let adjacency = &mut self.adjacency;
        let node = self
            .nodes
            .entry(address.to_string())
            .or_insert_with(|| {
                order.push(address.to_string());
                adjacency.entry(address.to_string()).or_default();
                WalletNode::new(address, first_seen)
            });
        node.first_seen = node.first_seen.min(first_seen);
        node
    }

    pub(crate) fn degree(&self, address: &str) -> usize {
        self.adjacency.get(address).map_or(0, BTreeSet::len)
    }

    /// Connected components in discovery order, each listed in BFS order.
    pub(crate) fn components(&self) -> Vec<Vec<String>> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut components = Vec::new();

        for seed in &self.order {
            if visited.contains(seed.as_str()) {
                continue;
            }
            visited.insert(seed.as_str());
            let mut members = Vec::new();
            let mut queue = VecDeque::from([seed.as_str()]);

            while let Some(current) = queue.pop_front() {
                members.push(current.to_string());
                if let Some(neighbors) = self.adjacency.get(current) {
                    for next in neighbors {
                        if visited.insert(next.as_str()) {
                            queue.push_back(next.as_str());
                        }
                    }
                }
            }
            components.push(members);
        }
        components
    }

    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        parent.insert(from, from);

        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = self.adjacency.get(current) else {
                continue;
            };
            for next in neighbors {
                if parent.contains_key(next.as_str()) {
                    continue;
                }
                parent.insert(next.as_str(), current);
                if next == to {
                    let mut path = vec![to.to_string()];
                    let mut step = current;
                    while step != from {
                        path.push(step.to_string());
                        step = parent[step];
                    }
                    path.push(from.to_string());
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next.as_str());
            }
        }
        None
    }
}

/// Shared wallet relationship graph.
pub struct WalletGraph {
    pub(crate) state: RwLock<GraphState>,
    pub(crate) config: GraphConfig,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Default for WalletGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default(), Arc::new(SystemClock))
    }
}

impl WalletGraph {
    pub fn new(config: GraphConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Register a wallet. Returns `true` if it was not known before.
    pub fn add_wallet(&self, address: &str, first_seen: i64) -> bool {
        let mut state = self.state.write();
        let is_new = !state.nodes.contains_key(address);
        state.ensure_node(address, first_seen);
        if is_new {
            trace!(wallet = %address, "graph: wallet added");
        }
        is_new
    }

    /// Append an edge and link both endpoints in the adjacency view.
    ///
    /// Unknown endpoints are created with `first_seen = edge.timestamp`.
    /// Funding edges also extend the endpoints' funding multisets.
    pub fn add_edge(&self, edge: WalletEdge) {
        let mut state = self.state.write();
        state.ensure_node(&edge.from, edge.timestamp);
        state.ensure_node(&edge.to, edge.timestamp);

        if edge.kind == EdgeKind::Funding {
            *state
                .ensure_node(&edge.from, edge.timestamp)
                .funding_targets
                .entry(edge.to.clone())
                .or_insert(0) += 1;
            *state
                .ensure_node(&edge.to, edge.timestamp)
                .funding_sources
                .entry(edge.from.clone())
                .or_insert(0) += 1;
        }

        if edge.from != edge.to {
            state
                .adjacency
                .entry(edge.from.clone())
                .or_default()
                .insert(edge.to.clone());
            state
                .adjacency
                .entry(edge.to.clone())
                .or_default()
                .insert(edge.from.clone());
        }

        debug!(from = %edge.from, to = %edge.to, kind = ?edge.kind, "graph: edge added");
        state.edges.push(edge);
    }

    /// Record a purchase against `wallet`.
    pub fn record_buy(&self, wallet: &str, amount: u64, timestamp: i64) {
        let mut state = self.state.write();
        let node = state.ensure_node(wallet, timestamp);
        node.transaction_count = node.transaction_count.saturating_add(1);
        node.total_volume = node.total_volume.saturating_add(amount);
        let at = node.buy_timestamps.partition_point(|t| *t <= timestamp);
        node.buy_timestamps.insert(at, timestamp);
    }

    pub fn contains(&self, address: &str) -> bool {
        self.state.read().nodes.contains_key(address)
    }

    pub fn node(&self, address: &str) -> Option<WalletNode> {
        self.state.read().nodes.get(address).cloned()
    }

    /// Funding sources of each listed wallet, under a single read guard.
    /// Unknown wallets map to an empty set.
    pub fn funding_sources_of(&self, wallets: &[String]) -> HashMap<String, BTreeSet<String>> {
        let state = self.state.read();
        wallets
            .iter()
            .map(|w| {
                let sources = state
                    .nodes
                    .get(w)
                    .map(|n| n.funding_sources.keys().cloned().collect())
                    .unwrap_or_default();
                (w.clone(), sources)
            })
            .collect()
    }

    /// Number of adjacency links of `address`.
    pub fn degree(&self, address: &str) -> usize {
        self.state.read().degree(address)
    }

    /// Shortest path by edge count, endpoints included.
    ///
    /// `None` if either wallet is unknown or they are not connected.
    /// Among equally short paths the first found by BFS is returned.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.state.read().shortest_path(from, to)
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.find_path(a, b).is_some()
    }

    pub fn edges(&self) -> Vec<WalletEdge> {
        self.state.read().edges.clone()
    }

    pub fn wallet_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn stats(&self) -> GraphStats {
        let state = self.state.read();
        let mut stats = GraphStats {
            wallets: state.nodes.len(),
            edges: state.edges.len(),
            total_volume: state
                .nodes
                .values()
                .fold(0u64, |acc, n| acc.saturating_add(n.total_volume)),
            ..GraphStats::default()
        };
        for edge in &state.edges {
            match edge.kind {
                EdgeKind::Funding => stats.funding_edges += 1,
                EdgeKind::Transfer => stats.transfer_edges += 1,
                EdgeKind::Trade => stats.trade_edges += 1,
            }
        }
        for component in state.components() {
            if component.len() >= 2 {
                stats.clusters += 1;
                stats.largest_cluster = stats.largest_cluster.max(component.len());
            }
        }
        stats
    }
}
