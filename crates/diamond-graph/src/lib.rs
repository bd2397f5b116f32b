//! # diamond-graph: Wallet relationship graph.
//!
//! Wallets are nodes; funding, transfer, and co-purchase relations are
//! directed edges in an append-only log. Traversal treats every edge as
//! undirected.
//! - **Cluster discovery**: breadth-first search over the adjacency view;
//!   connected sets of two or more wallets become clusters.
//! - **Suspicion scoring**: additive signals (wallet age, shared funders,
//!   buy cadence, size), capped at 100.
//! - **Path queries**: unweighted shortest paths between two wallets.

pub mod cluster;
pub mod graph;

pub use cluster::{score_cluster, ClusterResult, ClusterSignal};
pub use graph::{EdgeKind, GraphStats, WalletEdge, WalletGraph, WalletNode};
