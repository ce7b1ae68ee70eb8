use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::EngineError;
use crate::model::{AccountId, Transaction};

/// Edge payload: one transaction. Parallel edges between the same pair of
/// accounts are kept as separate edges.
#[derive(Debug, Clone)]
pub struct TxEdge {
    pub tx_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-account aggregates, accumulated while the graph is built.
#[derive(Debug, Clone, Default)]
pub struct AccountStats {
    /// Distinct counterparties that sent to this account.
    pub unique_in: usize,
    /// Distinct counterparties this account sent to.
    pub unique_out: usize,
    pub in_count: usize,
    pub out_count: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl AccountStats {
    pub fn total_tx_count(&self) -> usize {
        self.in_count + self.out_count
    }

    pub fn avg_in(&self) -> f64 {
        if self.in_count == 0 {
            0.0
        } else {
            self.total_in / self.in_count as f64
        }
    }

    pub fn avg_out(&self) -> f64 {
        if self.out_count == 0 {
            0.0
        } else {
            self.total_out / self.out_count as f64
        }
    }
}

/// The directed transaction multigraph for one analysis run.
///
/// Built once from the validated transaction list, read-only afterwards.
/// Accounts are created lazily on first reference; nothing is ever removed
/// within a run.
pub struct TransactionGraph {
    graph: DiGraph<AccountId, TxEdge>,
    nodes: HashMap<AccountId, NodeIndex>,
    stats: Vec<AccountStats>,
    /// Self-loops are recorded, not rejected.
    pub self_loops: usize,
}

impl TransactionGraph {
    pub fn build(transactions: &[Transaction]) -> Result<Self, EngineError> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyGraph);
        }

        let mut graph = DiGraph::new();
        let mut nodes: HashMap<AccountId, NodeIndex> = HashMap::new();
        let mut stats: Vec<AccountStats> = Vec::new();
        let mut in_peers: Vec<HashSet<NodeIndex>> = Vec::new();
        let mut out_peers: Vec<HashSet<NodeIndex>> = Vec::new();
        let mut self_loops = 0usize;

        // Accounts are created lazily on first reference.
        fn intern(
            id: &AccountId,
            nodes: &mut HashMap<AccountId, NodeIndex>,
            graph: &mut DiGraph<AccountId, TxEdge>,
            stats: &mut Vec<AccountStats>,
            in_peers: &mut Vec<HashSet<NodeIndex>>,
            out_peers: &mut Vec<HashSet<NodeIndex>>,
        ) -> NodeIndex {
            *nodes.entry(id.clone()).or_insert_with(|| {
                stats.push(AccountStats::default());
                in_peers.push(HashSet::new());
                out_peers.push(HashSet::new());
                graph.add_node(id.clone())
            })
        }

        for tx in transactions {
            let src = intern(
                &tx.sender_id,
                &mut nodes,
                &mut graph,
                &mut stats,
                &mut in_peers,
                &mut out_peers,
            );
            let dst = intern(
                &tx.receiver_id,
                &mut nodes,
                &mut graph,
                &mut stats,
                &mut in_peers,
                &mut out_peers,
            );

            if src == dst {
                self_loops += 1;
                tracing::warn!(account = %tx.sender_id, tx_id = %tx.tx_id, "Self-loop transaction recorded");
            }

            graph.add_edge(
                src,
                dst,
                TxEdge {
                    tx_id: tx.tx_id.clone(),
                    amount: tx.amount,
                    timestamp: tx.timestamp,
                },
            );

            out_peers[src.index()].insert(dst);
            in_peers[dst.index()].insert(src);

            let s = &mut stats[src.index()];
            s.out_count += 1;
            s.total_out += tx.amount;
            s.first_seen = Some(s.first_seen.map_or(tx.timestamp, |t| t.min(tx.timestamp)));
            s.last_seen = Some(s.last_seen.map_or(tx.timestamp, |t| t.max(tx.timestamp)));

            let r = &mut stats[dst.index()];
            r.in_count += 1;
            r.total_in += tx.amount;
            r.first_seen = Some(r.first_seen.map_or(tx.timestamp, |t| t.min(tx.timestamp)));
            r.last_seen = Some(r.last_seen.map_or(tx.timestamp, |t| t.max(tx.timestamp)));
        }

        for (idx, s) in stats.iter_mut().enumerate() {
            s.unique_in = in_peers[idx].len();
            s.unique_out = out_peers[idx].len();
        }

        tracing::info!(
            accounts = graph.node_count(),
            transactions = graph.edge_count(),
            self_loops,
            "Transaction graph built"
        );

        Ok(Self {
            graph,
            nodes,
            stats,
            self_loops,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    pub fn account_id(&self, idx: NodeIndex) -> &AccountId {
        &self.graph[idx]
    }

    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    pub fn stats(&self, idx: NodeIndex) -> &AccountStats {
        &self.stats[idx.index()]
    }

    /// Distinct successor accounts, ascending by node index. Deterministic
    /// and free of parallel-edge duplicates.
    pub fn successors(&self, idx: NodeIndex) -> BTreeSet<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect()
    }

    /// Inbound transactions as (sender, edge), sorted by timestamp.
    pub fn inbound_sorted(&self, idx: NodeIndex) -> Vec<(NodeIndex, &TxEdge)> {
        let mut edges: Vec<(NodeIndex, &TxEdge)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        edges.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp).then(a.1.tx_id.cmp(&b.1.tx_id)));
        edges
    }

    /// Outbound transactions as (receiver, edge), sorted by timestamp.
    pub fn outbound_sorted(&self, idx: NodeIndex) -> Vec<(NodeIndex, &TxEdge)> {
        let mut edges: Vec<(NodeIndex, &TxEdge)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        edges.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp).then(a.1.tx_id.cmp(&b.1.tx_id)));
        edges
    }

    /// Outbound transaction timestamps, sorted ascending.
    pub fn outbound_timestamps(&self, idx: NodeIndex) -> Vec<DateTime<Utc>> {
        let mut ts: Vec<DateTime<Utc>> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().timestamp)
            .collect();
        ts.sort();
        ts
    }

    /// Outbound transaction amounts, in edge order.
    pub fn outbound_amounts(&self, idx: NodeIndex) -> Vec<f64> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().amount)
            .collect()
    }

    pub(crate) fn inner(&self) -> &DiGraph<AccountId, TxEdge> {
        &self.graph
    }
}
