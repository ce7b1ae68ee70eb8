use petgraph::visit::EdgeRef;

use crate::model::{GraphData, GraphEdge, GraphNode};

use super::TransactionGraph;

/// Project the transaction graph into the flat node/edge form consumed by
/// the visualization frontend. Read-only view; not part of the scoring
/// contract.
pub fn project(graph: &TransactionGraph) -> GraphData {
    let inner = graph.inner();

    let nodes = inner
        .node_indices()
        .map(|idx| GraphNode {
            id: inner[idx].clone(),
        })
        .collect();

    let edges = inner
        .edge_references()
        .enumerate()
        .map(|(idx, edge)| GraphEdge {
            id: format!("{}-{}-{}", inner[edge.source()], inner[edge.target()], idx),
            source: inner[edge.source()].clone(),
            target: inner[edge.target()].clone(),
            amount: edge.weight().amount,
        })
        .collect();

    GraphData { nodes, edges }
}
