//! Topology index over a graph snapshot, built with petgraph.
//!
//! The index borrows the snapshot's nodes and edges and is rebuilt for every
//! evaluation, so it can never drift from the editor's state. Edges whose
//! endpoints are not both in the snapshot are kept aside as dangling.

use crate::edge::Edge;
use crate::node::Node;
use campaign_flow_core::NodeId;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// A directed view of one snapshot.
#[derive(Debug)]
pub struct Topology<'a> {
    graph: DiGraph<&'a Node, &'a Edge>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    index: HashMap<&'a NodeId, NodeIndex>,
    dangling: Vec<&'a Edge>,
}

impl<'a> Topology<'a> {
    /// Indexes a snapshot. The first node with a given id wins.
    #[must_use]
    pub fn build(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if index.contains_key(&node.id) {
                tracing::debug!(node_id = %node.id, "ignoring duplicate node id");
                continue;
            }
            let idx = graph.add_node(node);
            index.insert(&node.id, idx);
        }

        let mut dangling = Vec::new();
        for edge in edges {
            match (index.get(&edge.source), index.get(&edge.target)) {
                (Some(&source), Some(&target)) => {
                    graph.add_edge(source, target, edge);
                }
                _ => dangling.push(edge),
            }
        }

        Self {
            graph,
            index,
            dangling,
        }
    }

    /// Returns the node with the given id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&'a Node> {
        let idx = self.index.get(id)?;
        self.graph.node_weight(*idx).copied()
    }

    /// Returns true if the node is indexed.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Edges entering the node, between indexed nodes only.
    #[must_use]
    pub fn incoming(&self, id: &NodeId) -> Vec<&'a Edge> {
        self.edges_directed(id, Direction::Incoming)
    }

    /// Edges leaving the node, between indexed nodes only.
    #[must_use]
    pub fn outgoing(&self, id: &NodeId) -> Vec<&'a Edge> {
        self.edges_directed(id, Direction::Outgoing)
    }

    fn edges_directed(&self, id: &NodeId, direction: Direction) -> Vec<&'a Edge> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph yields adjacent edges newest first; restore snapshot order.
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| (e.id(), *e.weight()))
            .collect();
        edges.sort_by_key(|(edge_index, _)| *edge_index);
        edges.into_iter().map(|(_, edge)| edge).collect()
    }

    /// Edges with at least one endpoint missing from the snapshot.
    #[must_use]
    pub fn dangling(&self) -> &[&'a Edge] {
        &self.dangling
    }

    /// Ids of nodes that sit on a directed cycle, including self-loops.
    #[must_use]
    pub fn cyclic_nodes(&self) -> HashSet<&'a NodeId> {
        petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&idx| self.graph.contains_edge(idx, idx))
            })
            .flatten()
            .filter_map(|idx| self.graph.node_weight(idx).copied())
            .map(|node| &node.id)
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
