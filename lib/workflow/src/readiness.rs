//! Whole-graph readiness evaluation.
//!
//! Before a campaign may run, every node gets a status recomputed from the
//! snapshot:
//!
//! - `error` when something connected to it breaks the rules (an incoming
//!   edge the matcher would refuse, an edge to or from a missing node, a
//!   cycle) or when a splitter's wiring disagrees with what it declares;
//! - `pending` when required connections are merely absent;
//! - `ready` otherwise.
//!
//! Nothing is cached between calls, so the same snapshot always produces the
//! same report.

use crate::edge::Edge;
use crate::graph::Topology;
use crate::matcher;
use crate::node::{Node, NodeKind};
use crate::rules::RuleTable;
use campaign_flow_core::NodeId;
use serde::Serialize;
use std::collections::HashSet;

/// Readiness of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ready,
    Pending,
    Error,
}

/// Status of a node plus the reasons behind it, errors first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub status: Status,
    pub issues: Vec<String>,
}

/// Declared versus connected outputs of a splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterValidation {
    pub node_id: NodeId,
    pub expected_outputs: usize,
    pub connected_outputs: usize,
    pub is_valid: bool,
    pub message: String,
}

/// The result of evaluating a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub all_ready: bool,
    pub node_statuses: Vec<NodeStatus>,
    pub splitter_validations: Vec<SplitterValidation>,
}

impl ReadinessReport {
    /// Returns the status entry for a node.
    #[must_use]
    pub fn status_of(&self, node_id: &NodeId) -> Option<&NodeStatus> {
        self.node_statuses.iter().find(|s| &s.node_id == node_id)
    }

    /// Number of nodes in each state, as `(ready, pending, error)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        self.node_statuses
            .iter()
            .fold((0, 0, 0), |(r, p, e), s| match s.status {
                Status::Ready => (r + 1, p, e),
                Status::Pending => (r, p + 1, e),
                Status::Error => (r, p, e + 1),
            })
    }
}

#[derive(Default)]
struct Issues {
    errors: Vec<String>,
    pending: Vec<String>,
}

impl Issues {
    fn into_status(self, node: &Node) -> NodeStatus {
        let status = if !self.errors.is_empty() {
            Status::Error
        } else if !self.pending.is_empty() {
            Status::Pending
        } else {
            Status::Ready
        };
        let mut issues = self.errors;
        issues.extend(self.pending);
        NodeStatus {
            node_id: node.id.clone(),
            kind: node.kind,
            status,
            issues,
        }
    }
}

/// Evaluates every node of a snapshot.
#[must_use]
pub fn evaluate_graph(table: &RuleTable, nodes: &[Node], edges: &[Edge]) -> ReadinessReport {
    let topology = Topology::build(nodes, edges);
    let cyclic = topology.cyclic_nodes();
    let mut seen = HashSet::new();
    let mut node_statuses = Vec::with_capacity(nodes.len());
    let mut splitter_validations = Vec::new();

    for node in nodes {
        let mut issues = Issues::default();

        if !seen.insert(&node.id) {
            issues.errors.push(format!("duplicate node id {}", node.id));
            node_statuses.push(issues.into_status(node));
            continue;
        }

        check_incoming(table, node, nodes, edges, &topology, &mut issues);

        for edge in topology.dangling() {
            if edge.source == node.id && !topology.contains(&edge.target) {
                issues.errors.push(format!(
                    "connection {} leads to missing node {}",
                    edge.id, edge.target
                ));
            }
        }

        let requirement = table.requirement(node.kind);
        let incoming = topology.incoming(&node.id).len();
        if incoming < requirement.min_incoming {
            issues.pending.push(format!(
                "needs at least {} incoming connection(s), has {incoming}",
                requirement.min_incoming
            ));
        }
        let outgoing = topology.outgoing(&node.id).len();
        if outgoing < requirement.min_outgoing {
            issues.pending.push(format!(
                "needs at least {} outgoing connection(s), has {outgoing}",
                requirement.min_outgoing
            ));
        }

        if cyclic.contains(&node.id) {
            issues.errors.push("node is part of a cycle".to_string());
        }

        if node.kind.is_splitter() {
            let validation = validate_splitter(table, node, &topology);
            if !validation.is_valid {
                if validation.connected_outputs == 0 && validation.expected_outputs > 0 {
                    issues.pending.push(validation.message.clone());
                } else {
                    issues.errors.push(validation.message.clone());
                }
            }
            splitter_validations.push(validation);
        }

        node_statuses.push(issues.into_status(node));
    }

    let all_ready = node_statuses.iter().all(|s| s.status == Status::Ready)
        && splitter_validations.iter().all(|v| v.is_valid);

    ReadinessReport {
        all_ready,
        node_statuses,
        splitter_validations,
    }
}

/// Re-checks every edge entering the node as if it were being proposed now,
/// against all other edges of the snapshot.
fn check_incoming(
    table: &RuleTable,
    node: &Node,
    nodes: &[Node],
    edges: &[Edge],
    topology: &Topology<'_>,
    issues: &mut Issues,
) {
    for edge in topology.incoming(&node.id) {
        let others = edges.iter().filter(move |e| !std::ptr::eq(*e, edge));
        if let Err(rejection) = matcher::evaluate(table, edge, nodes, others) {
            issues.errors.push(format!(
                "incoming connection {} from {} is invalid: {rejection}",
                edge.id, edge.source
            ));
        }
    }

    for edge in topology.dangling() {
        if edge.target == node.id && !topology.contains(&edge.source) {
            issues.errors.push(format!(
                "incoming connection {} comes from missing node {}",
                edge.id, edge.source
            ));
        }
    }
}

/// Compares a splitter's declared outputs with the distinct nodes reached
/// through its output handles.
#[must_use]
pub fn validate_splitter(
    table: &RuleTable,
    node: &Node,
    topology: &Topology<'_>,
) -> SplitterValidation {
    let declared = node.declared_outputs;
    let expected = declared.unwrap_or(0);
    let connected = topology
        .outgoing(&node.id)
        .into_iter()
        .filter(|e| table.is_output_handle(e.source_handle.as_deref()))
        .map(|e| &e.target)
        .collect::<HashSet<_>>()
        .len();

    let (is_valid, message) = if declared.is_none() {
        (false, "A/B test node declares no variants".to_string())
    } else if connected == expected {
        (true, format!("all {expected} variant(s) connected"))
    } else if connected == 0 {
        (false, format!("no variants connected, expected {expected}"))
    } else if connected < expected {
        (false, format!("{connected} of {expected} variants connected"))
    } else {
        (
            false,
            format!("{connected} variants connected but only {expected} declared"),
        )
    };

    SplitterValidation {
        node_id: node.id.clone(),
        expected_outputs: expected,
        connected_outputs: connected,
        is_valid,
        message,
    }
}
