//! Directed connections between nodes.
//!
//! Edges optionally name a handle on either end. Handles are sub-ports used
//! when a node exposes more than one input or output, such as the per-variant
//! outputs of an A/B test (`port-1-output`, `port-2-output`, ...).

use campaign_flow_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// An edge in a campaign graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Editor-assigned identifier.
    pub id: EdgeId,
    /// The node this edge leaves.
    pub source: NodeId,
    /// The node this edge enters.
    pub target: NodeId,
    /// The output handle on the source node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// The input handle on the target node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates an edge without handles.
    #[must_use]
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Creates an edge for a connection the user is proposing, minting an id.
    #[must_use]
    pub fn proposed(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self::new(EdgeId::generate(), source, target)
    }

    /// Sets the source handle.
    #[must_use]
    pub fn on_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Sets the target handle.
    #[must_use]
    pub fn on_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Returns true if this edge leaves the given handle of the given node.
    #[must_use]
    pub fn leaves(&self, node: &NodeId, handle: &str) -> bool {
        &self.source == node && self.source_handle.as_deref() == Some(handle)
    }
}

/// Returns the conventional name of a splitter's n-th output handle (1-based).
#[must_use]
pub fn output_handle(index: usize) -> String {
    format!("port-{index}-output")
}
