//! Reading graph snapshots in the editor's own format.
//!
//! The editor stores nodes as `{id, type?, data}` and edges as
//! `{id?, source, target, sourceHandle?, targetHandle?}`. Normalizing turns
//! those records into [`Node`] and [`Edge`] values; the raw `data` object is
//! kept as the node payload.

use crate::edge::Edge;
use crate::error::IngestError;
use crate::node::{Node, NodeKind};
use campaign_flow_core::{EdgeId, NodeId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A node record as the editor saves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorNode {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: JsonValue,
}

impl EditorNode {
    /// Kind from the explicit type, else from `data.type`.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.node_type
            .as_deref()
            .or_else(|| self.data.get("type").and_then(JsonValue::as_str))
            .map_or(NodeKind::Unknown, NodeKind::resolve)
    }

    /// Declared outputs from `data.variants`, `data.variantCount` or
    /// `data.expectedOutputs`, in that order.
    #[must_use]
    pub fn declared_outputs(&self) -> Option<usize> {
        if let Some(variants) = self.data.get("variants").and_then(JsonValue::as_array) {
            return Some(variants.len());
        }
        ["variantCount", "expectedOutputs"]
            .iter()
            .find_map(|key| self.data.get(key).and_then(JsonValue::as_u64))
            .and_then(|n| usize::try_from(n).ok())
    }

    #[must_use]
    pub fn into_node(self) -> Node {
        let kind = self.kind();
        let declared_outputs = self.declared_outputs();
        Node {
            id: NodeId::new(self.id),
            kind,
            declared_outputs,
            payload: self.data,
        }
    }
}

/// An edge record as the editor saves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl EditorEdge {
    /// Converts to an [`Edge`], generating an id if the record has none.
    #[must_use]
    pub fn into_edge(self) -> Edge {
        let id = match self.id {
            Some(id) if !id.is_empty() => EdgeId::new(id),
            _ => EdgeId::generate(),
        };
        Edge {
            id,
            source: NodeId::new(self.source),
            target: NodeId::new(self.target),
            source_handle: self.source_handle.filter(|h| !h.is_empty()),
            target_handle: self.target_handle.filter(|h| !h.is_empty()),
        }
    }
}

/// A whole editor snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorGraph {
    #[serde(default)]
    pub nodes: Vec<EditorNode>,
    #[serde(default)]
    pub edges: Vec<EditorEdge>,
}

impl EditorGraph {
    /// Parses a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe an editor graph.
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let graph = serde_json::from_str(json).map_err(|e| IngestError::InvalidJson {
            details: e.to_string(),
        })?;
        Ok(graph)
    }

    /// Normalizes the snapshot, preserving record order.
    #[must_use]
    pub fn normalize(self) -> (Vec<Node>, Vec<Edge>) {
        let nodes = self.nodes.into_iter().map(EditorNode::into_node).collect();
        let edges = self.edges.into_iter().map(EditorEdge::into_edge).collect();
        (nodes, edges)
    }
}
