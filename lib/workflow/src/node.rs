//! Campaign graph nodes.
//!
//! A node is an opaque vertex owned by the graph editor. The engine reads
//! exactly two things from it: its [`NodeKind`] and, for A/B-test splitters,
//! how many outputs it declares. Everything else travels in `payload`
//! untouched.

use campaign_flow_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// The role of a node in a campaign workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Campaign source: audience and campaign fields.
    #[serde(alias = "campaign")]
    Source,
    /// A/B test fan-out into content variants.
    #[serde(alias = "ab_test", alias = "abTest")]
    Splitter,
    /// Content generation.
    #[serde(alias = "content")]
    Processor,
    /// Send scheduling.
    #[serde(alias = "schedule", alias = "scheduling")]
    Scheduler,
    /// Analytics sink.
    #[serde(alias = "sink")]
    Analytics,
    /// Anything the engine does not recognize.
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Source,
        Self::Splitter,
        Self::Processor,
        Self::Scheduler,
        Self::Analytics,
        Self::Unknown,
    ];

    /// Returns the canonical name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Splitter => "splitter",
            Self::Processor => "processor",
            Self::Scheduler => "scheduler",
            Self::Analytics => "analytics",
            Self::Unknown => "unknown",
        }
    }

    /// Resolves an editor type tag, falling back to [`NodeKind::Unknown`].
    ///
    /// Never fails: an unrecognized tag is simply an unknown node.
    #[must_use]
    pub fn resolve(tag: &str) -> Self {
        tag.parse().unwrap_or(Self::Unknown)
    }

    /// Returns true for fan-out kinds whose outputs are counted at evaluation time.
    #[must_use]
    pub const fn is_splitter(self) -> bool {
        matches!(self, Self::Splitter)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized node kind '{}'", self.input)
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for NodeKind {
    type Err = ParseKindError;

    /// Strict parse: canonical names and editor aliases only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" | "campaign" => Ok(Self::Source),
            "splitter" | "ab_test" | "abTest" => Ok(Self::Splitter),
            "processor" | "content" => Ok(Self::Processor),
            "scheduler" | "schedule" | "scheduling" => Ok(Self::Scheduler),
            "analytics" | "sink" => Ok(Self::Analytics),
            "unknown" => Ok(Self::Unknown),
            other => Err(ParseKindError {
                input: other.to_string(),
            }),
        }
    }
}

/// A node in a campaign graph snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Editor-assigned identifier.
    pub id: NodeId,
    /// Normalized role of this node.
    pub kind: NodeKind,
    /// Number of outputs the node says it has (A/B variants for a splitter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_outputs: Option<usize>,
    /// Domain data carried for the editor; not interpreted here.
    #[serde(default)]
    pub payload: JsonValue,
}

impl Node {
    /// Creates a node with an empty payload.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            declared_outputs: None,
            payload: JsonValue::Null,
        }
    }

    /// Sets the number of declared outputs.
    #[must_use]
    pub fn with_declared_outputs(mut self, count: usize) -> Self {
        self.declared_outputs = Some(count);
        self
    }
}

/// Finds a node by id in a snapshot.
#[must_use]
pub fn find_node<'a>(nodes: &'a [Node], id: &NodeId) -> Option<&'a Node> {
    nodes.iter().find(|n| &n.id == id)
}
