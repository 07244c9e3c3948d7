//! Connection rules and readiness for campaign workflow graphs.
//!
//! The graph editor owns the nodes and edges; this crate only judges them:
//!
//! - **Connection checks**: whether a proposed edge may be drawn, against
//!   per-kind caps and a specificity-ordered rule table that denies by default
//! - **Readiness**: a per-node ready/pending/error status for a whole
//!   snapshot, including A/B-test variant wiring
//! - **Notifications**: throttled reporting of rejections at the boundary
//!
//! Every evaluation works on the snapshot it is given. Nothing is cached
//! between calls.

pub mod edge;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod limits;
pub mod matcher;
pub mod node;
pub mod notify;
pub mod readiness;
pub mod rules;
pub mod verdict;

pub use edge::{Edge, output_handle};
pub use engine::ConnectionGate;
pub use error::{IngestError, RuleTableError};
pub use graph::Topology;
pub use ingest::{EditorEdge, EditorGraph, EditorNode};
pub use limits::check_limits;
pub use matcher::{matching_rules, validate_connection};
pub use node::{Node, NodeKind};
pub use notify::{NotificationThrottle, Notifier, ThrottleConfig, TracingNotifier};
pub use readiness::{NodeStatus, ReadinessReport, SplitterValidation, Status, evaluate_graph};
pub use rules::{
    ConnectionRule, KindPattern, NodeConnectionLimit, NodeRequirement, RuleTable, Validator,
};
pub use verdict::{ConnectionVerdict, LimitScope, ReasonCode, Rejection};
