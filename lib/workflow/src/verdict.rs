//! Outcomes of a connection check.
//!
//! Every rejection carries a reason class and a message meant for direct
//! display in the editor. Rejections are values, never errors.

use campaign_flow_core::NodeId;
use serde::Serialize;
use std::fmt;

/// Which cap a limit rejection hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum LimitScope {
    /// The source node's outgoing edge cap.
    Outgoing,
    /// The target node's incoming edge cap.
    Incoming,
    /// The cap on edges leaving one handle of the source node.
    Handle { handle: String },
    /// A rule's own `max_connections`.
    Rule { rule: String },
}

/// Why a proposed connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// An endpoint is not in the current snapshot.
    NodeNotFound { node_id: NodeId },
    /// A per-kind, per-handle or per-rule cap has been reached.
    LimitExceeded {
        #[serde(flatten)]
        scope: LimitScope,
        node_id: NodeId,
        max: usize,
        current: usize,
    },
    /// A rule's validator refused the pairing.
    RuleViolation { message: String },
    /// Nothing explicitly permits the pairing.
    NoMatchingRule { message: String },
}

/// Message used when no rule permits a connection.
pub const NOT_ALLOWED_MESSAGE: &str = "connection not allowed by workflow rules";

impl Rejection {
    /// Returns the reason class, used to throttle repeated notifications.
    #[must_use]
    pub fn code(&self) -> ReasonCode {
        match self {
            Self::NodeNotFound { .. } => ReasonCode::NodeNotFound,
            Self::LimitExceeded { .. } => ReasonCode::LimitExceeded,
            Self::RuleViolation { .. } => ReasonCode::RuleViolation,
            Self::NoMatchingRule { .. } => ReasonCode::NoMatchingRule,
        }
    }

    /// Creates the default-deny rejection.
    #[must_use]
    pub fn not_allowed() -> Self {
        Self::NoMatchingRule {
            message: NOT_ALLOWED_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::LimitExceeded {
                scope,
                node_id,
                max,
                current,
            } => match scope {
                LimitScope::Outgoing => write!(
                    f,
                    "node {node_id} already has {current} outgoing connection(s) (maximum {max})"
                ),
                LimitScope::Incoming => write!(
                    f,
                    "node {node_id} already has {current} incoming connection(s) (maximum {max})"
                ),
                LimitScope::Handle { handle } => write!(
                    f,
                    "handle '{handle}' on node {node_id} already has {current} connection(s) (maximum {max})"
                ),
                LimitScope::Rule { rule } => write!(
                    f,
                    "rule {rule} allows a maximum {max} connection(s) from node {node_id}"
                ),
            },
            Self::RuleViolation { message } | Self::NoMatchingRule { message } => {
                f.write_str(message)
            }
        }
    }
}

/// Coarse class of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NodeNotFound,
    LimitExceeded,
    RuleViolation,
    NoMatchingRule,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NodeNotFound => "node_not_found",
            Self::LimitExceeded => "limit_exceeded",
            Self::RuleViolation => "rule_violation",
            Self::NoMatchingRule => "no_matching_rule",
        };
        f.write_str(name)
    }
}

/// The engine's answer for one proposed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ConnectionVerdict {
    Accepted,
    Rejected(Rejection),
}

impl ConnectionVerdict {
    /// Returns true if the connection may be made.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Returns the rejection, if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Returns the display message for a rejection.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.rejection().map(ToString::to_string)
    }
}

impl From<Rejection> for ConnectionVerdict {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_not_found_message() {
        let rejection = Rejection::NodeNotFound {
            node_id: NodeId::from("ghost"),
        };
        assert_eq!(rejection.to_string(), "node not found: ghost");
        assert_eq!(rejection.code(), ReasonCode::NodeNotFound);
    }

    #[test]
    fn limit_messages_name_cap_and_count() {
        let rejection = Rejection::LimitExceeded {
            scope: LimitScope::Handle {
                handle: "port-1-output".to_string(),
            },
            node_id: NodeId::from("split"),
            max: 2,
            current: 2,
        };
        let message = rejection.to_string();
        assert!(message.contains("port-1-output"));
        assert!(message.contains("maximum 2"));
        assert!(message.contains("already has 2"));
    }

    #[test]
    fn rule_cap_message_mentions_maximum() {
        let rejection = Rejection::LimitExceeded {
            scope: LimitScope::Rule {
                rule: "source -> splitter".to_string(),
            },
            node_id: NodeId::from("campaign"),
            max: 1,
            current: 1,
        };
        assert!(rejection.to_string().contains("maximum 1"));
    }

    #[test]
    fn verdict_accessors() {
        assert!(ConnectionVerdict::Accepted.is_accepted());
        assert!(ConnectionVerdict::Accepted.message().is_none());

        let verdict = ConnectionVerdict::from(Rejection::not_allowed());
        assert!(!verdict.is_accepted());
        assert_eq!(verdict.message().as_deref(), Some(NOT_ALLOWED_MESSAGE));
        assert_eq!(
            verdict.rejection().map(Rejection::code),
            Some(ReasonCode::NoMatchingRule)
        );
    }

    #[test]
    fn verdict_serializes_with_reason_tag() {
        let verdict = ConnectionVerdict::Rejected(Rejection::RuleViolation {
            message: "nope".to_string(),
        });
        let json = serde_json::to_value(&verdict).expect("serialize");
        assert_eq!(json["verdict"], "rejected");
        assert_eq!(json["reason"], "rule_violation");
        assert_eq!(json["message"], "nope");
    }
}
