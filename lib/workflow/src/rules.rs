//! The static connection rule table.
//!
//! A [`RuleTable`] is plain data: an ordered list of [`ConnectionRule`]s, per
//! kind connection limits, per kind connection requirements and the handle
//! naming convention for splitter outputs. It can be serialized, loaded from
//! JSON and swapped out wholesale, for example to test the engine against a
//! minimal table.
//!
//! Every table must contain a catch-all `* -> *` rule without handle filters
//! so that each connection attempt ends in an explicit verdict.

use crate::error::RuleTableError;
use crate::node::{Node, NodeKind};
use crate::verdict::NOT_ALLOWED_MESSAGE;
use campaign_flow_core::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Matches a node kind, or any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KindPattern {
    /// The `*` wildcard.
    Any,
    /// One concrete kind.
    Kind(NodeKind),
}

impl KindPattern {
    /// Returns true if the pattern accepts the kind.
    #[must_use]
    pub fn matches(self, kind: NodeKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(k) => k == kind,
        }
    }

    /// Returns true for a concrete kind.
    #[must_use]
    pub fn is_concrete(self) -> bool {
        matches!(self, Self::Kind(_))
    }
}

impl From<NodeKind> for KindPattern {
    fn from(kind: NodeKind) -> Self {
        Self::Kind(kind)
    }
}

impl TryFrom<String> for KindPattern {
    type Error = crate::node::ParseKindError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == "*" {
            return Ok(Self::Any);
        }
        value.parse().map(Self::Kind)
    }
}

impl From<KindPattern> for String {
    fn from(pattern: KindPattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for KindPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Kind(kind) => f.write_str(kind.as_str()),
        }
    }
}

/// Parses a list of kind names strictly. Unrecognized names are errors, not
/// [`NodeKind::Unknown`].
fn strict_kinds<'de, D>(deserializer: D) -> std::result::Result<Vec<NodeKind>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|name| name.parse::<NodeKind>().map_err(serde::de::Error::custom))
        .collect()
}

fn strict_kind_map<V>(
    raw: BTreeMap<String, V>,
) -> std::result::Result<BTreeMap<NodeKind, V>, RuleTableError> {
    let mut map = BTreeMap::new();
    for (name, value) in raw {
        let Ok(kind) = name.parse::<NodeKind>() else {
            return Err(RuleTableError::UnknownKind { name });
        };
        map.insert(kind, value);
    }
    Ok(map)
}

/// A predicate over the two endpoints of a proposed connection.
///
/// Validators are a closed set so that rule tables stay serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Validator {
    /// Always accepts.
    Allow,
    /// Always rejects with the given message.
    Deny { message: String },
    /// Accepts only if the target's kind is listed.
    TargetKindIn {
        #[serde(deserialize_with = "strict_kinds")]
        kinds: Vec<NodeKind>,
        message: String,
    },
    /// Accepts only if the source's kind is listed.
    SourceKindIn {
        #[serde(deserialize_with = "strict_kinds")]
        kinds: Vec<NodeKind>,
        message: String,
    },
    /// Accepts only if the source handle ends with the suffix.
    SourceHandleSuffix { suffix: String, message: String },
}

impl Validator {
    /// Evaluates the predicate. The error is the user-facing reason.
    ///
    /// # Errors
    ///
    /// Returns the validator's message when it refuses the pairing.
    pub fn check(
        &self,
        source: &Node,
        source_handle: Option<&str>,
        target: &Node,
        _target_handle: Option<&str>,
    ) -> std::result::Result<(), String> {
        let refuse = |message: &str| -> std::result::Result<(), String> {
            Err(message.to_string())
        };
        match self {
            Self::Allow => Ok(()),
            Self::Deny { message } => refuse(message),
            Self::TargetKindIn { kinds, message } => {
                if kinds.contains(&target.kind) {
                    Ok(())
                } else {
                    refuse(message)
                }
            }
            Self::SourceKindIn { kinds, message } => {
                if kinds.contains(&source.kind) {
                    Ok(())
                } else {
                    refuse(message)
                }
            }
            Self::SourceHandleSuffix { suffix, message } => {
                if source_handle.is_some_and(|h| h.ends_with(suffix.as_str())) {
                    Ok(())
                } else {
                    refuse(message)
                }
            }
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRule {
    pub source_kind: KindPattern,
    pub target_kind: KindPattern,
    /// If set, the proposed edge's source handle must equal this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// If set, the proposed edge's target handle must equal this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Cap on edges from one source node matching this rule's handle filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
}

impl ConnectionRule {
    /// Creates a rule with no filters, cap or validator.
    #[must_use]
    pub fn new(source_kind: impl Into<KindPattern>, target_kind: impl Into<KindPattern>) -> Self {
        Self {
            source_kind: source_kind.into(),
            target_kind: target_kind.into(),
            source_handle: None,
            target_handle: None,
            max_connections: None,
            validator: None,
        }
    }

    /// The universal `* -> *` rule denying everything it reaches.
    #[must_use]
    pub fn catch_all() -> Self {
        Self::new(KindPattern::Any, KindPattern::Any).with_validator(Validator::Deny {
            message: NOT_ALLOWED_MESSAGE.to_string(),
        })
    }

    /// Restricts the rule to one source handle.
    #[must_use]
    pub fn on_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Restricts the rule to one target handle.
    #[must_use]
    pub fn on_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }

    /// Caps matching edges per source node.
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Attaches a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Number of concrete kinds in the pattern (0, 1 or 2).
    #[must_use]
    pub fn specificity(&self) -> u8 {
        u8::from(self.source_kind.is_concrete()) + u8::from(self.target_kind.is_concrete())
    }

    /// Returns true for `* -> *`.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.specificity() == 0
    }

    /// Returns true for a universal rule that matches every edge.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.is_universal() && self.source_handle.is_none() && self.target_handle.is_none()
    }

    /// Returns true if the handles satisfy this rule's handle filters.
    #[must_use]
    pub fn handles_match(&self, source_handle: Option<&str>, target_handle: Option<&str>) -> bool {
        let accepts = |filter: &Option<String>, handle: Option<&str>| {
            filter.as_deref().is_none_or(|f| handle == Some(f))
        };
        accepts(&self.source_handle, source_handle) && accepts(&self.target_handle, target_handle)
    }

    /// Short human-readable form, e.g. `source -> splitter`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source_kind, self.target_kind)
    }

    fn same_pattern(&self, other: &Self) -> bool {
        self.source_kind == other.source_kind
            && self.target_kind == other.target_kind
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

/// Per-kind connection caps. `None` means uncapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConnectionLimit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_incoming: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_outgoing: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections_per_handle: Option<usize>,
}

impl NodeConnectionLimit {
    /// Creates a limit with incoming and outgoing caps.
    #[must_use]
    pub fn new(max_incoming: usize, max_outgoing: usize) -> Self {
        Self {
            max_incoming: Some(max_incoming),
            max_outgoing: Some(max_outgoing),
            max_connections_per_handle: None,
        }
    }

    /// Adds a per-handle cap.
    #[must_use]
    pub fn with_per_handle(mut self, max: usize) -> Self {
        self.max_connections_per_handle = Some(max);
        self
    }
}

/// Connections a node of some kind needs before it is ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRequirement {
    #[serde(default)]
    pub min_incoming: usize,
    #[serde(default)]
    pub min_outgoing: usize,
}

impl NodeRequirement {
    #[must_use]
    pub fn new(min_incoming: usize, min_outgoing: usize) -> Self {
        Self {
            min_incoming,
            min_outgoing,
        }
    }
}

fn default_output_suffix() -> String {
    "-output".to_string()
}

/// The complete static configuration of the engine.
///
/// Deserializing always validates, so a table without a catch-all cannot be
/// loaded through any path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRuleTable")]
pub struct RuleTable {
    rules: Vec<ConnectionRule>,
    limits: BTreeMap<NodeKind, NodeConnectionLimit>,
    requirements: BTreeMap<NodeKind, NodeRequirement>,
    /// Suffix that marks a splitter's variant output handles.
    output_handle_suffix: String,
}

/// Unvalidated table as written in JSON, keyed by kind name.
#[derive(Deserialize)]
struct RawRuleTable {
    rules: Vec<ConnectionRule>,
    #[serde(default)]
    limits: BTreeMap<String, NodeConnectionLimit>,
    #[serde(default)]
    requirements: BTreeMap<String, NodeRequirement>,
    #[serde(default = "default_output_suffix")]
    output_handle_suffix: String,
}

impl TryFrom<RawRuleTable> for RuleTable {
    type Error = RuleTableError;

    fn try_from(raw: RawRuleTable) -> std::result::Result<Self, Self::Error> {
        let table = Self {
            rules: raw.rules,
            limits: strict_kind_map(raw.limits)?,
            requirements: strict_kind_map(raw.requirements)?,
            output_handle_suffix: raw.output_handle_suffix,
        };
        table.validate()?;
        Ok(table)
    }
}

impl RuleTable {
    /// Creates a table from rules, validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no catch-all or contains an
    /// unreachable rule.
    pub fn new(rules: Vec<ConnectionRule>) -> Result<Self, RuleTableError> {
        let table = Self {
            rules,
            limits: BTreeMap::new(),
            requirements: BTreeMap::new(),
            output_handle_suffix: default_output_suffix(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Parses and validates a table from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the table is invalid.
    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        let raw: RawRuleTable =
            serde_json::from_str(json).map_err(|e| RuleTableError::InvalidJson {
                details: e.to_string(),
            })?;
        Ok(Self::try_from(raw)?)
    }

    /// Sets the limits for a kind.
    #[must_use]
    pub fn with_limit(mut self, kind: NodeKind, limit: NodeConnectionLimit) -> Self {
        self.limits.insert(kind, limit);
        self
    }

    /// Sets the requirement for a kind.
    #[must_use]
    pub fn with_requirement(mut self, kind: NodeKind, requirement: NodeRequirement) -> Self {
        self.requirements.insert(kind, requirement);
        self
    }

    /// Sets the splitter output handle suffix.
    #[must_use]
    pub fn with_output_handle_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_handle_suffix = suffix.into();
        self
    }

    /// Checks the structural invariants of the table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleTableError::MissingCatchAll`] or
    /// [`RuleTableError::UnreachableRule`].
    pub fn validate(&self) -> std::result::Result<(), RuleTableError> {
        if !self.rules.iter().any(ConnectionRule::is_catch_all) {
            return Err(RuleTableError::MissingCatchAll);
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(shadowed_by) = self.rules[..index]
                .iter()
                .position(|earlier| earlier.same_pattern(rule))
            {
                return Err(RuleTableError::UnreachableRule { index, shadowed_by });
            }
        }
        Ok(())
    }

    /// The rules in table order.
    #[must_use]
    pub fn rules(&self) -> &[ConnectionRule] {
        &self.rules
    }

    /// The limits for a kind, if any.
    #[must_use]
    pub fn limit(&self, kind: NodeKind) -> Option<&NodeConnectionLimit> {
        self.limits.get(&kind)
    }

    /// The requirement for a kind, or none.
    #[must_use]
    pub fn requirement(&self, kind: NodeKind) -> NodeRequirement {
        self.requirements.get(&kind).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn output_handle_suffix(&self) -> &str {
        &self.output_handle_suffix
    }

    /// Returns true if the handle names a splitter variant output.
    #[must_use]
    pub fn is_output_handle(&self, handle: Option<&str>) -> bool {
        handle.is_some_and(|h| h.ends_with(self.output_handle_suffix.as_str()))
    }

    /// The built-in table for campaign workflows:
    /// campaign -> A/B test -> content -> schedule -> analytics, with
    /// content also reachable straight from the campaign.
    #[must_use]
    pub fn campaign_default() -> Self {
        use NodeKind::{Analytics, Processor, Scheduler, Source, Splitter};

        let rules = vec![
            ConnectionRule::new(Source, Splitter).with_max_connections(1),
            ConnectionRule::new(Source, Processor).with_validator(Validator::Allow),
            ConnectionRule::new(Splitter, Processor).with_validator(
                Validator::SourceHandleSuffix {
                    suffix: default_output_suffix(),
                    message: "A/B test nodes connect to content through a variant output"
                        .to_string(),
                },
            ),
            ConnectionRule::new(Scheduler, Analytics).with_max_connections(1),
            ConnectionRule::new(Source, KindPattern::Any).with_validator(Validator::Deny {
                message: "Campaign nodes can only connect to A/B test or content nodes"
                    .to_string(),
            }),
            ConnectionRule::new(Processor, KindPattern::Any).with_validator(
                Validator::TargetKindIn {
                    kinds: vec![Scheduler],
                    message: "Content nodes can only connect to scheduling nodes".to_string(),
                },
            ),
            ConnectionRule::new(KindPattern::Any, Splitter).with_validator(
                Validator::SourceKindIn {
                    kinds: vec![Source],
                    message: "Only a campaign node can feed an A/B test node".to_string(),
                },
            ),
            ConnectionRule::catch_all(),
        ];

        Self {
            rules,
            limits: BTreeMap::from([
                (Source, NodeConnectionLimit::new(0, 1)),
                (Splitter, NodeConnectionLimit::new(1, 4).with_per_handle(1)),
                (Processor, NodeConnectionLimit::new(1, 1)),
                (Scheduler, NodeConnectionLimit::new(4, 1)),
                (Analytics, NodeConnectionLimit::new(1, 0)),
            ]),
            requirements: BTreeMap::from([
                (Source, NodeRequirement::new(0, 1)),
                (Splitter, NodeRequirement::new(1, 0)),
                (Processor, NodeRequirement::new(1, 1)),
                (Scheduler, NodeRequirement::new(1, 0)),
                (Analytics, NodeRequirement::new(1, 0)),
            ]),
            output_handle_suffix: default_output_suffix(),
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::campaign_default()
    }
}
