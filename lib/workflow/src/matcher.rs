//! Rule matching for proposed connections.
//!
//! Evaluation order:
//!
//! 1. Both endpoints must exist in the snapshot.
//! 2. Per-kind limits ([`crate::limits`]).
//! 3. Applicable rules are collected and ordered by specificity
//!    ([`matching_rules`]).
//! 4. The most specific non-universal rule decides: its cap, then its
//!    validator, and a rule with neither simply permits the connection.
//! 5. With no such rule the universal `* -> *` rule decides, and without a
//!    validator it denies.
//!
//! The result is always an explicit verdict; nothing falls through.

use crate::edge::Edge;
use crate::limits;
use crate::node::{Node, NodeKind, find_node};
use crate::rules::{ConnectionRule, RuleTable};
use crate::verdict::{ConnectionVerdict, LimitScope, Rejection};

/// Returns the rules applicable to an edge between the given kinds, most
/// specific first. Rules of equal specificity keep their table order.
#[must_use]
pub fn matching_rules<'t>(
    table: &'t RuleTable,
    source_kind: NodeKind,
    target_kind: NodeKind,
    proposed: &Edge,
) -> Vec<&'t ConnectionRule> {
    let mut matching: Vec<_> = table
        .rules()
        .iter()
        .filter(|rule| {
            rule.source_kind.matches(source_kind)
                && rule.target_kind.matches(target_kind)
                && rule.handles_match(
                    proposed.source_handle.as_deref(),
                    proposed.target_handle.as_deref(),
                )
        })
        .collect();
    // Stable: ties stay in table order.
    matching.sort_by_key(|rule| std::cmp::Reverse(rule.specificity()));
    matching
}

/// Decides whether a proposed edge may be added to the snapshot.
///
/// `existing` must not contain `proposed` itself.
#[must_use]
pub fn validate_connection(
    table: &RuleTable,
    proposed: &Edge,
    nodes: &[Node],
    existing: &[Edge],
) -> ConnectionVerdict {
    match evaluate(table, proposed, nodes, existing.iter()) {
        Ok(()) => ConnectionVerdict::Accepted,
        Err(rejection) => ConnectionVerdict::Rejected(rejection),
    }
}

pub(crate) fn evaluate<'a, I>(
    table: &RuleTable,
    proposed: &Edge,
    nodes: &[Node],
    existing: I,
) -> Result<(), Rejection>
where
    I: Iterator<Item = &'a Edge> + Clone,
{
    let source = find_node(nodes, &proposed.source).ok_or_else(|| Rejection::NodeNotFound {
        node_id: proposed.source.clone(),
    })?;
    let target = find_node(nodes, &proposed.target).ok_or_else(|| Rejection::NodeNotFound {
        node_id: proposed.target.clone(),
    })?;

    limits::check_kinds(table, proposed, source.kind, target.kind, existing.clone())?;

    let rules = matching_rules(table, source.kind, target.kind, proposed);

    if let Some(rule) = rules.iter().find(|rule| !rule.is_universal()) {
        return apply_rule(rule, proposed, source, target, existing);
    }

    // Only universal rules remain. The first one arbitrates and denies
    // unless its validator explicitly accepts.
    let Some(universal) = rules.first() else {
        return Err(Rejection::not_allowed());
    };
    apply_rule(universal, proposed, source, target, existing)?;
    if universal.validator.is_some() {
        Ok(())
    } else {
        Err(Rejection::not_allowed())
    }
}

/// Applies one rule's cap and validator.
///
/// A validator refusal on a universal rule is reported as default-deny
/// rather than as a rule violation.
fn apply_rule<'a, I>(
    rule: &ConnectionRule,
    proposed: &Edge,
    source: &Node,
    target: &Node,
    existing: I,
) -> Result<(), Rejection>
where
    I: Iterator<Item = &'a Edge>,
{
    if let Some(max) = rule.max_connections {
        let current = existing
            .filter(|e| {
                e.source == proposed.source
                    && rule.handles_match(e.source_handle.as_deref(), e.target_handle.as_deref())
            })
            .count();
        if current >= max {
            return Err(Rejection::LimitExceeded {
                scope: LimitScope::Rule { rule: rule.label() },
                node_id: proposed.source.clone(),
                max,
                current,
            });
        }
    }

    if let Some(validator) = &rule.validator {
        validator
            .check(
                source,
                proposed.source_handle.as_deref(),
                target,
                proposed.target_handle.as_deref(),
            )
            .map_err(|message| {
                if rule.is_universal() {
                    Rejection::NoMatchingRule { message }
                } else {
                    Rejection::RuleViolation { message }
                }
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{KindPattern, NodeConnectionLimit, Validator};
    use crate::verdict::{NOT_ALLOWED_MESSAGE, ReasonCode};

    fn campaign_nodes() -> Vec<Node> {
        vec![
            Node::new("campaign", NodeKind::Source),
            Node::new("split", NodeKind::Splitter).with_declared_outputs(2),
            Node::new("content-a", NodeKind::Processor),
            Node::new("content-b", NodeKind::Processor),
            Node::new("schedule", NodeKind::Scheduler),
            Node::new("stats", NodeKind::Analytics),
            Node::new("webhook", NodeKind::Unknown),
        ]
    }

    fn code(verdict: &ConnectionVerdict) -> Option<ReasonCode> {
        verdict.rejection().map(Rejection::code)
    }

    fn single_cap_table() -> RuleTable {
        RuleTable::new(vec![
            ConnectionRule::new(NodeKind::Source, NodeKind::Splitter).with_max_connections(1),
            ConnectionRule::catch_all(),
        ])
        .expect("valid table")
    }

    #[test]
    fn second_capped_connection_is_rejected() {
        let table = single_cap_table();
        let nodes = vec![
            Node::new("campaign", NodeKind::Source),
            Node::new("split", NodeKind::Splitter),
        ];
        let existing = vec![Edge::new("e1", "campaign", "split")];
        let proposed = Edge::new("e2", "campaign", "split");

        let verdict = validate_connection(&table, &proposed, &nodes, &existing);
        assert_eq!(code(&verdict), Some(ReasonCode::LimitExceeded));
        assert!(verdict.message().expect("message").contains("maximum 1"));
    }

    #[test]
    fn cap_is_monotonic_and_recovers_after_removal() {
        let table = RuleTable::new(vec![
            ConnectionRule::new(NodeKind::Splitter, NodeKind::Processor).with_max_connections(2),
            ConnectionRule::catch_all(),
        ])
        .expect("valid table");
        let nodes = campaign_nodes();
        let mut existing = vec![
            Edge::new("e1", "split", "content-a"),
            Edge::new("e2", "split", "content-b"),
        ];

        for _ in 0..3 {
            let proposed = Edge::proposed("split", "content-a");
            assert!(!validate_connection(&table, &proposed, &nodes, &existing).is_accepted());
        }

        existing.pop();
        let proposed = Edge::proposed("split", "content-b");
        assert!(validate_connection(&table, &proposed, &nodes, &existing).is_accepted());
    }

    #[test]
    fn content_only_connects_to_scheduling() {
        let table = RuleTable::campaign_default();
        let nodes = campaign_nodes();
        let proposed = Edge::new("e1", "content-a", "stats");

        let verdict = validate_connection(&table, &proposed, &nodes, &[]);
        assert_eq!(code(&verdict), Some(ReasonCode::RuleViolation));
        assert_eq!(
            verdict.message().as_deref(),
            Some("Content nodes can only connect to scheduling nodes")
        );

        let proposed = Edge::new("e2", "content-a", "schedule");
        assert!(validate_connection(&table, &proposed, &nodes, &[]).is_accepted());
    }

    #[test]
    fn missing_node_is_rejected_without_panicking() {
        let table = RuleTable::campaign_default();
        let proposed = Edge::new("e1", "nowhere", "split");

        let verdict = validate_connection(&table, &proposed, &campaign_nodes(), &[]);
        assert_eq!(code(&verdict), Some(ReasonCode::NodeNotFound));
        assert!(verdict.message().expect("message").contains("node not found"));

        let proposed = Edge::new("e2", "campaign", "nowhere");
        let verdict = validate_connection(&table, &proposed, &campaign_nodes(), &[]);
        assert!(verdict.message().expect("message").contains("nowhere"));
    }

    #[test]
    fn limits_run_before_rule_caps() {
        let table = RuleTable::new(vec![
            ConnectionRule::new(NodeKind::Splitter, NodeKind::Processor).with_max_connections(10),
            ConnectionRule::catch_all(),
        ])
        .expect("valid table")
        .with_limit(
            NodeKind::Splitter,
            NodeConnectionLimit::new(1, 4).with_per_handle(2),
        );
        let mut nodes = campaign_nodes();
        nodes.extend(["p1", "p2", "p3", "p4", "p5"].map(|id| Node::new(id, NodeKind::Processor)));
        let existing = vec![
            Edge::new("e1", "split", "p1").on_source_handle("port-1-output"),
            Edge::new("e2", "split", "p2").on_source_handle("port-1-output"),
            Edge::new("e3", "split", "p3").on_source_handle("port-2-output"),
            Edge::new("e4", "split", "p4").on_source_handle("port-2-output"),
        ];
        let proposed = Edge::new("e5", "split", "p5").on_source_handle("port-2-output");

        let verdict = validate_connection(&table, &proposed, &nodes, &existing);
        match verdict.rejection() {
            Some(Rejection::LimitExceeded { scope, .. }) => {
                assert_ne!(
                    *scope,
                    LimitScope::Rule {
                        rule: "splitter -> processor".to_string()
                    }
                );
            }
            other => panic!("expected a limit rejection, got {other:?}"),
        }
    }

    #[test]
    fn unlisted_pairs_are_denied_by_default() {
        let table = RuleTable::campaign_default();
        let nodes = campaign_nodes();
        for (source, target) in [
            ("schedule", "content-a"),
            ("webhook", "stats"),
            ("stats", "webhook"),
        ] {
            let verdict =
                validate_connection(&table, &Edge::proposed(source, target), &nodes, &[]);
            assert!(!verdict.is_accepted(), "{source} -> {target} should be denied");
        }

        let verdict =
            validate_connection(&table, &Edge::proposed("webhook", "schedule"), &nodes, &[]);
        assert_eq!(code(&verdict), Some(ReasonCode::NoMatchingRule));
        assert_eq!(verdict.message().as_deref(), Some(NOT_ALLOWED_MESSAGE));
    }

    #[test]
    fn concrete_rule_outranks_half_wildcard_regardless_of_order() {
        let deny = Validator::Deny {
            message: "half wildcard".to_string(),
        };
        let rules_a = vec![
            ConnectionRule::new(NodeKind::Source, KindPattern::Any).with_validator(deny.clone()),
            ConnectionRule::new(NodeKind::Source, NodeKind::Processor)
                .with_validator(Validator::Allow),
            ConnectionRule::catch_all(),
        ];
        let mut rules_b = rules_a.clone();
        rules_b.swap(0, 1);

        let nodes = campaign_nodes();
        let proposed = Edge::new("e1", "campaign", "content-a");
        for rules in [rules_a, rules_b] {
            let table = RuleTable::new(rules).expect("valid table");
            assert!(validate_connection(&table, &proposed, &nodes, &[]).is_accepted());
        }
    }

    #[test]
    fn matching_rules_orders_by_specificity_then_table_order() {
        let table = RuleTable::new(vec![
            ConnectionRule::new(KindPattern::Any, NodeKind::Scheduler),
            ConnectionRule::catch_all(),
            ConnectionRule::new(NodeKind::Processor, KindPattern::Any),
            ConnectionRule::new(NodeKind::Processor, NodeKind::Scheduler),
            ConnectionRule::new(NodeKind::Source, NodeKind::Splitter),
        ])
        .expect("valid table");
        let proposed = Edge::new("e1", "content-a", "schedule");

        let labels: Vec<_> =
            matching_rules(&table, NodeKind::Processor, NodeKind::Scheduler, &proposed)
                .iter()
                .map(|r| r.label())
                .collect();
        assert_eq!(
            labels,
            vec![
                "processor -> scheduler",
                "* -> scheduler",
                "processor -> *",
                "* -> *"
            ]
        );
    }

    #[test]
    fn handle_filtered_rules_only_apply_to_their_handle() {
        let table = RuleTable::new(vec![
            ConnectionRule::new(NodeKind::Splitter, NodeKind::Processor)
                .on_source_handle("port-1-output")
                .with_validator(Validator::Allow),
            ConnectionRule::catch_all(),
        ])
        .expect("valid table");
        let nodes = campaign_nodes();

        let on_handle = Edge::proposed("split", "content-a").on_source_handle("port-1-output");
        assert!(validate_connection(&table, &on_handle, &nodes, &[]).is_accepted());

        let off_handle = Edge::proposed("split", "content-a").on_source_handle("port-2-output");
        assert!(!validate_connection(&table, &off_handle, &nodes, &[]).is_accepted());
    }

    #[test]
    fn rule_without_cap_or_validator_permits() {
        // A narrowing rule with no predicate grants the connection.
        let table = RuleTable::new(vec![
            ConnectionRule::new(NodeKind::Scheduler, NodeKind::Analytics),
            ConnectionRule::catch_all(),
        ])
        .expect("valid table");
        let proposed = Edge::new("e1", "schedule", "stats");
        assert!(validate_connection(&table, &proposed, &campaign_nodes(), &[]).is_accepted());
    }

    #[test]
    fn permissive_catch_all_accepts() {
        let table = RuleTable::new(vec![
            ConnectionRule::new(KindPattern::Any, KindPattern::Any)
                .with_validator(Validator::Allow),
        ])
        .expect("valid table");
        let proposed = Edge::new("e1", "webhook", "stats");
        assert!(validate_connection(&table, &proposed, &campaign_nodes(), &[]).is_accepted());
    }

    #[test]
    fn catch_all_without_validator_denies() {
        let table = RuleTable::new(vec![ConnectionRule::new(KindPattern::Any, KindPattern::Any)])
            .expect("valid table");
        let proposed = Edge::new("e1", "webhook", "stats");
        let verdict = validate_connection(&table, &proposed, &campaign_nodes(), &[]);
        assert_eq!(code(&verdict), Some(ReasonCode::NoMatchingRule));
    }

    #[test]
    fn campaign_flow_happy_path() {
        let table = RuleTable::campaign_default();
        let nodes = campaign_nodes();
        let mut existing = Vec::new();

        for edge in [
            Edge::new("e1", "campaign", "split"),
            Edge::new("e2", "split", "content-a").on_source_handle("port-1-output"),
            Edge::new("e3", "split", "content-b").on_source_handle("port-2-output"),
            Edge::new("e4", "content-a", "schedule"),
            Edge::new("e5", "content-b", "schedule"),
            Edge::new("e6", "schedule", "stats"),
        ] {
            let verdict = validate_connection(&table, &edge, &nodes, &existing);
            assert!(verdict.is_accepted(), "{} rejected: {verdict:?}", edge.id);
            existing.push(edge);
        }
    }

    #[test]
    fn only_campaigns_feed_ab_tests() {
        let table = RuleTable::campaign_default();
        let verdict = validate_connection(
            &table,
            &Edge::proposed("schedule", "split"),
            &campaign_nodes(),
            &[],
        );
        assert_eq!(
            verdict.message().as_deref(),
            Some("Only a campaign node can feed an A/B test node")
        );
    }

    #[test]
    fn ab_test_variants_need_output_handle() {
        let table = RuleTable::campaign_default();
        let verdict = validate_connection(
            &table,
            &Edge::proposed("split", "content-a"),
            &campaign_nodes(),
            &[],
        );
        assert_eq!(code(&verdict), Some(ReasonCode::RuleViolation));
    }

    #[test]
    fn verdicts_are_idempotent() {
        let table = RuleTable::campaign_default();
        let nodes = campaign_nodes();
        let existing = vec![Edge::new("e1", "campaign", "split")];
        let proposed = Edge::new("e2", "campaign", "content-a");
        let first = validate_connection(&table, &proposed, &nodes, &existing);
        let second = validate_connection(&table, &proposed, &nodes, &existing);
        assert_eq!(first, second);
    }
}
