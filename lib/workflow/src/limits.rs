//! Per-kind connection caps.
//!
//! Three independent checks run in a fixed order and stop at the first
//! failure: the source's outgoing cap, the target's incoming cap, then the
//! cap on the source handle. The order is observable through the messages.

use crate::edge::Edge;
use crate::node::{Node, NodeKind, find_node};
use crate::rules::RuleTable;
use crate::verdict::{LimitScope, Rejection};
use campaign_flow_core::NodeId;

/// Checks a proposed edge against the table's per-kind limits.
///
/// Endpoints missing from `nodes` are treated as [`NodeKind::Unknown`],
/// which normally carries no limits.
///
/// # Errors
///
/// Returns [`Rejection::LimitExceeded`] for the first cap that is reached.
pub fn check_limits(
    table: &RuleTable,
    proposed: &Edge,
    nodes: &[Node],
    existing: &[Edge],
) -> Result<(), Rejection> {
    let kind_of = |id: &NodeId| find_node(nodes, id).map_or(NodeKind::Unknown, |n| n.kind);
    check_kinds(
        table,
        proposed,
        kind_of(&proposed.source),
        kind_of(&proposed.target),
        existing.iter(),
    )
}

pub(crate) fn check_kinds<'a, I>(
    table: &RuleTable,
    proposed: &Edge,
    source_kind: NodeKind,
    target_kind: NodeKind,
    existing: I,
) -> Result<(), Rejection>
where
    I: Iterator<Item = &'a Edge> + Clone,
{
    let source_limit = table.limit(source_kind);

    if let Some(max) = source_limit.and_then(|l| l.max_outgoing) {
        let current = existing
            .clone()
            .filter(|e| e.source == proposed.source)
            .count();
        if current >= max {
            return Err(Rejection::LimitExceeded {
                scope: LimitScope::Outgoing,
                node_id: proposed.source.clone(),
                max,
                current,
            });
        }
    }

    if let Some(max) = table.limit(target_kind).and_then(|l| l.max_incoming) {
        let current = existing
            .clone()
            .filter(|e| e.target == proposed.target)
            .count();
        if current >= max {
            return Err(Rejection::LimitExceeded {
                scope: LimitScope::Incoming,
                node_id: proposed.target.clone(),
                max,
                current,
            });
        }
    }

    if let (Some(handle), Some(max)) = (
        proposed.source_handle.as_deref(),
        source_limit.and_then(|l| l.max_connections_per_handle),
    ) {
        let current = existing.filter(|e| e.leaves(&proposed.source, handle)).count();
        if current >= max {
            return Err(Rejection::LimitExceeded {
                scope: LimitScope::Handle {
                    handle: handle.to_string(),
                },
                node_id: proposed.source.clone(),
                max,
                current,
            });
        }
    }

    Ok(())
}
