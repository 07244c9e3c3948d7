//! The editor-facing entry point.
//!
//! [`ConnectionGate`] bundles a rule table with the notification boundary:
//! the editor asks it whether a connection may be drawn, and rejections are
//! reported through a [`Notifier`] subject to the throttle.

use crate::edge::Edge;
use crate::matcher;
use crate::node::Node;
use crate::notify::{NotificationThrottle, Notifier, TracingNotifier};
use crate::readiness::{self, ReadinessReport};
use crate::rules::RuleTable;
use crate::verdict::ConnectionVerdict;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Rule table plus rejection reporting.
#[derive(Debug, Clone)]
pub struct ConnectionGate<N = TracingNotifier> {
    table: Arc<RuleTable>,
    throttle: NotificationThrottle,
    notifier: N,
}

impl ConnectionGate {
    /// Creates a gate that logs rejections through `tracing`.
    #[must_use]
    pub fn new(table: RuleTable) -> Self {
        Self {
            table: Arc::new(table),
            throttle: NotificationThrottle::default(),
            notifier: TracingNotifier,
        }
    }
}

impl Default for ConnectionGate {
    fn default() -> Self {
        Self::new(RuleTable::campaign_default())
    }
}

impl<N: Notifier> ConnectionGate<N> {
    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier<M: Notifier>(self, notifier: M) -> ConnectionGate<M> {
        ConnectionGate {
            table: self.table,
            throttle: self.throttle,
            notifier,
        }
    }

    /// Replaces the throttle.
    #[must_use]
    pub fn with_throttle(mut self, throttle: NotificationThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Decides a proposed connection without notifying anyone.
    ///
    /// `existing` must not contain `proposed` itself.
    #[must_use]
    #[instrument(skip_all, fields(source = %proposed.source, target = %proposed.target))]
    pub fn check_connection(
        &self,
        proposed: &Edge,
        nodes: &[Node],
        existing: &[Edge],
    ) -> ConnectionVerdict {
        let verdict = matcher::validate_connection(&self.table, proposed, nodes, existing);
        match verdict.rejection() {
            None => debug!("connection accepted"),
            Some(rejection) => {
                debug!(reason = %rejection.code(), %rejection, "connection rejected");
            }
        }
        verdict
    }

    /// Decides a proposed connection and reports a rejection to the notifier
    /// unless one of the same reason was reported recently.
    pub fn propose(&self, proposed: &Edge, nodes: &[Node], existing: &[Edge]) -> ConnectionVerdict {
        let verdict = self.check_connection(proposed, nodes, existing);
        if let Some(rejection) = verdict.rejection() {
            if self.throttle.should_notify(rejection.code()) {
                self.notifier.notify(rejection);
            } else {
                debug!(reason = %rejection.code(), "rejection notice suppressed");
            }
        }
        verdict
    }

    /// Like [`propose`](Self::propose), returning true if the connection may
    /// be made.
    pub fn validate_connection(&self, proposed: &Edge, nodes: &[Node], existing: &[Edge]) -> bool {
        self.propose(proposed, nodes, existing).is_accepted()
    }

    /// Computes readiness for a whole snapshot.
    #[must_use]
    #[instrument(skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
    pub fn evaluate_graph(&self, nodes: &[Node], edges: &[Edge]) -> ReadinessReport {
        let report = readiness::evaluate_graph(&self.table, nodes, edges);
        let (ready, pending, error) = report.counts();
        debug!(
            all_ready = report.all_ready,
            ready, pending, error, "graph evaluated"
        );
        report
    }

    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.table
    }

    #[must_use]
    pub fn throttle(&self) -> &NotificationThrottle {
        &self.throttle
    }
}
