//! Error types for the workflow crate.
//!
//! Only configuration and ingestion problems are errors. A rejected
//! connection or an unready graph is an ordinary value, see
//! [`crate::verdict`] and [`crate::readiness`].

use std::fmt;

/// Problems with a rule table, caught when the table is built or loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTableError {
    /// No `* -> *` rule without handle filters, so some connections would
    /// fall through every rule.
    MissingCatchAll,
    /// A rule repeats the match pattern of an earlier rule and can never be
    /// reached.
    UnreachableRule { index: usize, shadowed_by: usize },
    /// A limit or requirement is keyed by a name that is not a node kind.
    UnknownKind { name: String },
    /// The table could not be parsed.
    InvalidJson { details: String },
}

impl fmt::Display for RuleTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCatchAll => {
                write!(f, "rule table has no catch-all '* -> *' rule")
            }
            Self::UnreachableRule { index, shadowed_by } => {
                write!(
                    f,
                    "rule {index} is unreachable: rule {shadowed_by} has the same match pattern"
                )
            }
            Self::UnknownKind { name } => {
                write!(f, "rule table names unknown node kind '{name}'")
            }
            Self::InvalidJson { details } => {
                write!(f, "invalid rule table: {details}")
            }
        }
    }
}

impl std::error::Error for RuleTableError {}

/// Problems reading an editor graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The snapshot is not valid JSON for the editor graph format.
    InvalidJson { details: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { details } => {
                write!(f, "invalid graph snapshot: {details}")
            }
        }
    }
}

impl std::error::Error for IngestError {}
