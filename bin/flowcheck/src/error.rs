//! Operational errors for flowcheck.
//!
//! A rejected connection or an unready graph is a normal outcome and never
//! one of these.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// An input file could not be read.
    ReadFile { path: PathBuf, details: String },
    /// The rule table is malformed or invalid.
    Rules { details: String },
    /// The graph snapshot is malformed.
    Graph { details: String },
    /// The result could not be written.
    Output { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "configuration error: {details}"),
            Self::ReadFile { path, details } => {
                write!(f, "cannot read {}: {details}", path.display())
            }
            Self::Rules { details } => write!(f, "rule table error: {details}"),
            Self::Graph { details } => write!(f, "graph error: {details}"),
            Self::Output { details } => write!(f, "output error: {details}"),
        }
    }
}

impl std::error::Error for CliError {}
