//! flowcheck: check campaign graphs against connection rules from the
//! command line.
//!
//! Graph snapshots are read in the editor's JSON format. Results go to
//! stdout as JSON; logs go to stderr.

pub mod config;
pub mod error;

use campaign_flow_core::Result;
use campaign_flow_workflow::{
    ConnectionGate, ConnectionVerdict, Edge, EditorGraph, Node, NotificationThrottle,
    ReadinessReport, RuleTable,
};
use clap::{Parser, Subcommand};
use crate::config::CliConfig;
use crate::error::CliError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Check campaign workflow graphs against connection rules
#[derive(Debug, Parser)]
#[command(name = "flowcheck", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Rule table JSON, overriding the configured one
    #[arg(long, global = true)]
    pub rule_table: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether a connection may be added to a graph
    Connect {
        /// Editor graph snapshot
        graph: PathBuf,
        /// Source node id
        #[arg(long)]
        source: String,
        /// Target node id
        #[arg(long)]
        target: String,
        /// Output handle on the source node
        #[arg(long)]
        source_handle: Option<String>,
        /// Input handle on the target node
        #[arg(long)]
        target_handle: Option<String>,
    },
    /// Report per-node readiness for a graph
    Readiness {
        /// Editor graph snapshot
        graph: PathBuf,
    },
    /// Print the active rule table
    Rules,
}

/// JSON to print and whether the check passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: serde_json::Value,
    pub success: bool,
}

#[derive(Serialize)]
struct ConnectOutput<'a> {
    edge: &'a Edge,
    result: &'a ConnectionVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Runs one command.
///
/// # Errors
///
/// Returns an error if an input cannot be read or parsed.
pub fn run(cli: &Cli, config: &CliConfig) -> Result<Outcome, CliError> {
    let rules_path = cli.rule_table.as_deref().or(config.rules_path.as_deref());
    let table = load_rules(rules_path)?;

    match &cli.command {
        Command::Connect {
            graph,
            source,
            target,
            source_handle,
            target_handle,
        } => {
            let (nodes, edges) = load_graph(graph)?;
            let gate = ConnectionGate::new(table)
                .with_throttle(NotificationThrottle::new(config.notifications.clone()));
            let mut proposed = Edge::proposed(source.as_str(), target.as_str());
            proposed.source_handle = source_handle.clone();
            proposed.target_handle = target_handle.clone();

            let verdict = gate.propose(&proposed, &nodes, &edges);
            let output = ConnectOutput {
                edge: &proposed,
                result: &verdict,
                message: verdict.message(),
            };
            Ok(Outcome {
                output: to_json(&output)?,
                success: verdict.is_accepted(),
            })
        }
        Command::Readiness { graph } => {
            let (nodes, edges) = load_graph(graph)?;
            let report: ReadinessReport =
                ConnectionGate::new(table).evaluate_graph(&nodes, &edges);
            Ok(Outcome {
                output: to_json(&report)?,
                success: report.all_ready,
            })
        }
        Command::Rules => Ok(Outcome {
            output: to_json(&table)?,
            success: true,
        }),
    }
}

/// Loads a rule table, or the built-in campaign table when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the table is invalid.
pub fn load_rules(path: Option<&Path>) -> Result<RuleTable, CliError> {
    let Some(path) = path else {
        return Ok(RuleTable::campaign_default());
    };
    let json = read(path)?;
    let table = RuleTable::from_json(&json).map_err(|e| CliError::Rules {
        details: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), rules = table.rules().len(), "loaded rule table");
    Ok(table)
}

/// Loads and normalizes an editor graph snapshot.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_graph(path: &Path) -> Result<(Vec<Node>, Vec<Edge>), CliError> {
    let json = read(path)?;
    let graph = EditorGraph::from_json(&json).map_err(|e| CliError::Graph {
        details: e.to_string(),
    })?;
    Ok(graph.normalize())
}

fn read(path: &Path) -> Result<String, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::ReadFile {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;
    Ok(contents)
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, CliError> {
    let json = serde_json::to_value(value).map_err(|e| CliError::Output {
        details: e.to_string(),
    })?;
    Ok(json)
}
