//! flowcheck configuration.
//!
//! Loaded via the `config` crate from an optional file plus environment
//! variables prefixed with `FLOWCHECK__`, for example
//! `FLOWCHECK__NOTIFICATIONS__MIN_INTERVAL_MS=500`.

use campaign_flow_workflow::ThrottleConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for one flowcheck invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Rule table to load instead of the built-in campaign table.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Rejection notification throttle.
    #[serde(default)]
    pub notifications: ThrottleConfig,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            notifications: ThrottleConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from `file`, if given, overridden by environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                config::Environment::with_prefix("FLOWCHECK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert!(config.rules_path.is_none());
        assert_eq!(config.notifications.min_interval_ms, 2000);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        writeln!(
            file,
            "rules_path = \"rules.json\"\nlog_filter = \"debug\"\n\n[notifications]\nmin_interval_ms = 500"
        )
        .expect("write config");

        let config = CliConfig::load(Some(file.path())).expect("load config");
        assert_eq!(config.rules_path, Some(PathBuf::from("rules.json")));
        assert_eq!(config.notifications.min_interval_ms, 500);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("create temp file");
        write!(file, r#"{{"notifications": {{}}}}"#).expect("write config");

        let config = CliConfig::load(Some(file.path())).expect("load config");
        assert_eq!(config.notifications.min_interval_ms, 2000);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(CliConfig::load(Some(&missing)).is_err());
    }
}
