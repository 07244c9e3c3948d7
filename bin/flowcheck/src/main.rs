use campaign_flow_cli::{Cli, config::CliConfig, error::CliError, run};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Accepted connection or ready graph.
const EXIT_PASS: u8 = 0;
/// Rejected connection or graph not ready.
const EXIT_FAIL: u8 = 1;
/// Bad input or configuration.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let err = CliError::Config {
                details: e.to_string(),
            };
            eprintln!("flowcheck: {err}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let outcome = match run(&cli, &config) {
        Ok(outcome) => outcome,
        Err(report) => {
            eprintln!("flowcheck: {report}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match serde_json::to_string_pretty(&outcome.output) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("flowcheck: output error: {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(if outcome.success { EXIT_PASS } else { EXIT_FAIL })
}
