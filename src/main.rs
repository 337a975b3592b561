// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! arguelauncher
//!
//! Runs a case-based reasoning experiment: loads cases and requests, calls
//! the retrieval and adaptation services, evaluates the answers and prints
//! the aggregated metrics as JSON.

use arguelauncher::{
    cli::Cli,
    config::Config,
    error::AppError,
    services::Launcher,
    time_utils::run_directory,
};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_DIRECTIVES: &str = "arguelauncher=debug,info";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "Run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides)?;

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let output = cli
        .output_dir
        .unwrap_or_else(|| run_directory(&config.output_root, &chrono::Local::now()));
    tracing::info!(
        output = %output.display(),
        cases = %config.path.cases.display(),
        requests = %config.path.requests.display(),
        retrieval = config.retrieval.is_some(),
        adaptation = config.adaptation.is_some(),
        "Starting run"
    );

    let launcher = Launcher::new(config)?;
    let report = launcher.run(&output).await?;

    let json = serde_json::to_string_pretty(&report.aggregated)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to render results: {}", e)))?;
    println!("{}", json);

    Ok(())
}

/// Log to stderr so stdout only carries the results.
/// JSON lines for log collectors, human-readable otherwise.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let format = tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .with_writer(std::io::stderr);
        registry.with(format).init();
    } else {
        let format = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        registry.with(format).init();
    }
}
