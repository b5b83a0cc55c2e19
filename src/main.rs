use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use prlint::cli::Cli;
use prlint::config::Config;
use prlint::github::HttpChecksClient;
use prlint::lint::EslintRunner;
use prlint::orchestrator::{Orchestrator, RunOutcome};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let repo = format!("{}/{}", config.pull_request.owner, config.pull_request.repo);
    info!(pr = config.pull_request.number, repo = %repo, "prlint starting");

    let client = Box::new(HttpChecksClient::new(config.token.clone()));
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let runner = EslintRunner::new(
        config.lint_command.clone(),
        config.lint_args.clone(),
        working_dir,
        config.timeout_seconds.map(Duration::from_secs),
    );

    let orchestrator = Orchestrator::new(config, client, runner);
    match orchestrator.run().await {
        Ok(RunOutcome::Clean) | Ok(RunOutcome::NothingToLint) => {}
        Ok(RunOutcome::LintFailure) => {
            eprintln!("lint found errors");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
