//! Hookgate CLI
//!
//! A small command-line surface over `hookgate-core` for hook authors:
//!
//! - `hookgate dispatch` runs the configured hooks for one event and prints the
//!   aggregated decision as JSON on stdout. The exit status is 2 when the decision
//!   blocks, so the binary can itself be chained as a hook.
//! - `hookgate list` shows the merged hook table.
//! - `hookgate check` validates every settings source.
//!
//! Logs go to stderr and are controlled by `RUST_LOG` (or `--verbose`).

mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let store = commands::config_store(cli.project_dir.as_deref())?;
    match cli.command {
        Commands::Dispatch {
            event,
            subject,
            payload,
            session_id,
            cwd,
            detailed,
        } => {
            let request = commands::dispatch::DispatchRequest {
                event,
                subject,
                payload,
                session_id,
                cwd,
                detailed,
            };
            commands::dispatch::execute(&store, request).await
        }
        Commands::List { event, json } => {
            commands::list::execute(&store, event, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => commands::check::execute(&store),
    }
}
