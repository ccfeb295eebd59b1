//! CLI argument definitions using clap
//!
//! - hookgate dispatch --event PreAction --subject Write --payload input.json
//! - hookgate list                  # Show the merged hook table
//! - hookgate check                 # Validate every settings source

use clap::{Parser, Subcommand};
use hookgate_core::EventKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hookgate")]
#[command(about = "Hookgate - run agent lifecycle hooks and resolve their verdicts")]
#[command(
    long_about = r#"Hookgate - run agent lifecycle hooks and resolve their verdicts

USAGE:
  hookgate dispatch --event PreAction --subject Bash --payload -
  hookgate list                  # Show configured hooks
  hookgate check                 # Validate settings files

Settings are read from ~/.config/hookgate/settings.json, then
.hookgate/settings.json and .hookgate/settings.local.json in the project."#
)]
#[command(version)]
pub struct Cli {
    /// Project directory used to discover settings (defaults to the current directory)
    #[arg(long, global = true, env = "HOOKGATE_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Enable verbose logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch one event and print the aggregated decision as JSON
    #[command(verbatim_doc_comment)]
    Dispatch {
        /// Event kind (PreAction, PostAction, PostActionFailure, PromptSubmit)
        #[arg(long, short, value_parser = parse_event)]
        event: EventKind,

        /// Subject matched against hook matchers, usually the tool name
        #[arg(long, short)]
        subject: Option<String>,

        /// JSON object with the event fields; "-" reads stdin
        #[arg(long, short)]
        payload: Option<String>,

        /// Session identifier passed to hooks (random if omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Working directory reported to hooks
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Print every hook run, not just the final decision
        #[arg(long)]
        detailed: bool,
    },

    /// List the merged hook table
    #[command(verbatim_doc_comment)]
    List {
        /// Only show hooks for this event
        #[arg(long, short, value_parser = parse_event)]
        event: Option<EventKind>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate every settings source and report problems
    #[command(verbatim_doc_comment)]
    Check,
}

fn parse_event(value: &str) -> Result<EventKind, String> {
    value.parse()
}
