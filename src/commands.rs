//! CLI command definitions
//!
//! Defines the clap commands for the smoke runner.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the smoke suite against the configured application
    Run {
        /// Scenario root (default: from config or SMOKE_SCENARIO_DIR)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Error log file (default: from config or SMOKE_ERROR_LOG)
        #[arg(long)]
        error_log: Option<PathBuf>,

        /// Only run scenarios whose path contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Also write the run's log output to this file
        #[arg(long)]
        run_log: Option<PathBuf>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print the run plan in execution order without starting a browser
    List {
        /// Scenario root (default: from config or SMOKE_SCENARIO_DIR)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Parse and validate every scenario document without starting a browser
    Check {
        /// Scenario root (default: from config or SMOKE_SCENARIO_DIR)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show recorded scenario failures
    Logs {
        /// Number of records to show (default: 20)
        #[arg(long, short = 'n', default_value = "20")]
        lines: usize,

        /// Print records as JSON
        #[arg(long)]
        json: bool,

        /// Error log file (default: from config or SMOKE_ERROR_LOG)
        #[arg(long)]
        error_log: Option<PathBuf>,
    },
}
