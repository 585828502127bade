//! Smoke runner - declarative browser smoke tests
//!
//! Runs YAML scenario documents against a web application through a
//! WebDriver session, ordered and gated by scenario priority.

use clap::Parser;
use smoke::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "smoke", about = "Priority-gated browser smoke test runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
