//! CLI command handling
//!
//! Resolves configuration for each command and formats output.

use std::path::Path;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, Error, Result};
use crate::dsl::Registries;
use crate::runner::{self, ErrorLog, RunRecord, SessionManager, Suite};
use crate::scenario::{discover, Priority, ScenarioDocument};
use crate::webdriver::WebDriverClient;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            root,
            error_log,
            filter,
            run_log,
            verbose,
        } => {
            let _guard = logging::init_run(verbose, run_log.as_deref());
            let config = Config::load()?;
            let root = root.unwrap_or_else(|| config.scenarios.root.clone());
            let log = ErrorLog::new(error_log.unwrap_or_else(|| config.log.error_log.clone()));
            run(&config, &root, log, filter.as_deref()).await
        }

        Commands::List { root } => {
            logging::init_cli(false);
            let config = Config::load()?;
            let root = root.unwrap_or_else(|| config.scenarios.root.clone());
            let plan = runner::plan(&root, &config.scenarios.extensions, None)?;

            if plan.is_empty() {
                println!("No scenarios found in {}", root.display());
                return Ok(());
            }
            println!("Run order ({} scenarios):", plan.len());
            for (i, scenario) in plan.iter().enumerate() {
                println!(
                    "  {:>3}. {} {}",
                    i + 1,
                    priority_label(scenario.priority),
                    scenario.id.display()
                );
            }
            Ok(())
        }

        Commands::Check { root } => {
            logging::init_cli(false);
            let config = Config::load()?;
            let root = root.unwrap_or_else(|| config.scenarios.root.clone());
            check(&root, &config.scenarios.extensions)
        }

        Commands::Logs {
            lines,
            json,
            error_log,
        } => {
            logging::init_cli(false);
            let path = match error_log {
                Some(path) => path,
                None => Config::load()?.log.error_log,
            };
            show_records(&path, lines, json)
        }
    }
}

async fn run(config: &Config, root: &Path, log: ErrorLog, filter: Option<&str>) -> Result<()> {
    let plan = runner::plan(root, &config.scenarios.extensions, filter)?;
    if plan.is_empty() {
        println!("No scenarios found in {}", root.display());
        return Ok(());
    }

    let session = SessionManager::new(config.auth.clone())?;
    let mut browser = WebDriverClient::connect(config).await?;

    let mut suite = Suite::new(root, Registries::builtin(), log).with_hooks(session);
    let summary = suite.run(&mut browser, &plan).await;

    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }

    if summary.success() {
        Ok(())
    } else {
        Err(Error::SuiteFailed(summary.failed()))
    }
}

fn check(root: &Path, extensions: &[String]) -> Result<()> {
    let registries = Registries::builtin();
    let ids = discover(root, extensions)?;
    let mut invalid = 0;

    for id in &ids {
        let result = ScenarioDocument::load(root, id)
            .and_then(|document| registries.validate_document(&document).map(|()| document));
        match result {
            Ok(document) => println!(
                "  {} {} {}",
                "✓".green(),
                id.display(),
                format!(
                    "[{}, {} steps, {} assertions]",
                    document.priority,
                    document.steps.len(),
                    document.assertions.len()
                )
                .dimmed()
            ),
            Err(e) => {
                invalid += 1;
                println!("  {} {}", "✗".red(), id.display().to_string().red());
                println!("      {}", e);
            }
        }
    }

    println!();
    if invalid == 0 {
        println!("{} {} document(s) valid", "✓".green().bold(), ids.len());
        Ok(())
    } else {
        Err(Error::InvalidDocuments(invalid))
    }
}

fn show_records(path: &Path, lines: usize, json: bool) -> Result<()> {
    let records = ErrorLog::new(path).read_all()?;
    let start = records.len().saturating_sub(lines);
    let shown = &records[start..];

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No failures recorded in {}", path.display());
        return Ok(());
    }

    println!(
        "Showing {} of {} recorded failure(s) from {}:",
        shown.len(),
        records.len(),
        path.display()
    );
    for record in shown {
        print_record(record);
    }
    Ok(())
}

fn priority_label(priority: Priority) -> colored::ColoredString {
    let label = format!("{:<6}", priority.as_str());
    match priority {
        Priority::High => label.red().bold(),
        Priority::Medium => label.yellow(),
        Priority::Low => label.dimmed(),
    }
}

fn print_record(record: &RunRecord) {
    println!();
    println!(
        "{} {} {} {}",
        record.timestamp.dimmed(),
        priority_label(record.priority),
        record.scenario_file.white().bold(),
        format!("({})", record.module).dimmed()
    );
    println!("    {}: {}", record.error_name.red(), record.message);
    if let Some(step) = &record.failing_step {
        println!("    at {}", step);
    }
    if let Some(url) = &record.url {
        println!("    url: {}", url.dimmed());
    }
}
