//! Suite orchestration
//!
//! Runs a fixed plan of scenarios one after another against a single
//! browser session. Each scenario is caught at its boundary: failures are
//! written to the error log, then the suppression policy decides what the
//! suite reports.

pub mod interpreter;
pub mod policy;
pub mod record;
pub mod session;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use colored::Colorize;

use crate::browser::Browser;
use crate::common::{Error, Result};
use crate::dsl::Registries;
use crate::scenario::{discover, order, read_module, PlannedScenario, Priority, ScenarioDocument};

pub use interpreter::{Diagnostics, Interpreter};
pub use policy::{Outcome, Verdict};
pub use record::{ErrorLog, RunRecord};
pub use session::SessionManager;

/// Extension points around every scenario
#[async_trait]
pub trait ScenarioHooks: Send + Sync {
    /// Runs before the scenario's first step. An error fails the scenario
    /// without running it.
    async fn before_scenario(
        &self,
        _browser: &mut dyn Browser,
        _scenario: &PlannedScenario,
    ) -> Result<()> {
        Ok(())
    }

    /// Runs once the scenario's outcome is final
    async fn after_scenario(&self, _report: &ScenarioReport) {}
}

/// Discover scenarios below `root`, keep those whose path contains
/// `filter`, and order them by priority
pub fn plan(root: &Path, extensions: &[String], filter: Option<&str>) -> Result<Vec<PlannedScenario>> {
    let mut ids = discover(root, extensions)?;
    if let Some(filter) = filter {
        ids.retain(|id| id.to_string_lossy().contains(filter));
    }
    Ok(order(root, ids))
}

/// Result of one scenario as the suite sees it
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub id: PathBuf,
    pub module: String,
    pub priority: Priority,
    pub verdict: Verdict,
    pub failing_step: Option<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl ScenarioReport {
    fn print(&self) {
        let name = self.id.display().to_string();
        let elapsed = format!("({:.1}s)", self.duration.as_secs_f64());
        match (self.verdict.recorded, self.verdict.visible) {
            (Outcome::Passed, _) => println!(
                "  {} {} {} {}",
                "✓".green(),
                name,
                format!("[{}]", self.module).dimmed(),
                elapsed.dimmed()
            ),
            (Outcome::Failed, Outcome::Failed) => {
                println!("  {} {} {}", "✗".red(), name.red(), elapsed.dimmed());
                self.print_failure();
            }
            (Outcome::Failed, Outcome::Passed) => {
                println!(
                    "  {} {} {}",
                    "⚠".yellow(),
                    name,
                    format!("failed with {} priority, not blocking the suite", self.priority).yellow()
                );
                self.print_failure();
            }
        }
    }

    fn print_failure(&self) {
        if let Some(step) = &self.failing_step {
            println!("      at {}", step.dimmed());
        }
        if let Some(error) = &self.error {
            println!("      {}", error);
        }
    }
}

/// Aggregate result of a suite run
#[derive(Debug, Default)]
pub struct SuiteSummary {
    pub reports: Vec<ScenarioReport>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict.recorded == Outcome::Passed)
            .count()
    }

    /// Failures the suite reports (high priority)
    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict.visible == Outcome::Failed)
            .count()
    }

    /// Failures rewritten to passes
    pub fn suppressed(&self) -> usize {
        self.reports.iter().filter(|r| r.verdict.suppressed()).count()
    }

    /// True when no scenario failed from the suite's point of view
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    fn print(&self, log: &Path) {
        println!();
        let counts = format!(
            "{} passed, {} failed, {} suppressed",
            self.passed(),
            self.failed(),
            self.suppressed()
        );
        if self.success() {
            println!("{} {}", "✓".green().bold(), counts.green().bold());
        } else {
            println!("{} {}", "✗".red().bold(), counts.red().bold());
        }
        if self.failed() + self.suppressed() > 0 {
            println!("  Failures recorded in {}", log.display().to_string().dimmed());
        }
    }
}

/// Sequential scenario runner
pub struct Suite {
    root: PathBuf,
    registries: Registries,
    hooks: Vec<Box<dyn ScenarioHooks>>,
    log: ErrorLog,
    diagnostics: Diagnostics,
}

impl Suite {
    pub fn new(root: impl Into<PathBuf>, registries: Registries, log: ErrorLog) -> Self {
        Self {
            root: root.into(),
            registries,
            hooks: Vec::new(),
            log,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Add hooks; they run in the order they were added
    pub fn with_hooks<H>(mut self, hooks: H) -> Self
    where
        H: ScenarioHooks + 'static,
    {
        self.hooks.push(Box::new(hooks));
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run every planned scenario in order
    pub async fn run(&mut self, browser: &mut dyn Browser, plan: &[PlannedScenario]) -> SuiteSummary {
        println!(
            "\n{} {} scenario(s) from {}",
            "Running".blue().bold(),
            plan.len(),
            self.root.display().to_string().white().bold()
        );

        let mut summary = SuiteSummary::default();
        for scenario in plan {
            let report = self.run_scenario(browser, scenario).await;
            summary.reports.push(report);
        }
        summary.print(self.log.path());
        summary
    }

    #[tracing::instrument(skip_all, fields(scenario = %scenario.id.display(), priority = %scenario.priority))]
    async fn run_scenario(
        &mut self,
        browser: &mut dyn Browser,
        scenario: &PlannedScenario,
    ) -> ScenarioReport {
        let started = Instant::now();

        let (module, result) = self.execute(browser, scenario).await;

        let failing_step = self.diagnostics.current().map(ToString::to_string);
        let recorded = match &result {
            Ok(()) => Outcome::Passed,
            Err(_) => Outcome::Failed,
        };
        let verdict = policy::apply(scenario.priority, recorded);

        if let Err(error) = &result {
            self.record_failure(browser, scenario, &module, failing_step.clone(), error)
                .await;
            if verdict.suppressed() {
                tracing::warn!(
                    error = %error,
                    "Scenario failed with {} priority; not failing the suite",
                    scenario.priority
                );
            } else {
                tracing::error!(error = %error, "Scenario failed");
            }
        }

        self.diagnostics.clear();

        let report = ScenarioReport {
            id: scenario.id.clone(),
            module,
            priority: scenario.priority,
            verdict,
            failing_step,
            error: result.err().map(|e| e.to_string()),
            duration: started.elapsed(),
        };
        report.print();
        for hooks in &self.hooks {
            hooks.after_scenario(&report).await;
        }
        report
    }

    /// Before hooks, then parse, then interpret. Returns the module name
    /// alongside the outcome so a failure before parsing can still be
    /// attributed.
    async fn execute(
        &mut self,
        browser: &mut dyn Browser,
        scenario: &PlannedScenario,
    ) -> (String, Result<()>) {
        let mut module = self.header_module(scenario);
        for hooks in &self.hooks {
            if let Err(e) = hooks.before_scenario(browser, scenario).await {
                return (module, Err(e));
            }
        }
        let document = match ScenarioDocument::load(&self.root, &scenario.id) {
            Ok(document) => document,
            Err(e) => return (module, Err(e)),
        };
        module = document.module.clone();
        let result = Interpreter::new(&self.registries)
            .run(browser, &document, &mut self.diagnostics)
            .await;
        (module, result)
    }

    /// Module named in the document header, `unknown` when unreadable
    fn header_module(&self, scenario: &PlannedScenario) -> String {
        std::fs::read_to_string(self.root.join(&scenario.id))
            .ok()
            .and_then(|content| read_module(&content))
            .unwrap_or_else(|| "unknown".to_string())
    }

    async fn record_failure(
        &self,
        browser: &mut dyn Browser,
        scenario: &PlannedScenario,
        module: &str,
        failing_step: Option<String>,
        error: &Error,
    ) {
        let url = browser.current_url().await.ok();
        let record = RunRecord::failure(&scenario.id, module, scenario.priority, failing_step, url, error);
        if let Err(e) = self.log.append(record) {
            tracing::warn!(error = %e, "Could not record failure");
            println!("  {} {}", "⚠".yellow(), e.to_string().yellow());
        }
    }
}
