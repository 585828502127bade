//! Scenario interpreter
//!
//! Runs a document's steps, then its assertions, strictly in order. The
//! first failure stops the scenario. Before each dispatch the entry about to
//! run is written into [`Diagnostics`], which the caller owns and passes in.

use std::fmt;

use crate::browser::Browser;
use crate::common::Result;
use crate::dsl::{Registries, Registry};
use crate::scenario::{ActionEntry, ScenarioDocument};

/// Which list of a document an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Steps,
    Assertions,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Steps => write!(f, "steps"),
            Self::Assertions => write!(f, "assertions"),
        }
    }
}

/// The entry that was executing, identified by list, index and action name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentEntry {
    pub phase: Phase,
    pub index: usize,
    pub action: String,
}

impl fmt::Display for CurrentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.phase, self.index, self.action)
    }
}

/// Scenario-scoped diagnostic context
#[derive(Debug, Default)]
pub struct Diagnostics {
    current: Option<CurrentEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, phase: Phase, index: usize, action: &str) {
        self.current = Some(CurrentEntry {
            phase,
            index,
            action: action.to_string(),
        });
    }

    pub fn current(&self) -> Option<&CurrentEntry> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Executes documents against a browser through the registries
pub struct Interpreter<'a> {
    registries: &'a Registries,
}

impl<'a> Interpreter<'a> {
    pub fn new(registries: &'a Registries) -> Self {
        Self { registries }
    }

    /// Run `document`, stopping at the first failing entry
    pub async fn run(
        &self,
        browser: &mut dyn Browser,
        document: &ScenarioDocument,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        self.run_list(browser, Phase::Steps, &self.registries.steps, &document.steps, diagnostics)
            .await?;
        self.run_list(
            browser,
            Phase::Assertions,
            &self.registries.assertions,
            &document.assertions,
            diagnostics,
        )
        .await
    }

    async fn run_list(
        &self,
        browser: &mut dyn Browser,
        phase: Phase,
        registry: &Registry,
        entries: &[ActionEntry],
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        for (index, entry) in entries.iter().enumerate() {
            diagnostics.enter(phase, index, &entry.name);
            tracing::debug!(%phase, index, action = %entry.name, "Executing entry");
            registry.dispatch(browser, entry).await?;
        }
        Ok(())
    }
}
