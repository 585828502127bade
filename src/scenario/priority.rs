//! Priority-based run ordering
//!
//! Only the `priority` header of each document is consulted. The plan is
//! fixed before any document is parsed for execution. The same header read
//! names the module of a document that fails to parse.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use super::document::Priority;

/// One scenario scheduled for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedScenario {
    /// Path relative to the scenario root
    pub id: PathBuf,
    pub priority: Priority,
}

#[derive(Deserialize)]
struct Header {
    priority: Option<Value>,
    module: Option<Value>,
}

/// Read the declared priority from document text
///
/// Anything unreadable counts as `Medium`: a broken document still gets
/// scheduled, and fails with a parse error when it runs.
pub fn read_priority(content: &str) -> Priority {
    match serde_yaml::from_str::<Header>(content) {
        Ok(header) => Priority::from_value(header.priority.as_ref()),
        Err(_) => Priority::Medium,
    }
}

/// Read the `module` header from document text, if it is a plain string
pub fn read_module(content: &str) -> Option<String> {
    match serde_yaml::from_str::<Header>(content).ok()?.module? {
        Value::String(module) if !module.is_empty() => Some(module),
        _ => None,
    }
}

/// Build the run plan for discovered documents below `root`
pub fn order(root: &Path, ids: Vec<PathBuf>) -> Vec<PlannedScenario> {
    let plan = ids
        .into_iter()
        .map(|id| {
            let priority = match std::fs::read_to_string(root.join(&id)) {
                Ok(content) => read_priority(&content),
                Err(e) => {
                    tracing::warn!(scenario = %id.display(), error = %e, "Cannot read priority header");
                    Priority::Medium
                }
            };
            PlannedScenario { id, priority }
        })
        .collect();
    sort_plan(plan)
}

/// Stable sort by priority: ties keep discovery order
pub fn sort_plan(mut plan: Vec<PlannedScenario>) -> Vec<PlannedScenario> {
    plan.sort_by_key(|p| p.priority.rank());
    plan
}
