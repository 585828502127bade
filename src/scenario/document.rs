//! Scenario document types
//!
//! Defines the data structures for deserializing YAML scenario documents:
//!
//! ```yaml
//! module: Customers
//! priority: high
//! steps:
//!   - goto: /customers
//!   - click: '[data-cy="customer-row"]'
//! assertions:
//!   - visible: Customer details
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::common::{Error, Result};
use crate::dsl::payload::Payload;

/// Scenario priority: decides run order and whether a failure blocks the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Read a declared priority. Absent or unrecognized values are `Medium`.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some(label) => Self::from_label(label),
            None => Self::Medium,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Sort key: high runs first
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{action_name: payload}` entry of a steps or assertions list
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEntry {
    pub name: String,
    pub payload: Payload,
}

impl ActionEntry {
    pub fn new(name: &str, payload: Payload) -> Self {
        Self {
            name: name.to_string(),
            payload,
        }
    }
}

/// A parsed, validated scenario document
#[derive(Debug, Clone)]
pub struct ScenarioDocument {
    /// Path relative to the scenario root
    pub id: PathBuf,
    /// Feature under test
    pub module: String,
    pub priority: Priority,
    pub steps: Vec<ActionEntry>,
    pub assertions: Vec<ActionEntry>,
}

/// Top-level shape on disk; unknown keys are ignored
#[derive(Deserialize)]
struct RawDocument {
    module: Option<String>,
    priority: Option<Value>,
    steps: Option<Vec<Value>>,
    assertions: Option<Vec<Value>>,
}

impl ScenarioDocument {
    /// Read and parse `root/id`
    pub fn load(root: &Path, id: &Path) -> Result<Self> {
        let path = root.join(id);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::parse(id, format!("cannot read file: {}", e)))?;
        Self::parse(id, &content)
    }

    /// Parse document text; `id` only labels errors and the result
    pub fn parse(id: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(Error::parse(id, "document is empty"));
        }

        let raw: RawDocument =
            serde_yaml::from_str(content).map_err(|e| Error::parse(id, e.to_string()))?;

        let steps = parse_entries(id, "steps", raw.steps.unwrap_or_default())?;
        let assertions = parse_entries(id, "assertions", raw.assertions.unwrap_or_default())?;

        Ok(Self {
            id: id.to_path_buf(),
            module: raw.module.unwrap_or_else(|| "unknown".to_string()),
            priority: Priority::from_value(raw.priority.as_ref()),
            steps,
            assertions,
        })
    }
}

fn parse_entries(id: &Path, list: &str, values: Vec<Value>) -> Result<Vec<ActionEntry>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            parse_entry(value).map_err(|message| Error::parse(id, format!("{}[{}]: {}", list, index, message)))
        })
        .collect()
}

/// An entry must be a mapping with exactly one string key
fn parse_entry(value: Value) -> std::result::Result<ActionEntry, String> {
    let Value::Mapping(mapping) = value else {
        return Err(format!(
            "expected a single-key mapping like '- goto: /path', found {}",
            describe(&value)
        ));
    };

    if mapping.len() != 1 {
        let keys: Vec<String> = mapping
            .keys()
            .map(|k| k.as_str().map(str::to_string).unwrap_or_else(|| describe(k)))
            .collect();
        return Err(format!(
            "expected exactly one action per entry, found {} ({})",
            keys.len(),
            keys.join(", ")
        ));
    }

    let Some((key, payload)) = mapping.into_iter().next() else {
        return Err("empty entry".to_string());
    };
    let name = key
        .as_str()
        .ok_or_else(|| format!("action name must be a string, found {}", describe(&key)))?
        .to_string();
    let payload = Payload::from_value(payload).map_err(|e| format!("{}: {}", name, e))?;

    Ok(ActionEntry { name, payload })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string '{}'", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}
