//! Run Records and the persistent error log
//!
//! The log is a single JSON array. Appending reads the current array, adds
//! one record, writes the result to a temporary file next to the log and
//! renames it into place, so history is never truncated.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::common::{truncate_chars, Error, Result};
use crate::scenario::Priority;

/// Maximum characters of diagnostic trace kept per record
pub const TRACE_LIMIT: usize = 500;

/// Persisted outcome of one failed scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub timestamp: String,
    pub scenario_file: String,
    pub module: String,
    pub priority: Priority,
    pub error_name: String,
    pub message: String,
    pub failing_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub stack_trace: String,
}

impl RunRecord {
    /// Build a record for `error`, stamped with the current time
    pub fn failure(
        scenario_file: &Path,
        module: &str,
        priority: Priority,
        failing_step: Option<String>,
        url: Option<String>,
        error: &Error,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            scenario_file: scenario_file.display().to_string(),
            module: module.to_string(),
            priority,
            error_name: error.name().to_string(),
            message: error.to_string(),
            failing_step,
            url,
            stack_trace: truncate_chars(&error.trace(), TRACE_LIMIT),
        }
    }
}

/// Append-only JSON array of [`RunRecord`]s on disk
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, message: impl Into<String>) -> Error {
        Error::LogStore {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    /// All records, oldest first. A missing or empty log has none.
    pub fn read_all(&self) -> Result<Vec<RunRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.store_error(e.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| self.store_error(format!("not a JSON array of run records: {}", e)))
    }

    /// Add `record` after all existing records
    ///
    /// Creates the log (and its directory) when absent. An existing log that
    /// cannot be parsed is left untouched and reported as an error.
    pub fn append(&self, record: RunRecord) -> Result<()> {
        let mut records = self.read_all()?;
        records.push(record);

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.store_error(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.store_error(e.to_string()))?;
        serde_json::to_writer_pretty(&mut tmp, &records)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| self.store_error(e.error.to_string()))?;

        tracing::debug!(path = %self.path.display(), total = records.len(), "Appended run record");
        Ok(())
    }
}
