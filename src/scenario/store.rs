//! Scenario discovery
//!
//! Walks the scenario root recursively and returns every document path,
//! relative to the root. A missing or unreadable root is a configuration
//! error and is never handled locally.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::common::{Error, Result};

/// Find all scenario documents below `root` whose extension is in `extensions`
///
/// Entries are visited in file-name order, so the result is deterministic
/// for a fixed tree. Callers must still not rely on this order; the
/// priority sorter decides run order.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(root).map_err(|e| Error::Discovery {
        root: root.to_path_buf(),
        source: e,
    })?;
    if !meta.is_dir() {
        return Err(Error::Discovery {
            root: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Discovery {
            root: root.to_path_buf(),
            source: e.into(),
        })?;

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::Internal(format!("walked outside scenario root: {}", e)))?;
        found.push(relative.to_path_buf());
    }

    tracing::debug!(root = %root.display(), count = found.len(), "Discovered scenarios");
    Ok(found)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
