//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/smoke-runner/`, `~/.local/share/smoke-runner/`
//! - macOS: `~/Library/Application Support/smoke-runner/`
//! - Windows: `%APPDATA%\smoke-runner\`

use std::path::PathBuf;

/// Name used for config and data directories
const APP_NAME: &str = "smoke-runner";

/// Config file looked up in the working directory before the platform config dir
pub const LOCAL_CONFIG_FILE: &str = "smoke.toml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// A `smoke.toml` in the working directory wins over the platform config dir.
pub fn config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Default location of the persistent run record log
pub fn default_error_log() -> PathBuf {
    log_dir()
        .map(|dir| dir.join("smoke-errors.json"))
        .unwrap_or_else(|| PathBuf::from("smoke-errors.json"))
}
