//! Error types for the smoke runner
//!
//! Scenario-level errors are caught at the scenario boundary and turned into
//! run records; only discovery and configuration errors abort a whole run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which registry an action name was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Step,
    Assertion,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step => write!(f, "step"),
            Self::Assertion => write!(f, "assertion"),
        }
    }
}

/// Main error type for the smoke runner
#[derive(Error, Debug)]
pub enum Error {
    // === Discovery Errors ===
    #[error("Cannot read scenario root '{}': {source}", root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    // === Document Errors ===
    #[error("Invalid scenario document '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unknown {kind} type: {name}")]
    UnknownActionType { kind: ActionKind, name: String },

    #[error("Invalid payload for '{action}': {message}")]
    InvalidPayload { action: String, message: String },

    // === Execution Errors ===
    #[error("Timed out after {timeout_ms}ms waiting for {waiting_for}")]
    ActionTimeout { waiting_for: String, timeout_ms: u64 },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Login did not reach the expected page: {0}")]
    AuthenticationSetup(String),

    // === WebDriver Errors ===
    #[error("WebDriver command '{command}' failed ({error}): {message}")]
    WebDriver {
        command: String,
        error: String,
        message: String,
    },

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Cannot reach WebDriver at {url}: {source}")]
    DriverConnection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("WebDriver did not become ready within {0} seconds")]
    DriverSpawnTimeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Suite Errors ===
    #[error("{0} high-priority scenario(s) failed")]
    SuiteFailed(usize),

    #[error("{0} scenario document(s) are invalid")]
    InvalidDocuments(usize),

    // === Run Record Log Errors ===
    #[error("Error log '{}' is unusable: {message}", path.display())]
    LogStore { path: PathBuf, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid payload error
    pub fn invalid_payload(action: &str, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            action: action.to_string(),
            message: message.into(),
        }
    }

    /// Create a parse error for a scenario document
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(waiting_for: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::ActionTimeout {
            waiting_for: waiting_for.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Stable classification name, stored as `errorName` in run records
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovery { .. } => "DiscoveryError",
            Self::Parse { .. } => "ParseError",
            Self::UnknownActionType { .. } => "UnknownActionType",
            Self::InvalidPayload { .. } => "InvalidPayload",
            Self::ActionTimeout { .. } => "ActionTimeout",
            Self::AssertionFailed(_) => "AssertionFailed",
            Self::AuthenticationSetup(_) => "AuthenticationSetupFailure",
            Self::WebDriver { .. } | Self::StaleElement(_) => "WebDriverError",
            Self::DriverConnection { .. } | Self::DriverSpawnTimeout(_) => "DriverConnectionError",
            Self::Config(_) | Self::ConfigParse(_) => "ConfigError",
            Self::SuiteFailed(_) => "SuiteFailure",
            Self::InvalidDocuments(_) => "InvalidDocuments",
            Self::LogStore { .. } => "LogStoreError",
            Self::Io(_) | Self::FileRead { .. } => "IoError",
            Self::Json(_) => "JsonError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Render the error and its source chain as a diagnostic trace
    pub fn trace(&self) -> String {
        let mut trace = format!("{}: {}", self.name(), self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            trace.push_str("\n  caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        trace
    }
}
