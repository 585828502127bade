//! Configuration file and environment handling
//!
//! Settings come from an optional TOML file and are then overridden by
//! `SMOKE_*` environment variables. Everything is read once at startup.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::{config_path, default_error_log};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Login flow run before every scenario
    #[serde(default)]
    pub auth: AuthConfig,

    /// WebDriver endpoint settings
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Scenario discovery settings
    #[serde(default)]
    pub scenarios: ScenarioConfig,

    /// Run record log settings
    #[serde(default)]
    pub log: LogConfig,
}

/// A string that never shows up in `Debug` output
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value. Never pass the result to a log macro.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// Browser viewport size
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    /// Parse `WIDTHxHEIGHT`
    pub fn parse(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::Config(format!("Invalid viewport '{}', expected WIDTHxHEIGHT", s)))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid viewport width: {}", w)))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid viewport height: {}", h)))?;
        Ok(Self { width, height })
    }
}

/// Application under test
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Base URL that relative paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Browser window size
    #[serde(default)]
    pub viewport: Viewport,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            viewport: Viewport::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Login flow settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Login entry point, relative to the base URL
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: Secret,

    #[serde(default = "default_username_selector")]
    pub username_selector: String,

    #[serde(default = "default_password_selector")]
    pub password_selector: String,

    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,

    /// Regex the location must match once login succeeded
    #[serde(default = "default_post_login_pattern")]
    pub post_login_pattern: String,

    /// Maximum wait for the post-login location
    #[serde(default = "default_auth_timeout")]
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            username: String::new(),
            password: Secret::default(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            submit_selector: default_submit_selector(),
            post_login_pattern: default_post_login_pattern(),
            timeout_secs: default_auth_timeout(),
        }
    }
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}
fn default_username_selector() -> String {
    r#"input[name="email"]"#.to_string()
}
fn default_password_selector() -> String {
    r#"input[name="password"]"#.to_string()
}
fn default_submit_selector() -> String {
    r#"button[type="submit"]"#.to_string()
}
fn default_post_login_pattern() -> String {
    "/dashboard".to_string()
}
fn default_auth_timeout() -> u64 {
    30
}

impl AuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Browser flavour, decides the capabilities sent on session creation
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl BrowserKind {
    /// Driver executable spawned when no endpoint is listening
    pub fn driver_binary(&self) -> &'static str {
        match self {
            Self::Chrome => "chromedriver",
            Self::Firefox => "geckodriver",
        }
    }
}

/// WebDriver endpoint settings
#[derive(Debug, Deserialize)]
pub struct WebDriverConfig {
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    #[serde(default)]
    pub browser: BrowserKind,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Spawn the driver binary from PATH if nothing listens at `url`
    #[serde(default = "default_true")]
    pub spawn_driver: bool,

    #[serde(default = "default_page_load")]
    pub page_load_timeout_secs: u64,

    /// Timeout for a single HTTP round trip to the driver
    #[serde(default = "default_request")]
    pub request_timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: BrowserKind::default(),
            headless: true,
            spawn_driver: true,
            page_load_timeout_secs: default_page_load(),
            request_timeout_secs: default_request(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_true() -> bool {
    true
}
fn default_page_load() -> u64 {
    60
}
fn default_request() -> u64 {
    90
}

/// Scenario discovery settings
#[derive(Debug, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default = "default_scenario_root")]
    pub root: PathBuf,

    /// File extensions (without dot) that mark scenario documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            root: default_scenario_root(),
            extensions: default_extensions(),
        }
    }
}

fn default_scenario_root() -> PathBuf {
    PathBuf::from("smoke/modules")
}
fn default_extensions() -> Vec<String> {
    vec!["yaml".to_string()]
}

/// Run record log settings
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            error_log: default_error_log(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and the process environment
    ///
    /// Returns defaults (plus environment overrides) if no file exists
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                tracing::debug!(path = %path.display(), "Loaded config file");
                return Self::from_toml(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Override settings from `SMOKE_*` variables supplied by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SMOKE_BASE_URL") {
            self.target.base_url = url;
        }
        if let Some(username) = lookup("SMOKE_USERNAME") {
            self.auth.username = username;
        }
        if let Some(password) = lookup("SMOKE_PASSWORD") {
            self.auth.password = Secret::new(password);
        }
        if let Some(viewport) = lookup("SMOKE_VIEWPORT") {
            self.target.viewport = Viewport::parse(&viewport)?;
        }
        if let Some(url) = lookup("SMOKE_WEBDRIVER_URL") {
            self.webdriver.url = url;
        }
        if let Some(root) = lookup("SMOKE_SCENARIO_DIR") {
            self.scenarios.root = PathBuf::from(root);
        }
        if let Some(log) = lookup("SMOKE_ERROR_LOG") {
            self.log.error_log = PathBuf::from(log);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.auth.login_path, "/auth/login");
        assert_eq!(config.target.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(config.scenarios.extensions, vec!["yaml"]);
        assert_eq!(config.webdriver.browser, BrowserKind::Chrome);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
[target]
base_url = "https://shop.example.com/reseller"

[auth]
post_login_pattern = "/reseller/(dashboard|home)"

[webdriver]
browser = "firefox"
headless = false
"#,
        )
        .unwrap();
        assert_eq!(config.target.base_url, "https://shop.example.com/reseller");
        assert_eq!(config.auth.post_login_pattern, "/reseller/(dashboard|home)");
        assert_eq!(config.auth.timeout_secs, 30);
        assert_eq!(config.webdriver.browser, BrowserKind::Firefox);
        assert!(!config.webdriver.headless);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SMOKE_BASE_URL", "https://staging.example.com"),
            ("SMOKE_USERNAME", "qa@example.com"),
            ("SMOKE_PASSWORD", "hunter2"),
            ("SMOKE_VIEWPORT", "1920x1080"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target.base_url, "https://staging.example.com");
        assert_eq!(config.auth.username, "qa@example.com");
        assert_eq!(config.auth.password.expose(), "hunter2");
        assert_eq!(config.target.viewport, Viewport { width: 1920, height: 1080 });
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let mut config = Config::default();
        config.auth.password = Secret::new("hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Secret(***)"));
    }

    #[test]
    fn test_invalid_viewport() {
        assert!(Viewport::parse("wide").is_err());
        assert!(Viewport::parse("100xtall").is_err());
        assert_eq!(Viewport::parse(" 800X600 ").unwrap(), Viewport { width: 800, height: 600 });
    }
}
