//! WebDriver client for driving a real browser
//!
//! Talks W3C WebDriver over HTTP to chromedriver/geckodriver, spawning the
//! driver binary from PATH when nothing is listening yet.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::process::{Child, Command};

use crate::browser::{resolve_url, Browser, ElementId};
use crate::common::config::Config;
use crate::common::{Error, Result};

use super::types::*;

/// Timeout for a spawned driver to start answering `/status`
const SPAWN_TIMEOUT_SECS: u64 = 10;

const FIND_BY_TEXT_SCRIPT: &str = r#"
const needle = arguments[0];
const skip = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE']);
const all = document.body ? Array.from(document.body.querySelectorAll('*')) : [];
return all.filter(el => {
    if (skip.has(el.tagName)) return false;
    if (!(el.textContent || '').includes(needle)) return false;
    return !Array.from(el.children).some(c => (c.textContent || '').includes(needle));
});
"#;

const FORCE_CLICK_SCRIPT: &str = "arguments[0].click();";

const SCROLL_SCRIPT: &str = "arguments[0].scrollIntoView({ block: 'center', inline: 'nearest' });";

const SELECT_SCRIPT: &str = r#"
const [select, wanted] = arguments;
const option = Array.from(select.options || [])
    .find(o => o.value === wanted || o.text.trim() === wanted);
if (!option) return false;
select.value = option.value;
select.dispatchEvent(new Event('input', { bubbles: true }));
select.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

const CLEAR_STORAGE_SCRIPT: &str = r#"
try { window.localStorage.clear(); } catch (e) {}
try { window.sessionStorage.clear(); } catch (e) {}
"#;

/// WebDriver session bound to one browser window
pub struct WebDriverClient {
    http: reqwest::Client,
    /// Driver endpoint, without trailing slash
    endpoint: String,
    /// Application base URL for relative navigation
    base_url: String,
    session_id: String,
    /// Driver process, when we spawned it ourselves
    driver: Option<Child>,
}

impl WebDriverClient {
    /// Start (or reuse) a driver and open a browser session configured from `config`
    #[tracing::instrument(skip(config), fields(endpoint = %config.webdriver.url, browser = ?config.webdriver.browser))]
    pub async fn connect(config: &Config) -> Result<Self> {
        let wd = &config.webdriver;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(wd.request_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = wd.url.trim_end_matches('/').to_string();

        let driver = ensure_driver_running(&http, &endpoint, config).await?;

        let caps = capabilities(wd.browser, wd.headless, config.target.viewport);
        let created: NewSessionResponse =
            send(&http, Method::POST, &format!("{}/session", endpoint), Some(caps), "new session")
                .await?;

        tracing::info!(session_id = %created.session_id, "Browser session created");

        let mut client = Self {
            http,
            endpoint,
            base_url: config.target.base_url.clone(),
            session_id: created.session_id,
            driver,
        };

        let timeouts = Timeouts {
            page_load: wd.page_load_timeout_secs * 1000,
            script: 30_000,
            implicit: 0,
        };
        client
            .command::<Value>(Method::POST, "timeouts", Some(serde_json::to_value(&timeouts)?))
            .await?;

        let viewport = config.target.viewport;
        client.set_viewport(viewport.width, viewport.height).await?;

        Ok(client)
    }

    /// Send a session-scoped command and unwrap its `value`
    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}/session/{}/{}", self.endpoint, self.session_id, path);
        send(&self.http, method, &url, body, path).await
    }

    async fn element_command<T: DeserializeOwned>(
        &self,
        method: Method,
        element: &ElementId,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<T> {
        self.command(method, &format!("element/{}/{}", element.0, suffix), body)
            .await
    }

    async fn execute<T: DeserializeOwned>(&self, script: &str, args: Vec<Value>) -> Result<T> {
        let body = serde_json::to_value(ExecuteScript { script, args })?;
        self.command(Method::POST, "execute/sync", Some(body)).await
    }

    /// End the browser session and stop a driver we spawned
    pub async fn close(mut self) -> Result<()> {
        let url = format!("{}/session/{}", self.endpoint, self.session_id);
        if let Err(e) = send::<Value>(&self.http, Method::DELETE, &url, None, "delete session").await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }
        if let Some(mut driver) = self.driver.take() {
            let _ = driver.kill().await;
        }
        Ok(())
    }
}

impl Drop for WebDriverClient {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        if let Some(driver) = self.driver.as_mut() {
            let _ = driver.start_kill();
        }
    }
}

fn element_arg(element: &ElementId) -> Value {
    json!({ ELEMENT_KEY: element.0 })
}

/// Perform one HTTP round trip and decode the `value` envelope
async fn send<T: DeserializeOwned>(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    command: &str,
) -> Result<T> {
    tracing::trace!(%method, %url, "WebDriver request");

    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| Error::DriverConnection {
        url: url.to_string(),
        source: e,
    })?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| Error::DriverConnection {
        url: url.to_string(),
        source: e,
    })?;

    decode(command, status, &bytes)
}

fn decode<T: DeserializeOwned>(command: &str, status: StatusCode, bytes: &[u8]) -> Result<T> {
    if status.is_success() {
        let envelope: Envelope<T> = serde_json::from_slice(bytes).map_err(|e| Error::WebDriver {
            command: command.to_string(),
            error: "invalid response".to_string(),
            message: e.to_string(),
        })?;
        return Ok(envelope.value);
    }

    let body = serde_json::from_slice::<Envelope<ErrorBody>>(bytes)
        .map(|e| e.value)
        .unwrap_or_else(|_| ErrorBody {
            error: format!("http {}", status.as_u16()),
            message: String::from_utf8_lossy(bytes).into_owned(),
        });

    tracing::debug!(command, error = %body.error, message = %body.message, "WebDriver error");

    match body.error.as_str() {
        "stale element reference" | "no such element" => Err(Error::StaleElement(body.message)),
        _ => Err(Error::WebDriver {
            command: command.to_string(),
            error: body.error,
            message: body.message,
        }),
    }
}

/// Make sure a driver answers at `endpoint`, spawning one if allowed
///
/// Returns the spawned child so the session can stop it again.
async fn ensure_driver_running(
    http: &reqwest::Client,
    endpoint: &str,
    config: &Config,
) -> Result<Option<Child>> {
    if driver_ready(http, endpoint).await {
        return Ok(None);
    }

    if !config.webdriver.spawn_driver {
        return Err(Error::Config(format!(
            "No WebDriver listening at {} and spawn_driver is disabled",
            endpoint
        )));
    }

    let binary = config.webdriver.browser.driver_binary();
    let path = which::which(binary).map_err(|_| {
        Error::Config(format!(
            "No WebDriver listening at {} and '{}' was not found in PATH",
            endpoint, binary
        ))
    })?;

    let port = reqwest::Url::parse(endpoint)
        .ok()
        .and_then(|u| u.port_or_known_default())
        .ok_or_else(|| Error::Config(format!("Cannot determine port of WebDriver URL {}", endpoint)))?;

    tracing::info!(driver = %path.display(), port, "Spawning WebDriver");

    let child = Command::new(&path)
        .arg(format!("--port={}", port))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Config(format!("Failed to spawn {}: {}", path.display(), e)))?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(SPAWN_TIMEOUT_SECS);
    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::DriverSpawnTimeout(SPAWN_TIMEOUT_SECS));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        if driver_ready(http, endpoint).await {
            tracing::debug!("WebDriver started successfully");
            return Ok(Some(child));
        }
    }
}

async fn driver_ready(http: &reqwest::Client, endpoint: &str) -> bool {
    let url = format!("{}/status", endpoint);
    match send::<StatusResponse>(http, Method::GET, &url, None, "status").await {
        Ok(status) => {
            tracing::debug!(ready = status.ready, message = %status.message, "WebDriver status");
            status.ready
        }
        Err(_) => false,
    }
}

#[async_trait]
impl Browser for WebDriverClient {
    async fn navigate(&mut self, path: &str) -> Result<()> {
        let url = resolve_url(&self.base_url, path);
        tracing::debug!(%url, "Navigating");
        self.command::<Value>(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.command(Method::GET, "url", None).await
    }

    async fn title(&mut self) -> Result<String> {
        self.command(Method::GET, "title", None).await
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>> {
        let locator = serde_json::to_value(Locator::css(selector))?;
        let refs: Vec<ElementRef> = self.command(Method::POST, "elements", Some(locator)).await?;
        Ok(refs.into_iter().map(|r| ElementId(r.id)).collect())
    }

    async fn find_by_text(&mut self, text: &str) -> Result<Vec<ElementId>> {
        let refs: Vec<ElementRef> = self.execute(FIND_BY_TEXT_SCRIPT, vec![json!(text)]).await?;
        Ok(refs.into_iter().map(|r| ElementId(r.id)).collect())
    }

    async fn is_displayed(&mut self, element: &ElementId) -> Result<bool> {
        self.element_command(Method::GET, element, "displayed", None).await
    }

    async fn is_enabled(&mut self, element: &ElementId) -> Result<bool> {
        self.element_command(Method::GET, element, "enabled", None).await
    }

    async fn text(&mut self, element: &ElementId) -> Result<String> {
        self.element_command(Method::GET, element, "text", None).await
    }

    async fn attribute(&mut self, element: &ElementId, name: &str) -> Result<Option<String>> {
        self.element_command(Method::GET, element, &format!("attribute/{}", name), None)
            .await
    }

    async fn click(&mut self, element: &ElementId) -> Result<()> {
        self.element_command::<Value>(Method::POST, element, "click", Some(json!({})))
            .await?;
        Ok(())
    }

    async fn force_click(&mut self, element: &ElementId) -> Result<()> {
        self.execute::<Value>(FORCE_CLICK_SCRIPT, vec![element_arg(element)])
            .await?;
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<()> {
        self.element_command::<Value>(Method::POST, element, "value", Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementId) -> Result<()> {
        self.execute::<Value>(SCROLL_SCRIPT, vec![element_arg(element)])
            .await?;
        Ok(())
    }

    async fn select_option(&mut self, element: &ElementId, value: &str) -> Result<bool> {
        self.execute(SELECT_SCRIPT, vec![element_arg(element), json!(value)])
            .await
    }

    async fn clear_session_state(&mut self) -> Result<()> {
        self.command::<Value>(Method::DELETE, "cookie", None).await?;
        self.execute::<Value>(CLEAR_STORAGE_SCRIPT, Vec::new()).await?;
        Ok(())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.command::<Value>(
            Method::POST,
            "window/rect",
            Some(json!({ "width": width, "height": height })),
        )
        .await?;
        Ok(())
    }
}
