//! Built-in step actions
//!
//! Steps change page state. Each one waits for its target with a bounded
//! poll before acting; an explicit `timeout` option (milliseconds) replaces
//! the default maximum wait.

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::wait::{self, Waiter};
use crate::browser::Browser;
use crate::common::{ActionKind, Error, Result};
use crate::scenario::ActionEntry;

use super::{required, ActionHandler, Registry};

pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const INTERACTION_TIMEOUT: Duration = Duration::from_secs(20);
pub const WAIT_FOR_TIMEOUT: Duration = Duration::from_secs(30);

pub const SIDEBAR_TOGGLE: &str = r#"[data-cy="button-sidebar-toggle"]"#;

/// Selector of the sidebar button opening module panel `name`
pub fn module_button(name: &str) -> String {
    format!(r#"[data-cy="button-sidebar-{}"]"#, name)
}

/// Registry with every built-in step
pub fn registry() -> Registry {
    let mut registry = Registry::new(ActionKind::Step);
    registry
        .register("goto", Goto)
        .register("click", Click)
        .register("sidebar", Sidebar)
        .register("wait_for", WaitFor)
        .register("type", Type)
        .register("click_if_visible", ClickIfVisible)
        .register("open_module", OpenModule)
        .register("scroll_to", ScrollTo)
        .register("select", Select);
    registry
}

fn selector(entry: &ActionEntry) -> Result<String> {
    required(entry, "selector", entry.payload.selector())
}

/// `goto: /path` navigates to a path relative to the base URL
pub struct Goto;

impl Goto {
    fn path(entry: &ActionEntry) -> Result<String> {
        required(entry, "path", entry.payload.path())
    }
}

#[async_trait]
impl ActionHandler for Goto {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let path = Self::path(entry)?;
        let timeout = entry.payload.timeout_or(NAVIGATION_TIMEOUT);
        tokio::time::timeout(timeout, browser.navigate(&path))
            .await
            .map_err(|_| Error::timeout(format!("page '{}' to load", path), timeout))?
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::path(entry).map(|_| ())
    }
}

/// `click: <selector>`; `force: true` clicks without the visibility check
pub struct Click;

#[async_trait]
impl ActionHandler for Click {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        if entry.payload.force() {
            let target = wait::element(browser, &selector, timeout).await?;
            browser.force_click(&target).await
        } else {
            let target = wait::visible_element(browser, &selector, timeout).await?;
            browser.click(&target).await
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `sidebar: true` toggles the navigation sidebar; `false` leaves it alone
pub struct Sidebar;

impl Sidebar {
    fn flag(entry: &ActionEntry) -> Result<bool> {
        entry
            .payload
            .flag()
            .ok_or_else(|| Error::invalid_payload(&entry.name, "expected true or false"))
    }
}

#[async_trait]
impl ActionHandler for Sidebar {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        if !Self::flag(entry)? {
            return Ok(());
        }
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let toggle = wait::element(browser, SIDEBAR_TOGGLE, timeout).await?;
        browser.force_click(&toggle).await
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::flag(entry).map(|_| ())
    }
}

/// `wait_for: <selector>` blocks until the selector matches
pub struct WaitFor;

#[async_trait]
impl ActionHandler for WaitFor {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(WAIT_FOR_TIMEOUT);
        wait::element(browser, &selector, timeout).await.map(|_| ())
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `type: { selector, text }` sends keystrokes to a field
///
/// The shorthand form names only the selector and types nothing.
pub struct Type;

#[async_trait]
impl ActionHandler for Type {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let text = entry.payload.options.text.clone().unwrap_or_default();
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let field = wait::visible_element(browser, &selector, timeout).await?;
        if text.is_empty() {
            return Ok(());
        }
        browser.send_keys(&field, &text).await
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `click_if_visible: <selector>` clicks the element when it is in the
/// page right now; an absent element is not a failure.
pub struct ClickIfVisible;

#[async_trait]
impl ActionHandler for ClickIfVisible {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let present = wait::transient(browser.find_all(&selector).await)?.unwrap_or_default();
        if present.is_empty() {
            tracing::debug!(%selector, "Not present, skipping click");
            return Ok(());
        }
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let target = wait::visible_element(browser, &selector, timeout).await?;
        browser.click(&target).await
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `open_module: <name>` clicks the sidebar button for a module panel
pub struct OpenModule;

impl OpenModule {
    fn name(entry: &ActionEntry) -> Result<String> {
        required(entry, "module name", entry.payload.value())
    }
}

#[async_trait]
impl ActionHandler for OpenModule {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let button = module_button(&Self::name(entry)?);
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let target = wait::visible_element(browser, &button, timeout).await?;
        browser.click(&target).await
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::name(entry).map(|_| ())
    }
}

/// `scroll_to: <selector>` brings an element into the viewport
pub struct ScrollTo;

#[async_trait]
impl ActionHandler for ScrollTo {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let target = wait::element(browser, &selector, timeout).await?;
        browser.scroll_into_view(&target).await
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `select: { selector, value }` picks a dropdown option by value or label
pub struct Select;

impl Select {
    fn args(entry: &ActionEntry) -> Result<(String, String)> {
        let selector = required(entry, "selector", entry.payload.options.selector.clone())?;
        let value = required(entry, "value", entry.payload.options.value.clone())?;
        Ok((selector, value))
    }
}

#[async_trait]
impl ActionHandler for Select {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let (selector, value) = Self::args(entry)?;
        let timeout = entry.payload.timeout_or(INTERACTION_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            // options may be populated after the control renders
            let field = match wait::visible_element(browser, &selector, waiter.remaining()).await {
                Ok(field) => field,
                Err(Error::ActionTimeout { .. }) => {
                    return Err(Error::timeout(
                        format!("element '{}' to be visible", selector),
                        timeout,
                    ))
                }
                Err(e) => return Err(e),
            };
            if wait::transient(browser.select_option(&field, &value).await)? == Some(true) {
                return Ok(());
            }
            if !waiter.next().await {
                return Err(Error::timeout(
                    format!("option '{}' in '{}'", value, selector),
                    timeout,
                ));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::args(entry).map(|_| ())
    }
}
