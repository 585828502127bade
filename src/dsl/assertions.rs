//! Built-in assertion actions
//!
//! Every assertion re-checks its condition until it holds or the maximum
//! wait passes, so a page that is still rendering does not fail early.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::browser::wait::{self, transient, Waiter};
use crate::browser::{Browser, ElementId};
use crate::common::{ActionKind, Error, Result};
use crate::scenario::ActionEntry;

use super::{required, ActionHandler, Registry};

pub const VISIBLE_TIMEOUT: Duration = Duration::from_secs(20);
pub const URL_TIMEOUT: Duration = Duration::from_secs(30);
pub const NOT_VISIBLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const ELEMENT_TIMEOUT: Duration = Duration::from_secs(4);

/// Registry with every built-in assertion
pub fn registry() -> Registry {
    let mut registry = Registry::new(ActionKind::Assertion);
    registry
        .register("visible", Visible)
        .register("not_visible", NotVisible)
        .register("url_contains", UrlContains)
        .register("url_matches", UrlMatches)
        .register("contains_text", ContainsText)
        .register("title_contains", TitleContains)
        .register("element_exists", ElementExists)
        .register("element_not_exists", ElementNotExists)
        .register("count", Count { at_least: false })
        .register("min_count", Count { at_least: true })
        .register("has_class", HasClass)
        .register("is_enabled", Enabled { expected: true })
        .register("is_disabled", Enabled { expected: false });
    registry
}

fn selector(entry: &ActionEntry) -> Result<String> {
    required(entry, "selector", entry.payload.selector())
}

fn text(entry: &ActionEntry) -> Result<String> {
    required(entry, "text", entry.payload.text())
}

/// Elements matching `selector`; a stale lookup counts as none
async fn matching(browser: &mut dyn Browser, selector: &str) -> Result<Vec<ElementId>> {
    Ok(transient(browser.find_all(selector).await)?.unwrap_or_default())
}

/// `visible: <text>` passes once an element showing the text is displayed
pub struct Visible;

#[async_trait]
impl ActionHandler for Visible {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let text = text(entry)?;
        let timeout = entry.payload.timeout_or(VISIBLE_TIMEOUT);
        wait::visible_text(browser, &text, timeout).await.map(|_| ())
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        text(entry).map(|_| ())
    }
}

/// `not_visible: <text>` passes once no displayed element shows the text
pub struct NotVisible;

#[async_trait]
impl ActionHandler for NotVisible {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let text = text(entry)?;
        let timeout = entry.payload.timeout_or(NOT_VISIBLE_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            let candidates = transient(browser.find_by_text(&text).await)?.unwrap_or_default();
            let mut shown = false;
            for candidate in candidates {
                if transient(browser.is_displayed(&candidate).await)? == Some(true) {
                    shown = true;
                    break;
                }
            }
            if !shown {
                return Ok(());
            }
            if !waiter.next().await {
                return Err(Error::timeout(format!("text '{}' to disappear", text), timeout));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        text(entry).map(|_| ())
    }
}

/// `url_contains: <fragment>` checks the current location
pub struct UrlContains;

impl UrlContains {
    fn fragment(entry: &ActionEntry) -> Result<String> {
        required(entry, "value", entry.payload.value())
    }
}

#[async_trait]
impl ActionHandler for UrlContains {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let fragment = Self::fragment(entry)?;
        let timeout = entry.payload.timeout_or(URL_TIMEOUT);
        let description = format!("contain '{}'", fragment);
        wait::location(browser, &description, timeout, |url| url.contains(&fragment))
            .await
            .map(|_| ())
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::fragment(entry).map(|_| ())
    }
}

/// `url_matches: <regex>` checks the current location against a pattern
pub struct UrlMatches;

impl UrlMatches {
    fn pattern(entry: &ActionEntry) -> Result<Regex> {
        let pattern = required(entry, "pattern", entry.payload.pattern())?;
        Regex::new(&pattern).map_err(|e| Error::invalid_payload(&entry.name, e.to_string()))
    }
}

#[async_trait]
impl ActionHandler for UrlMatches {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let pattern = Self::pattern(entry)?;
        let timeout = entry.payload.timeout_or(URL_TIMEOUT);
        let description = format!("match /{}/", pattern.as_str());
        wait::location(browser, &description, timeout, |url| pattern.is_match(url))
            .await
            .map(|_| ())
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::pattern(entry).map(|_| ())
    }
}

/// `contains_text: { selector, text }` passes once any matching element's
/// text contains the expected text
pub struct ContainsText;

impl ContainsText {
    fn args(entry: &ActionEntry) -> Result<(String, String)> {
        let selector = required(entry, "selector", entry.payload.options.selector.clone())?;
        let text = required(entry, "text", entry.payload.options.text.clone())?;
        Ok((selector, text))
    }
}

#[async_trait]
impl ActionHandler for ContainsText {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let (selector, expected) = Self::args(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        let mut seen = Vec::new();
        loop {
            seen.clear();
            for element in matching(browser, &selector).await? {
                if let Some(text) = transient(browser.text(&element).await)? {
                    if text.contains(&expected) {
                        return Ok(());
                    }
                    seen.push(text);
                }
            }
            if !waiter.next().await {
                return Err(if seen.is_empty() {
                    Error::timeout(format!("element '{}'", selector), timeout)
                } else {
                    Error::AssertionFailed(format!(
                        "'{}' does not contain '{}' after {}ms (found: {})",
                        selector,
                        expected,
                        timeout.as_millis(),
                        seen.join(" | ")
                    ))
                });
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::args(entry).map(|_| ())
    }
}

/// `title_contains: <text>` checks the document title
pub struct TitleContains;

#[async_trait]
impl ActionHandler for TitleContains {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let expected = text(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            let title = browser.title().await?;
            if title.contains(&expected) {
                return Ok(());
            }
            if !waiter.next().await {
                return Err(Error::AssertionFailed(format!(
                    "title '{}' does not contain '{}'",
                    title, expected
                )));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        text(entry).map(|_| ())
    }
}

/// `element_exists: <selector>`
pub struct ElementExists;

#[async_trait]
impl ActionHandler for ElementExists {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        wait::element(browser, &selector, timeout).await.map(|_| ())
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `element_not_exists: <selector>` passes once nothing matches
pub struct ElementNotExists;

#[async_trait]
impl ActionHandler for ElementNotExists {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            let found = matching(browser, &selector).await?.len();
            if found == 0 {
                return Ok(());
            }
            if !waiter.next().await {
                return Err(Error::AssertionFailed(format!(
                    "expected no '{}' but found {}",
                    selector, found
                )));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

/// `count: { selector, count }` or `min_count: { selector, min }`
pub struct Count {
    at_least: bool,
}

impl Count {
    fn args(&self, entry: &ActionEntry) -> Result<(String, usize)> {
        let options = &entry.payload.options;
        let selector = required(entry, "selector", options.selector.clone())?;
        let (key, wanted) = if self.at_least {
            ("min", options.min)
        } else {
            ("count", options.count)
        };
        let wanted = wanted.ok_or_else(|| Error::invalid_payload(&entry.name, format!("missing {}", key)))?;
        Ok((selector, wanted as usize))
    }

    fn holds(&self, found: usize, wanted: usize) -> bool {
        if self.at_least {
            found >= wanted
        } else {
            found == wanted
        }
    }
}

#[async_trait]
impl ActionHandler for Count {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let (selector, wanted) = self.args(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            let found = matching(browser, &selector).await?.len();
            if self.holds(found, wanted) {
                return Ok(());
            }
            if !waiter.next().await {
                let relation = if self.at_least { "at least " } else { "" };
                return Err(Error::AssertionFailed(format!(
                    "expected {}{} '{}' but found {}",
                    relation, wanted, selector, found
                )));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        self.args(entry).map(|_| ())
    }
}

/// `has_class: { selector, class }`
pub struct HasClass;

impl HasClass {
    fn args(entry: &ActionEntry) -> Result<(String, String)> {
        let selector = required(entry, "selector", entry.payload.options.selector.clone())?;
        let class = required(entry, "class", entry.payload.options.class.clone())?;
        Ok((selector, class))
    }
}

#[async_trait]
impl ActionHandler for HasClass {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let (selector, class) = Self::args(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        loop {
            let mut classes = None;
            if let Some(first) = matching(browser, &selector).await?.into_iter().next() {
                classes = transient(browser.attribute(&first, "class").await)?.flatten();
            }
            if let Some(list) = &classes {
                if list.split_whitespace().any(|c| c == class) {
                    return Ok(());
                }
            }
            if !waiter.next().await {
                return Err(Error::AssertionFailed(format!(
                    "'{}' does not have class '{}' (class: '{}')",
                    selector,
                    class,
                    classes.unwrap_or_default()
                )));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        Self::args(entry).map(|_| ())
    }
}

/// `is_enabled: <selector>` / `is_disabled: <selector>`
pub struct Enabled {
    expected: bool,
}

#[async_trait]
impl ActionHandler for Enabled {
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let selector = selector(entry)?;
        let timeout = entry.payload.timeout_or(ELEMENT_TIMEOUT);
        let mut waiter = Waiter::start(timeout);
        let target = match wait::element(browser, &selector, waiter.remaining()).await {
            Ok(target) => target,
            Err(Error::ActionTimeout { .. }) => {
                return Err(Error::timeout(format!("element '{}'", selector), timeout))
            }
            Err(e) => return Err(e),
        };
        loop {
            if transient(browser.is_enabled(&target).await)? == Some(self.expected) {
                return Ok(());
            }
            if !waiter.next().await {
                let state = if self.expected { "enabled" } else { "disabled" };
                return Err(Error::AssertionFailed(format!("'{}' is not {}", selector, state)));
            }
        }
    }

    fn validate(&self, entry: &ActionEntry) -> Result<()> {
        selector(entry).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;
    use crate::dsl::payload::{Payload, PayloadOptions};
    use tokio::time::Instant;

    fn entry(name: &str, value: &str) -> ActionEntry {
        ActionEntry::new(name, Payload::text_shorthand(value))
    }

    fn with_options(name: &str, options: PayloadOptions) -> ActionEntry {
        ActionEntry::new(
            name,
            Payload {
                scalar: None,
                options,
            },
        )
    }

    async fn check(browser: &mut FakeBrowser, entry: ActionEntry) -> Result<()> {
        registry().dispatch(browser, &entry).await
    }

    async fn on_page(path: &str, build: impl FnOnce(&mut crate::browser::fake::FakePage)) -> FakeBrowser {
        let mut browser = FakeBrowser::new();
        build(browser.page(path));
        browser.navigate(path).await.unwrap();
        browser
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_waits_for_late_text() {
        let mut browser = on_page("/home", |p| {
            p.element_after("h1", "Welcome back", Duration::from_secs(3));
        })
        .await;
        check(&mut browser, entry("visible", "Welcome")).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_times_out_at_default() {
        let mut browser = on_page("/home", |_| {}).await;
        let started = Instant::now();
        let err = check(&mut browser, entry("visible", "Welcome")).await.unwrap_err();
        assert!(matches!(err, Error::ActionTimeout { timeout_ms: 20_000, .. }));
        assert!(started.elapsed() >= VISIBLE_TIMEOUT);
        assert!(started.elapsed() < VISIBLE_TIMEOUT + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_shorthand_and_explicit_forms_agree() {
        let mut browser = on_page("/home", |p| {
            p.element("h1", "Welcome");
        })
        .await;
        check(&mut browser, entry("visible", "Welcome")).await.unwrap();
        check(
            &mut browser,
            with_options(
                "visible",
                PayloadOptions {
                    text: Some("Welcome".to_string()),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_visible() {
        let mut browser = on_page("/home", |p| {
            p.hidden_element(".toast", "Saved").element("h1", "Home");
        })
        .await;
        check(&mut browser, entry("not_visible", "Saved")).await.unwrap();
        let err = check(&mut browser, entry("not_visible", "Home")).await.unwrap_err();
        assert!(matches!(err, Error::ActionTimeout { timeout_ms: 10_000, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_contains() {
        let mut browser = on_page("/customers/42", |_| {}).await;
        check(&mut browser, entry("url_contains", "/customers")).await.unwrap();

        let err = check(&mut browser, entry("url_contains", "/invoices")).await.unwrap_err();
        assert_eq!(err.name(), "ActionTimeout");
        assert!(err.to_string().contains("/customers/42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_matches() {
        let mut browser = on_page("/customers/42", |_| {}).await;
        let assertion = with_options(
            "url_matches",
            PayloadOptions {
                pattern: Some(r"/customers/\d+$".to_string()),
                ..Default::default()
            },
        );
        check(&mut browser, assertion).await.unwrap();

        let err = check(&mut browser, entry("url_matches", "(unclosed")).await.unwrap_err();
        assert_eq!(err.name(), "InvalidPayload");
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_text() {
        let mut browser = on_page("/home", |p| {
            p.element(".row", "Alpha").element(".row", "Acme Corp");
        })
        .await;
        let assertion = |text: &str| {
            with_options(
                "contains_text",
                PayloadOptions {
                    selector: Some(".row".to_string()),
                    text: Some(text.to_string()),
                    ..Default::default()
                },
            )
        };

        check(&mut browser, assertion("Acme")).await.unwrap();

        let err = check(&mut browser, assertion("Globex")).await.unwrap_err();
        assert_eq!(err.name(), "AssertionFailed");
        assert!(err.to_string().contains("Alpha | Acme Corp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_text_uses_short_default() {
        let mut browser = on_page("/home", |_| {}).await;
        let started = Instant::now();
        let err = check(
            &mut browser,
            with_options(
                "contains_text",
                PayloadOptions {
                    selector: Some(".row".to_string()),
                    text: Some("Acme".to_string()),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ActionTimeout { timeout_ms: 4000, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_contains() {
        let mut browser = on_page("/home", |p| {
            p.title("Dashboard | Acme");
        })
        .await;
        check(&mut browser, entry("title_contains", "Dashboard")).await.unwrap();
        assert!(check(&mut browser, entry("title_contains", "Billing")).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_element_existence() {
        let mut browser = on_page("/home", |p| {
            p.hidden_element("#modal", "");
        })
        .await;
        check(&mut browser, entry("element_exists", "#modal")).await.unwrap();
        check(&mut browser, entry("element_not_exists", "#error")).await.unwrap();

        let err = check(&mut browser, entry("element_not_exists", "#modal")).await.unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: expected no '#modal' but found 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_and_min_count() {
        let mut browser = on_page("/list", |p| {
            p.element("li", "a").element("li", "b").element("li", "c");
        })
        .await;
        let counted = |name: &str, count: Option<u64>, min: Option<u64>| {
            with_options(
                name,
                PayloadOptions {
                    selector: Some("li".to_string()),
                    count,
                    min,
                    ..Default::default()
                },
            )
        };

        check(&mut browser, counted("count", Some(3), None)).await.unwrap();
        check(&mut browser, counted("min_count", None, Some(2))).await.unwrap();

        let err = check(&mut browser, counted("count", Some(2), None)).await.unwrap_err();
        assert!(err.to_string().contains("expected 2 'li' but found 3"));

        let err = check(&mut browser, counted("min_count", None, None)).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid payload for 'min_count': missing min");
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_class() {
        let mut browser = on_page("/home", |p| {
            p.element_with_attr("#tab", "class", "tab tab-active");
        })
        .await;
        let assertion = |class: &str| {
            with_options(
                "has_class",
                PayloadOptions {
                    selector: Some("#tab".to_string()),
                    class: Some(class.to_string()),
                    ..Default::default()
                },
            )
        };
        check(&mut browser, assertion("tab-active")).await.unwrap();
        assert!(check(&mut browser, assertion("active")).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_state() {
        let mut browser = on_page("/form", |p| {
            p.element("#save", "Save").disabled_element("#delete", "Delete");
        })
        .await;
        check(&mut browser, entry("is_enabled", "#save")).await.unwrap();
        check(&mut browser, entry("is_disabled", "#delete")).await.unwrap();

        let err = check(&mut browser, entry("is_disabled", "#save")).await.unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: '#save' is not disabled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_wait_is_bounded_by_one_timeout() {
        let mut browser = on_page("/form", |p| {
            p.element_after("#save", "Save", Duration::from_millis(3900));
            if let Some(save) = p.elements.last_mut() {
                save.enabled = false;
            }
        })
        .await;

        let started = Instant::now();
        let err = check(&mut browser, entry("is_enabled", "#save")).await.unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: '#save' is not enabled");
        assert!(started.elapsed() <= ELEMENT_TIMEOUT, "waited {:?}", started.elapsed());
    }
}
