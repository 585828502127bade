//! Scripted in-memory browser for unit tests
//!
//! Pages are declared up front; selectors match by exact string equality.
//! Every state-changing call is recorded in `actions` so tests can assert
//! on what the runner did and in which order.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::common::{Error, Result};

use super::{resolve_url, Browser, ElementId};

pub const BASE_URL: &str = "http://app.test";

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub selector: String,
    pub text: String,
    pub displayed: bool,
    pub enabled: bool,
    pub appears_after: Duration,
    pub attributes: HashMap<String, String>,
    pub navigates_to: Option<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub elements: Vec<FakeElement>,
    pub redirect: Option<String>,
}

impl FakePage {
    fn push(&mut self, element: FakeElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn element(&mut self, selector: &str, text: &str) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            displayed: true,
            enabled: true,
            ..Default::default()
        })
    }

    pub fn hidden_element(&mut self, selector: &str, text: &str) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            displayed: false,
            enabled: true,
            ..Default::default()
        })
    }

    pub fn disabled_element(&mut self, selector: &str, text: &str) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            displayed: true,
            enabled: false,
            ..Default::default()
        })
    }

    pub fn element_after(&mut self, selector: &str, text: &str, delay: Duration) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            displayed: true,
            enabled: true,
            appears_after: delay,
            ..Default::default()
        })
    }

    pub fn element_with_attr(&mut self, selector: &str, name: &str, value: &str) -> &mut Self {
        let mut attributes = HashMap::new();
        attributes.insert(name.to_string(), value.to_string());
        self.push(FakeElement {
            selector: selector.to_string(),
            displayed: true,
            enabled: true,
            attributes,
            ..Default::default()
        })
    }

    pub fn select(&mut self, selector: &str, options: &[&str]) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            displayed: true,
            enabled: true,
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        })
    }

    /// Clicking the element with `selector` loads `path`
    pub fn link(&mut self, selector: &str, text: &str, path: &str) -> &mut Self {
        self.push(FakeElement {
            selector: selector.to_string(),
            text: text.to_string(),
            displayed: true,
            enabled: true,
            navigates_to: Some(path.to_string()),
            ..Default::default()
        })
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Loading this page lands on `path` instead
    pub fn redirect(&mut self, path: &str) -> &mut Self {
        self.redirect = Some(path.to_string());
        self
    }
}

#[derive(Debug)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    current: String,
    loaded_at: Instant,
    pub actions: Vec<String>,
    pub typed: HashMap<String, String>,
    pub selected: HashMap<String, String>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            current: "about:blank".to_string(),
            loaded_at: Instant::now(),
            actions: Vec::new(),
            typed: HashMap::new(),
            selected: HashMap::new(),
        }
    }

    /// Declare (or extend) the page served at `path`
    pub fn page(&mut self, path: &str) -> &mut FakePage {
        self.pages.entry(path.to_string()).or_default()
    }

    /// Standard login page whose submit button leads to `/dashboard`
    pub fn with_login(&mut self) -> &mut Self {
        self.page("/auth/login")
            .element(r#"input[name="email"]"#, "")
            .element(r#"input[name="password"]"#, "")
            .link(r#"button[type="submit"]"#, "Sign in", "/dashboard");
        self.page("/dashboard").element("h1", "Dashboard");
        self
    }

    pub fn current_path(&self) -> &str {
        &self.current
    }

    pub fn element_text(&self, id: &ElementId) -> String {
        self.lookup(id).map(|e| e.text.clone()).unwrap_or_default()
    }

    fn load(&mut self, path: &str) {
        let target = self
            .pages
            .get(path)
            .and_then(|p| p.redirect.clone())
            .unwrap_or_else(|| path.to_string());
        self.current = target;
        self.loaded_at = Instant::now();
    }

    fn present(&self) -> Vec<(usize, &FakeElement)> {
        let elapsed = self.loaded_at.elapsed();
        self.pages
            .get(&self.current)
            .map(|page| {
                page.elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.appears_after <= elapsed)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn id(&self, index: usize) -> ElementId {
        ElementId(format!("{}#{}", self.current, index))
    }

    fn lookup(&self, id: &ElementId) -> Result<&FakeElement> {
        let (page, index) = id
            .0
            .rsplit_once('#')
            .ok_or_else(|| Error::Internal(format!("bad fake element id {}", id)))?;
        if page != self.current {
            return Err(Error::StaleElement(id.0.clone()));
        }
        let index: usize = index
            .parse()
            .map_err(|_| Error::Internal(format!("bad fake element id {}", id)))?;
        self.pages
            .get(page)
            .and_then(|p| p.elements.get(index))
            .ok_or_else(|| Error::StaleElement(id.0.clone()))
    }

    fn interactable(&self, id: &ElementId) -> Result<&FakeElement> {
        let element = self.lookup(id)?;
        if !element.displayed {
            return Err(Error::WebDriver {
                command: "click".to_string(),
                error: "element not interactable".to_string(),
                message: format!("{} is not visible", element.selector),
            });
        }
        Ok(element)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, path: &str) -> Result<()> {
        let path = path.strip_prefix(BASE_URL).unwrap_or(path);
        self.actions.push(format!("navigate {}", path));
        self.load(path);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(resolve_url(BASE_URL, &self.current))
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self
            .pages
            .get(&self.current)
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>> {
        Ok(self
            .present()
            .into_iter()
            .filter(|(_, e)| e.selector == selector)
            .map(|(i, _)| self.id(i))
            .collect())
    }

    async fn find_by_text(&mut self, text: &str) -> Result<Vec<ElementId>> {
        Ok(self
            .present()
            .into_iter()
            .filter(|(_, e)| !text.is_empty() && e.text.contains(text))
            .map(|(i, _)| self.id(i))
            .collect())
    }

    async fn is_displayed(&mut self, element: &ElementId) -> Result<bool> {
        Ok(self.lookup(element)?.displayed)
    }

    async fn is_enabled(&mut self, element: &ElementId) -> Result<bool> {
        Ok(self.lookup(element)?.enabled)
    }

    async fn text(&mut self, element: &ElementId) -> Result<String> {
        Ok(self.lookup(element)?.text.clone())
    }

    async fn attribute(&mut self, element: &ElementId, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(element)?.attributes.get(name).cloned())
    }

    async fn click(&mut self, element: &ElementId) -> Result<()> {
        let target = self.interactable(element)?;
        let (selector, next) = (target.selector.clone(), target.navigates_to.clone());
        self.actions.push(format!("click {}", selector));
        if let Some(path) = next {
            self.load(&path);
        }
        Ok(())
    }

    async fn force_click(&mut self, element: &ElementId) -> Result<()> {
        let target = self.lookup(element)?;
        let (selector, next) = (target.selector.clone(), target.navigates_to.clone());
        self.actions.push(format!("force_click {}", selector));
        if let Some(path) = next {
            self.load(&path);
        }
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<()> {
        let selector = self.interactable(element)?.selector.clone();
        self.actions.push(format!("type {}", selector));
        self.typed.entry(selector).or_default().push_str(text);
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementId) -> Result<()> {
        let selector = self.lookup(element)?.selector.clone();
        self.actions.push(format!("scroll {}", selector));
        Ok(())
    }

    async fn select_option(&mut self, element: &ElementId, value: &str) -> Result<bool> {
        let target = self.interactable(element)?;
        if !target.options.iter().any(|o| o == value) {
            return Ok(false);
        }
        let selector = target.selector.clone();
        self.actions.push(format!("select {} {}", selector, value));
        self.selected.insert(selector, value.to_string());
        Ok(true)
    }

    async fn clear_session_state(&mut self) -> Result<()> {
        self.actions.push("clear_session".to_string());
        self.typed.clear();
        Ok(())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.actions.push(format!("viewport {}x{}", width, height));
        Ok(())
    }
}
