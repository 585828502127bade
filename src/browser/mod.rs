//! Browser automation interface
//!
//! The runner never talks to a concrete automation engine directly. Every
//! handler goes through the [`Browser`] trait, whose methods are single,
//! non-waiting primitives. Waiting with a bounded timeout is layered on top
//! in [`wait`].

pub mod wait;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::common::Result;

/// Opaque reference to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primitive operations the runner needs from a browser session
#[async_trait]
pub trait Browser: Send {
    /// Load `path`, resolved against the base URL when relative, and
    /// block until the page load finishes
    async fn navigate(&mut self, path: &str) -> Result<()>;

    /// Current location
    async fn current_url(&mut self) -> Result<String>;

    /// Document title
    async fn title(&mut self) -> Result<String>;

    /// All elements matching a CSS selector, in document order
    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>>;

    /// Deepest elements whose text content contains `text`
    async fn find_by_text(&mut self, text: &str) -> Result<Vec<ElementId>>;

    async fn is_displayed(&mut self, element: &ElementId) -> Result<bool>;

    async fn is_enabled(&mut self, element: &ElementId) -> Result<bool>;

    /// Rendered text of an element
    async fn text(&mut self, element: &ElementId) -> Result<String>;

    async fn attribute(&mut self, element: &ElementId, name: &str) -> Result<Option<String>>;

    /// User-level click: fails if the element is covered or not interactable
    async fn click(&mut self, element: &ElementId) -> Result<()>;

    /// Script-level click that ignores overlays and visibility
    async fn force_click(&mut self, element: &ElementId) -> Result<()>;

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<()>;

    async fn scroll_into_view(&mut self, element: &ElementId) -> Result<()>;

    /// Choose the `<option>` of a `<select>` whose value or label equals `value`
    async fn select_option(&mut self, element: &ElementId, value: &str) -> Result<bool>;

    /// Drop cookies plus local and session storage
    async fn clear_session_state(&mut self) -> Result<()>;

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()>;
}

/// Join a scenario path onto the base URL
///
/// Absolute URLs pass through untouched. Relative paths are appended to the
/// base, keeping any path prefix the base carries (`/reseller` + `/dashboard`
/// is `/reseller/dashboard`).
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.contains("://") || path.starts_with("about:") || path.starts_with("data:") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_keeps_base_prefix() {
        assert_eq!(
            resolve_url("https://shop.example.com/reseller", "/dashboard"),
            "https://shop.example.com/reseller/dashboard"
        );
        assert_eq!(
            resolve_url("https://shop.example.com/reseller/", "auth/login"),
            "https://shop.example.com/reseller/auth/login"
        );
    }

    #[test]
    fn test_resolve_absolute_passes_through() {
        assert_eq!(
            resolve_url("http://localhost:3000", "https://other.example.com/x"),
            "https://other.example.com/x"
        );
        assert_eq!(resolve_url("http://localhost:3000", "about:blank"), "about:blank");
    }

    #[test]
    fn test_resolve_root() {
        assert_eq!(resolve_url("http://localhost:3000", "/"), "http://localhost:3000/");
    }
}
