//! Action registries
//!
//! Two independent tables map an action name to a handler: one for steps
//! (state-changing) and one for assertions (state-checking). Adding an
//! action means registering a new [`ActionHandler`]; dispatch never changes.
//!
//! Registries are built once at startup and only read during a run.

pub mod assertions;
pub mod payload;
pub mod steps;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::browser::Browser;
use crate::common::{ActionKind, Error, Result};
use crate::scenario::{ActionEntry, ScenarioDocument};

/// Executable behavior behind one action name
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action against the browser. Steps change state, assertions
    /// verify it; both report failure through the error.
    async fn execute(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()>;

    /// Check the payload shape without touching a browser
    fn validate(&self, _entry: &ActionEntry) -> Result<()> {
        Ok(())
    }
}

/// Mapping from action name to handler
pub struct Registry {
    kind: ActionKind,
    handlers: BTreeMap<String, Box<dyn ActionHandler>>,
}

impl Registry {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` under `name`, replacing any previous handler
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered action names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    fn lookup(&self, name: &str) -> Result<&dyn ActionHandler> {
        self.handlers
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| Error::UnknownActionType {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    /// Execute `entry` with the handler registered under its action name
    pub async fn dispatch(&self, browser: &mut dyn Browser, entry: &ActionEntry) -> Result<()> {
        let handler = self.lookup(&entry.name)?;
        tracing::debug!(kind = %self.kind, action = %entry.name, "Dispatching");
        handler.execute(browser, entry).await
    }

    /// Resolve and shape-check `entry` without executing it
    pub fn validate(&self, entry: &ActionEntry) -> Result<()> {
        self.lookup(&entry.name)?.validate(entry)
    }
}

/// The step and assertion registries used by a run
pub struct Registries {
    pub steps: Registry,
    pub assertions: Registry,
}

impl Registries {
    /// Registries holding every built-in action
    pub fn builtin() -> Self {
        Self {
            steps: steps::registry(),
            assertions: assertions::registry(),
        }
    }

    /// Check that every entry of `document` names a known action with a
    /// usable payload
    pub fn validate_document(&self, document: &ScenarioDocument) -> Result<()> {
        let lists = [
            ("steps", &self.steps, &document.steps),
            ("assertions", &self.assertions, &document.assertions),
        ];
        for (list, registry, entries) in lists {
            for (index, entry) in entries.iter().enumerate() {
                registry.validate(entry).map_err(|e| {
                    Error::parse(&document.id, format!("{}[{}]: {}", list, index, e))
                })?;
            }
        }
        Ok(())
    }
}

/// Required string argument, or an invalid-payload error naming it
pub(crate) fn required(entry: &ActionEntry, what: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::invalid_payload(&entry.name, format!("missing {}", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeBrowser;
    use crate::dsl::payload::Payload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ActionHandler for Counting {
        async fn execute(&self, _browser: &mut dyn Browser, _entry: &ActionEntry) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_known_action() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new(ActionKind::Step);
        registry.register("noop", Counting(calls.clone()));

        let mut browser = FakeBrowser::new();
        let entry = ActionEntry::new("noop", Payload::default());
        registry.dispatch(&mut browser, &entry).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_action_names_it() {
        let registry = Registry::new(ActionKind::Step);
        let mut browser = FakeBrowser::new();
        let entry = ActionEntry::new("unknown_action", Payload::text_shorthand("x"));

        let err = registry.dispatch(&mut browser, &entry).await.unwrap_err();
        match err {
            Error::UnknownActionType { kind, name } => {
                assert_eq!(kind, ActionKind::Step);
                assert_eq!(name, "unknown_action");
            }
            other => panic!("Expected UnknownActionType, got {:?}", other),
        }
        assert!(browser.actions.is_empty());
    }

    #[tokio::test]
    async fn test_registries_are_independent() {
        let registries = Registries::builtin();
        assert!(registries.steps.contains("goto"));
        assert!(!registries.assertions.contains("goto"));
        assert!(registries.assertions.contains("visible"));
        assert!(!registries.steps.contains("visible"));

        let mut browser = FakeBrowser::new();
        let entry = ActionEntry::new("visible", Payload::text_shorthand("Welcome"));
        let err = registries.steps.dispatch(&mut browser, &entry).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown step type: visible");
    }

    #[test]
    fn test_register_extends_without_touching_dispatch() {
        let mut registry = steps::registry();
        let before = registry.names().count();
        registry.register("custom", Counting(Arc::new(AtomicUsize::new(0))));
        assert_eq!(registry.names().count(), before + 1);
        assert!(registry.validate(&ActionEntry::new("custom", Payload::default())).is_ok());
    }

    #[test]
    fn test_validate_document() {
        let registries = Registries::builtin();
        let parse = |yaml: &str| ScenarioDocument::parse(std::path::Path::new("a.yaml"), yaml).unwrap();

        let valid = parse("steps:\n  - goto: /home\nassertions:\n  - visible: Home\n");
        assert!(registries.validate_document(&valid).is_ok());

        let unknown = parse("steps:\n  - goto: /home\nassertions:\n  - goto: /other\n");
        let err = registries.validate_document(&unknown).unwrap_err();
        assert_eq!(err.name(), "ParseError");
        assert!(err.to_string().contains("assertions[0]: Unknown assertion type: goto"));

        let missing = parse("steps:\n  - type: { text: Acme }\n");
        let err = registries.validate_document(&missing).unwrap_err();
        assert!(err.to_string().contains("steps[0]: Invalid payload for 'type': missing selector"));
    }

    #[test]
    fn test_minimum_builtin_actions() {
        let registries = Registries::builtin();
        for name in [
            "goto",
            "click",
            "sidebar",
            "wait_for",
            "type",
            "click_if_visible",
            "open_module",
            "scroll_to",
        ] {
            assert!(registries.steps.contains(name), "missing step {}", name);
        }
        for name in ["visible", "url_contains", "contains_text"] {
            assert!(registries.assertions.contains(name), "missing assertion {}", name);
        }
    }
}
