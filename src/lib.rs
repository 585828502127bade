//! Smoke runner - declarative browser smoke tests
//!
//! Scenario documents describe steps and assertions as single-key action
//! entries. The runner discovers them, orders them by priority, resets an
//! authenticated browser session before each one, and records every failure
//! in a persistent JSON log. Only `high` priority failures fail the suite.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod dsl;
pub mod runner;
pub mod scenario;
pub mod webdriver;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use runner::{ErrorLog, RunRecord};
pub use scenario::Priority;
