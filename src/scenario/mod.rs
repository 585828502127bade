//! Scenario documents: discovery, ordering, and parsing

mod document;
pub mod priority;
pub mod store;

pub use document::{ActionEntry, Priority, ScenarioDocument};
pub use priority::{order, read_module, PlannedScenario};
pub use store::discover;
