pub mod catalog;

pub use catalog::{ResolvedScenario, ScenarioCatalog, ScenarioId, ScenarioParameters};
