pub mod request;
pub mod runner;

pub use request::{RiskFigures, SimulationRecord, SimulationRequest, SimulationSummary};
pub use runner::SimulationService;
