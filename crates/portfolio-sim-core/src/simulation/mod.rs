pub mod aggregate;
pub mod paths;

pub use aggregate::{summarize, SimulationResult};
pub use paths::{path_seed, Deadline, PathSimulator, ShockDistribution};
