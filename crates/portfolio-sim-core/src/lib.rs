pub mod config;
pub mod error;
pub mod scenarios;
pub mod service;
pub mod simulation;
pub mod stores;
pub mod types;

pub use config::EngineConfig;
pub use error::{ErrorKind, ErrorReport, PortfolioSimError};
pub use types::*;

/// Standard result type for all portfolio-sim operations
pub type PortfolioSimResult<T> = Result<T, PortfolioSimError>;
