//! Collaborators the simulation service talks to: a position lookup and an
//! append-only result log.

pub mod memory;

#[cfg(feature = "file_stores")]
pub mod file;

use crate::service::SimulationRecord;
use crate::types::Position;
use crate::PortfolioSimResult;

pub use memory::{InMemoryPositionStore, InMemoryResultLog};

#[cfg(feature = "file_stores")]
pub use file::{JsonPositionFile, JsonlResultLog};

/// Read-only access to positions by id.
pub trait PositionStore: Send + Sync {
    /// `Ok(None)` when the id is unknown; `Err` when the store itself fails.
    fn position(&self, position_id: &str) -> PortfolioSimResult<Option<Position>>;
}

/// Append-only sink for completed simulation records.
pub trait ResultStore: Send + Sync {
    fn append(&self, record: &SimulationRecord) -> PortfolioSimResult<()>;
}

impl<T: PositionStore + ?Sized> PositionStore for &T {
    fn position(&self, position_id: &str) -> PortfolioSimResult<Option<Position>> {
        (**self).position(position_id)
    }
}

impl<T: ResultStore + ?Sized> ResultStore for &T {
    fn append(&self, record: &SimulationRecord) -> PortfolioSimResult<()> {
        (**self).append(record)
    }
}

impl<T: PositionStore + ?Sized> PositionStore for Box<T> {
    fn position(&self, position_id: &str) -> PortfolioSimResult<Option<Position>> {
        (**self).position(position_id)
    }
}

impl<T: ResultStore + ?Sized> ResultStore for Box<T> {
    fn append(&self, record: &SimulationRecord) -> PortfolioSimResult<()> {
        (**self).append(record)
    }
}
