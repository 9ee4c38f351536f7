use std::collections::HashMap;
use std::sync::Mutex;

use super::{PositionStore, ResultStore};
use crate::error::PortfolioSimError;
use crate::service::SimulationRecord;
use crate::types::Position;
use crate::PortfolioSimResult;

/// Positions held in a map, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPositionStore {
    positions: HashMap<String, Position>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a position.
    pub fn insert(&mut self, position: Position) {
        self.positions.insert(position.id.clone(), position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<Position> for InMemoryPositionStore {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut store = InMemoryPositionStore::new();
        for position in iter {
            store.insert(position);
        }
        store
    }
}

impl PositionStore for InMemoryPositionStore {
    fn position(&self, position_id: &str) -> PortfolioSimResult<Option<Position>> {
        Ok(self.positions.get(position_id).cloned())
    }
}

/// Append-only record log kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryResultLog {
    records: Mutex<Vec<SimulationRecord>>,
}

impl InMemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far, oldest first.
    pub fn records(&self) -> PortfolioSimResult<Vec<SimulationRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| PortfolioSimError::Storage("Result log lock poisoned".into()))
    }

    /// Records for one position, oldest first.
    pub fn records_for(&self, position_id: &str) -> PortfolioSimResult<Vec<SimulationRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.position_id == position_id)
            .collect())
    }
}

impl ResultStore for InMemoryResultLog {
    fn append(&self, record: &SimulationRecord) -> PortfolioSimResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| PortfolioSimError::Storage("Result log lock poisoned".into()))?;
        records.push(record.clone());
        Ok(())
    }
}
