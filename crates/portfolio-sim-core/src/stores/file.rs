use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{InMemoryPositionStore, PositionStore, ResultStore};
use crate::error::PortfolioSimError;
use crate::service::SimulationRecord;
use crate::types::Position;
use crate::PortfolioSimResult;

/// Accepts either `{"positions": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum PositionDocument {
    Wrapped { positions: Vec<Position> },
    Bare(Vec<Position>),
}

/// Positions loaded once from a JSON document.
#[derive(Debug, Clone)]
pub struct JsonPositionFile {
    path: PathBuf,
    inner: InMemoryPositionStore,
}

impl JsonPositionFile {
    pub fn load(path: impl AsRef<Path>) -> PortfolioSimResult<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|e| {
            PortfolioSimError::Storage(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let inner = Self::parse(&contents)?;
        Ok(JsonPositionFile { path, inner })
    }

    fn parse(contents: &str) -> PortfolioSimResult<InMemoryPositionStore> {
        let positions = match serde_json::from_str::<PositionDocument>(contents)? {
            PositionDocument::Wrapped { positions } | PositionDocument::Bare(positions) => {
                positions
            }
        };
        Ok(positions.into_iter().collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PositionStore for JsonPositionFile {
    fn position(&self, position_id: &str) -> PortfolioSimResult<Option<Position>> {
        self.inner.position(position_id)
    }
}

/// Append-only JSON-lines file, one record per line.
#[derive(Debug)]
pub struct JsonlResultLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlResultLog {
    /// The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlResultLog {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the log, oldest first. A missing file is an empty log.
    pub fn read_all(&self) -> PortfolioSimResult<Vec<SimulationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl ResultStore for JsonlResultLog {
    fn append(&self, record: &SimulationRecord) -> PortfolioSimResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PortfolioSimError::Storage("Result log lock poisoned".into()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                PortfolioSimError::Storage(format!(
                    "Failed to open '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
