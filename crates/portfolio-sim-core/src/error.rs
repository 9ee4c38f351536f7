use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::service::SimulationRecord;

#[derive(Debug, Error)]
pub enum PortfolioSimError {
    #[error("Invalid input: {field} — {reason}")]
    Validation { field: String, reason: String },

    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Unknown scenario: '{0}'")]
    UnknownScenario(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulation timed out after {elapsed_ms} ms (deadline {deadline_ms} ms)")]
    TimedOut { elapsed_ms: u64, deadline_ms: u64 },

    /// The simulation completed but the record could not be written.
    /// The computed record is kept so callers can still use it.
    #[error("Simulation failed: result {} computed but not persisted: {reason}", .record.simulation_id)]
    PersistenceFailed {
        reason: String,
        record: Box<SimulationRecord>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioSimError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PortfolioSimError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Transport-level classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortfolioSimError::Validation { .. } => ErrorKind::ValidationError,
            PortfolioSimError::PositionNotFound(_) => ErrorKind::PositionNotFound,
            PortfolioSimError::UnknownScenario(_) => ErrorKind::UnknownScenario,
            PortfolioSimError::TimedOut { .. } => ErrorKind::TimedOut,
            PortfolioSimError::SimulationFailed(_)
            | PortfolioSimError::PersistenceFailed { .. }
            | PortfolioSimError::Storage(_)
            | PortfolioSimError::SerializationError(_) => ErrorKind::SimulationFailed,
        }
    }

    /// The computed-but-unpersisted record, if this is a persistence failure.
    pub fn unpersisted_record(&self) -> Option<&SimulationRecord> {
        match self {
            PortfolioSimError::PersistenceFailed { record, .. } => Some(&**record),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PortfolioSimError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioSimError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for PortfolioSimError {
    fn from(e: std::io::Error) -> Self {
        PortfolioSimError::Storage(e.to_string())
    }
}

/// The five failure kinds exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    PositionNotFound,
    UnknownScenario,
    SimulationFailed,
    TimedOut,
}

/// Failure payload: `{ error_kind, message }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error_kind: ErrorKind,
    pub message: String,
}

impl From<&PortfolioSimError> for ErrorReport {
    fn from(e: &PortfolioSimError) -> Self {
        ErrorReport {
            error_kind: e.kind(),
            message: e.to_string(),
        }
    }
}
