use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioSimError;
use crate::PortfolioSimResult;

/// Monetary amounts at the storage boundary. Simulation runs in f64.
pub type Money = Decimal;

/// A single aggregated holding, as returned by a position store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub quantity: Decimal,
    pub unit_value: Money,
}

impl Position {
    pub fn new(id: impl Into<String>, quantity: Decimal, unit_value: Money) -> Self {
        Position {
            id: id.into(),
            quantity,
            unit_value,
        }
    }

    /// `quantity * unit_value`, rejecting negative inputs and overflow.
    pub fn initial_value(&self) -> PortfolioSimResult<Money> {
        if self.quantity < Decimal::ZERO {
            return Err(PortfolioSimError::validation(
                "quantity",
                "Must be non-negative",
            ));
        }
        if self.unit_value < Decimal::ZERO {
            return Err(PortfolioSimError::validation(
                "unit_value",
                "Must be non-negative",
            ));
        }
        self.quantity
            .checked_mul(self.unit_value)
            .ok_or_else(|| PortfolioSimError::validation("initial_value", "Overflows"))
    }

    /// Initial value converted for simulation.
    pub fn initial_value_f64(&self) -> PortfolioSimResult<f64> {
        self.initial_value()?
            .to_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                PortfolioSimError::validation("initial_value", "Not representable as f64")
            })
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
