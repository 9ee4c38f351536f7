use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EngineConfig;
use crate::error::PortfolioSimError;
use crate::simulation::{ShockDistribution, SimulationResult};
use crate::PortfolioSimResult;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One simulation invocation. Integers are signed so that zero and negative
/// values reach validation instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub position_id: String,
    pub scenario_id: String,
    pub time_horizon_months: i64,
    /// Defaults to `EngineConfig::default_iterations`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_count: Option<i64>,
    /// Base seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Overrides `EngineConfig::shock_distribution`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shock_distribution: Option<ShockDistribution>,
}

impl SimulationRequest {
    pub fn new(
        position_id: impl Into<String>,
        scenario_id: impl Into<String>,
        time_horizon_months: i64,
    ) -> Self {
        SimulationRequest {
            position_id: position_id.into(),
            scenario_id: scenario_id.into(),
            time_horizon_months,
            iteration_count: None,
            seed: None,
            shock_distribution: None,
        }
    }

    pub fn with_iterations(mut self, iteration_count: i64) -> Self {
        self.iteration_count = Some(iteration_count);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_distribution(mut self, distribution: ShockDistribution) -> Self {
        self.shock_distribution = Some(distribution);
        self
    }

    /// Horizon and iteration count checked against the configured bounds.
    pub fn bounded(&self, config: &EngineConfig) -> PortfolioSimResult<(u32, usize)> {
        let horizon = self.time_horizon_months;
        if horizon <= 0 || horizon > i64::from(config.max_horizon_months) {
            return Err(PortfolioSimError::validation(
                "time_horizon_months",
                format!(
                    "Must be within [1, {}], got {horizon}",
                    config.max_horizon_months
                ),
            ));
        }

        let iterations = self
            .iteration_count
            .unwrap_or_else(|| i64::from(config.default_iterations));
        if iterations <= 0 {
            return Err(PortfolioSimError::validation(
                "iteration_count",
                format!("Must be positive, got {iterations}"),
            ));
        }
        if iterations < i64::from(config.min_iterations)
            || iterations > i64::from(config.max_iterations)
        {
            return Err(PortfolioSimError::validation(
                "iteration_count",
                format!(
                    "Must be within [{}, {}], got {iterations}",
                    config.min_iterations, config.max_iterations
                ),
            ));
        }

        Ok((horizon as u32, iterations as usize))
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Process-wide suffix keeping ids unique when two runs of the same position
/// share a timestamp.
static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A persisted simulation: inputs that determine the run plus its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub simulation_id: String,
    pub position_id: String,
    pub scenario_id: String,
    pub initial_value: f64,
    pub shock_distribution: ShockDistribution,
    pub seed: u64,
    pub result: SimulationResult,
}

/// Headline figures returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFigures {
    pub median: f64,
    pub p5: f64,
    pub p95: f64,
    pub max_loss: f64,
    pub value_at_risk_95: f64,
}

/// Success payload: `{ simulation_id, results }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub simulation_id: String,
    pub results: RiskFigures,
}

impl SimulationRecord {
    pub fn new(
        position_id: impl Into<String>,
        scenario_id: impl Into<String>,
        initial_value: f64,
        shock_distribution: ShockDistribution,
        seed: u64,
        result: SimulationResult,
    ) -> Self {
        let position_id = position_id.into();
        let simulation_id = format!(
            "{}-{}-{}",
            position_id,
            result.generated_at.format("%Y%m%dT%H%M%S%.6fZ"),
            RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        SimulationRecord {
            simulation_id,
            position_id,
            scenario_id: scenario_id.into(),
            initial_value,
            shock_distribution,
            seed,
            result,
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary {
            simulation_id: self.simulation_id.clone(),
            results: RiskFigures {
                median: self.result.median,
                p5: self.result.p5,
                p95: self.result.p95,
                max_loss: self.result.max_loss,
                value_at_risk_95: self.result.value_at_risk_95,
            },
        }
    }
}
