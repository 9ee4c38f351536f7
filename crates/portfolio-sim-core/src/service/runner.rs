use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::request::{SimulationRecord, SimulationRequest};
use crate::config::EngineConfig;
use crate::error::PortfolioSimError;
use crate::scenarios::{ResolvedScenario, ScenarioCatalog};
use crate::simulation::{summarize, Deadline, PathSimulator, ShockDistribution, SimulationResult};
use crate::stores::{PositionStore, ResultStore};
use crate::PortfolioSimResult;

/// Orchestrates one simulation per request: validate, resolve the position
/// and scenario, simulate, aggregate, persist.
pub struct SimulationService<P, S> {
    positions: P,
    results: S,
    catalog: ScenarioCatalog,
    config: EngineConfig,
}

/// Everything the compute phase needs, fixed before it starts.
struct RunPlan {
    initial_value: f64,
    scenario: ResolvedScenario,
    horizon: u32,
    iterations: usize,
    distribution: ShockDistribution,
    seed: u64,
}

impl<P, S> SimulationService<P, S>
where
    P: PositionStore,
    S: ResultStore,
{
    pub fn new(positions: P, results: S, config: EngineConfig) -> PortfolioSimResult<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        Ok(SimulationService {
            positions,
            results,
            catalog,
            config,
        })
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn positions(&self) -> &P {
        &self.positions
    }

    pub fn results(&self) -> &S {
        &self.results
    }

    /// Run under the configured deadline, if any.
    pub fn run(&self, request: &SimulationRequest) -> PortfolioSimResult<SimulationRecord> {
        self.run_with_deadline(request, self.config.deadline())
    }

    /// Run under an explicit deadline measured from this call.
    pub fn run_with_deadline(
        &self,
        request: &SimulationRequest,
        deadline: Option<Duration>,
    ) -> PortfolioSimResult<SimulationRecord> {
        let start = Instant::now();
        let deadline = deadline.map(Deadline::starting_now);

        let plan = self.plan(request)?;
        info!(
            position_id = %request.position_id,
            scenario = %plan.scenario.name,
            horizon_months = plan.horizon,
            iterations = plan.iterations,
            seed = plan.seed,
            "starting simulation"
        );

        let result = self.compute(&plan, deadline)?;
        if let Some(deadline) = &deadline {
            deadline.check()?;
        }

        let record = SimulationRecord::new(
            request.position_id.clone(),
            plan.scenario.name.clone(),
            plan.initial_value,
            plan.distribution,
            plan.seed,
            result,
        );

        if let Err(e) = self.results.append(&record) {
            warn!(
                simulation_id = %record.simulation_id,
                error = %e,
                "simulation computed but not persisted"
            );
            return Err(PortfolioSimError::PersistenceFailed {
                reason: e.to_string(),
                record: Box::new(record),
            });
        }

        info!(
            simulation_id = %record.simulation_id,
            median = record.result.median,
            value_at_risk_95 = record.result.value_at_risk_95,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "simulation complete"
        );
        Ok(record)
    }

    /// Validate in order: position, scenario, bounds, initial value.
    fn plan(&self, request: &SimulationRequest) -> PortfolioSimResult<RunPlan> {
        let position = self
            .positions
            .position(&request.position_id)
            .map_err(|e| {
                warn!(position_id = %request.position_id, error = %e, "position lookup failed");
                PortfolioSimError::PositionNotFound(format!("{} ({e})", request.position_id))
            })?
            .ok_or_else(|| PortfolioSimError::PositionNotFound(request.position_id.clone()))?;

        let scenario = self.catalog.lookup(&request.scenario_id)?;
        let (horizon, iterations) = request.bounded(&self.config)?;

        let initial_value = position.initial_value_f64()?;
        if initial_value <= 0.0 {
            return Err(PortfolioSimError::validation(
                "initial_value",
                format!(
                    "Position '{}' has zero value; value at risk is undefined",
                    position.id
                ),
            ));
        }

        let seed = request
            .seed
            .or(self.config.seed)
            .unwrap_or_else(rand::random);
        let distribution = request
            .shock_distribution
            .unwrap_or(self.config.shock_distribution);

        debug!(
            position_id = %position.id,
            initial_value,
            drift = scenario.parameters.monthly_drift,
            volatility = scenario.parameters.monthly_volatility,
            ?distribution,
            "request validated"
        );

        Ok(RunPlan {
            initial_value,
            scenario,
            horizon,
            iterations,
            distribution,
            seed,
        })
    }

    /// Simulate and aggregate. A panic anywhere in here becomes
    /// `SimulationFailed`; no partial result escapes.
    fn compute(
        &self,
        plan: &RunPlan,
        deadline: Option<Deadline>,
    ) -> PortfolioSimResult<SimulationResult> {
        let mut simulator = PathSimulator::new(plan.distribution, plan.seed);
        if let Some(deadline) = deadline {
            simulator = simulator.with_deadline(deadline);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let started = Instant::now();
            let mut terminal = simulator.simulate(
                plan.initial_value,
                &plan.scenario.parameters,
                plan.horizon,
                plan.iterations,
            )?;
            debug!(
                paths = terminal.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "paths simulated"
            );
            summarize(&mut terminal, plan.initial_value, plan.horizon)
        }));

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(PortfolioSimError::SimulationFailed(panic_message(
                payload.as_ref(),
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Internal panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Internal panic: {s}")
    } else {
        "Internal panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{InMemoryPositionStore, InMemoryResultLog};
    use crate::types::Position;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    fn service() -> SimulationService<InMemoryPositionStore, InMemoryResultLog> {
        let positions: InMemoryPositionStore = vec![
            Position::new("acct-1", dec!(40), dec!(250)),
            Position::new("empty", dec!(0), dec!(250)),
        ]
        .into_iter()
        .collect();
        SimulationService::new(positions, InMemoryResultLog::new(), EngineConfig::default())
            .unwrap()
    }

    #[test]
    fn test_run_persists_one_record() {
        let svc = service();
        let req = SimulationRequest::new("acct-1", "bear_market", 12)
            .with_iterations(1_000)
            .with_seed(SEED);
        let record = svc.run(&req).unwrap();
        assert_eq!(record.initial_value, 10_000.0);
        assert_eq!(record.seed, SEED);
        assert_eq!(record.result.iteration_count, 1_000);
        let log = svc.results().records().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0], record);
    }

    #[test]
    fn test_position_checked_before_scenario() {
        let svc = service();
        let req = SimulationRequest::new("nobody", "moon_shot", 0);
        assert!(matches!(
            svc.run(&req),
            Err(PortfolioSimError::PositionNotFound(_))
        ));
    }

    #[test]
    fn test_scenario_checked_before_bounds() {
        let svc = service();
        let req = SimulationRequest::new("acct-1", "moon_shot", 0);
        assert!(matches!(
            svc.run(&req),
            Err(PortfolioSimError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_bounds_checked_before_initial_value() {
        let svc = service();
        let req = SimulationRequest::new("empty", "crash", 0);
        assert!(matches!(
            svc.run(&req),
            Err(PortfolioSimError::Validation { ref field, .. }) if field == "time_horizon_months"
        ));
    }

    #[test]
    fn test_zero_value_position_is_validation_error() {
        let svc = service();
        let req = SimulationRequest::new("empty", "crash", 12).with_seed(SEED);
        assert!(matches!(
            svc.run(&req),
            Err(PortfolioSimError::Validation { ref field, .. }) if field == "initial_value"
        ));
        assert!(svc.results().records().unwrap().is_empty());
    }

    #[test]
    fn test_config_seed_used_when_request_has_none() {
        let positions: InMemoryPositionStore =
            vec![Position::new("acct-1", dec!(1), dec!(10000))].into_iter().collect();
        let config = EngineConfig {
            seed: Some(99),
            ..EngineConfig::default()
        };
        let svc = SimulationService::new(positions, InMemoryResultLog::new(), config).unwrap();
        let req = SimulationRequest::new("acct-1", "recession", 6).with_iterations(200);
        assert_eq!(svc.run(&req).unwrap().seed, 99);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "Internal panic: boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "Internal panic: bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "Internal panic");
    }
}
