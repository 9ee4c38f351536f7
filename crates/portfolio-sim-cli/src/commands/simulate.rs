use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

use portfolio_sim_core::service::{SimulationRequest, SimulationService};
use portfolio_sim_core::simulation::ShockDistribution;
use portfolio_sim_core::stores::{
    InMemoryPositionStore, InMemoryResultLog, JsonPositionFile, JsonlResultLog, PositionStore,
    ResultStore,
};
use portfolio_sim_core::types::with_metadata;
use portfolio_sim_core::{EngineConfig, PortfolioSimError, Position};

use super::DistributionArg;
use crate::input;

const INLINE_POSITION_ID: &str = "inline";

/// Arguments for a single Monte Carlo risk simulation
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a JSON simulation request (stdin is read when omitted and no flags are given)
    #[arg(long)]
    pub input: Option<String>,

    /// Position to simulate
    #[arg(long)]
    pub position_id: Option<String>,

    /// Scenario id (e.g. bear_market, crash)
    #[arg(long)]
    pub scenario: Option<String>,

    /// Horizon in months
    #[arg(long, allow_hyphen_values = true)]
    pub horizon_months: Option<i64>,

    /// Number of simulated paths
    #[arg(long, allow_hyphen_values = true)]
    pub iterations: Option<i64>,

    /// Base seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Distribution of the per-step shock
    #[arg(long, value_enum)]
    pub distribution: Option<DistributionArg>,

    /// JSON file of positions
    #[arg(long, conflicts_with = "position_value")]
    pub positions: Option<String>,

    /// Simulate a single inline position worth this much
    #[arg(long)]
    pub position_value: Option<Decimal>,

    /// Append the completed record to this JSON-lines file
    #[arg(long)]
    pub results_log: Option<String>,

    /// Engine configuration JSON file
    #[arg(long)]
    pub config: Option<String>,

    /// Abort the run after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Emit the full record (all statistics, seed, distribution)
    #[arg(long)]
    pub full: bool,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let config = load_config(args.config.as_deref())?;
    let request = build_request(&args)?;
    let positions = position_store(&args, &request)?;
    let results: Box<dyn ResultStore> = match args.results_log {
        Some(ref path) => Box::new(JsonlResultLog::new(path)),
        None => Box::new(InMemoryResultLog::new()),
    };

    let deadline = args
        .timeout_ms
        .map(Duration::from_millis)
        .or_else(|| config.deadline());
    let service = SimulationService::new(positions, results, config)?;
    let record = service.run_with_deadline(&request, deadline)?;

    let mut warnings = Vec::new();
    if record.shock_distribution == ShockDistribution::Uniform {
        warnings.push(
            "Uniform shocks understate tail risk relative to a Gaussian model".to_string(),
        );
    }
    if record.result.iteration_count < 1_000 {
        warnings.push(format!(
            "Only {} paths simulated; tail percentiles are noisy",
            record.result.iteration_count
        ));
    }

    let result = if args.full {
        serde_json::to_value(&record)?
    } else {
        serde_json::to_value(record.summary())?
    };

    let output = with_metadata(
        "Monte Carlo value simulation (multiplicative monthly steps, floor at zero)",
        &json!({
            "position_id": record.position_id,
            "scenario_id": record.scenario_id,
            "time_horizon_months": record.result.time_horizon_months,
            "iteration_count": record.result.iteration_count,
            "seed": record.seed,
            "shock_distribution": record.shock_distribution,
            "initial_value": record.initial_value,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(output)?)
}

pub(crate) fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => input::file::read_json::<EngineConfig>(p, "config")?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Request from `--input`, else from flags, else from stdin. Explicit flags
/// override whatever the JSON request carried.
fn build_request(args: &SimulateArgs) -> Result<SimulationRequest, Box<dyn std::error::Error>> {
    let from_flags = args.scenario.is_some() || args.horizon_months.is_some();

    let mut request = if args.input.is_none() && from_flags {
        let scenario = args
            .scenario
            .clone()
            .ok_or_else(|| {
                PortfolioSimError::validation("scenario_id", "--scenario is required with flags")
            })?;
        let horizon = args
            .horizon_months
            .ok_or_else(|| {
                PortfolioSimError::validation(
                    "time_horizon_months",
                    "--horizon-months is required with flags",
                )
            })?;
        let position_id = args
            .position_id
            .clone()
            .unwrap_or_else(|| INLINE_POSITION_ID.to_string());
        SimulationRequest::new(position_id, scenario, horizon)
    } else {
        input::file_or_stdin::<SimulationRequest>(args.input.as_deref(), "request")?
            .ok_or_else(|| {
                PortfolioSimError::validation(
                    "request",
                    "--input <request.json>, stdin, or --scenario/--horizon-months required",
                )
            })?
    };

    if !from_flags {
        if let Some(ref id) = args.position_id {
            request.position_id = id.clone();
        }
    }
    if let Some(n) = args.iterations {
        request.iteration_count = Some(n);
    }
    if let Some(seed) = args.seed {
        request.seed = Some(seed);
    }
    if let Some(d) = args.distribution {
        request.shock_distribution = Some(d.into());
    }
    Ok(request)
}

fn position_store(
    args: &SimulateArgs,
    request: &SimulationRequest,
) -> Result<Box<dyn PositionStore>, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.positions {
        let store = input::file::resolve_path(path, "positions")
            .and_then(|resolved| JsonPositionFile::load(resolved))
            .map_err(|e| {
                PortfolioSimError::PositionNotFound(format!("{} ({e})", request.position_id))
            })?;
        debug!(path = %store.path().display(), positions = store.len(), "positions loaded");
        return Ok(Box::new(store));
    }
    if let Some(value) = args.position_value {
        let store: InMemoryPositionStore =
            std::iter::once(Position::new(request.position_id.clone(), Decimal::ONE, value))
                .collect();
        return Ok(Box::new(store));
    }
    Err(PortfolioSimError::validation(
        "position",
        "--positions <file.json> or --position-value <amount> required",
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_sim_core::ErrorKind;
    use rust_decimal_macros::dec;

    fn args(scenario: &str, horizon: i64) -> SimulateArgs {
        SimulateArgs {
            input: None,
            position_id: Some("acct-1".into()),
            scenario: Some(scenario.into()),
            horizon_months: Some(horizon),
            iterations: Some(500),
            seed: Some(42),
            distribution: None,
            positions: None,
            position_value: Some(dec!(10000)),
            results_log: None,
            config: None,
            timeout_ms: None,
            full: false,
        }
    }

    #[test]
    fn test_inline_position_summary() {
        let value = run_simulate(args("bear_market", 12)).unwrap();
        let result = &value["result"];
        assert!(result["simulation_id"].as_str().unwrap().starts_with("acct-1-"));
        assert!(result["results"]["median"].as_f64().unwrap() < 10_000.0);
        assert_eq!(value["assumptions"]["iteration_count"], 500);
        assert_eq!(value["warnings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_full_record_carries_statistics() {
        let mut a = args("crash", 6);
        a.full = true;
        a.distribution = Some(DistributionArg::Normal);
        let value = run_simulate(a).unwrap();
        assert_eq!(value["result"]["shock_distribution"], "normal");
        assert!(value["result"]["result"]["std_dev"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_errors_surface_as_core_errors() {
        assert_eq!(
            kind_of(run_simulate(args("bubble", 12))),
            ErrorKind::UnknownScenario
        );
    }

    #[test]
    fn test_missing_position_source_rejected() {
        let mut a = args("crash", 12);
        a.position_value = None;
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::ValidationError);
    }

    fn kind_of(result: Result<Value, Box<dyn std::error::Error>>) -> ErrorKind {
        result
            .unwrap_err()
            .downcast_ref::<PortfolioSimError>()
            .expect("typed error")
            .kind()
    }

    fn scratch(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!(
            "psim-{}-{}-{}",
            std::process::id(),
            scratch_nanos(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn scratch_nanos() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    }

    #[test]
    fn test_malformed_request_file_reports_validation() {
        let path = scratch(
            "request.json",
            r#"{"position_id": "acct-1", "scenario_id": "crash", "time_horizon_months": "twelve"}"#,
        );
        let mut a = args("crash", 12);
        a.scenario = None;
        a.horizon_months = None;
        a.input = Some(path.clone());
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::ValidationError);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_input_and_config_files_report_validation() {
        let mut a = args("crash", 12);
        a.scenario = None;
        a.horizon_months = None;
        a.input = Some("no/such/request.json".into());
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::ValidationError);

        let mut a = args("crash", 12);
        a.config = Some("no/such/config.json".into());
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::ValidationError);
    }

    #[test]
    fn test_unreadable_positions_file_reports_position_not_found() {
        let mut a = args("crash", 12);
        a.position_value = None;
        a.positions = Some("no/such/positions.json".into());
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::PositionNotFound);

        let path = scratch("positions.json", "not json");
        let mut a = args("crash", 12);
        a.position_value = None;
        a.positions = Some(path.clone());
        assert_eq!(kind_of(run_simulate(a)), ErrorKind::PositionNotFound);
        std::fs::remove_file(path).unwrap();
    }
}
