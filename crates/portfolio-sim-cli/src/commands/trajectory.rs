use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use portfolio_sim_core::simulation::PathSimulator;
use portfolio_sim_core::types::with_metadata;
use portfolio_sim_core::PortfolioSimError;

use super::simulate::load_config;
use super::DistributionArg;

/// Arguments for tracing one simulated path month by month
#[derive(Args)]
pub struct TrajectoryArgs {
    /// Scenario id (e.g. bear_market, crash)
    #[arg(long)]
    pub scenario: String,

    /// Horizon in months
    #[arg(long)]
    pub horizon_months: u32,

    /// Starting value of the path
    #[arg(long)]
    pub initial_value: f64,

    /// Base seed; the same seed and index reproduce a path from `simulate`
    #[arg(long)]
    pub seed: Option<u64>,

    /// Which path of the run to trace
    #[arg(long, default_value_t = 0)]
    pub path_index: u64,

    /// Distribution of the per-step shock
    #[arg(long, value_enum)]
    pub distribution: Option<DistributionArg>,

    /// Engine configuration JSON file
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_trajectory(args: TrajectoryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let scenario = config.catalog()?.lookup(&args.scenario)?;

    if args.horizon_months == 0 || args.horizon_months > config.max_horizon_months {
        return Err(PortfolioSimError::validation(
            "time_horizon_months",
            format!("Must be between 1 and {}", config.max_horizon_months),
        )
        .into());
    }
    if !(args.initial_value.is_finite() && args.initial_value > 0.0) {
        return Err(
            PortfolioSimError::validation("initial_value", "Must be positive and finite").into(),
        );
    }

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    let distribution = args
        .distribution
        .map(Into::into)
        .unwrap_or(config.shock_distribution);

    let values = PathSimulator::new(distribution, seed).trajectory(
        args.initial_value,
        &scenario.parameters,
        args.horizon_months,
        args.path_index,
    )?;

    let path: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(month, value)| json!({ "month": month, "value": value }))
        .collect();

    let output = with_metadata(
        "Single Monte Carlo path (multiplicative monthly steps, floor at zero)",
        &json!({
            "scenario_id": scenario.name,
            "time_horizon_months": args.horizon_months,
            "initial_value": args.initial_value,
            "seed": seed,
            "path_index": args.path_index,
            "shock_distribution": distribution,
        }),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        json!({ "path": path }),
    );
    Ok(serde_json::to_value(output)?)
}
