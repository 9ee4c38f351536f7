use clap::Args;
use serde_json::{json, Value};

use super::simulate::load_config;

/// Arguments for listing the scenario catalog
#[derive(Args)]
pub struct ScenariosArgs {
    /// Engine configuration JSON file; its custom scenarios are listed too
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = load_config(args.config.as_deref())?.catalog()?;

    let entries: Vec<Value> = catalog
        .entries()
        .into_iter()
        .map(|entry| {
            json!({
                "scenario_id": entry.name,
                "kind": if entry.builtin.is_some() { "builtin" } else { "custom" },
                "monthly_drift": entry.parameters.monthly_drift,
                "monthly_volatility": entry.parameters.monthly_volatility,
                "description": entry.builtin.map(|id| id.description()).unwrap_or(""),
            })
        })
        .collect();

    Ok(Value::Array(entries))
}
