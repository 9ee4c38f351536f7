mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::scenarios::ScenariosArgs;
use commands::simulate::SimulateArgs;
use commands::trajectory::TrajectoryArgs;
use portfolio_sim_core::PortfolioSimError;

/// Scenario-based Monte Carlo risk simulation for portfolio positions
#[derive(Parser)]
#[command(
    name = "psim",
    version,
    about = "Scenario-based Monte Carlo risk simulation for portfolio positions",
    long_about = "Simulates the value of a portfolio position over a monthly horizon under \
                  a named market scenario and reports the median, 5th/95th percentiles, \
                  worst-case loss and 95% value at risk of the terminal value."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log at debug level to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Monte Carlo simulation for one position under one scenario
    Simulate(SimulateArgs),
    /// List the scenario catalog
    Scenarios(ScenariosArgs),
    /// Trace a single simulated path month by month
    Trajectory(TrajectoryArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Trajectory(args) => commands::trajectory::run_trajectory(args),
        Commands::Version => {
            println!("psim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            if let Some(sim_err) = e.downcast_ref::<PortfolioSimError>() {
                let report = output::failure_report(sim_err);
                output::format_output(&cli.output, &report);
            }
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
