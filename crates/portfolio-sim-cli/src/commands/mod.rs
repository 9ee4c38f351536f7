pub mod scenarios;
pub mod simulate;
pub mod trajectory;

use clap::ValueEnum;
use portfolio_sim_core::simulation::ShockDistribution;

/// Command-line spelling of [`ShockDistribution`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DistributionArg {
    Uniform,
    Normal,
}

impl From<DistributionArg> for ShockDistribution {
    fn from(arg: DistributionArg) -> Self {
        match arg {
            DistributionArg::Uniform => ShockDistribution::Uniform,
            DistributionArg::Normal => ShockDistribution::Normal,
        }
    }
}
