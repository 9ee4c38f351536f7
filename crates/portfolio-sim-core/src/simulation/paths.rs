use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Normal, Uniform};
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use crate::error::PortfolioSimError;
use crate::scenarios::ScenarioParameters;
use crate::PortfolioSimResult;

/// sqrt(1/12): scales the monthly volatility onto one step.
const STEP_SCALE: f64 = 0.288_675_134_594_812_9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Distribution of the per-step shock `Z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockDistribution {
    /// Z ~ U[-1, 1]. Thinner tails than a Gaussian model.
    #[default]
    Uniform,
    /// Z ~ N(0, 1).
    Normal,
}

/// Wall-clock budget for a simulation, measured from `start`.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Duration,
}

/// Evolves independent value trajectories under a scenario.
///
/// Path `i` draws from its own generator seeded from `(base_seed, i)`, so the
/// terminal values do not depend on how rayon splits the work. `R` is the
/// generator type; `StdRng` unless built with [`PathSimulator::with_rng`].
#[derive(Debug, Clone)]
pub struct PathSimulator<R = StdRng> {
    distribution: ShockDistribution,
    base_seed: u64,
    deadline: Option<Deadline>,
    _rng: PhantomData<fn() -> R>,
}

#[derive(Debug, Clone)]
enum Shock {
    Uniform(Uniform),
    Normal(Normal),
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

impl Shock {
    fn new(distribution: ShockDistribution) -> PortfolioSimResult<Self> {
        match distribution {
            ShockDistribution::Uniform => Uniform::new(-1.0, 1.0)
                .map(Shock::Uniform)
                .map_err(|e| {
                    PortfolioSimError::SimulationFailed(format!("Invalid Uniform shock: {e}"))
                }),
            ShockDistribution::Normal => Normal::new(0.0, 1.0)
                .map(Shock::Normal)
                .map_err(|e| {
                    PortfolioSimError::SimulationFailed(format!("Invalid Normal shock: {e}"))
                }),
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Shock::Uniform(u) => rng.sample(u),
            Shock::Normal(n) => rng.sample(n),
        }
    }
}

/// Seed for one path, mixed so neighbouring indices give unrelated streams.
pub fn path_seed(base_seed: u64, path_index: u64) -> u64 {
    let mut z = base_seed ^ path_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Clamp to the absorbing floor. NaN passes through so it is caught later.
fn floor_at_zero(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

fn step(value: f64, params: &ScenarioParameters, z: f64) -> f64 {
    floor_at_zero(
        value
            + params.monthly_drift * value
            + params.monthly_volatility * STEP_SCALE * z * value,
    )
}

fn run_path<R: Rng + ?Sized>(
    initial_value: f64,
    params: &ScenarioParameters,
    time_horizon_months: u32,
    shock: &Shock,
    rng: &mut R,
    mut on_step: impl FnMut(f64),
) -> f64 {
    let mut value = initial_value;
    for _ in 0..time_horizon_months {
        // Zero is absorbing: no further shock can revive the path.
        if value == 0.0 {
            on_step(0.0);
            continue;
        }
        value = step(value, params, shock.draw(rng));
        on_step(value);
    }
    value
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

impl Deadline {
    pub fn starting_now(limit: Duration) -> Self {
        Deadline {
            start: Instant::now(),
            limit,
        }
    }

    pub fn check(&self) -> PortfolioSimResult<()> {
        let elapsed = self.start.elapsed();
        if elapsed > self.limit {
            return Err(PortfolioSimError::TimedOut {
                elapsed_ms: elapsed.as_millis() as u64,
                deadline_ms: self.limit.as_millis() as u64,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl PathSimulator<StdRng> {
    pub fn new(distribution: ShockDistribution, base_seed: u64) -> Self {
        PathSimulator::with_rng(distribution, base_seed)
    }
}

impl<R> PathSimulator<R>
where
    R: Rng + SeedableRng,
{
    /// Simulator drawing shocks from generator type `R`.
    pub fn with_rng(distribution: ShockDistribution, base_seed: u64) -> Self {
        PathSimulator {
            distribution,
            base_seed,
            deadline: None,
            _rng: PhantomData,
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn distribution(&self) -> ShockDistribution {
        self.distribution
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Terminal values of `iteration_count` independent paths.
    ///
    /// Fails with `TimedOut` once the deadline passes and with
    /// `SimulationFailed` if any path ends non-finite.
    pub fn simulate(
        &self,
        initial_value: f64,
        params: &ScenarioParameters,
        time_horizon_months: u32,
        iteration_count: usize,
    ) -> PortfolioSimResult<Vec<f64>> {
        check_initial_value(initial_value)?;
        let shock = Shock::new(self.distribution)?;

        let terminal: Vec<f64> = (0..iteration_count)
            .into_par_iter()
            .map(|i| {
                if let Some(deadline) = &self.deadline {
                    deadline.check()?;
                }
                let mut rng = R::seed_from_u64(path_seed(self.base_seed, i as u64));
                Ok(run_path(
                    initial_value,
                    params,
                    time_horizon_months,
                    &shock,
                    &mut rng,
                    |_| {},
                ))
            })
            .collect::<PortfolioSimResult<Vec<f64>>>()?;

        if let Some(i) = terminal.iter().position(|v| !v.is_finite()) {
            return Err(PortfolioSimError::SimulationFailed(format!(
                "Path {i} produced a non-finite terminal value"
            )));
        }
        Ok(terminal)
    }

    /// Month-by-month values of path `path_index`, starting with
    /// `initial_value`. The last element equals that path's terminal value
    /// from [`simulate`](Self::simulate).
    pub fn trajectory(
        &self,
        initial_value: f64,
        params: &ScenarioParameters,
        time_horizon_months: u32,
        path_index: u64,
    ) -> PortfolioSimResult<Vec<f64>> {
        check_initial_value(initial_value)?;
        let shock = Shock::new(self.distribution)?;
        let mut rng = R::seed_from_u64(path_seed(self.base_seed, path_index));

        let mut values = Vec::with_capacity(time_horizon_months as usize + 1);
        values.push(initial_value);
        run_path(
            initial_value,
            params,
            time_horizon_months,
            &shock,
            &mut rng,
            |v| values.push(v),
        );
        Ok(values)
    }
}

fn check_initial_value(initial_value: f64) -> PortfolioSimResult<()> {
    if !initial_value.is_finite() || initial_value < 0.0 {
        return Err(PortfolioSimError::validation(
            "initial_value",
            format!("Must be finite and non-negative, got {initial_value}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
