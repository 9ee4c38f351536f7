use portfolio_sim_core::scenarios::{ScenarioCatalog, ScenarioId};
use portfolio_sim_core::simulation::{summarize, PathSimulator, ShockDistribution};
use portfolio_sim_core::PortfolioSimError;

const SEED: u64 = 42;

fn run(
    scenario: ScenarioId,
    distribution: ShockDistribution,
    seed: u64,
    initial_value: f64,
    horizon: u32,
    iterations: usize,
) -> portfolio_sim_core::simulation::SimulationResult {
    let mut terminal = PathSimulator::new(distribution, seed)
        .simulate(initial_value, &scenario.parameters(), horizon, iterations)
        .unwrap();
    summarize(&mut terminal, initial_value, horizon).unwrap()
}

fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

// ===========================================================================
// Path properties
// ===========================================================================

#[test]
fn test_every_scenario_yields_n_non_negative_terminal_values() {
    for distribution in [ShockDistribution::Uniform, ShockDistribution::Normal] {
        for id in ScenarioId::ALL {
            for n in [1, 20, 777] {
                let values = PathSimulator::new(distribution, SEED)
                    .simulate(10_000.0, &id.parameters(), 24, n)
                    .unwrap();
                assert_eq!(values.len(), n);
                assert!(values.iter().all(|v| *v >= 0.0 && v.is_finite()));
            }
        }
    }
}

#[test]
fn test_percentile_ordering_holds_from_twenty_paths() {
    for id in ScenarioId::ALL {
        for n in [20, 21, 100, 5_000] {
            for seed in 0..5 {
                let r = run(id, ShockDistribution::Uniform, seed, 10_000.0, 12, n);
                assert!(r.max_loss <= r.p5, "{id} n={n}");
                assert!(r.p5 <= r.median, "{id} n={n}");
                assert!(r.median <= r.p95, "{id} n={n}");
            }
        }
    }
}

// ===========================================================================
// Statistical behaviour
// ===========================================================================

#[test]
fn test_median_variance_shrinks_with_more_iterations() {
    let medians = |n: usize| -> Vec<f64> {
        (0..6)
            .map(|seed| {
                run(ScenarioId::BearMarket, ShockDistribution::Uniform, seed, 10_000.0, 12, n)
                    .median
            })
            .collect()
    };
    let small = sample_variance(&medians(100));
    let large = sample_variance(&medians(100_000));
    assert!(
        large < small,
        "variance at 100k ({large}) should be below variance at 100 ({small})"
    );
}

#[test]
fn test_crash_value_at_risk_is_negative() {
    for distribution in [ShockDistribution::Uniform, ShockDistribution::Normal] {
        let r = run(ScenarioId::Crash, distribution, SEED, 10_000.0, 12, 10_000);
        assert!(
            r.value_at_risk_95 < 0.0,
            "VaR should be negative, got {}",
            r.value_at_risk_95
        );
    }
}

#[test]
fn test_bull_market_median_above_initial() {
    let r = run(ScenarioId::BullMarket, ShockDistribution::Uniform, SEED, 10_000.0, 12, 10_000);
    assert!(r.median > 10_000.0, "median={}", r.median);
}

#[test]
fn test_scenarios_ranked_by_drift() {
    let median = |id| run(id, ShockDistribution::Uniform, SEED, 10_000.0, 12, 10_000).median;
    assert!(median(ScenarioId::BullMarket) > median(ScenarioId::Stagflation));
    assert!(median(ScenarioId::Stagflation) > median(ScenarioId::Recession));
    assert!(median(ScenarioId::Recession) > median(ScenarioId::BearMarket));
    assert!(median(ScenarioId::BearMarket) > median(ScenarioId::Crash));
}

#[test]
fn test_normal_shocks_widen_the_tails() {
    let uniform = run(
        ScenarioId::Stagflation,
        ShockDistribution::Uniform,
        SEED,
        10_000.0,
        24,
        20_000,
    );
    let normal = run(
        ScenarioId::Stagflation,
        ShockDistribution::Normal,
        SEED,
        10_000.0,
        24,
        20_000,
    );
    // Same scale, unit variance versus 1/3: the Gaussian spread is wider.
    assert!(normal.p95 - normal.p5 > uniform.p95 - uniform.p5);
    assert!(normal.value_at_risk_95 < uniform.value_at_risk_95);
}

#[test]
fn test_bear_market_end_to_end_figures() {
    let r = run(ScenarioId::BearMarket, ShockDistribution::Uniform, SEED, 10_000.0, 12, 10_000);
    assert!(r.median < 9_500.0, "median={}", r.median);
    assert!(r.max_loss >= 0.0);
    assert!(r.p95 > r.median);
    assert_eq!(r.iteration_count, 10_000);
    assert_eq!(r.time_horizon_months, 12);
    assert!(r.is_finite());
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn test_zero_initial_value_never_yields_nan() {
    let mut terminal = PathSimulator::new(ShockDistribution::Uniform, SEED)
        .simulate(0.0, &ScenarioId::Crash.parameters(), 12, 1_000)
        .unwrap();
    match summarize(&mut terminal, 0.0, 12) {
        Err(PortfolioSimError::Validation { .. }) => {}
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn test_unknown_scenarios_rejected() {
    let catalog = ScenarioCatalog::builtin();
    for id in ["bubble", "BEAR_MARKET", "recession2", "flash-crash"] {
        assert!(matches!(
            catalog.lookup(id),
            Err(PortfolioSimError::UnknownScenario(_))
        ));
    }
}
