use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PortfolioSimError;
use crate::PortfolioSimResult;

/// Risk statistics over the terminal values of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub median: f64,
    pub p5: f64,
    pub p95: f64,
    /// Lowest terminal value observed.
    pub max_loss: f64,
    /// `(p5 - initial_value) / initial_value * 100`; negative means a loss.
    pub value_at_risk_95: f64,
    pub best_case: f64,
    pub worst_case: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Mean terminal value over the paths at or below `p5`.
    pub expected_shortfall_95: f64,
    /// Share of paths ending below the initial value.
    pub probability_of_loss: f64,
    pub iteration_count: usize,
    pub time_horizon_months: u32,
    pub generated_at: DateTime<Utc>,
}

impl SimulationResult {
    /// True when every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.median,
            self.p5,
            self.p95,
            self.max_loss,
            self.value_at_risk_95,
            self.best_case,
            self.worst_case,
            self.mean,
            self.std_dev,
            self.expected_shortfall_95,
            self.probability_of_loss,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Value at `floor(n * fraction)` of a sorted slice, clamped to the last index.
fn floor_percentile(sorted: &[f64], fraction: f64) -> f64 {
    let idx = ((sorted.len() as f64 * fraction).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Reduce terminal values to a [`SimulationResult`].
///
/// Sorts `terminal_values` in place. Percentiles use the floor-index rule
/// (`sorted[floor(n * q)]`) rather than interpolation, so they are always
/// observed path values.
pub fn summarize(
    terminal_values: &mut [f64],
    initial_value: f64,
    time_horizon_months: u32,
) -> PortfolioSimResult<SimulationResult> {
    if terminal_values.is_empty() {
        return Err(PortfolioSimError::validation(
            "terminal_values",
            "At least one terminal value is required",
        ));
    }
    if !initial_value.is_finite() || initial_value <= 0.0 {
        return Err(PortfolioSimError::validation(
            "initial_value",
            format!("Value at risk is undefined for an initial value of {initial_value}"),
        ));
    }
    if terminal_values.iter().any(|v| !v.is_finite()) {
        return Err(PortfolioSimError::SimulationFailed(
            "Non-finite terminal value".into(),
        ));
    }

    terminal_values.sort_by(|a, b| a.total_cmp(b));
    let sorted: &[f64] = terminal_values;
    let n = sorted.len() as f64;

    let median = floor_percentile(sorted, 0.5);
    let p5 = floor_percentile(sorted, 0.05);
    let p95 = floor_percentile(sorted, 0.95);
    let max_loss = sorted[0];
    let value_at_risk_95 = (p5 - initial_value) / initial_value * 100.0;

    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let tail: Vec<f64> = sorted.iter().copied().take_while(|v| *v <= p5).collect();
    let expected_shortfall_95 = tail.iter().sum::<f64>() / tail.len() as f64;

    let losing = sorted.partition_point(|v| *v < initial_value);
    let probability_of_loss = losing as f64 / n;

    let result = SimulationResult {
        median,
        p5,
        p95,
        max_loss,
        value_at_risk_95,
        best_case: p95,
        worst_case: p5,
        mean,
        std_dev,
        expected_shortfall_95,
        probability_of_loss,
        iteration_count: sorted.len(),
        time_horizon_months,
        generated_at: Utc::now(),
    };

    if !result.is_finite() {
        return Err(PortfolioSimError::SimulationFailed(
            "Aggregated statistics are not finite".into(),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_index_percentiles() {
        // Reversed 0..100, so sorted[k] == k.
        let mut values: Vec<f64> = (0..100).rev().map(f64::from).collect();
        let r = summarize(&mut values, 50.0, 12).unwrap();
        assert_eq!(r.median, 50.0);
        assert_eq!(r.p5, 5.0);
        assert_eq!(r.p95, 95.0);
        assert_eq!(r.max_loss, 0.0);
        assert_eq!(r.best_case, r.p95);
        assert_eq!(r.worst_case, r.p5);
        assert_eq!(r.iteration_count, 100);
        assert_eq!(r.time_horizon_months, 12);
    }

    #[test]
    fn test_value_at_risk_relative_to_initial() {
        let mut values: Vec<f64> = (0..100).map(|i| 80.0 + f64::from(i)).collect();
        let r = summarize(&mut values, 100.0, 12).unwrap();
        // p5 = 85 → (85 - 100) / 100 * 100 = -15
        assert!((r.value_at_risk_95 - (-15.0)).abs() < 1e-12);
    }

    #[test]
    fn test_ordering_invariant() {
        let mut values: Vec<f64> = (0..20).map(|i| ((i * 7919) % 20) as f64 * 3.5).collect();
        let r = summarize(&mut values, 10.0, 1).unwrap();
        assert!(r.max_loss <= r.p5);
        assert!(r.p5 <= r.median);
        assert!(r.median <= r.p95);
    }

    #[test]
    fn test_zero_initial_value_rejected() {
        let mut values = vec![0.0; 100];
        match summarize(&mut values, 0.0, 12) {
            Err(PortfolioSimError::Validation { field, .. }) => assert_eq!(field, "initial_value"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_rejected() {
        let mut values: Vec<f64> = vec![];
        assert!(summarize(&mut values, 100.0, 12).is_err());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut values = vec![1.0, f64::INFINITY, 3.0];
        assert!(matches!(
            summarize(&mut values, 1.0, 12),
            Err(PortfolioSimError::SimulationFailed(_))
        ));
    }

    #[test]
    fn test_single_value_collapses_percentiles() {
        let mut values = vec![42.0];
        let r = summarize(&mut values, 40.0, 3).unwrap();
        assert_eq!(r.median, 42.0);
        assert_eq!(r.p5, 42.0);
        assert_eq!(r.p95, 42.0);
        assert_eq!(r.std_dev, 0.0);
    }

    #[test]
    fn test_expected_shortfall_and_loss_probability() {
        let mut values: Vec<f64> = (1..=100).map(f64::from).collect();
        let r = summarize(&mut values, 50.0, 12).unwrap();
        // p5 = sorted[5] = 6 → tail is 1..=6, mean 3.5
        assert_eq!(r.p5, 6.0);
        assert!((r.expected_shortfall_95 - 3.5).abs() < 1e-12);
        // 1..=49 end below 50
        assert!((r.probability_of_loss - 0.49).abs() < 1e-12);
        assert!((r.mean - 50.5).abs() < 1e-12);
    }
}
