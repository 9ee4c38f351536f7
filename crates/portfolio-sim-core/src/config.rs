use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::PortfolioSimError;
use crate::scenarios::{ScenarioCatalog, ScenarioParameters};
use crate::simulation::ShockDistribution;
use crate::PortfolioSimResult;

/// Engine-wide policy: request bounds, sampling and scenario extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Paths per run when the request omits `iteration_count`.
    #[serde(default = "default_iterations")]
    pub default_iterations: u32,
    /// Smallest accepted `iteration_count`.
    #[serde(default = "default_min_iterations")]
    pub min_iterations: u32,
    /// Largest accepted `iteration_count`.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Largest accepted `time_horizon_months`.
    #[serde(default = "default_max_horizon_months")]
    pub max_horizon_months: u32,
    #[serde(default)]
    pub shock_distribution: ShockDistribution,
    /// Base seed when the request carries none. `None` draws from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Wall-clock budget per run, measured from request receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    /// Extra scenarios, keyed by name.
    #[serde(default)]
    pub custom_scenarios: BTreeMap<String, ScenarioParameters>,
}

fn default_iterations() -> u32 {
    10_000
}

fn default_min_iterations() -> u32 {
    100
}

fn default_max_iterations() -> u32 {
    1_000_000
}

fn default_max_horizon_months() -> u32 {
    600
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_iterations: default_iterations(),
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
            max_horizon_months: default_max_horizon_months(),
            shock_distribution: ShockDistribution::default(),
            seed: None,
            deadline_ms: None,
            custom_scenarios: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> PortfolioSimResult<()> {
        if self.min_iterations == 0 {
            return Err(PortfolioSimError::validation(
                "min_iterations",
                "Must be at least 1",
            ));
        }
        if self.min_iterations > self.max_iterations {
            return Err(PortfolioSimError::validation(
                "min_iterations",
                format!(
                    "Must not exceed max_iterations ({})",
                    self.max_iterations
                ),
            ));
        }
        if !(self.min_iterations..=self.max_iterations).contains(&self.default_iterations) {
            return Err(PortfolioSimError::validation(
                "default_iterations",
                format!(
                    "Must be within [{}, {}]",
                    self.min_iterations, self.max_iterations
                ),
            ));
        }
        if self.max_horizon_months == 0 {
            return Err(PortfolioSimError::validation(
                "max_horizon_months",
                "Must be at least 1",
            ));
        }
        for (name, params) in &self.custom_scenarios {
            params.validate().map_err(|e| match e {
                PortfolioSimError::Validation { field, reason } => PortfolioSimError::Validation {
                    field: format!("custom_scenarios.{name}.{field}"),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Built-in catalog extended with `custom_scenarios`.
    pub fn catalog(&self) -> PortfolioSimResult<ScenarioCatalog> {
        self.custom_scenarios
            .iter()
            .try_fold(ScenarioCatalog::builtin(), |catalog, (name, params)| {
                catalog.with_custom(name.clone(), *params)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_iterations, 10_000);
        assert_eq!(config.shock_distribution, ShockDistribution::Uniform);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.min_iterations, 100);
        assert_eq!(config.max_iterations, 1_000_000);
        assert_eq!(config.max_horizon_months, 600);
        assert!(config.deadline().is_none());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "max_iterations": 50000,
                "shock_distribution": "normal",
                "deadline_ms": 250,
                "custom_scenarios": {
                    "soft_landing": { "monthly_drift": 0.003, "monthly_volatility": 0.08 }
                }
            }"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 50_000);
        assert_eq!(config.shock_distribution, ShockDistribution::Normal);
        assert_eq!(config.deadline(), Some(Duration::from_millis(250)));
        let catalog = config.catalog().unwrap();
        assert!(catalog.lookup("soft_landing").is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = EngineConfig {
            min_iterations: 500,
            max_iterations: 100,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_outside_bounds_rejected() {
        let config = EngineConfig {
            max_iterations: 5_000,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_custom_scenario_names_field() {
        let mut config = EngineConfig::default();
        config.custom_scenarios.insert(
            "moon_shot".into(),
            ScenarioParameters {
                monthly_drift: 2.0,
                monthly_volatility: 0.1,
            },
        );
        match config.validate() {
            Err(PortfolioSimError::Validation { field, .. }) => {
                assert_eq!(field, "custom_scenarios.moon_shot.monthly_drift")
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
