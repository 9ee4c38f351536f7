use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioSimError;
use crate::PortfolioSimResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The closed set of built-in macroeconomic scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    BullMarket,
    BearMarket,
    Stagflation,
    Recession,
    Crash,
}

/// Monthly drift and volatility driving the path update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Expected fractional change per month (signed).
    pub monthly_drift: f64,
    /// Shock scale per month; applied as `volatility * sqrt(1/12) * Z`.
    pub monthly_volatility: f64,
}

/// A catalog entry resolved for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub name: String,
    /// `None` for custom parameter sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin: Option<ScenarioId>,
    pub parameters: ScenarioParameters,
}

/// Scenario lookup table: the five built-ins plus any custom sets
/// registered at configuration time.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    custom: BTreeMap<String, ScenarioParameters>,
}

// ---------------------------------------------------------------------------
// Built-in scenarios
// ---------------------------------------------------------------------------

impl ScenarioId {
    pub const ALL: [ScenarioId; 5] = [
        ScenarioId::BullMarket,
        ScenarioId::BearMarket,
        ScenarioId::Stagflation,
        ScenarioId::Recession,
        ScenarioId::Crash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::BullMarket => "bull_market",
            ScenarioId::BearMarket => "bear_market",
            ScenarioId::Stagflation => "stagflation",
            ScenarioId::Recession => "recession",
            ScenarioId::Crash => "crash",
        }
    }

    /// Annual moves expressed per month.
    pub fn parameters(self) -> ScenarioParameters {
        match self {
            ScenarioId::BullMarket => ScenarioParameters::fixed(0.15 / 12.0, 0.12),
            ScenarioId::BearMarket => ScenarioParameters::fixed(-0.20 / 12.0, 0.15),
            ScenarioId::Stagflation => ScenarioParameters::fixed(-0.05 / 12.0, 0.20),
            ScenarioId::Recession => ScenarioParameters::fixed(-0.10 / 12.0, 0.18),
            ScenarioId::Crash => ScenarioParameters::fixed(-0.40 / 12.0, 0.30),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScenarioId::BullMarket => "Sustained expansion, ~15% annual gain",
            ScenarioId::BearMarket => "Broad decline, ~20% annual loss",
            ScenarioId::Stagflation => "Flat-to-negative real growth with high volatility",
            ScenarioId::Recession => "Contraction, ~10% annual loss",
            ScenarioId::Crash => "Severe dislocation, ~40% annual loss",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = PortfolioSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| PortfolioSimError::UnknownScenario(s.to_string()))
    }
}

impl ScenarioParameters {
    const fn fixed(monthly_drift: f64, monthly_volatility: f64) -> Self {
        ScenarioParameters {
            monthly_drift,
            monthly_volatility,
        }
    }

    /// Build a custom parameter set. Drift must lie in [-1, 1] and
    /// volatility in [0, 2].
    pub fn custom(monthly_drift: f64, monthly_volatility: f64) -> PortfolioSimResult<Self> {
        let params = ScenarioParameters::fixed(monthly_drift, monthly_volatility);
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> PortfolioSimResult<()> {
        if !self.monthly_drift.is_finite() || !(-1.0..=1.0).contains(&self.monthly_drift) {
            return Err(PortfolioSimError::validation(
                "monthly_drift",
                format!("Must be within [-1, 1], got {}", self.monthly_drift),
            ));
        }
        if !self.monthly_volatility.is_finite()
            || !(0.0..=2.0).contains(&self.monthly_volatility)
        {
            return Err(PortfolioSimError::validation(
                "monthly_volatility",
                format!("Must be within [0, 2], got {}", self.monthly_volatility),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

impl ScenarioCatalog {
    /// Catalog holding only the five built-in scenarios.
    pub fn builtin() -> Self {
        ScenarioCatalog::default()
    }

    /// Register a custom parameter set under `name`.
    pub fn with_custom(
        mut self,
        name: impl Into<String>,
        parameters: ScenarioParameters,
    ) -> PortfolioSimResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PortfolioSimError::validation(
                "custom_scenarios",
                "Scenario name must not be empty",
            ));
        }
        if name.parse::<ScenarioId>().is_ok() {
            return Err(PortfolioSimError::validation(
                "custom_scenarios",
                format!("'{name}' shadows a built-in scenario"),
            ));
        }
        if self.custom.contains_key(&name) {
            return Err(PortfolioSimError::validation(
                "custom_scenarios",
                format!("'{name}' registered twice"),
            ));
        }
        parameters.validate()?;
        self.custom.insert(name, parameters);
        Ok(self)
    }

    /// Resolve a scenario identifier, built-ins first.
    pub fn lookup(&self, scenario_id: &str) -> PortfolioSimResult<ResolvedScenario> {
        if let Ok(id) = scenario_id.parse::<ScenarioId>() {
            return Ok(ResolvedScenario {
                name: id.as_str().to_string(),
                builtin: Some(id),
                parameters: id.parameters(),
            });
        }
        self.custom
            .get(scenario_id)
            .map(|params| ResolvedScenario {
                name: scenario_id.to_string(),
                builtin: None,
                parameters: *params,
            })
            .ok_or_else(|| PortfolioSimError::UnknownScenario(scenario_id.to_string()))
    }

    /// All entries: built-ins in catalog order, then custom sets by name.
    pub fn entries(&self) -> Vec<ResolvedScenario> {
        ScenarioId::ALL
            .into_iter()
            .map(|id| ResolvedScenario {
                name: id.as_str().to_string(),
                builtin: Some(id),
                parameters: id.parameters(),
            })
            .chain(self.custom.iter().map(|(name, params)| ResolvedScenario {
                name: name.clone(),
                builtin: None,
                parameters: *params,
            }))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
