//! Analytics thresholds and their YAML configuration.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Prune candidates sit below this fraction of the average margin rate.
pub const PRUNE_MARGIN_FACTOR: f64 = 0.9;
/// Maximum members of each candidate list.
pub const CANDIDATE_LIMIT: usize = 5;
/// Gap used to rank growth candidates that have no breakeven data.
pub const GROWTH_GAP_FALLBACK: u32 = 1;
/// Score multiplier for procedures below an even share of demand.
pub const UNDERSERVED_DEMAND_BOOST: f64 = 1.25;
/// Score multiplier for procedures at or above the average margin rate.
pub const PROFITABILITY_BOOST: f64 = 1.2;
/// Breakeven gap beyond which the breakeven boost stops growing.
pub const BREAKEVEN_GAP_CAP: u32 = 10;
/// Profit-to-revenue ratio assumed when there is no revenue history.
pub const DEFAULT_PROFIT_RATIO: f64 = 0.3;
/// Revenue per unit of marketing spend assumed when no spend was recorded.
pub const IMPLIED_ROAS: f64 = 3.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("yaml error: {0}")]
    Yaml(String),
    #[error("invalid threshold: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e.to_string())
    }
}

/// Tunable constants of the portfolio heuristics. Missing YAML keys keep
/// their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Fraction of the average margin rate below which pruning is considered.
    pub prune_margin_factor: f64,
    /// Maximum members of the growth and prune lists.
    pub candidate_limit: usize,
    /// Gap assumed when ranking growth candidates without breakeven data.
    pub growth_gap_fallback: u32,
    /// Score multiplier below an even share of demand.
    pub underserved_demand_boost: f64,
    /// Score multiplier at or above the average margin rate.
    pub profitability_boost: f64,
    /// Gap at which the breakeven boost reaches its maximum; zero disables it.
    pub breakeven_gap_cap: u32,
    /// Profit-to-revenue ratio used without revenue history.
    pub default_profit_ratio: f64,
    /// Revenue per unit of spend used without spend history.
    pub implied_roas: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            prune_margin_factor: PRUNE_MARGIN_FACTOR,
            candidate_limit: CANDIDATE_LIMIT,
            growth_gap_fallback: GROWTH_GAP_FALLBACK,
            underserved_demand_boost: UNDERSERVED_DEMAND_BOOST,
            profitability_boost: PROFITABILITY_BOOST,
            breakeven_gap_cap: BREAKEVEN_GAP_CAP,
            default_profit_ratio: DEFAULT_PROFIT_RATIO,
            implied_roas: IMPLIED_ROAS,
        }
    }
}

impl Thresholds {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let t: Thresholds = serde_yaml::from_str(text)?;
        t.validate()?;
        Ok(t)
    }

    /// Load thresholds from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let t = Self::from_yaml_str(&text)?;
        info!(path = %path.as_ref().display(), "loaded analytics thresholds");
        Ok(t)
    }

    /// Reject factors that would make scores or projections meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let factors = [
            ("prune_margin_factor", self.prune_margin_factor),
            ("underserved_demand_boost", self.underserved_demand_boost),
            ("profitability_boost", self.profitability_boost),
            ("default_profit_ratio", self.default_profit_ratio),
            ("implied_roas", self.implied_roas),
        ];
        for (name, v) in factors {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} = {v}")));
            }
        }
        if self.candidate_limit == 0 {
            return Err(ConfigError::Invalid("candidate_limit = 0".to_string()));
        }
        Ok(())
    }

    pub(crate) fn prune_factor(&self) -> Decimal {
        Decimal::from_f64(self.prune_margin_factor).unwrap_or(Decimal::ONE)
    }

    pub(crate) fn profit_ratio(&self) -> Decimal {
        Decimal::from_f64(self.default_profit_ratio).unwrap_or(Decimal::ZERO)
    }

    pub(crate) fn implied_efficiency(&self) -> Decimal {
        Decimal::from_f64(self.implied_roas).unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let t = Thresholds::default();
        assert_eq!(t.prune_margin_factor, 0.9);
        assert_eq!(t.candidate_limit, 5);
        assert_eq!(t.breakeven_gap_cap, 10);
        assert_eq!(t.prune_factor(), Decimal::new(9, 1));
        assert_eq!(t.profit_ratio(), Decimal::new(3, 1));
        t.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let t = Thresholds::from_yaml_str("candidate_limit: 3\nprofitability_boost: 1.5\n").unwrap();
        assert_eq!(t.candidate_limit, 3);
        assert_eq!(t.profitability_boost, 1.5);
        assert_eq!(t.underserved_demand_boost, UNDERSERVED_DEMAND_BOOST);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Thresholds::from_yaml_str("implied_roas: -1.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Thresholds::from_yaml_str("candidate_limit: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Thresholds::from_yaml_str("candidate_limit: [1, 2]\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Thresholds::load("/definitely/not/here.yaml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn json_roundtrip() {
        let t = Thresholds::default();
        let s = serde_json::to_string(&t).unwrap();
        let back: Thresholds = serde_json::from_str(&s).unwrap();
        assert_eq!(back, t);
    }
}
