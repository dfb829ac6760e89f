//! Multiplier curve — geometric growth from 1x at step 0 to the top multiplier

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{EngineError, EngineResult};

/// Precomputed `step → multiplier` lookup for steps `0..=N`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierTable {
    multipliers: Vec<f64>,
}

impl MultiplierTable {
    /// Build the table for a configuration
    pub fn build(config: &GameConfig) -> EngineResult<Self> {
        config.validate()?;
        Self::geometric(config.total_steps, config.max_multiplier)
    }

    /// `base^step` with `base = max_multiplier^(1/N)`
    pub fn geometric(total_steps: u32, max_multiplier: f64) -> EngineResult<Self> {
        if total_steps == 0 {
            return Err(EngineError::InvalidTable("curve needs at least one step".into()));
        }
        if !max_multiplier.is_finite() || max_multiplier <= 1.0 {
            return Err(EngineError::InvalidTable(format!(
                "top multiplier must be finite and above 1, got {max_multiplier}"
            )));
        }

        let base = max_multiplier.powf(1.0 / total_steps as f64);
        let multipliers = (0..=total_steps).map(|step| base.powf(step as f64)).collect();
        Ok(Self { multipliers })
    }

    /// Adopt an externally supplied table (e.g. a cached file)
    pub fn from_multipliers(multipliers: Vec<f64>) -> EngineResult<Self> {
        if multipliers.len() < 2 {
            return Err(EngineError::InvalidTable(format!(
                "expected at least 2 entries, got {}",
                multipliers.len()
            )));
        }
        if (multipliers[0] - 1.0).abs() > 1e-9 {
            return Err(EngineError::InvalidTable(format!(
                "step 0 must be 1x, got {}",
                multipliers[0]
            )));
        }
        if let Some(bad) = multipliers.iter().position(|m| !m.is_finite()) {
            return Err(EngineError::InvalidTable(format!("step {bad} is not finite")));
        }
        if let Some(i) = multipliers.windows(2).position(|w| w[1] <= w[0]) {
            return Err(EngineError::InvalidTable(format!(
                "not strictly increasing at step {}",
                i + 1
            )));
        }
        Ok(Self { multipliers })
    }

    /// Multiplier at `step`
    pub fn multiplier(&self, step: u32) -> EngineResult<f64> {
        self.get(step).ok_or(EngineError::StepOutOfRange {
            step,
            total_steps: self.total_steps(),
        })
    }

    pub fn get(&self, step: u32) -> Option<f64> {
        self.multipliers.get(step as usize).copied()
    }

    /// Unchecked lookup for steps already clamped to `0..=N`
    pub(crate) fn at(&self, step: u32) -> f64 {
        self.multipliers[step as usize]
    }

    /// Number of steps N
    pub fn total_steps(&self) -> u32 {
        (self.multipliers.len() - 1) as u32
    }

    /// Multiplier at step N
    pub fn top(&self) -> f64 {
        self.multipliers[self.multipliers.len() - 1]
    }

    /// Per-step growth factor
    pub fn base(&self) -> f64 {
        self.multipliers[1]
    }

    /// `(step, multiplier)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.multipliers
            .iter()
            .enumerate()
            .map(|(step, &m)| (step as u32, m))
    }

    /// Whether this table describes the configuration's curve
    pub fn matches(&self, config: &GameConfig) -> bool {
        self.total_steps() == config.total_steps
            && ((self.top() - config.max_multiplier) / config.max_multiplier).abs() < 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_endpoints() {
        for config in [GameConfig::ascent_100(), GameConfig::ascent_50()] {
            let table = MultiplierTable::build(&config).unwrap();
            assert_eq!(table.total_steps(), config.total_steps);
            assert_eq!(table.multiplier(0).unwrap(), 1.0);
            assert_relative_eq!(table.top(), 15_000.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_growth_is_geometric() {
        let table = MultiplierTable::geometric(50, 15_000.0).unwrap();
        let base = 15_000f64.powf(1.0 / 50.0);
        assert_relative_eq!(table.base(), base, max_relative = 1e-12);

        for step in 1..=50 {
            let ratio = table.at(step) / table.at(step - 1);
            assert_relative_eq!(ratio, base, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_out_of_range() {
        let table = MultiplierTable::geometric(50, 15_000.0).unwrap();
        assert_eq!(
            table.multiplier(51),
            Err(EngineError::StepOutOfRange {
                step: 51,
                total_steps: 50
            })
        );
        assert!(table.get(51).is_none());
    }

    #[test]
    fn test_from_multipliers_validation() {
        assert!(MultiplierTable::from_multipliers(vec![1.0, 2.0, 4.0]).is_ok());
        assert!(MultiplierTable::from_multipliers(vec![1.0]).is_err());
        assert!(MultiplierTable::from_multipliers(vec![1.5, 2.0]).is_err());
        assert!(MultiplierTable::from_multipliers(vec![1.0, 2.0, 2.0]).is_err());
        assert!(MultiplierTable::from_multipliers(vec![1.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_matches_config() {
        let config = GameConfig::ascent_50();
        let table = MultiplierTable::build(&config).unwrap();
        assert!(table.matches(&config));
        assert!(!table.matches(&GameConfig::ascent_100()));
    }
}
