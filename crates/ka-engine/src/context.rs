//! Immutable per-configuration context shared by every round

use crate::bonus::BonusKind;
use crate::config::GameConfig;
use crate::crash::CrashDistribution;
use crate::curve::MultiplierTable;
use crate::error::{EngineError, EngineResult};

/// Configuration, multiplier table and calibrated crash distribution
///
/// Built once, then shared read-only across rounds and worker threads.
#[derive(Debug, Clone)]
pub struct GameContext {
    config: GameConfig,
    table: MultiplierTable,
    crash: CrashDistribution,
}

impl GameContext {
    /// Build the table and calibrate the crash distribution
    pub fn new(config: GameConfig) -> EngineResult<Self> {
        let table = MultiplierTable::build(&config)?;
        Self::with_table(config, table)
    }

    /// Use an existing (e.g. cached) multiplier table
    pub fn with_table(config: GameConfig, table: MultiplierTable) -> EngineResult<Self> {
        let crash = CrashDistribution::calibrate(&config, &table)?;
        Ok(Self {
            config,
            table,
            crash,
        })
    }

    /// Use a precomputed crash distribution instead of calibrating
    pub fn with_distribution(
        config: GameConfig,
        table: MultiplierTable,
        crash: CrashDistribution,
    ) -> EngineResult<Self> {
        config.validate()?;
        if !table.matches(&config) {
            return Err(EngineError::InvalidTable(format!(
                "table has {} steps, configuration expects {}",
                table.total_steps(),
                config.total_steps
            )));
        }
        if crash.total_steps() != config.total_steps {
            return Err(EngineError::Calibration(format!(
                "distribution covers {} steps, configuration expects {}",
                crash.total_steps(),
                config.total_steps
            )));
        }
        Ok(Self {
            config,
            table,
            crash,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn table(&self) -> &MultiplierTable {
        &self.table
    }

    pub fn crash(&self) -> &CrashDistribution {
        &self.crash
    }

    pub fn total_steps(&self) -> u32 {
        self.config.total_steps
    }

    /// Paid price of a bonus at `step`, `None` when infeasible
    pub fn bonus_cost(&self, kind: BonusKind, step: u32) -> Option<f64> {
        self.config
            .bonus(kind)
            .cost(&self.table, step, self.config.bonus_rtp)
    }
}
