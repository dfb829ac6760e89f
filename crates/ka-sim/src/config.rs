//! Simulation run configuration

use std::fs;
use std::path::Path;

use ka_engine::{CashoutStrategy, GameConfig, GameContext, PlayMode};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// How each round picks its speed mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedSelection {
    /// Uniform over the configured speed modes, per round
    Random,
    /// Always the named mode
    Fixed(String),
}

impl Default for SpeedSelection {
    fn default() -> Self {
        Self::Random
    }
}

/// Configuration for a batch of rounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of rounds to play
    pub rounds: u64,

    /// Bonus trigger mode
    pub mode: PlayMode,

    /// Speed mode selection
    #[serde(default)]
    pub speed: SpeedSelection,

    /// Cashout strategy
    #[serde(default)]
    pub cashout: CashoutStrategy,

    /// Random seed for reproducibility (None = OS entropy)
    pub seed: Option<u64>,

    /// Simulate chunks of rounds on the rayon pool
    pub parallel: bool,

    /// Rounds simulated per chunk
    pub chunk_size: usize,

    /// Directory for CSV output (None = no files)
    pub output_dir: Option<String>,

    /// Write one CSV row per round
    pub write_rounds_csv: bool,

    /// Write one CSV row per bonus activation
    pub write_bonus_csv: bool,

    /// Log a progress line every N rounds (0 = never)
    pub progress_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rounds: 100_000,
            mode: PlayMode::Base,
            speed: SpeedSelection::Random,
            cashout: CashoutStrategy::Random,
            seed: None,
            parallel: true,
            chunk_size: 10_000,
            output_dir: None,
            write_rounds_csv: true,
            write_bonus_csv: true,
            progress_interval: 100_000,
        }
    }
}

impl SimConfig {
    /// Small seeded batch for smoke runs
    pub fn quick() -> Self {
        Self {
            rounds: 10_000,
            seed: Some(42),
            parallel: false,
            progress_interval: 0,
            ..Default::default()
        }
    }

    /// Long batch for RTP measurements
    pub fn exhaustive() -> Self {
        Self {
            rounds: 10_000_000,
            chunk_size: 100_000,
            progress_interval: 1_000_000,
            write_rounds_csv: false,
            ..Default::default()
        }
    }

    /// Builder: set round count
    pub fn with_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds;
        self
    }

    /// Builder: set play mode
    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: set speed selection
    pub fn with_speed(mut self, speed: SpeedSelection) -> Self {
        self.speed = speed;
        self
    }

    /// Builder: set cashout strategy
    pub fn with_cashout(mut self, cashout: CashoutStrategy) -> Self {
        self.cashout = cashout;
        self
    }

    /// Builder: set seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder: toggle parallel chunks
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder: set chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Builder: set output directory
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Check the run against a game context
    pub fn validate(&self, ctx: &GameContext) -> SimResult<()> {
        if self.rounds == 0 {
            return Err(SimError::InvalidInput(
                "number of rounds must be a positive integer".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(SimError::InvalidInput("chunk size must be at least 1".into()));
        }
        self.cashout.validate(ctx.total_steps())?;
        if let SpeedSelection::Fixed(name) = &self.speed {
            ctx.config().speed_mode(name)?;
        }
        Ok(())
    }

    /// Human-readable cashout description
    pub fn cashout_label(&self, total_steps: u32) -> String {
        match self.cashout {
            CashoutStrategy::Random => format!("Random (0-{total_steps})"),
            CashoutStrategy::Fixed(step) => format!("Fixed at step {step}"),
        }
    }
}

/// Load a game configuration, picking the format from the file extension
pub fn load_game_config(path: &Path) -> SimResult<GameConfig> {
    let text = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let config = match ext.as_deref() {
        Some("json") => GameConfig::from_json(&text)?,
        Some("yaml") | Some("yml") => GameConfig::from_yaml(&text)?,
        _ => {
            return Err(SimError::InvalidInput(format!(
                "unsupported config format: {} (expected .json, .yaml or .yml)",
                path.display()
            )));
        }
    };
    Ok(config)
}
