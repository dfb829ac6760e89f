//! Error types for the Knight Ascent engine

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Step {step} is outside the curve (0..={total_steps})")]
    StepOutOfRange { step: u32, total_steps: u32 },

    #[error("Invalid multiplier table: {0}")]
    InvalidTable(String),

    #[error("Calibration failed: {0}")]
    Calibration(String),

    #[error("Invalid cashout step {step}: must be within 0..={total_steps}")]
    InvalidCashout { step: u32, total_steps: u32 },

    #[error("Unknown speed mode: {0}")]
    UnknownSpeedMode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
