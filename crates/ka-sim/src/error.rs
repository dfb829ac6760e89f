//! Error types for the batch simulator

use ka_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("Invalid table cache {path}: {reason}")]
    InvalidCache { path: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_yml::Error> for SimError {
    fn from(e: serde_yml::Error) -> Self {
        SimError::Yaml(e.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
