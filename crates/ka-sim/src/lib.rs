//! # ka-sim — Batch simulator for Knight Ascent
//!
//! Drives the `ka-engine` round state machine over large batches and turns the
//! results into CSV logs, session statistics and reports.
//!
//! ## Features
//!
//! - **Table cache**: `Step,Multiplier` CSV, loaded or generated on demand
//! - **Batch runner**: seeded per-round streams, optional rayon chunks
//! - **CSV logs**: one row per round, one row per bonus activation
//! - **Reports**: crash and bonus-cost tables, per-step statistics, JSON

pub mod config;
pub mod csv_log;
pub mod error;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod stats;
pub mod table_cache;

pub use config::*;
pub use csv_log::*;
pub use error::*;
pub use prompt::*;
pub use report::*;
pub use runner::*;
pub use stats::*;
pub use table_cache::*;
