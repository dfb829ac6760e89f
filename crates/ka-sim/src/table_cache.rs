//! Multiplier table cache (`Step,Multiplier` CSV)

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ka_engine::{GameConfig, MultiplierTable};
use log::{info, warn};
use serde::Deserialize;

use crate::error::{SimError, SimResult};

pub const TABLE_HEADER: [&str; 2] = ["Step", "Multiplier"];

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(rename = "Step")]
    step: u32,
    #[serde(rename = "Multiplier")]
    multiplier: f64,
}

/// File-backed multiplier table
#[derive(Debug, Clone)]
pub struct TableCache {
    path: PathBuf,
}

impl TableCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default file name for a configuration, e.g. `multiplier_array_50.csv`
    pub fn default_file_name(config: &GameConfig) -> String {
        format!("multiplier_array_{}.csv", config.total_steps)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and validate the cached table
    pub fn load(&self) -> SimResult<MultiplierTable> {
        let file = File::open(&self.path)?;
        read_table(file).map_err(|e| self.invalid(e))
    }

    /// Write the table, replacing any existing file
    pub fn save(&self, table: &MultiplierTable) -> SimResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        write_table(file, table)
    }

    /// Load the cached table, or generate and save it when missing or stale
    pub fn load_or_generate(&self, config: &GameConfig) -> SimResult<MultiplierTable> {
        if self.exists() {
            match self.load() {
                Ok(table) if table.matches(config) => {
                    info!("Loading multiplier table from {}", self.path.display());
                    return Ok(table);
                }
                Ok(table) => warn!(
                    "{} holds a {}-step table, regenerating for {} steps",
                    self.path.display(),
                    table.total_steps(),
                    config.total_steps
                ),
                Err(e) => warn!("Ignoring unreadable table cache: {e}"),
            }
        }

        info!(
            "Generating multiplier table and saving to {}",
            self.path.display()
        );
        let table = MultiplierTable::build(config)?;
        self.save(&table)?;
        Ok(table)
    }

    fn invalid(&self, err: SimError) -> SimError {
        match err {
            SimError::Io(_) => err,
            other => SimError::InvalidCache {
                path: self.path.display().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Serialize a table as `Step,Multiplier` rows
pub fn write_table<W: Write>(writer: W, table: &MultiplierTable) -> SimResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(TABLE_HEADER)?;
    for (step, multiplier) in table.iter() {
        // Display gives the shortest round-trip form
        csv.write_record([step.to_string(), multiplier.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Parse `Step,Multiplier` rows; steps must run 0..=N without gaps
pub fn read_table<R: Read>(reader: R) -> SimResult<MultiplierTable> {
    let mut csv = csv::Reader::from_reader(reader);

    let headers = csv.headers()?;
    if headers.iter().ne(TABLE_HEADER) {
        return Err(SimError::InvalidInput(format!(
            "expected header Step,Multiplier, found {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut multipliers = Vec::new();
    for row in csv.deserialize() {
        let row: TableRow = row?;
        if row.step as usize != multipliers.len() {
            return Err(SimError::InvalidInput(format!(
                "expected step {}, found {}",
                multipliers.len(),
                row.step
            )));
        }
        multipliers.push(row.multiplier);
    }

    Ok(MultiplierTable::from_multipliers(multipliers)?)
}
