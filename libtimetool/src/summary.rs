use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use super::error::SummaryError;
use super::source_id::ClockTime;

/// Features published for one analyzed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub seconds: u32,
    pub nanoseconds: u32,
    pub values: Vec<f64>,
}

/// Record of a replay: event counts and the features published for every analyzed event.
/// Written to disk as YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub events: u64,
    pub analyzed: u64,
    pub configures: u64,
    /// Feature cache slots registered by the end of the replay
    pub cache_slots: usize,
    pub features: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl ReplaySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, clock: ClockTime, values: Vec<f64>) {
        self.rows.push(FeatureRow {
            seconds: clock.seconds,
            nanoseconds: clock.nanoseconds,
            values,
        });
    }

    pub fn write(&self, path: &Path) -> Result<(), SummaryError> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(serde_yaml::to_string(self)?.as_bytes())?;
        Ok(())
    }
}
