//! TOML configuration for the report binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use redcap_ingest::{EventOptions, SnapshotOptions};
use redcap_report::ReportConfig;

/// Column conventions and thresholds, one table per stage.
///
/// Every key is optional; a missing key keeps the REDCap default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub snapshot: SnapshotOptions,
    pub events: EventOptions,
    pub report: ReportConfig,
}

impl DashboardConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.report.validate()?;
        Ok(config)
    }
}
