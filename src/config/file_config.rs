use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub reminder_interval_hours: Option<u64>,

    // Feature configs
    pub routes: Option<RoutesConfig>,
}

/// Route target durations, in weeks.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RoutesConfig {
    pub pre_assessment_weeks: Option<i64>,
    pub short_route_weeks: Option<i64>,
    pub revision_weeks: Option<i64>,
    pub supervisor_weeks: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
