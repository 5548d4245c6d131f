mod file_config;

pub use file_config::{FileConfig, RoutesConfig};

use crate::reviews::RouteDurations;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub reminder_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Interval between due-date scans. 0 disables the scan.
    pub reminder_interval_hours: u64,
    pub route_durations: RouteDurations,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let reminder_interval_hours = file
            .reminder_interval_hours
            .unwrap_or(cli.reminder_interval_hours);

        let routes = file.routes.unwrap_or_default();
        let defaults = RouteDurations::default();
        let route_durations = RouteDurations {
            pre_assessment_weeks: routes
                .pre_assessment_weeks
                .unwrap_or(defaults.pre_assessment_weeks),
            short_route_weeks: routes
                .short_route_weeks
                .unwrap_or(defaults.short_route_weeks),
            revision_weeks: routes.revision_weeks.unwrap_or(defaults.revision_weeks),
            supervisor_weeks: routes
                .supervisor_weeks
                .unwrap_or(defaults.supervisor_weeks),
        };
        if route_durations.pre_assessment_weeks <= 0
            || route_durations.short_route_weeks <= 0
            || route_durations.revision_weeks <= 0
            || route_durations.supervisor_weeks <= 0
        {
            bail!("Route durations must be positive");
        }

        Ok(Self {
            db_dir,
            port,
            logging_level,
            reminder_interval_hours,
            route_durations,
        })
    }

    pub fn portal_db_path(&self) -> PathBuf {
        self.db_dir.join("portal.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
