use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ethica_server::config::{AppConfig, CliConfig, FileConfig};
use ethica_server::notifications::TracingEventSink;
use ethica_server::reviews::WorkflowOrchestrator;
use ethica_server::server::{run_server, ServerConfig};
use ethica_server::{RequestsLoggingLevel, SqlitePortalStore, SqliteUserStore};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (portal.db, user.db).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file; its values override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Interval in hours between review due-date scans. Set to 0 to disable.
    #[clap(long, default_value_t = 24)]
    pub reminder_interval_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        reminder_interval_hours: cli_args.reminder_interval_hours,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening portal database at {:?}...", config.portal_db_path());
    let portal_store = Arc::new(SqlitePortalStore::new(config.portal_db_path())?);

    info!("Opening user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);

    let workflow = Arc::new(
        WorkflowOrchestrator::new(
            portal_store.clone(),
            user_store.clone(),
            Arc::new(TracingEventSink),
        )
        .with_durations(config.route_durations),
    );

    // Spawn the periodic due-date scan if enabled.
    if config.reminder_interval_hours > 0 {
        let interval_hours = config.reminder_interval_hours;
        let scan_workflow = workflow.clone();

        info!(
            "Review due-date scan enabled, running every {} hours",
            interval_hours
        );

        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(interval_hours * 60 * 60);
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick, wait for the first interval.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match scan_workflow.scan_due_reviews() {
                    Ok(count) => {
                        if count > 0 {
                            info!("Emitted {} review due-date reminders", count);
                        }
                    }
                    Err(e) => {
                        error!("Review due-date scan failed: {}", e);
                    }
                }
            }
        });
    }

    info!("Ready to serve at port {}!", config.port);
    run_server(
        ServerConfig {
            requests_logging_level: config.logging_level,
            port: config.port,
        },
        portal_store,
        user_store,
        workflow,
    )
    .await
}
