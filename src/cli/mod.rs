//! Command-line interface.

mod report;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing::info;

use crate::config::{FileConfig, Overrides, SyncConfig};
use crate::repository::DatabaseConnector;
use crate::source::HttpRecordSource;
use crate::sync::SyncOrchestrator;

pub use report::{format_count, print_report};

#[derive(Parser, Debug)]
#[command(name = "status-sync")]
#[command(about = "Copy status-check records from the remote dump into a SQL table")]
#[command(version)]
pub struct Cli {
    /// Fetch and dedupe but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Request a full sync (reported as such; nothing is cleared)
    #[arg(long)]
    pub full: bool,

    /// TOML config file with a [sync] table
    #[arg(short, long, env = "STATUS_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Destination database URL (sqlite:path or mysql://...)
    #[arg(long, env = "STATUS_SYNC_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Remote dump endpoint
    #[arg(long, env = "STATUS_SYNC_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Records requested per page (1-5000)
    #[arg(long, env = "STATUS_SYNC_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Pause between pages in milliseconds
    #[arg(long, env = "STATUS_SYNC_PAGE_DELAY_MS")]
    pub page_delay_ms: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "STATUS_SYNC_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            database_url: self.database_url.clone(),
            source_url: self.source_url.clone(),
            page_size: self.page_size,
            page_delay_ms: self.page_delay_ms,
            timeout_secs: self.timeout_secs,
            dry_run: self.dry_run,
            full: self.full,
        }
    }

    /// Resolve the run configuration from the config file and flags.
    pub fn load_config(&self) -> anyhow::Result<SyncConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(SyncConfig::resolve(file, self.overrides())?)
    }
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Parse arguments, run one sync and print the report.
///
/// Returns whether the run succeeded; configuration errors are returned as
/// `Err` before any I/O happens.
pub async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    info!(
        "Syncing {} into {}",
        config.source_url,
        config.redacted_database_url()
    );

    let source = HttpRecordSource::new(config.source_url.clone(), config.request_timeout)
        .context("Failed to build HTTP client")?;
    let connector = DatabaseConnector::new(config.database_url.clone());

    println!(
        "{} Syncing {} → {}",
        style("→").cyan(),
        config.source_url,
        config.redacted_database_url()
    );

    let outcome = SyncOrchestrator::new(&config, connector, source).run().await;
    print_report(&outcome);

    Ok(outcome.success())
}
