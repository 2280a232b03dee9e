//! Run configuration.
//!
//! Values are resolved from built-in defaults, an optional TOML file and
//! command-line flags (which also read `STATUS_SYNC_*` environment
//! variables), in increasing order of precedence.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::repository::util::redact_url_password;
use crate::sync::SyncMode;

/// Remote dump endpoint used when none is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://live-head.restless-dust-dcc3.workers.dev/dump_last";

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Largest page the remote serves.
pub const MAX_PAGE_SIZE: usize = 5000;

/// Pause between page requests.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 500;

/// Per-request HTTP timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("No database URL configured (use --database-url or STATUS_SYNC_DATABASE_URL)")]
    MissingDatabaseUrl,
    #[error("Invalid source URL '{url}': {source}")]
    InvalidSourceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Source URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("Page size must be between 1 and {max}, got {got}")]
    PageSize { got: usize, max: usize },
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Contents of the optional config file's `[sync]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub source_url: Option<String>,
    pub page_size: Option<usize>,
    pub page_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sync: FileConfig,
}

impl FileConfig {
    /// Load the `[sync]` table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.sync)
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub source_url: Option<String>,
    pub page_size: Option<usize>,
    pub page_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub dry_run: bool,
    pub full: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub source_url: Url,
    pub page_size: usize,
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub dry_run: bool,
    pub mode: SyncMode,
}

impl SyncConfig {
    /// Config with default paging and timeouts.
    pub fn new(database_url: impl Into<String>, source_url: Url) -> Self {
        Self {
            database_url: database_url.into(),
            source_url,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            dry_run: false,
            mode: SyncMode::Incremental,
        }
    }

    /// Merge overrides over file values over defaults, then validate.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let database_url = overrides
            .database_url
            .or(file.database_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let source = overrides
            .source_url
            .or(file.source_url)
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
        let source_url = Url::parse(&source).map_err(|source_err| ConfigError::InvalidSourceUrl {
            url: source.clone(),
            source: source_err,
        })?;
        if !matches!(source_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(source_url.scheme().to_string()));
        }

        let page_size = overrides
            .page_size
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize {
                got: page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        let timeout_secs = overrides
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let page_delay_ms = overrides
            .page_delay_ms
            .or(file.page_delay_ms)
            .unwrap_or(DEFAULT_PAGE_DELAY_MS);

        Ok(Self {
            database_url,
            source_url,
            page_size,
            page_delay: Duration::from_millis(page_delay_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            dry_run: overrides.dry_run,
            mode: if overrides.full {
                SyncMode::Full
            } else {
                SyncMode::Incremental
            },
        })
    }

    /// Database URL safe for logs.
    pub fn redacted_database_url(&self) -> String {
        redact_url_password(&self.database_url)
    }
}
