//! Pipeline configuration loaded from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use gamefeed_news::FetcherConfig;

/// Longest retention window accepted from configuration or a trigger
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Runtime settings shared by the crawl pipeline and its triggers
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// SQLite file holding the live store and catalog tables
    pub database_path: PathBuf,
    /// Directory of monthly `<YYYY-MM>.json` archive files
    pub archive_dir: PathBuf,
    /// Curated word classification table
    pub keywords_path: PathBuf,
    /// JSON source list replacing the built-in registry
    pub feed_sources_path: Option<PathBuf>,
    /// Days an item stays in the live store
    pub retention_days: i64,
    /// Per-source fetch timeout
    pub fetch_timeout: Duration,
    /// Deadline for the fetch phase of a whole run
    pub crawl_deadline: Duration,
    pub accept_invalid_certs: bool,
    /// Scheduled crawl period; `None` disables the schedule
    pub crawl_interval: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/gamefeed.db"),
            archive_dir: PathBuf::from("data"),
            keywords_path: PathBuf::from("data/keywords.json"),
            feed_sources_path: None,
            retention_days: 10,
            fetch_timeout: Duration::from_secs(15),
            crawl_deadline: Duration::from_secs(300),
            accept_invalid_certs: false,
            crawl_interval: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to the defaults:
    /// - DATABASE_PATH: `data/gamefeed.db`
    /// - ARCHIVE_DIR: `data`
    /// - KEYWORDS_PATH: `data/keywords.json`
    /// - FEED_SOURCES_PATH: built-in registry
    /// - RETENTION_DAYS: 10
    /// - FETCH_TIMEOUT_SECS: 15
    /// - CRAWL_DEADLINE_SECS: 300
    /// - FEEDS_ACCEPT_INVALID_CERTS: false
    /// - CRAWL_INTERVAL_SECS: no schedule
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let retention_days = match get("RETENTION_DAYS") {
            Some(raw) => parse_number::<i64>("RETENTION_DAYS", &raw)?,
            None => defaults.retention_days,
        };
        if !(0..=MAX_RETENTION_DAYS).contains(&retention_days) {
            return Err(ConfigError::OutOfRange {
                var: "RETENTION_DAYS".to_string(),
                value: retention_days.to_string(),
            });
        }

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(raw) => positive_secs("FETCH_TIMEOUT_SECS", &raw)?,
            None => defaults.fetch_timeout,
        };

        let crawl_deadline = match get("CRAWL_DEADLINE_SECS") {
            Some(raw) => positive_secs("CRAWL_DEADLINE_SECS", &raw)?,
            None => defaults.crawl_deadline,
        };

        let accept_invalid_certs = match get("FEEDS_ACCEPT_INVALID_CERTS") {
            Some(raw) => parse_bool("FEEDS_ACCEPT_INVALID_CERTS", &raw)?,
            None => defaults.accept_invalid_certs,
        };

        let crawl_interval = get("CRAWL_INTERVAL_SECS")
            .map(|raw| positive_secs("CRAWL_INTERVAL_SECS", &raw))
            .transpose()?;

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            archive_dir: get("ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_dir),
            keywords_path: get("KEYWORDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.keywords_path),
            feed_sources_path: get("FEED_SOURCES_PATH").map(PathBuf::from),
            retention_days,
            fetch_timeout,
            crawl_deadline,
            accept_invalid_certs,
            crawl_interval,
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: self.fetch_timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var: var.to_string(),
        value: raw.to_string(),
    })
}

fn positive_secs(var: &str, raw: &str) -> Result<Duration, ConfigError> {
    match parse_number::<u64>(var, raw)? {
        0 => Err(ConfigError::OutOfRange {
            var: var.to_string(),
            value: raw.to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got \"{value}\"")]
    InvalidNumber { var: String, value: String },

    #[error("{var} must be true or false, got \"{value}\"")]
    InvalidBool { var: String, value: String },

    #[error("{var} is out of range: {value}")]
    OutOfRange { var: String, value: String },
}
