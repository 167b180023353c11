//! Environment-driven run configuration.
//!
//! Values come from the process environment, with a `.env` file in the
//! working directory loaded first when present. Every variable has a default.

use dotenv::dotenv;
use idxsync_core::data::Period;
use idxsync_core::ticker::DEFAULT_SUFFIX;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/";
pub const DEFAULT_DB_NAME: &str = "idx_yfinance_data";
pub const DEFAULT_CSV_FILE_PATH: &str = "data/idx.csv";
pub const DEFAULT_FETCH_DELAY_SECS: u64 = 1;

/// Errors from reading configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} is not a valid period: '{value}'")]
    InvalidPeriod { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },
}

/// Settings for a sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mongo_uri: String,
    pub db_name: String,
    pub csv_file_path: PathBuf,
    pub ticker_suffix: String,
    pub fetch_delay: Duration,
    pub fetch_period: Period,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: DEFAULT_MONGO_URI.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            csv_file_path: PathBuf::from(DEFAULT_CSV_FILE_PATH),
            ticker_suffix: DEFAULT_SUFFIX.to_string(),
            fetch_delay: Duration::from_secs(DEFAULT_FETCH_DELAY_SECS),
            fetch_period: Period::default(),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let mongo_uri = non_empty(&lookup, "MONGO_URI")?.unwrap_or(defaults.mongo_uri);
        let db_name = non_empty(&lookup, "DB_NAME")?.unwrap_or(defaults.db_name);
        let csv_file_path = non_empty(&lookup, "CSV_FILE_PATH")?
            .map(PathBuf::from)
            .unwrap_or(defaults.csv_file_path);

        // An empty suffix is allowed: symbols are then used verbatim.
        let ticker_suffix = lookup("TICKER_SUFFIX")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.ticker_suffix);

        let fetch_delay = match lookup("FETCH_DELAY_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    key: "FETCH_DELAY_SECS",
                    value: raw.clone(),
                }
            })?),
            None => defaults.fetch_delay,
        };

        let fetch_period = match lookup("FETCH_PERIOD") {
            Some(raw) => raw
                .parse::<Period>()
                .map_err(|_| ConfigError::InvalidPeriod {
                    key: "FETCH_PERIOD",
                    value: raw.clone(),
                })?,
            None => defaults.fetch_period,
        };

        Ok(Config {
            mongo_uri,
            db_name,
            csv_file_path,
            ticker_suffix,
            fetch_delay,
            fetch_period,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { key }),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}
