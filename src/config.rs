//! Environment-driven configuration.
//!
//! Everything the service needs is collected into one [`AppConfig`] value at
//! startup and passed down explicitly.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::{TrackedSet, TrackedSetError};

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_STOOQ_BASE_URL: &str = "https://stooq.com";
pub const DEFAULT_FETCH_SCHEDULE: &str = "0 0 9 * * *";

const DEFAULT_TICKERS: &[(&str, f64)] = &[
    ("VTI", 245.0),
    ("VXUS", 55.0),
    ("VOO", 490.0),
    ("AMD", 90.0),
    ("INTC", 18.0),
    ("WMT", 80.0),
    ("KO", 55.0),
    ("WM", 175.0),
    ("BRK-B", 475.0),
    ("GOOGL", 165.0),
    ("META", 450.0),
    ("AMZN", 150.0),
    ("AAPL", 185.0),
    ("NVDA", 100.0),
    ("MSFT", 325.0),
    ("TSLA", 300.0),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid TICKERS entry {0:?}, expected SYMBOL=TARGET")]
    MalformedTicker(String),

    #[error(transparent)]
    TrackedSet(#[from] TrackedSetError),
}

/// Deployment environment name (`ENVIRONMENT`, defaults to `development`).
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub tracked: TrackedSet,
    pub pool_size: usize,
    pub task_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_backoff: Duration,
    pub price_ceiling: f64,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub reset_cache_each_cycle: bool,
    pub yahoo_base_url: String,
    pub stooq_base_url: String,
    pub provider_timeout: Duration,
    pub fetch_schedule: String,
    pub run_on_start: bool,
    pub pushbullet_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            tracked: default_tracked_set(),
            pool_size: 8,
            task_timeout: Duration::from_secs(45),
            retry_max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            price_ceiling: 10_000_000.0,
            cache_dir: PathBuf::from(".cache/tickerwatch"),
            cache_ttl: Duration::from_secs(300),
            reset_cache_each_cycle: true,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            stooq_base_url: DEFAULT_STOOQ_BASE_URL.to_string(),
            provider_timeout: Duration::from_secs(15),
            fetch_schedule: DEFAULT_FETCH_SCHEDULE.to_string(),
            run_on_start: true,
            pushbullet_token: None,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults; set but malformed keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tracked = match get("TICKERS") {
            Some(raw) => parse_tickers(&raw)?,
            None => defaults.tracked,
        };

        Ok(Self {
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            tracked,
            pool_size: parse_or("FETCH_POOL_SIZE", get("FETCH_POOL_SIZE"), defaults.pool_size)?,
            task_timeout: secs_or(
                "FETCH_TASK_TIMEOUT_SECONDS",
                get("FETCH_TASK_TIMEOUT_SECONDS"),
                defaults.task_timeout,
            )?,
            retry_max_attempts: parse_or(
                "RETRY_MAX_ATTEMPTS",
                get("RETRY_MAX_ATTEMPTS"),
                defaults.retry_max_attempts,
            )?,
            retry_backoff: match get("RETRY_BACKOFF_MS") {
                Some(v) => Duration::from_millis(parse_value("RETRY_BACKOFF_MS", &v)?),
                None => defaults.retry_backoff,
            },
            price_ceiling: parse_or("PRICE_CEILING", get("PRICE_CEILING"), defaults.price_ceiling)?,
            cache_dir: get("CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir),
            cache_ttl: secs_or("CACHE_TTL_SECONDS", get("CACHE_TTL_SECONDS"), defaults.cache_ttl)?,
            reset_cache_each_cycle: parse_or(
                "CACHE_RESET_EACH_CYCLE",
                get("CACHE_RESET_EACH_CYCLE"),
                defaults.reset_cache_each_cycle,
            )?,
            yahoo_base_url: get("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            stooq_base_url: get("STOOQ_BASE_URL").unwrap_or(defaults.stooq_base_url),
            provider_timeout: secs_or(
                "PROVIDER_TIMEOUT_SECONDS",
                get("PROVIDER_TIMEOUT_SECONDS"),
                defaults.provider_timeout,
            )?,
            fetch_schedule: get("FETCH_SCHEDULE").unwrap_or(defaults.fetch_schedule),
            run_on_start: parse_or("RUN_ON_START", get("RUN_ON_START"), defaults.run_on_start)?,
            pushbullet_token: get("PUSHBULLET_TOKEN"),
        })
    }
}

pub fn default_tracked_set() -> TrackedSet {
    TrackedSet::new(DEFAULT_TICKERS.iter().copied()).unwrap_or_default()
}

/// Parses `SYM=TARGET,SYM=TARGET`.
pub fn parse_tickers(raw: &str) -> Result<TrackedSet, ConfigError> {
    let mut entries = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (symbol, target) = item
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedTicker(item.to_string()))?;
        let target: f64 = target
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedTicker(item.to_string()))?;
        entries.push((symbol.trim().to_string(), target));
    }
    Ok(TrackedSet::new(entries)?)
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn secs_or(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse_or(key, value, default.as_secs()).map(Duration::from_secs)
}
