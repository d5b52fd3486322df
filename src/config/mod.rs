//! # Runtime configuration
//!
//! Resolves the harness settings once at startup from environment variables.
//! The resulting [`Config`] is immutable and handed to the HTTP client, the
//! step registry and the runner explicitly.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::http::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://reqres.in";
pub const DEFAULT_API_KEY: &str = "reqres-free-v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_backoff_factor: f64,
    pub parallel_workers: usize,
    pub log_level: Level,
    pub enable_html_report: bool,
    pub enable_allure_report: bool,
    pub schema_dir: PathBuf,
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry_count: 3,
            retry_backoff_factor: 1.0,
            parallel_workers: 4,
            log_level: Level::INFO,
            enable_html_report: true,
            enable_allure_report: true,
            schema_dir: PathBuf::from("tests/schemas"),
            data_dir: PathBuf::from("tests/data"),
            report_dir: PathBuf::from("reports"),
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves every setting through `lookup`, falling back to the defaults
    /// for keys it does not know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let base_url = lookup("BASE_URL").unwrap_or(defaults.base_url);
        if base_url.trim().is_empty() {
            return Err(invalid("BASE_URL", &base_url, "must not be empty"));
        }

        let timeout_secs: u64 = parse_or(&lookup, "TIMEOUT", defaults.timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(invalid("TIMEOUT", "0", "must be at least 1 second"));
        }

        let retry_backoff_factor: f64 =
            parse_or(&lookup, "RETRY_BACKOFF_FACTOR", defaults.retry_backoff_factor)?;
        if !retry_backoff_factor.is_finite() || retry_backoff_factor < 0.0 {
            return Err(invalid(
                "RETRY_BACKOFF_FACTOR",
                &retry_backoff_factor.to_string(),
                "must be a non-negative number",
            ));
        }

        let parallel_workers: usize = parse_or(&lookup, "PARALLEL_WORKERS", defaults.parallel_workers)?;
        if parallel_workers == 0 {
            return Err(invalid("PARALLEL_WORKERS", "0", "must be at least 1"));
        }

        let log_level = match lookup("LOG_LEVEL") {
            Some(raw) => parse_level(&raw).ok_or_else(|| invalid("LOG_LEVEL", &raw, "unknown level"))?,
            None => defaults.log_level,
        };

        Ok(Self {
            base_url: base_url.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
            retry_count: parse_or(&lookup, "RETRY_COUNT", defaults.retry_count)?,
            retry_backoff_factor,
            parallel_workers,
            log_level,
            enable_html_report: flag_or(&lookup, "ENABLE_HTML_REPORT", defaults.enable_html_report),
            enable_allure_report: flag_or(&lookup, "ENABLE_ALLURE_REPORT", defaults.enable_allure_report),
            schema_dir: lookup("SCHEMA_DIR").map(PathBuf::from).unwrap_or(defaults.schema_dir),
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            report_dir: lookup("REPORT_DIR").map(PathBuf::from).unwrap_or(defaults.report_dir),
            api_key: lookup("API_KEY").unwrap_or(defaults.api_key),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_backoff_factor)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| invalid(key, &raw, err.to_string())),
        None => Ok(default),
    }
}

/// Only a case-insensitive `true` enables a flag.
fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "WARNING" => Some(Level::WARN),
        "CRITICAL" | "FATAL" => Some(Level::ERROR),
        other => other.parse().ok(),
    }
}
