//! Runtime configuration resolved from the environment.
//!
//! # Design
//! The core never reads the environment on its own: [`AppConfig`] is built
//! once at startup and handed to constructors. [`AppConfig::from_lookup`]
//! takes any key lookup so tests do not touch the process environment.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build flavour of the running application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppVariant {
    #[default]
    Develop,
    Staging,
    Production,
}

impl FromStr for AppVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "develop" | "development" | "dev" => Ok(Self::Develop),
            "staging" | "stg" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::UnknownVariant(s.to_string())),
        }
    }
}

/// Log verbosity requested by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::UnknownLogLevel(s.to_string())),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> Duration {
    REQUEST_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub variant: AppVariant,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(skip, default = "default_timeout")]
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: AppVariant::default(),
            api_url: default_api_url(),
            log_level: LogLevel::default(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Resolve from `API_URL`, `APP_VARIANT` and `LOG_LEVEL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment. Unset or
    /// blank values fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is set but not recognised.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("API_URL") {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidApiUrl(url.to_string()));
            }
            config.api_url = url.to_string();
        }
        if let Some(variant) = get("APP_VARIANT") {
            config.variant = variant.parse()?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level.parse()?;
        }
        Ok(config)
    }
}

/// Staleness and garbage-collection windows of the query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub stale_time: Duration,
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
        }
    }
}

impl CacheConfig {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }
}

/// Retry limits and backoff for cache-owned operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt of a read.
    pub read_retries: u32,
    /// Retries after the first attempt of a write.
    pub write_retries: u32,
    /// HTTP statuses that may be retried. Transport failures always may.
    pub retryable_statuses: Vec<u16>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            read_retries: 2,
            write_retries: 1,
            retryable_statuses: Vec::new(),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    pub fn with_retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}
