use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use holdfast_core::coordinator::CoordinatorConfig;
use holdfast_core::lock::DEFAULT_MAX_TTL_SECS;
use holdfast_core::usage::DEFAULT_HISTORY_CAPACITY;

/// A configuration variable that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var}: '{value}' ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Expiry sweeper cadence in milliseconds (default: `1000`).
    pub sweep_interval_ms: u64,
    /// Usage samples kept per resource (default: `50`).
    pub usage_history_capacity: usize,
    /// Largest TTL a caller may request (default: `86400`).
    pub max_ttl_secs: u32,
    /// Snapshot file; snapshotting is disabled when unset.
    pub snapshot_path: Option<PathBuf>,
    /// Periodic snapshot cadence in seconds (default: `30`).
    pub snapshot_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec!["*".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            sweep_interval_ms: 1000,
            usage_history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_ttl_secs: DEFAULT_MAX_TTL_SECS,
            snapshot_path: None,
            snapshot_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `HOST`                   | `0.0.0.0` |
    /// | `PORT`                   | `8000`    |
    /// | `CORS_ORIGINS`           | `*`       |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`      |
    /// | `SWEEP_INTERVAL_MS`      | `1000`    |
    /// | `USAGE_HISTORY_CAPACITY` | `50`      |
    /// | `MAX_TTL_SECS`           | `86400`   |
    /// | `SNAPSHOT_PATH`          | unset     |
    /// | `SNAPSHOT_INTERVAL_SECS` | `30`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => defaults.cors_origins,
        };

        let snapshot_path = lookup("SNAPSHOT_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        let config = Self {
            host,
            port: parse_var(&lookup, "PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: parse_var(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            shutdown_timeout_secs: parse_var(
                &lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout_secs,
            )?,
            sweep_interval_ms: parse_var(&lookup, "SWEEP_INTERVAL_MS", defaults.sweep_interval_ms)?,
            usage_history_capacity: parse_var(
                &lookup,
                "USAGE_HISTORY_CAPACITY",
                defaults.usage_history_capacity,
            )?,
            max_ttl_secs: parse_var(&lookup, "MAX_TTL_SECS", defaults.max_ttl_secs)?,
            snapshot_path,
            snapshot_interval_secs: parse_var(
                &lookup,
                "SNAPSHOT_INTERVAL_SECS",
                defaults.snapshot_interval_secs,
            )?,
        };

        require_positive("SWEEP_INTERVAL_MS", config.sweep_interval_ms)?;
        require_positive("SNAPSHOT_INTERVAL_SECS", config.snapshot_interval_secs)?;
        require_positive("USAGE_HISTORY_CAPACITY", config.usage_history_capacity as u64)?;
        require_positive("MAX_TTL_SECS", u64::from(config.max_ttl_secs))?;

        Ok(config)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            history_capacity: self.usage_history_capacity,
            max_ttl_secs: self.max_ttl_secs,
        }
    }

    /// True when any origin may call the API.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn require_positive(var: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError {
            var,
            value: "0".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    for origin in origins.iter().filter(|o| o.as_str() != "*") {
        HeaderValue::from_str(origin).map_err(|e| ConfigError {
            var: "CORS_ORIGINS",
            value: origin.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(origins)
}
