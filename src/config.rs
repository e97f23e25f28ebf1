//! Pool configuration module
//!
//! Handles loading configuration from environment variables (and an
//! optional `.env` file).

use crate::error::PoolError;
use crate::pool::ResourceId;
use std::env;
use std::time::Duration;

/// Resource set used when `POOL_RESOURCES` is not set
pub const DEFAULT_RESOURCES: &str = "Conn_1,Conn_2,Conn_3";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Pool name, used as the `pool` field in logs and metric labels
    pub pool_name: String,

    /// Fixed initial resource set
    pub resources: Vec<ResourceId>,

    /// Number of concurrent worker threads in the demo workload
    pub workers: usize,

    /// How long a worker holds a resource before releasing it
    pub hold: Duration,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Render Prometheus metrics at exit
    pub metrics_enabled: bool,
}

impl PoolConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, PoolError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PoolError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pool_name = lookup("POOL_NAME").unwrap_or_else(|| "primary".to_string());
        if pool_name.trim().is_empty() {
            return Err(PoolError::Config("POOL_NAME must not be empty".to_string()));
        }

        let resources = parse_resources(
            &lookup("POOL_RESOURCES").unwrap_or_else(|| DEFAULT_RESOURCES.to_string()),
        )?;

        let workers: usize = lookup("POOL_WORKERS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|e| PoolError::Config(format!("POOL_WORKERS must be a valid number: {e}")))?;
        if workers == 0 {
            return Err(PoolError::Config("POOL_WORKERS must be at least 1".to_string()));
        }

        let hold_ms: u64 = lookup("POOL_HOLD_MS")
            .unwrap_or_else(|| "500".to_string())
            .parse()
            .map_err(|e| PoolError::Config(format!("POOL_HOLD_MS must be a valid number: {e}")))?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(PoolError::Config(format!(
                    "LOG_FORMAT must be 'pretty' or 'json', got '{other}'"
                )))
            }
        };

        let metrics_enabled = match lookup("METRICS_ENABLED").as_deref() {
            None => false,
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(other) => {
                return Err(PoolError::Config(format!(
                    "METRICS_ENABLED must be a boolean, got '{other}'"
                )))
            }
        };

        Ok(Self {
            pool_name,
            resources,
            workers,
            hold: Duration::from_millis(hold_ms),
            log_level,
            log_format,
            metrics_enabled,
        })
    }
}

/// Parse a comma-separated resource list.
///
/// Blank entries are skipped. Duplicates are left for pool construction
/// to reject, so the error names the pool.
pub fn parse_resources(raw: &str) -> Result<Vec<ResourceId>, PoolError> {
    let resources: Vec<ResourceId> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ResourceId::from)
        .collect();

    if resources.is_empty() {
        return Err(PoolError::Config(
            "POOL_RESOURCES must name at least one resource".to_string(),
        ));
    }
    Ok(resources)
}
