//! Domain error types for the shared pool
//!
//! Structured thiserror types so callers can match on the failure mode
//! instead of parsing message strings.
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All library code returns Result<T, PoolError>.
//!
//! Pool exhaustion is deliberately absent: `acquire()` reports it as `None`.

use thiserror::Error;

/// Shared pool domain errors
///
/// Example log output:
/// ```text
/// PoolError::NotCheckedOut { pool: "primary", resource: "Conn_9" }
/// → "resource 'Conn_9' is not checked out of pool 'primary'"
/// ```
#[derive(Error, Debug)]
pub enum PoolError {
    /// Pool construction was asked to build a pool with no resources
    #[error("pool '{pool}' cannot be built from an empty resource set")]
    EmptyResourceSet { pool: String },

    /// The initial resource set named the same identifier twice
    #[error("pool '{pool}' lists resource '{resource}' more than once")]
    DuplicateResource { pool: String, resource: String },

    /// Release of an identifier that is not currently in use
    #[error("resource '{resource}' is not checked out of pool '{pool}'")]
    NotCheckedOut { pool: String, resource: String },

    /// A caller-supplied pool factory failed
    #[error("pool construction failed")]
    ConstructionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A workload worker thread panicked before reporting its outcome
    #[error("worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },

    /// Prometheus recorder could not be installed
    #[error("metrics recorder installation failed: {0}")]
    MetricsInstall(String),

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),
}

impl PoolError {
    /// Returns a static label string suitable for metrics.
    ///
    /// Used as the `error_type` label on `pool_errors_total`.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::EmptyResourceSet { .. } => "empty_resource_set",
            Self::DuplicateResource { .. } => "duplicate_resource",
            Self::NotCheckedOut { .. } => "not_checked_out",
            Self::ConstructionFailed(_) => "construction_failed",
            Self::WorkerPanicked { .. } => "worker_panicked",
            Self::MetricsInstall(_) => "metrics_install",
            Self::Config(_) => "config",
        }
    }
}
