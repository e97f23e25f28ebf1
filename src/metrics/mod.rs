//! Prometheus metrics module
//!
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed. [`MetricsExporter`] installs the Prometheus one.

use crate::error::PoolError;
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Per-pool metrics recorder
///
/// Every series carries a `pool` label with the pool name.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pool: Arc<str>,
}

impl PoolMetrics {
    /// Create a recorder for the named pool
    pub fn new(pool: &str) -> Self {
        Self { pool: Arc::from(pool) }
    }

    /// Record a pool built by an [`InstanceRegistry`](crate::pool::InstanceRegistry)
    pub fn record_construction(&self) {
        counter!("pool_constructions_total", "pool" => self.pool.to_string()).increment(1);
    }

    /// Record a successful acquire
    pub fn record_acquire(&self) {
        counter!("pool_acquires_total", "pool" => self.pool.to_string()).increment(1);
    }

    /// Record an acquire that found the pool empty
    pub fn record_exhausted(&self) {
        counter!("pool_exhausted_total", "pool" => self.pool.to_string()).increment(1);
    }

    /// Record a successful release
    pub fn record_release(&self) {
        counter!("pool_releases_total", "pool" => self.pool.to_string()).increment(1);
    }

    /// Record a pool error
    pub fn record_error(&self, error: &PoolError) {
        counter!(
            "pool_errors_total",
            "pool" => self.pool.to_string(),
            "error_type" => error.error_type_label()
        )
        .increment(1);
    }

    /// Set available/in-use gauges
    pub fn set_occupancy(&self, available: usize, in_use: usize) {
        gauge!("pool_resources_available", "pool" => self.pool.to_string()).set(available as f64);
        gauge!("pool_resources_in_use", "pool" => self.pool.to_string()).set(in_use as f64);
    }
}

/// Installed Prometheus recorder
#[derive(Clone)]
pub struct MetricsExporter {
    handle: Arc<PrometheusHandle>,
}

impl MetricsExporter {
    /// Install the Prometheus recorder as the global recorder
    pub fn install() -> Result<Self, PoolError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| PoolError::MetricsInstall(e.to_string()))?;

        describe_metrics();

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Register metric descriptions
fn describe_metrics() {
    describe_counter!(
        "pool_constructions_total",
        Unit::Count,
        "Pool instances constructed by the registry"
    );
    describe_counter!(
        "pool_acquires_total",
        Unit::Count,
        "Resources handed out by acquire"
    );
    describe_counter!(
        "pool_exhausted_total",
        Unit::Count,
        "Acquire calls that found no available resource"
    );
    describe_counter!(
        "pool_releases_total",
        Unit::Count,
        "Resources returned to the pool"
    );
    describe_counter!("pool_errors_total", Unit::Count, "Total pool errors");

    describe_gauge!(
        "pool_resources_available",
        Unit::Count,
        "Resources currently available"
    );
    describe_gauge!(
        "pool_resources_in_use",
        Unit::Count,
        "Resources currently checked out"
    );
}
