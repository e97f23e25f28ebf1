//! Shared Pool demo
//!
//! Builds the pool registry once, then lets several worker threads race
//! for the shared pool and its resources. Prints the final report as JSON.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use shared_pool::config::LogFormat;
use shared_pool::metrics::MetricsExporter;
use shared_pool::{run_workload, InstanceRegistry, PoolConfig, Workload};

fn main() -> Result<()> {
    // Load configuration first to get log level
    let config = PoolConfig::from_env()?;

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("shared_pool={}", config.log_level).parse()?);
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pool = %config.pool_name,
        resources = config.resources.len(),
        workers = config.workers,
        "Starting shared pool demo"
    );

    let exporter = if config.metrics_enabled {
        let exporter = MetricsExporter::install()?;
        info!("Prometheus metrics initialized");
        Some(exporter)
    } else {
        None
    };

    // Nothing is constructed until the first worker asks for the pool.
    let registry = Arc::new(InstanceRegistry::from_config(&config));

    let workload = Workload::new(config.workers, config.hold);
    let report = run_workload(Arc::clone(&registry), &workload)?;

    if !report.outstanding.is_empty() {
        warn!(
            outstanding = ?report.outstanding,
            "Resources still checked out at shutdown"
        );
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(exporter) = exporter {
        println!("{}", exporter.render());
    }

    info!(
        construction_attempts = registry.construction_attempts(),
        "Shared pool demo complete"
    );
    Ok(())
}
