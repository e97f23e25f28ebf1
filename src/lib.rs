//! Shared Pool - lazily-initialized, thread-safe resource pool
//!
//! - One pool per [`InstanceRegistry`], built on first request, at most once
//! - `acquire` / `release` of opaque resource identifiers under a pool lock
//! - Exhaustion reported as `None`, misuse rejected with [`PoolError`]
//! - Prometheus metrics and structured tracing for every pool event

pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod workload;

pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{InstanceRegistry, Lease, PoolSnapshot, ResourceId, ResourcePool};
pub use workload::{run_workload, Workload, WorkloadReport};
