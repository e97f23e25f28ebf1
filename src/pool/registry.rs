//! Instance registry
//!
//! Owns the single shared [`ResourcePool`]. The registry itself is an
//! ordinary value: build it once at startup and pass it around in an `Arc`.
//!
//! `OnceCell::get_or_try_init` gives the double-checked behavior: callers
//! after the first successful construction read the handle without
//! locking, callers racing the first construction block until it finishes,
//! and a failed construction leaves the cell empty so the next caller
//! tries again.

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::metrics::PoolMetrics;
use crate::pool::resources::{ResourceId, ResourcePool};

use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

type PoolFactory = Box<dyn Fn() -> Result<ResourcePool, PoolError> + Send + Sync>;

/// Process-wide holder of the shared pool
pub struct InstanceRegistry {
    instance: OnceCell<Arc<ResourcePool>>,
    factory: PoolFactory,
    construction_attempts: AtomicU64,
    metrics: PoolMetrics,
}

impl InstanceRegistry {
    /// Registry that builds a pool from a fixed resource set on first use
    pub fn new(name: impl Into<String>, resources: Vec<ResourceId>) -> Self {
        let name = name.into();
        let registry_name = name.clone();
        Self::with_factory(&registry_name, move || {
            ResourcePool::new(name.clone(), resources.iter().cloned())
        })
    }

    /// Registry for the configured pool
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.pool_name.clone(), config.resources.clone())
    }

    /// Registry with a caller-supplied, possibly failing, pool factory
    ///
    /// `name` labels the registry's construction metrics.
    pub fn with_factory<F>(name: &str, factory: F) -> Self
    where
        F: Fn() -> Result<ResourcePool, PoolError> + Send + Sync + 'static,
    {
        Self {
            instance: OnceCell::new(),
            factory: Box::new(factory),
            construction_attempts: AtomicU64::new(0),
            metrics: PoolMetrics::new(name),
        }
    }

    /// Get the shared pool, constructing it on first call.
    ///
    /// Every successful call returns the same pool. A construction error is
    /// returned to the caller that ran the factory and is not remembered.
    pub fn get_instance(&self) -> Result<Arc<ResourcePool>, PoolError> {
        if let Some(pool) = self.instance.get() {
            return Ok(Arc::clone(pool));
        }

        let pool = self.instance.get_or_try_init(|| {
            let attempt = self.construction_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(attempt, "Constructing shared pool");

            match (self.factory)() {
                Ok(pool) => {
                    info!(
                        pool = %pool.name(),
                        capacity = pool.capacity(),
                        attempt,
                        "Shared pool created"
                    );
                    self.metrics.record_construction();
                    Ok(Arc::new(pool))
                }
                Err(e) => {
                    error!(attempt, error = %e, "Shared pool construction failed");
                    self.metrics.record_error(&e);
                    Err(e)
                }
            }
        })?;

        Ok(Arc::clone(pool))
    }

    /// Whether the shared pool has been constructed
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Number of times the factory has run, successful or not
    pub fn construction_attempts(&self) -> u64 {
        self.construction_attempts.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instance", &self.instance.get().map(|p| p.name()))
            .field("construction_attempts", &self.construction_attempts())
            .finish_non_exhaustive()
    }
}
