//! Concurrent worker harness
//!
//! Spawns one OS thread per worker. Each worker asks the registry for the
//! shared pool, tries to acquire a resource, holds it for a while and gives
//! it back.

use crate::error::PoolError;
use crate::pool::{InstanceRegistry, PoolSnapshot, ResourceId};

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Workload parameters
#[derive(Debug, Clone)]
pub struct Workload {
    workers: usize,
    hold: Duration,
    hold_until_all_acquired: bool,
}

impl Workload {
    /// `workers` threads, each holding its resource for `hold`
    pub fn new(workers: usize, hold: Duration) -> Self {
        Self {
            workers,
            hold,
            hold_until_all_acquired: false,
        }
    }

    /// Make every worker finish its acquire attempt before any worker
    /// releases, so the number of successful acquires is deterministic.
    pub fn hold_until_all_acquired(mut self, enabled: bool) -> Self {
        self.hold_until_all_acquired = enabled;
        self
    }
}

/// What one worker observed
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub worker_id: usize,
    /// Address of the pool the worker received, for identity comparison
    pub pool_addr: usize,
    /// `None` when the pool was exhausted
    pub resource: Option<ResourceId>,
    pub released: bool,
}

/// Result of a workload run
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub same_instance: bool,
    pub acquired: usize,
    pub unavailable: usize,
    pub outcomes: Vec<WorkerOutcome>,
    /// Pool state after every worker finished
    pub final_state: PoolSnapshot,
    /// Resources still checked out at the end of the run
    pub outstanding: Vec<ResourceId>,
}

/// Run the workload against the registry's shared pool
pub fn run_workload(
    registry: Arc<InstanceRegistry>,
    workload: &Workload,
) -> Result<WorkloadReport, PoolError> {
    let start = Arc::new(Barrier::new(workload.workers));
    let gate = Arc::new(Barrier::new(workload.workers));

    let mut handles = Vec::with_capacity(workload.workers);
    for worker_id in 0..workload.workers {
        let registry = Arc::clone(&registry);
        let start = Arc::clone(&start);
        let gate = workload
            .hold_until_all_acquired
            .then(|| Arc::clone(&gate));
        let hold = workload.hold;

        handles.push(thread::spawn(move || {
            start.wait();
            run_worker(worker_id, &registry, gate.as_deref(), hold)
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    let mut first_error = None;
    for (worker_id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(e)) => {
                warn!(worker_id, error = %e, "Worker failed");
                first_error.get_or_insert(e);
            }
            Err(_) => {
                first_error.get_or_insert(PoolError::WorkerPanicked { worker_id });
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let pool = registry.get_instance()?;
    let final_state = pool.snapshot();
    let same_instance = outcomes
        .iter()
        .all(|o| o.pool_addr == Arc::as_ptr(&pool) as usize);
    let acquired = outcomes.iter().filter(|o| o.resource.is_some()).count();

    info!(
        pool = %pool.name(),
        workers = outcomes.len(),
        acquired,
        same_instance,
        "Workload finished"
    );

    Ok(WorkloadReport {
        same_instance,
        acquired,
        unavailable: outcomes.len() - acquired,
        outstanding: final_state.in_use.clone(),
        outcomes,
        final_state,
    })
}

fn run_worker(
    worker_id: usize,
    registry: &InstanceRegistry,
    gate: Option<&Barrier>,
    hold: Duration,
) -> Result<WorkerOutcome, PoolError> {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        let instance = registry.get_instance();
        let resource = instance.as_ref().ok().and_then(|pool| pool.acquire());
        (instance, resource)
    }));

    // Every worker reaches the gate, even on failure or panic, so none is
    // left waiting.
    if let Some(gate) = gate {
        gate.wait();
    }

    let (instance, resource) = match attempt {
        Ok(attempt) => attempt,
        Err(_) => {
            error!(worker_id, "Worker panicked while getting a resource");
            return Err(PoolError::WorkerPanicked { worker_id });
        }
    };
    let pool = instance?;
    debug!(worker_id, pool_addr = Arc::as_ptr(&pool) as usize, "Worker got pool");

    let released = match resource {
        Some(ref id) => {
            info!(worker_id, resource = %id, "Worker holding resource");
            thread::sleep(hold);
            pool.release(id)?;
            true
        }
        None => {
            info!(worker_id, "Worker found no free resource");
            false
        }
    };

    Ok(WorkerOutcome {
        worker_id,
        pool_addr: Arc::as_ptr(&pool) as usize,
        resource,
        released,
    })
}
