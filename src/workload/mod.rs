//! Workload module
//!
//! Drives concurrent callers against the shared pool.

mod runner;

pub use runner::{run_workload, WorkerOutcome, Workload, WorkloadReport};
