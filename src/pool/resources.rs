//! Resource pool implementation
//!
//! Hands out opaque resource identifiers and takes them back, keeping
//! `available` and `in_use` a partition of the fixed initial set.

use crate::error::PoolError;
use crate::metrics::PoolMetrics;
use crate::pool::lease::Lease;

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Opaque resource identifier (e.g. `Conn_1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time copy of the pool partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub name: String,
    pub capacity: usize,
    /// Sorted
    pub available: Vec<ResourceId>,
    /// Sorted
    pub in_use: Vec<ResourceId>,
}

#[derive(Debug)]
struct Partition {
    available: Vec<ResourceId>,
    /// Checked-out id -> checkout generation
    in_use: HashMap<ResourceId, u64>,
    next_generation: u64,
}

/// Fixed-size pool of resource identifiers
///
/// Both collections live behind one mutex, so every move between them is
/// atomic with respect to other callers. The lock is held only while the
/// collections are mutated.
#[derive(Debug)]
pub struct ResourcePool {
    name: String,
    capacity: usize,
    partition: Mutex<Partition>,
    metrics: PoolMetrics,
}

impl ResourcePool {
    /// Build a pool whose resources all start out available.
    ///
    /// Fails on an empty set or a repeated identifier. The pool is only
    /// returned once fully populated.
    pub fn new<I>(name: impl Into<String>, resources: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = ResourceId>,
    {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut available = Vec::new();

        for id in resources {
            if !seen.insert(id.clone()) {
                return Err(PoolError::DuplicateResource {
                    pool: name,
                    resource: id.0,
                });
            }
            available.push(id);
        }

        if available.is_empty() {
            return Err(PoolError::EmptyResourceSet { pool: name });
        }

        let capacity = available.len();
        let metrics = PoolMetrics::new(&name);
        metrics.set_occupancy(capacity, 0);

        info!(pool = %name, capacity, "Resource pool populated");

        Ok(Self {
            name,
            capacity,
            partition: Mutex::new(Partition {
                available,
                in_use: HashMap::with_capacity(capacity),
                next_generation: 0,
            }),
            metrics,
        })
    }

    /// Get the pool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the fixed resource set
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take one resource, or `None` when the pool is exhausted.
    ///
    /// Exhaustion is an expected outcome; retry policy belongs to the caller.
    pub fn acquire(&self) -> Option<ResourceId> {
        self.checkout().map(|(id, _)| id)
    }

    /// Acquire, also returning the checkout generation of the identifier
    fn checkout(&self) -> Option<(ResourceId, u64)> {
        let (checkout, available, in_use) = {
            let mut partition = self.partition.lock();
            let checkout = match partition.available.pop() {
                Some(id) => {
                    let generation = partition.next_generation;
                    partition.next_generation += 1;
                    partition.in_use.insert(id.clone(), generation);
                    Some((id, generation))
                }
                None => None,
            };
            (checkout, partition.available.len(), partition.in_use.len())
        };

        match checkout {
            Some((id, generation)) => {
                self.metrics.record_acquire();
                self.metrics.set_occupancy(available, in_use);
                debug!(pool = %self.name, resource = %id, generation, available, in_use, "Resource acquired");
                Some((id, generation))
            }
            None => {
                self.metrics.record_exhausted();
                warn!(pool = %self.name, in_use, "No resource available");
                None
            }
        }
    }

    /// Return a resource taken with [`acquire`](Self::acquire).
    ///
    /// An identifier that is not currently in use (never acquired, unknown
    /// or already released) is rejected and the pool is left untouched.
    pub fn release(&self, id: &ResourceId) -> Result<(), PoolError> {
        self.checkin(id, None)
    }

    /// Release only if `id` is still out under `generation`
    pub(crate) fn release_checkout(&self, id: &ResourceId, generation: u64) -> Result<(), PoolError> {
        self.checkin(id, Some(generation))
    }

    fn checkin(&self, id: &ResourceId, generation: Option<u64>) -> Result<(), PoolError> {
        let counts = {
            let mut partition = self.partition.lock();
            let matches = match (partition.in_use.get(id), generation) {
                (Some(_), None) => true,
                (Some(current), Some(expected)) => *current == expected,
                (None, _) => false,
            };
            if matches {
                partition.in_use.remove(id);
                partition.available.push(id.clone());
                Some((partition.available.len(), partition.in_use.len()))
            } else {
                None
            }
        };

        match counts {
            Some((available, in_use)) => {
                self.metrics.record_release();
                self.metrics.set_occupancy(available, in_use);
                debug!(pool = %self.name, resource = %id, available, in_use, "Resource released");
                Ok(())
            }
            None => {
                let err = PoolError::NotCheckedOut {
                    pool: self.name.clone(),
                    resource: id.0.clone(),
                };
                self.metrics.record_error(&err);
                warn!(pool = %self.name, resource = %id, "Rejected release of resource not in use");
                Err(err)
            }
        }
    }

    /// Acquire wrapped in a guard that releases on drop
    pub fn lease(self: &Arc<Self>) -> Option<Lease> {
        self.checkout()
            .map(|(id, generation)| Lease::new(Arc::clone(self), id, generation))
    }

    /// Number of resources currently available
    pub fn available_count(&self) -> usize {
        self.partition.lock().available.len()
    }

    /// Number of resources currently checked out
    pub fn in_use_count(&self) -> usize {
        self.partition.lock().in_use.len()
    }

    /// Whether `id` is currently checked out
    pub fn is_in_use(&self, id: &ResourceId) -> bool {
        self.partition.lock().in_use.contains_key(id)
    }

    /// Consistent copy of both collections
    pub fn snapshot(&self) -> PoolSnapshot {
        let (mut available, mut in_use) = {
            let partition = self.partition.lock();
            (
                partition.available.clone(),
                partition.in_use.keys().cloned().collect::<Vec<_>>(),
            )
        };
        available.sort();
        in_use.sort();

        PoolSnapshot {
            name: self.name.clone(),
            capacity: self.capacity,
            available,
            in_use,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Barrier;
    use std::thread;

    fn ids(names: &[&str]) -> Vec<ResourceId> {
        names.iter().copied().map(ResourceId::from).collect()
    }

    fn conn_pool() -> ResourcePool {
        ResourcePool::new("test", ids(&["Conn_1", "Conn_2", "Conn_3"])).unwrap()
    }

    fn assert_partition(pool: &ResourcePool, initial: &[&str]) {
        let snap = pool.snapshot();
        let available: BTreeSet<_> = snap.available.iter().cloned().collect();
        let in_use: BTreeSet<_> = snap.in_use.iter().cloned().collect();
        let expected: BTreeSet<_> = ids(initial).into_iter().collect();

        assert!(available.is_disjoint(&in_use), "collections overlap");
        assert_eq!(available.len(), snap.available.len(), "duplicate in available");
        let union: BTreeSet<_> = available.union(&in_use).cloned().collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_rejects_empty_resource_set() {
        let err = ResourcePool::new("empty", Vec::new()).unwrap_err();
        assert!(matches!(err, PoolError::EmptyResourceSet { ref pool } if pool == "empty"));
    }

    #[test]
    fn test_rejects_duplicate_resource() {
        let err = ResourcePool::new("dup", ids(&["a", "b", "a"])).unwrap_err();
        assert!(matches!(err, PoolError::DuplicateResource { ref resource, .. } if resource == "a"));
    }

    #[test]
    fn test_acquire_takes_last_available() {
        let pool = conn_pool();
        assert_eq!(pool.acquire(), Some(ResourceId::from("Conn_3")));
        assert_eq!(pool.available_count(), 2);
        assert_eq!(pool.in_use_count(), 1);
        assert!(pool.is_in_use(&ResourceId::from("Conn_3")));
        assert_partition(&pool, &["Conn_1", "Conn_2", "Conn_3"]);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let pool = conn_pool();
        let taken: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
        assert!(taken.iter().all(Option::is_some));
        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.in_use_count(), 3);
        assert_partition(&pool, &["Conn_1", "Conn_2", "Conn_3"]);
    }

    #[test]
    fn test_acquire_release_round_trip() {
        let pool = conn_pool();
        let before = pool.snapshot();

        let id = pool.acquire().unwrap();
        pool.release(&id).unwrap();

        assert_eq!(pool.snapshot(), before);
    }

    #[test]
    fn test_release_of_unknown_resource_is_rejected() {
        let pool = conn_pool();
        let before = pool.snapshot();

        let err = pool.release(&ResourceId::from("Conn_9")).unwrap_err();
        assert!(matches!(err, PoolError::NotCheckedOut { ref resource, .. } if resource == "Conn_9"));

        // Known but never acquired
        assert!(pool.release(&ResourceId::from("Conn_1")).is_err());
        assert_eq!(pool.snapshot(), before);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let pool = conn_pool();
        let id = pool.acquire().unwrap();
        pool.release(&id).unwrap();

        assert!(pool.release(&id).is_err());
        assert_eq!(pool.available_count(), 3);
        assert_partition(&pool, &["Conn_1", "Conn_2", "Conn_3"]);
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let pool = Arc::new(conn_pool());
        {
            let lease = pool.lease().unwrap();
            assert!(pool.is_in_use(lease.resource()));
            assert_eq!(pool.in_use_count(), 1);
        }
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.available_count(), 3);
    }

    #[test]
    fn test_concurrent_acquires_are_distinct() {
        let names: Vec<String> = (0..16).map(|i| format!("Conn_{i}")).collect();
        let pool = Arc::new(
            ResourcePool::new("stress", names.iter().map(|n| ResourceId::from(n.as_str()))).unwrap(),
        );
        let barrier = Arc::new(Barrier::new(32));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    pool.acquire()
                })
            })
            .collect();

        let acquired: Vec<ResourceId> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        let unique: BTreeSet<_> = acquired.iter().cloned().collect();
        assert_eq!(acquired.len(), 16);
        assert_eq!(unique.len(), 16, "a resource was handed out twice");
        assert_eq!(pool.available_count(), 0);
    }

    #[test]
    fn test_partition_holds_under_churn() {
        let pool = Arc::new(conn_pool());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..200 {
                        if let Some(id) = pool.acquire() {
                            pool.release(&id).unwrap();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(pool.in_use_count(), 0);
        assert_partition(&pool, &["Conn_1", "Conn_2", "Conn_3"]);
    }

    #[test]
    fn test_snapshot_serializes_ids_as_strings() {
        let pool = conn_pool();
        pool.acquire();
        let json = serde_json::to_value(pool.snapshot()).unwrap();
        assert_eq!(json["in_use"], serde_json::json!(["Conn_3"]));
        assert_eq!(json["available"], serde_json::json!(["Conn_1", "Conn_2"]));
        assert_eq!(json["capacity"], 3);
    }
}
