//! RAII guard for a checked-out resource

use crate::error::PoolError;
use crate::pool::resources::{ResourceId, ResourcePool};

use std::sync::Arc;
use tracing::error;

/// A resource checked out of a [`ResourcePool`]
///
/// The resource goes back to the pool when the lease is dropped. A lease
/// only returns its own checkout: if the identifier was released behind its
/// back and checked out again, the lease's release is rejected.
#[derive(Debug)]
pub struct Lease {
    pool: Arc<ResourcePool>,
    resource: ResourceId,
    generation: u64,
    released: bool,
}

impl Lease {
    pub(crate) fn new(pool: Arc<ResourcePool>, resource: ResourceId, generation: u64) -> Self {
        Self {
            pool,
            resource,
            generation,
            released: false,
        }
    }

    /// The leased identifier
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// Return the resource now, surfacing any release error
    pub fn release(mut self) -> Result<(), PoolError> {
        self.released = true;
        self.pool.release_checkout(&self.resource, self.generation)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pool.release_checkout(&self.resource, self.generation) {
            error!(pool = %self.pool.name(), resource = %self.resource, error = %e, "Lease release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Arc<ResourcePool> {
        Arc::new(ResourcePool::new("lease", vec![ResourceId::from("only")]).unwrap())
    }

    #[test]
    fn test_explicit_release() {
        let pool = pool();
        let lease = pool.lease().unwrap();
        assert!(pool.lease().is_none(), "single resource already leased");

        lease.release().unwrap();
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.in_use_count(), 0);
    }

    #[test]
    fn test_lease_exposes_resource() {
        let pool = pool();
        let lease = pool.lease().unwrap();
        assert_eq!(lease.resource().as_str(), "only");
        assert!(pool.is_in_use(lease.resource()));
    }

    #[test]
    fn test_drop_after_manual_release_keeps_partition() {
        let pool = pool();
        let lease = pool.lease().unwrap();

        // Out-of-band release; the guard's own release is then rejected.
        pool.release(lease.resource()).unwrap();
        drop(lease);

        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.in_use_count(), 0);
    }

    #[test]
    fn test_stale_lease_does_not_release_reacquired_resource() {
        let pool = pool();
        let lease = pool.lease().unwrap();

        pool.release(lease.resource()).unwrap();
        let other = pool.acquire();
        assert_eq!(other, Some(ResourceId::from("only")));

        // The old lease no longer owns the checkout.
        drop(lease);
        assert!(pool.is_in_use(&ResourceId::from("only")));
        assert_eq!(pool.acquire(), None, "resource handed out twice");

        pool.release(&ResourceId::from("only")).unwrap();
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_stale_explicit_release_is_rejected() {
        let pool = pool();
        let lease = pool.lease().unwrap();

        pool.release(lease.resource()).unwrap();
        let _reacquired = pool.acquire().unwrap();

        let err = lease.release().unwrap_err();
        assert!(matches!(err, PoolError::NotCheckedOut { .. }));
        assert_eq!(pool.in_use_count(), 1);
    }
}
