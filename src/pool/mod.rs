//! Shared pool module
//!
//! A lazily-constructed [`ResourcePool`] owned by an [`InstanceRegistry`].

mod lease;
mod registry;
mod resources;

pub use lease::Lease;
pub use registry::InstanceRegistry;
pub use resources::{PoolSnapshot, ResourceId, ResourcePool};
