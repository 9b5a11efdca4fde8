//! Collaborator contracts consumed by the consistency checker.
//!
//! The checker never talks to a concrete backend: the tenant registry, the
//! per-tenant virtual stores, the shared physical cache/store, and the
//! readiness gate are all narrow async traits. The event-driven sync path
//! that actually creates and updates physical objects sits behind
//! [`TenantStore::requeue_virtual_object`]; this crate only asks it to
//! reprocess, it never writes physical objects itself.

use async_trait::async_trait;

use crate::error::{DeleteError, EnqueueError, StoreError};
use crate::model::{PhysicalObject, VirtualObject};

/// Source of the currently known tenants. The set may grow or shrink
/// between calls; the checker re-reads it at the start of every cycle.
#[async_trait]
pub trait TenantRegistry: Send + Sync + 'static {
    async fn list_tenants(&self) -> Vec<String>;
}

/// Read and requeue access to per-tenant virtual object stores.
#[async_trait]
pub trait TenantStore: Send + Sync + 'static {
    /// List all virtual objects owned by `tenant`.
    async fn list_virtual_objects(&self, tenant: &str) -> Result<Vec<VirtualObject>, StoreError>;

    /// Look up a single virtual object by tenant and name.
    async fn get_virtual_object(
        &self,
        tenant: &str,
        name: &str,
    ) -> Result<VirtualObject, StoreError>;

    /// Submit an object back into the event-driven sync queue for `tenant`
    /// so its physical counterpart gets reprocessed.
    async fn requeue_virtual_object(
        &self,
        tenant: &str,
        object: VirtualObject,
    ) -> Result<(), EnqueueError>;
}

/// Read-only view of the shared physical store, backed by an externally
/// maintained cache.
#[async_trait]
pub trait PhysicalCache: Send + Sync + 'static {
    /// Full, unfiltered listing of physical objects.
    async fn list_physical_objects(&self) -> Result<Vec<PhysicalObject>, StoreError>;

    /// Look up a single physical object by its deterministic name.
    async fn get_physical_object(&self, name: &str) -> Result<PhysicalObject, StoreError>;
}

/// The one mutation this crate performs: a conditional delete against the
/// shared physical store.
#[async_trait]
pub trait PhysicalStore: Send + Sync + 'static {
    /// Delete `name` only if its current delegated fingerprint equals
    /// `expected_fingerprint`. The precondition makes the delete safe to
    /// race against concurrent recreation by the sync path.
    async fn delete_physical_object(
        &self,
        name: &str,
        expected_fingerprint: &str,
    ) -> Result<(), DeleteError>;
}

/// Initial-sync barrier for the backing caches this checker reads from.
#[async_trait]
pub trait ReadinessGate: Send + Sync + 'static {
    /// Resolves once all backing caches have completed their initial sync.
    /// Returns `false` if the caches can never become ready.
    async fn wait_for_sync(&self) -> bool;
}

pub mod memory;
pub use memory::{
    InMemoryPhysicalStore, InMemoryTenantRegistry, InMemoryTenantStore, ManualReadinessGate,
};
