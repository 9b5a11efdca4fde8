//! In-memory collaborator implementations.
//!
//! Used by the demo binary and the test suite. The tenant store records
//! requeued objects instead of reprocessing them, and supports injected
//! listing failures so transient-error paths can be exercised. The physical
//! store honors the fingerprint precondition on delete exactly like a real
//! backend would.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{PhysicalCache, PhysicalStore, ReadinessGate, TenantRegistry, TenantStore};
use crate::error::{DeleteError, EnqueueError, StoreError};
use crate::model::{PhysicalObject, VirtualObject};

/// Fixed-at-construction (but mutable) tenant set.
#[derive(Debug, Default)]
pub struct InMemoryTenantRegistry {
    tenants: Mutex<Vec<String>>,
    panic_on_next_list: AtomicBool,
}

impl InMemoryTenantRegistry {
    pub fn new(tenants: Vec<String>) -> Self {
        Self {
            tenants: Mutex::new(tenants),
            panic_on_next_list: AtomicBool::new(false),
        }
    }

    pub async fn set_tenants(&self, tenants: Vec<String>) {
        *self.tenants.lock().await = tenants;
    }

    /// Make the next `list_tenants` call panic. One-shot: later calls
    /// behave normally again.
    pub fn panic_on_next_list(&self) {
        self.panic_on_next_list.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl TenantRegistry for InMemoryTenantRegistry {
    async fn list_tenants(&self) -> Vec<String> {
        if self.panic_on_next_list.swap(false, Ordering::Relaxed) {
            panic!("injected panic in tenant listing");
        }
        self.tenants.lock().await.clone()
    }
}

/// In-memory tenant-side store with a recorded requeue channel.
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    /// tenant -> (name -> object)
    objects: Mutex<HashMap<String, HashMap<String, VirtualObject>>>,
    /// Objects handed back to the (simulated) event-driven sync path.
    requeued: Mutex<Vec<(String, VirtualObject)>>,
    /// Tenants whose listings fail with a transient error.
    list_failures: Mutex<HashSet<String>>,
    /// When set, every requeue is rejected.
    reject_requeues: AtomicBool,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, object: VirtualObject) {
        self.objects
            .lock()
            .await
            .entry(object.tenant.clone())
            .or_default()
            .insert(object.name.clone(), object);
    }

    pub async fn remove(&self, tenant: &str, name: &str) {
        if let Some(objects) = self.objects.lock().await.get_mut(tenant) {
            objects.remove(name);
        }
    }

    /// Objects requeued so far, in order.
    pub async fn requeued(&self) -> Vec<(String, VirtualObject)> {
        self.requeued.lock().await.clone()
    }

    /// Make listings for `tenant` fail with a transient error.
    pub async fn fail_listings_for(&self, tenant: &str) {
        self.list_failures.lock().await.insert(tenant.to_string());
    }

    pub fn reject_requeues(&self, reject: bool) {
        self.reject_requeues.store(reject, Ordering::Relaxed);
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn list_virtual_objects(&self, tenant: &str) -> Result<Vec<VirtualObject>, StoreError> {
        if self.list_failures.lock().await.contains(tenant) {
            return Err(StoreError::Transient(format!(
                "injected listing failure for tenant {tenant}"
            )));
        }
        Ok(self
            .objects
            .lock()
            .await
            .get(tenant)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_virtual_object(
        &self,
        tenant: &str,
        name: &str,
    ) -> Result<VirtualObject, StoreError> {
        self.objects
            .lock()
            .await
            .get(tenant)
            .and_then(|objects| objects.get(name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{tenant}/{name}")))
    }

    async fn requeue_virtual_object(
        &self,
        tenant: &str,
        object: VirtualObject,
    ) -> Result<(), EnqueueError> {
        if self.reject_requeues.load(Ordering::Relaxed) {
            return Err(EnqueueError(format!(
                "queue for tenant {tenant} is not accepting work"
            )));
        }
        self.requeued
            .lock()
            .await
            .push((tenant.to_string(), object));
        Ok(())
    }
}

/// In-memory shared store serving both the read-side cache view and the
/// conditional-delete mutator.
#[derive(Debug, Default)]
pub struct InMemoryPhysicalStore {
    objects: Mutex<HashMap<String, PhysicalObject>>,
    delete_calls: AtomicUsize,
}

impl InMemoryPhysicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, object: PhysicalObject) {
        self.objects
            .lock()
            .await
            .insert(object.name.clone(), object);
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.objects.lock().await.contains_key(name)
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    /// Number of delete attempts issued against this store, including
    /// rejected ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PhysicalCache for InMemoryPhysicalStore {
    async fn list_physical_objects(&self) -> Result<Vec<PhysicalObject>, StoreError> {
        Ok(self.objects.lock().await.values().cloned().collect())
    }

    async fn get_physical_object(&self, name: &str) -> Result<PhysicalObject, StoreError> {
        self.objects
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl PhysicalStore for InMemoryPhysicalStore {
    async fn delete_physical_object(
        &self,
        name: &str,
        expected_fingerprint: &str,
    ) -> Result<(), DeleteError> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        let mut objects = self.objects.lock().await;
        match objects.get(name) {
            None => Err(DeleteError::NotFound(name.to_string())),
            Some(object)
                if object.delegated_fingerprint.as_deref() != Some(expected_fingerprint) =>
            {
                Err(DeleteError::PreconditionFailed {
                    name: name.to_string(),
                })
            }
            Some(_) => {
                objects.remove(name);
                Ok(())
            }
        }
    }
}

/// Readiness gate flipped by hand. Starts unsynced; `mark_synced` releases
/// every current and future waiter.
#[derive(Debug, Default)]
pub struct ManualReadinessGate {
    ready: AtomicBool,
    notify: Notify,
}

impl ManualReadinessGate {
    /// A gate that is still waiting for initial sync.
    pub fn pending() -> Self {
        Self::default()
    }

    /// A gate that reports sync completion immediately.
    pub fn synced() -> Self {
        let gate = Self::default();
        gate.ready.store(true, Ordering::Release);
        gate
    }

    pub fn mark_synced(&self) {
        self.ready.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl ReadinessGate for ManualReadinessGate {
    async fn wait_for_sync(&self) -> bool {
        while !self.ready.load(Ordering::Acquire) {
            let notified = self.notify.notified();
            // Recheck after registering so a concurrent mark_synced between
            // the load and the wait cannot be missed.
            if self.ready.load(Ordering::Acquire) {
                break;
            }
            notified.await;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tenant_store_round_trip() {
        let store = InMemoryTenantStore::new();
        store.insert(VirtualObject::new("t1", "ns1", "u1")).await;

        let listed = store.list_virtual_objects("t1").await.unwrap();
        assert_eq!(listed.len(), 1);

        let fetched = store.get_virtual_object("t1", "ns1").await.unwrap();
        assert_eq!(fetched.fingerprint, "u1");

        store.remove("t1", "ns1").await;
        let err = store.get_virtual_object("t1", "ns1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_tenant_store_injected_listing_failure() {
        let store = InMemoryTenantStore::new();
        store.fail_listings_for("t1").await;

        let err = store.list_virtual_objects("t1").await.unwrap_err();
        assert!(matches!(err, StoreError::Transient(_)));
        // Other tenants are unaffected.
        assert!(store.list_virtual_objects("t2").await.is_ok());
    }

    #[tokio::test]
    async fn test_conditional_delete_honors_precondition() {
        let store = InMemoryPhysicalStore::new();
        store
            .insert(PhysicalObject {
                name: "t1-ns1".to_string(),
                owner_tenant: Some("t1".to_string()),
                owner_name: Some("ns1".to_string()),
                delegated_fingerprint: Some("u1".to_string()),
            })
            .await;

        // Wrong fingerprint: rejected, object stays.
        let err = store
            .delete_physical_object("t1-ns1", "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::PreconditionFailed { .. }));
        assert!(store.contains("t1-ns1").await);

        // Matching fingerprint: deleted.
        store.delete_physical_object("t1-ns1", "u1").await.unwrap();
        assert!(!store.contains("t1-ns1").await);

        // Already gone.
        let err = store
            .delete_physical_object("t1-ns1", "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::NotFound(_)));
        assert_eq!(store.delete_calls(), 3);
    }

    #[tokio::test]
    async fn test_manual_gate_releases_waiters() {
        let gate = std::sync::Arc::new(ManualReadinessGate::pending());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_for_sync().await })
        };
        gate.mark_synced();
        assert!(waiter.await.unwrap());
        // Later waiters pass straight through.
        assert!(gate.wait_for_sync().await);
    }
}
