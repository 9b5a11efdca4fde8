//! Drift scanning.
//!
//! One `ConsistencyChecker` cycle compares both sides of the mirror:
//!
//! 1. **Tenant scans** (one concurrent task per tenant): every virtual
//!    object must have a physical counterpart; missing ones are requeued
//!    into the event-driven sync path.
//! 2. **Orphan scan** (single pass, after all tenant scans join): every
//!    managed physical object must have a live, fingerprint-matching
//!    virtual owner; orphans and stale mirrors are deleted with an identity
//!    precondition.
//!
//! The two listings are taken without cross-store consistency, so a scan
//! can observe read-skew and classify fresh state as drift. The
//! precondition-guarded delete and the idempotent requeue make every such
//! false positive harmless, and the next cycle self-corrects.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use crate::executor::RemediationExecutor;
use crate::identity;
use crate::metrics::CheckerMetrics;
use crate::model::RemediationDecision;
use crate::stores::{PhysicalCache, TenantRegistry, TenantStore};

/// Compares the virtual and physical sides of the mirror and feeds
/// remediation decisions straight into the executor.
pub struct ConsistencyChecker {
    registry: Arc<dyn TenantRegistry>,
    tenant_store: Arc<dyn TenantStore>,
    physical_cache: Arc<dyn PhysicalCache>,
    executor: RemediationExecutor,
    metrics: CheckerMetrics,
}

impl ConsistencyChecker {
    pub fn new(
        registry: Arc<dyn TenantRegistry>,
        tenant_store: Arc<dyn TenantStore>,
        physical_cache: Arc<dyn PhysicalCache>,
        executor: RemediationExecutor,
        metrics: CheckerMetrics,
    ) -> Self {
        Self {
            registry,
            tenant_store,
            physical_cache,
            executor,
            metrics,
        }
    }

    /// Run one full check cycle: fan out per-tenant scans, join them all,
    /// then sweep the physical side once.
    ///
    /// The orphan scan must not start before every tenant scan has
    /// finished; the join barrier keeps a virtual object that a tenant scan
    /// just requeued from being misread as ownerless by a physical object
    /// recreated mid-cycle.
    pub async fn run_cycle(self: Arc<Self>) {
        let tenants = self.registry.list_tenants().await;
        if tenants.is_empty() {
            tracing::info!("no tenants known, skipping consistency cycle");
            return;
        }

        let started = Instant::now();
        tracing::debug!(tenants = tenants.len(), "starting consistency cycle");

        let mut scans = JoinSet::new();
        for tenant in tenants {
            let checker = Arc::clone(&self);
            scans.spawn(async move { checker.scan_tenant(&tenant).await });
        }
        while let Some(joined) = scans.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "tenant scan task failed");
            }
        }

        self.scan_physical().await;

        let elapsed = started.elapsed();
        self.metrics.record_cycle(elapsed);
        tracing::debug!(duration_ms = elapsed.as_millis() as u64, "consistency cycle complete");
    }

    /// Check that every virtual object of `tenant` has a physical
    /// counterpart.
    ///
    /// A listing failure aborts this tenant's scan for the cycle before any
    /// side effect is attempted; other tenants are unaffected.
    pub async fn scan_tenant(&self, tenant: &str) {
        let objects = match self.tenant_store.list_virtual_objects(tenant).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::error!(
                    tenant = %tenant,
                    error = %e,
                    "failed to list virtual objects, skipping tenant this cycle"
                );
                return;
            }
        };

        tracing::debug!(tenant = %tenant, objects = objects.len(), "scanning tenant");

        for object in objects {
            let physical_name = identity::physical_name_for(tenant, &object.name);
            match self.physical_cache.get_physical_object(&physical_name).await {
                Err(e) if e.is_not_found() => {
                    // The physical counterpart is gone (or never made it):
                    // hand the object back to the sync path to recreate it.
                    self.executor
                        .apply(RemediationDecision::RequeueVirtual {
                            tenant: tenant.to_string(),
                            object,
                        })
                        .await;
                }
                Err(e) => {
                    // Do not mask a transient backend error as drift.
                    tracing::error!(
                        tenant = %tenant,
                        physical = %physical_name,
                        error = %e,
                        "failed to look up physical object"
                    );
                }
                Ok(physical) => {
                    if !identity::fingerprints_match(&physical, &object) {
                        // Report only; the orphan scan owns the delete for
                        // mismatches so two scans never race on the same
                        // object.
                        self.executor
                            .apply(RemediationDecision::ReportMismatch { physical_name })
                            .await;
                    }
                }
            }
        }
    }

    /// Sweep the physical side for objects whose virtual owner is gone or
    /// whose delegated fingerprint no longer matches.
    pub async fn scan_physical(&self) {
        let physicals = match self.physical_cache.list_physical_objects().await {
            Ok(physicals) => physicals,
            Err(e) => {
                tracing::error!(error = %e, "failed to list physical objects, skipping orphan scan");
                return;
            }
        };

        tracing::debug!(objects = physicals.len(), "scanning physical store for orphans");

        for physical in physicals {
            let Some(owner) = identity::owner_of(&physical) else {
                // Not managed by this system.
                continue;
            };

            let should_delete = match self
                .tenant_store
                .get_virtual_object(&owner.tenant, &owner.virtual_name)
                .await
            {
                Err(e) if e.is_not_found() => true,
                Err(e) => {
                    tracing::error!(
                        tenant = %owner.tenant,
                        object = %owner.virtual_name,
                        error = %e,
                        "failed to look up virtual owner"
                    );
                    false
                }
                Ok(virtual_object) => {
                    if identity::fingerprints_match(&physical, &virtual_object) {
                        false
                    } else {
                        // Stale mirror of a prior, now-recreated virtual
                        // object. Delete it so the sync path can rebuild
                        // the physical side fresh.
                        tracing::warn!(
                            physical = %physical.name,
                            tenant = %owner.tenant,
                            "delegated fingerprint differs from tenant object, removing stale mirror"
                        );
                        true
                    }
                }
            };

            if should_delete {
                match &physical.delegated_fingerprint {
                    Some(fingerprint) => {
                        self.executor
                            .apply(RemediationDecision::DeletePhysical {
                                name: physical.name.clone(),
                                expected_fingerprint: fingerprint.clone(),
                            })
                            .await;
                    }
                    None => {
                        // Without a delegated fingerprint there is no safe
                        // delete precondition to attach.
                        tracing::warn!(
                            physical = %physical.name,
                            "orphan physical object has no delegated fingerprint, refusing unconditional delete"
                        );
                    }
                }
            }
        }
    }
}
