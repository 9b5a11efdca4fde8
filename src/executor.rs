//! Remediation execution.
//!
//! Applies the decisions produced by the scanners: conditional deletes
//! against the physical store and requeues into the event-driven sync path.
//! Nothing here is retried within a cycle; a failed action is logged and
//! rederived on the next periodic cycle if the drift persists.

use std::sync::Arc;

use crate::error::DeleteError;
use crate::metrics::CheckerMetrics;
use crate::model::RemediationDecision;
use crate::stores::{PhysicalStore, TenantStore};

/// Applies remediation decisions and accounts for them in metrics.
pub struct RemediationExecutor {
    physical_store: Arc<dyn PhysicalStore>,
    tenant_store: Arc<dyn TenantStore>,
    metrics: CheckerMetrics,
}

impl RemediationExecutor {
    pub fn new(
        physical_store: Arc<dyn PhysicalStore>,
        tenant_store: Arc<dyn TenantStore>,
        metrics: CheckerMetrics,
    ) -> Self {
        Self {
            physical_store,
            tenant_store,
            metrics,
        }
    }

    /// Apply a single decision. Never fails: every outcome is absorbed into
    /// logs and counters so one bad object cannot abort a scan.
    pub async fn apply(&self, decision: RemediationDecision) {
        match decision {
            RemediationDecision::DeletePhysical {
                name,
                expected_fingerprint,
            } => {
                self.delete_physical(&name, &expected_fingerprint).await;
            }
            RemediationDecision::RequeueVirtual { tenant, object } => {
                let object_name = object.name.clone();
                match self
                    .tenant_store
                    .requeue_virtual_object(&tenant, object)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            tenant = %tenant,
                            object = %object_name,
                            "requeued virtual object for the sync path to recreate its physical counterpart"
                        );
                        self.metrics.record_virtual_requeued();
                    }
                    Err(e) => {
                        tracing::error!(
                            tenant = %tenant,
                            object = %object_name,
                            error = %e,
                            "failed to requeue virtual object, will retry next cycle"
                        );
                    }
                }
            }
            RemediationDecision::ReportMismatch { physical_name } => {
                tracing::warn!(
                    physical = %physical_name,
                    "delegated fingerprint differs from tenant object"
                );
                self.metrics.record_mismatch_reported();
            }
        }
    }

    async fn delete_physical(&self, name: &str, expected_fingerprint: &str) {
        match self
            .physical_store
            .delete_physical_object(name, expected_fingerprint)
            .await
        {
            Ok(()) => {
                tracing::info!(physical = %name, "deleted orphan physical object");
                self.metrics.record_orphan_deleted();
            }
            Err(DeleteError::PreconditionFailed { .. }) => {
                // The object was recreated or changed since the scan read
                // it. Benign race: leave it for the next cycle.
                tracing::info!(
                    physical = %name,
                    "physical object identity changed since scan, skipping delete"
                );
            }
            Err(DeleteError::NotFound(_)) => {
                tracing::debug!(physical = %name, "physical object already gone");
            }
            Err(e) => {
                tracing::error!(
                    physical = %name,
                    error = %e,
                    "failed to delete orphan physical object"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PhysicalObject, VirtualObject};
    use crate::stores::{InMemoryPhysicalStore, InMemoryTenantStore};

    fn mirrored_physical(tenant: &str, name: &str, fingerprint: &str) -> PhysicalObject {
        PhysicalObject {
            name: crate::identity::physical_name_for(tenant, name),
            owner_tenant: Some(tenant.to_string()),
            owner_name: Some(name.to_string()),
            delegated_fingerprint: Some(fingerprint.to_string()),
        }
    }

    fn executor(
        physical: &Arc<InMemoryPhysicalStore>,
        tenants: &Arc<InMemoryTenantStore>,
        metrics: CheckerMetrics,
    ) -> RemediationExecutor {
        RemediationExecutor::new(physical.clone(), tenants.clone(), metrics)
    }

    #[tokio::test]
    async fn test_delete_success_increments_counter() {
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let metrics = CheckerMetrics::new();
        physical.insert(mirrored_physical("t1", "ns1", "u1")).await;

        executor(&physical, &tenants, metrics.clone())
            .apply(RemediationDecision::DeletePhysical {
                name: "t1-ns1".to_string(),
                expected_fingerprint: "u1".to_string(),
            })
            .await;

        assert!(!physical.contains("t1-ns1").await);
        assert_eq!(metrics.orphans_deleted(), 1);
    }

    #[tokio::test]
    async fn test_precondition_failure_is_benign() {
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let metrics = CheckerMetrics::new();
        physical.insert(mirrored_physical("t1", "ns1", "u2")).await;

        executor(&physical, &tenants, metrics.clone())
            .apply(RemediationDecision::DeletePhysical {
                name: "t1-ns1".to_string(),
                expected_fingerprint: "u1".to_string(),
            })
            .await;

        // Object survives and nothing is counted as deleted.
        assert!(physical.contains("t1-ns1").await);
        assert_eq!(metrics.orphans_deleted(), 0);
    }

    #[tokio::test]
    async fn test_requeue_records_object_and_counter() {
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let metrics = CheckerMetrics::new();

        executor(&physical, &tenants, metrics.clone())
            .apply(RemediationDecision::RequeueVirtual {
                tenant: "t1".to_string(),
                object: VirtualObject::new("t1", "ns1", "u1"),
            })
            .await;

        let requeued = tenants.requeued().await;
        assert_eq!(requeued.len(), 1);
        assert_eq!(requeued[0].0, "t1");
        assert_eq!(requeued[0].1.name, "ns1");
        assert_eq!(metrics.virtual_objects_requeued(), 1);
    }

    #[tokio::test]
    async fn test_failed_requeue_does_not_count() {
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let metrics = CheckerMetrics::new();
        tenants.reject_requeues(true);

        executor(&physical, &tenants, metrics.clone())
            .apply(RemediationDecision::RequeueVirtual {
                tenant: "t1".to_string(),
                object: VirtualObject::new("t1", "ns1", "u1"),
            })
            .await;

        assert!(tenants.requeued().await.is_empty());
        assert_eq!(metrics.virtual_objects_requeued(), 0);
    }

    #[tokio::test]
    async fn test_mismatch_report_mutates_nothing() {
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let metrics = CheckerMetrics::new();
        physical.insert(mirrored_physical("t1", "ns1", "u1")).await;

        executor(&physical, &tenants, metrics.clone())
            .apply(RemediationDecision::ReportMismatch {
                physical_name: "t1-ns1".to_string(),
            })
            .await;

        assert!(physical.contains("t1-ns1").await);
        assert_eq!(physical.delete_calls(), 0);
        assert_eq!(metrics.mismatches_reported(), 1);
    }
}
