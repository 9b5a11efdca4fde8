//! Typed objects exchanged between the checker and its collaborators.

use serde::{Deserialize, Serialize};

/// A tenant-scoped logical object, owned and mutated exclusively by the
/// tenant-side store. The checker only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualObject {
    /// Object name, unique within its tenant.
    pub name: String,
    /// Tenant that owns this object.
    pub tenant: String,
    /// Unique identity assigned at creation time by the tenant store.
    pub fingerprint: String,
}

impl VirtualObject {
    pub fn new(
        tenant: impl Into<String>,
        name: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tenant: tenant.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// A shared-store object mirroring some tenant's virtual object.
///
/// The owner fields come from annotations written by the event-driven sync
/// path when the object was created. Objects without a complete owner
/// annotation are not managed by this system and are never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalObject {
    /// Name in the shared store, derived from `(tenant, virtual name)`.
    pub name: String,
    /// Tenant recorded in the owner annotation, if present.
    pub owner_tenant: Option<String>,
    /// Virtual object name recorded in the owner annotation, if present.
    pub owner_name: Option<String>,
    /// Fingerprint copied from the owning virtual object at creation time.
    pub delegated_fingerprint: Option<String>,
}

/// Reference to the virtual object a physical object claims to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub tenant: String,
    pub virtual_name: String,
}

/// Corrective action produced by a scan and applied by the executor.
///
/// Decisions are transient values: nothing is persisted between cycles, and
/// an unapplied decision is simply re-derived on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationDecision {
    /// Delete a physical object, conditional on its identity still matching
    /// the fingerprint observed during the scan.
    DeletePhysical {
        name: String,
        expected_fingerprint: String,
    },
    /// Hand a virtual object back to the event-driven sync path so its
    /// physical counterpart gets (re)created.
    RequeueVirtual {
        tenant: String,
        object: VirtualObject,
    },
    /// Log-only report of a fingerprint mismatch seen from the tenant side.
    ReportMismatch { physical_name: String },
}
