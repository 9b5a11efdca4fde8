//! Identity mapping between virtual and physical objects.
//!
//! Pure functions only: no I/O, no failure modes beyond `None`/`false`.

use crate::model::{OwnerRef, PhysicalObject, VirtualObject};

/// Extract the owner reference recorded on a physical object.
///
/// Returns `None` when the owner annotation is absent or malformed (empty
/// tenant or name), which marks the object as unmanaged: the scanners skip
/// such objects entirely.
pub fn owner_of(physical: &PhysicalObject) -> Option<OwnerRef> {
    let tenant = physical.owner_tenant.as_deref()?;
    let virtual_name = physical.owner_name.as_deref()?;
    if tenant.is_empty() || virtual_name.is_empty() {
        return None;
    }
    Some(OwnerRef {
        tenant: tenant.to_string(),
        virtual_name: virtual_name.to_string(),
    })
}

/// Deterministic physical name for a tenant's virtual object.
///
/// The tenant is part of the name, so two tenants can never collide on the
/// same virtual object name in the shared store.
pub fn physical_name_for(tenant: &str, virtual_name: &str) -> String {
    format!("{tenant}-{virtual_name}")
}

/// Compare a physical object's delegated fingerprint against the virtual
/// object it claims to mirror. A missing delegated fingerprint never
/// matches; it means the physical object predates fingerprint delegation or
/// was created outside the sync path.
pub fn fingerprints_match(physical: &PhysicalObject, virtual_object: &VirtualObject) -> bool {
    physical.delegated_fingerprint.as_deref() == Some(virtual_object.fingerprint.as_str())
}
