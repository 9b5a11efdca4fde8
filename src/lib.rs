//! driftwatch — periodic drift detection and auto-remediation for a
//! multi-tenant resource-mirroring control plane.
//!
//! A shared physical store mirrors objects owned by many isolated tenant
//! stores. The event-driven sync path keeps the two sides aligned in the
//! happy case; this crate is the safety net that periodically compares
//! both sides after the fact, classifies any drift, and issues corrective
//! actions:
//!
//! - A virtual object with no physical counterpart is requeued into the
//!   sync path so its mirror gets recreated.
//! - A physical object with no live virtual owner, or with a stale
//!   delegated fingerprint, is deleted behind an identity precondition.
//!
//! All backends are consumed through the narrow traits in [`stores`]; the
//! crate itself never creates or updates physical objects.

pub mod config;
pub mod error;
pub mod executor;
pub mod identity;
pub mod metrics;
pub mod model;
pub mod scanner;
pub mod scheduler;
pub mod stores;

// Re-export commonly used types
pub use config::{CheckerConfig, Configuration};
pub use error::{CheckerError, DeleteError, EnqueueError, StoreError};
pub use executor::RemediationExecutor;
pub use metrics::{CheckerMetrics, MetricsSummary};
pub use model::{OwnerRef, PhysicalObject, RemediationDecision, VirtualObject};
pub use scanner::ConsistencyChecker;
pub use scheduler::{CheckerState, PeriodChecker};
pub use stores::{PhysicalCache, PhysicalStore, ReadinessGate, TenantRegistry, TenantStore};
