//! # index-provisioner-domain
//!
//! Domain model for remote vector-index lifecycle management.
//!
//! - **Primitives** - `ScopeId`, `IndexName`, `SnapshotName`
//! - **Naming** - scope-namespaced, collision-free index names
//! - **Spec** - `DesiredIndexSpec`, `PodType`, `RemovalPolicy`
//! - **Events** - `LifecycleEvent` tagged union
//! - **Guards** - deletion guard and update validator
//! - **State** - `ReconcileState`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use index_provisioner_shared::shared_crate_version;

pub mod event;
pub mod guard;
pub mod naming;
pub mod primitives;
pub mod record;
pub mod spec;
pub mod states;
pub mod upgrade;

pub use event::{EventKind, EventPayload, LifecycleEvent};
pub use guard::{DeletionDecision, SkipReason, may_delete};
pub use naming::{
    DEFAULT_LOGICAL_NAME, MAX_INDEX_NAME_LENGTH, MIN_INDEX_NAME_LENGTH, ManagedPrefix,
    managed_prefix, resolve, resolve_with_prefix,
};
pub use primitives::{IndexName, PrimitiveError, ScopeId, SnapshotName};
pub use record::ManagedIndexRecord;
pub use spec::{
    DesiredIndexSpec, DistanceMetric, MetadataConfig, PodCount, PodInstanceClass, PodSizeClass,
    PodType, PodTypeError, RemovalPolicy, ReplicaCount, SpecError,
};
pub use states::ReconcileState;
pub use upgrade::{InvalidUpdate, UpdateRejection, validate_pod_type_change, validate_update};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
