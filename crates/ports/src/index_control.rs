//! Remote vector-index control API boundary contract.

use crate::BoxFuture;
use index_provisioner_domain::{
    DesiredIndexSpec, DistanceMetric, IndexName, MetadataConfig, PodType, SnapshotName,
};
use index_provisioner_shared::{RequestContext, Result, SecretString};
use std::sync::Arc;

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexControlProviderInfo {
    /// Stable provider identifier.
    pub id: Box<str>,
    /// Human-readable provider name.
    pub name: Box<str>,
}

/// Owned request for creating an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexRequest {
    /// Resolved index name.
    pub name: IndexName,
    /// Vector dimension.
    pub dimension: u32,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Pod count.
    pub pods: u32,
    /// Replica count.
    pub replicas: u32,
    /// Composite pod type.
    pub pod_type: PodType,
    /// Optional metadata allowlist.
    pub metadata_config: Option<MetadataConfig>,
    /// Optional collection to clone from.
    pub source_collection: Option<Box<str>>,
}

impl CreateIndexRequest {
    /// Build a create request from a declared spec; instance and size fold into `pod_type`.
    #[must_use]
    pub fn from_spec(name: IndexName, dimension: u32, spec: &DesiredIndexSpec) -> Self {
        Self {
            name,
            dimension,
            metric: spec.metric,
            pods: spec.pods.get(),
            replicas: spec.replicas.get(),
            pod_type: spec.pod_type(),
            metadata_config: spec.metadata_config.clone(),
            source_collection: spec.source_collection.as_deref().map(Box::from),
        }
    }
}

/// Owned request for scaling an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateIndexRequest {
    /// Index to update.
    pub name: IndexName,
    /// Desired replica count.
    pub replicas: u32,
    /// Desired pod type.
    pub pod_type: PodType,
}

/// Remote state reported for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    /// Index name.
    pub name: IndexName,
    /// Current pod type as reported by the remote API.
    pub pod_type: Box<str>,
    /// Stored vector count, when the remote API reports one.
    pub vector_count: Option<u64>,
}

/// Boundary contract for the remote index control API.
pub trait IndexControlPort: Send + Sync {
    /// Provider info for this implementation.
    fn provider(&self) -> &IndexControlProviderInfo;

    /// Create an index.
    fn create_index(&self, ctx: &RequestContext, request: CreateIndexRequest)
    -> BoxFuture<'_, Result<()>>;

    /// Change replica count and pod type of an index.
    fn update_index(&self, ctx: &RequestContext, request: UpdateIndexRequest)
    -> BoxFuture<'_, Result<()>>;

    /// Delete an index.
    fn delete_index(&self, ctx: &RequestContext, name: IndexName) -> BoxFuture<'_, Result<()>>;

    /// Describe an index (pod type and vector count).
    fn describe_index(
        &self,
        ctx: &RequestContext,
        name: IndexName,
    ) -> BoxFuture<'_, Result<IndexDescription>>;

    /// List every index visible to the credential.
    fn list_indexes(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Vec<IndexName>>>;

    /// Create a point-in-time snapshot of `source`.
    fn create_snapshot(
        &self,
        ctx: &RequestContext,
        name: SnapshotName,
        source: IndexName,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Builds control clients bound to a credential and environment.
pub trait IndexControlConnector: Send + Sync {
    /// Connect to `environment` using `credential`.
    fn connect(
        &self,
        ctx: &RequestContext,
        credential: SecretString,
        environment: &str,
    ) -> Result<Arc<dyn IndexControlPort>>;
}
