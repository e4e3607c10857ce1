//! The engine's view of an index that exists remotely.

use crate::primitives::IndexName;
use crate::spec::PodType;
use serde::{Deserialize, Serialize};

/// Remote index state discovered during a reconciliation pass.
///
/// Rebuilt from the control API on every pass and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIndexRecord {
    /// Resolved remote name.
    pub name: IndexName,
    /// Current pod type.
    pub pod_type: PodType,
    /// Stored vector count, when the remote API reported one.
    pub vector_count: Option<u64>,
}

impl ManagedIndexRecord {
    /// Build a record from discovered remote state.
    #[must_use]
    pub const fn new(name: IndexName, pod_type: PodType, vector_count: Option<u64>) -> Self {
        Self {
            name,
            pod_type,
            vector_count,
        }
    }

    /// Returns `Some(true)` when the index holds vectors, `None` when unknown.
    #[must_use]
    pub fn holds_vectors(&self) -> Option<bool> {
        self.vector_count.map(|count| count > 0)
    }
}
