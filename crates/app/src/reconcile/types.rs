//! Inputs and outputs of a reconciliation pass.

use super::error::FailureKind;
use index_provisioner_domain::{
    EventKind, IndexName, MAX_INDEX_NAME_LENGTH, ReconcileState, RemovalPolicy,
};
use index_provisioner_ports::{IndexControlConnector, LoggerPort, SecretStorePort};
use index_provisioner_shared::{ErrorEnvelope, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Dependencies required by reconcile.
#[derive(Clone)]
pub struct ReconcileDeps {
    /// Builds a control API client once the credential is known.
    pub connector: Arc<dyn IndexControlConnector>,
    /// Resolves the API key secret.
    pub secrets: Arc<dyn SecretStorePort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Immutable settings for one pass, usually derived from validated config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Policy applied to every remote call.
    pub retry: RetryPolicy,
    /// Budget for resolved index names.
    pub max_index_name_length: usize,
    /// Policy for indexes without a declared removal policy.
    pub default_removal_policy: RemovalPolicy,
    /// Secret reference used when no declared index names one.
    pub api_key_secret_name: Option<Box<str>>,
    /// Environment used when no declared index names one.
    pub environment: Option<Box<str>>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_index_name_length: MAX_INDEX_NAME_LENGTH,
            default_removal_policy: RemovalPolicy::default(),
            api_key_secret_name: None,
            environment: None,
        }
    }
}

/// What happened to one index during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexAction {
    /// Created.
    Created,
    /// Scaled to the declared replicas and pod type.
    Updated,
    /// Deleted.
    Deleted,
    /// Snapshotted, then deleted.
    Snapshotted,
    /// Left in place by the deletion guard.
    Retained,
}

impl IndexAction {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Snapshotted => "snapshotted",
            Self::Retained => "retained",
        }
    }
}

/// Per-index result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutcome {
    /// Resolved remote name.
    pub name: IndexName,
    /// Declared logical name; absent for managed indexes that are no longer declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<Box<str>>,
    /// Action taken.
    pub action: IndexAction,
    /// Skip reason or snapshot name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Box<str>>,
}

impl IndexOutcome {
    pub(crate) fn new(name: IndexName, logical_name: Option<&str>, action: IndexAction) -> Self {
        Self {
            name,
            logical_name: logical_name.map(Box::from),
            action,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<Box<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The remote side converged.
    Done {
        /// Event kind that was handled.
        event: EventKind,
        /// Per-index actions, in execution order.
        indexes: Vec<IndexOutcome>,
        /// States visited, ending in `Done`.
        states: Vec<ReconcileState>,
    },
    /// The pass stopped early.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// Human-readable reason.
        message: String,
        /// Structured error.
        error: ErrorEnvelope,
        /// States visited, ending in `Failed`.
        states: Vec<ReconcileState>,
    },
}

impl ReconcileOutcome {
    /// Returns true for `Done`.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// States visited during the pass.
    #[must_use]
    pub fn states(&self) -> &[ReconcileState] {
        match self {
            Self::Done { states, .. } | Self::Failed { states, .. } => states,
        }
    }

    /// Per-index actions; empty for failed passes.
    #[must_use]
    pub fn indexes(&self) -> &[IndexOutcome] {
        match self {
            Self::Done { indexes, .. } => indexes,
            Self::Failed { .. } => &[],
        }
    }

    /// Failure category, if the pass failed.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Done { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }
}
