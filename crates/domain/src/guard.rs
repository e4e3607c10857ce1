//! Policy gate for destructive deletes.
//!
//! Rules are evaluated in order:
//!
//! | removal policy           | condition             | decision               |
//! |--------------------------|-----------------------|------------------------|
//! | any                      | record unavailable    | `Skip`                 |
//! | `retain`                 | any                   | `Skip`                 |
//! | `retain-if-nonempty`     | vector count > 0      | `Skip`                 |
//! | `retain-if-nonempty`     | vector count unknown  | `Skip`                 |
//! | `retain-if-nonempty`     | vector count == 0     | `Proceed`              |
//! | `snapshot-then-destroy`  | any                   | `ProceedAfterSnapshot` |
//! | `destroy`                | any                   | `Proceed`              |
//!
//! An index that cannot be described is never deleted.

use crate::record::ManagedIndexRecord;
use crate::spec::RemovalPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a delete was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The remote index could not be described.
    Uninspectable,
    /// The removal policy retains the index unconditionally.
    Retained,
    /// The index holds vectors and the policy retains non-empty indexes.
    NotEmpty {
        /// Reported vector count.
        vector_count: u64,
    },
    /// The remote API did not report a vector count.
    UnknownVectorCount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninspectable => formatter.write_str("index could not be described"),
            Self::Retained => formatter.write_str("removal policy retains the index"),
            Self::NotEmpty { vector_count } => {
                write!(formatter, "index is not empty ({vector_count} vectors)")
            },
            Self::UnknownVectorCount => formatter.write_str("vector count is unknown"),
        }
    }
}

/// Outcome of the deletion guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DeletionDecision {
    /// Delete directly.
    Proceed,
    /// Create a snapshot first, then delete.
    ProceedAfterSnapshot,
    /// Leave the index in place.
    Skip {
        /// Why the delete was skipped.
        #[serde(flatten)]
        reason: SkipReason,
    },
}

impl DeletionDecision {
    /// Returns true when the index will be deleted.
    #[must_use]
    pub const fn deletes(self) -> bool {
        !matches!(self, Self::Skip { .. })
    }
}

/// Decide whether `record` may be deleted under `policy`.
///
/// `record` is `None` when remote discovery failed.
#[must_use]
pub fn may_delete(record: Option<&ManagedIndexRecord>, policy: RemovalPolicy) -> DeletionDecision {
    let Some(record) = record else {
        return DeletionDecision::Skip {
            reason: SkipReason::Uninspectable,
        };
    };

    match policy {
        RemovalPolicy::Retain => DeletionDecision::Skip {
            reason: SkipReason::Retained,
        },
        RemovalPolicy::RetainIfNonempty => match record.vector_count {
            Some(0) => DeletionDecision::Proceed,
            Some(vector_count) => DeletionDecision::Skip {
                reason: SkipReason::NotEmpty { vector_count },
            },
            None => DeletionDecision::Skip {
                reason: SkipReason::UnknownVectorCount,
            },
        },
        RemovalPolicy::SnapshotThenDestroy => DeletionDecision::ProceedAfterSnapshot,
        RemovalPolicy::Destroy => DeletionDecision::Proceed,
    }
}
