//! Reconciliation state machine.

use crate::event::EventKind;
use serde::{Deserialize, Serialize};

/// State of one reconciliation pass.
///
/// `Idle → Resolving → Discovering → {Creating | Updating | Deleting} → Done | Failed`.
/// Create events skip discovery. Any non-terminal state may fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcileState {
    /// Event accepted, nothing done yet.
    Idle,
    /// Resolving names and credentials.
    Resolving,
    /// Reading remote state.
    Discovering,
    /// Creating declared indexes.
    Creating,
    /// Converging existing indexes.
    Updating,
    /// Removing indexes.
    Deleting,
    /// Pass completed.
    Done,
    /// Pass failed with a human-readable reason.
    Failed {
        /// Failure reason.
        reason: Box<str>,
    },
}

impl ReconcileState {
    /// Returns true for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }

    /// Working state entered for an event kind.
    #[must_use]
    pub const fn working_state(kind: EventKind) -> Self {
        match kind {
            EventKind::Create => Self::Creating,
            EventKind::Update => Self::Updating,
            EventKind::Delete => Self::Deleting,
        }
    }

    /// Returns true when moving to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: &Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Self::Failed { .. })
            | (Self::Idle, Self::Resolving)
            | (Self::Resolving, Self::Discovering | Self::Creating)
            | (Self::Discovering, Self::Updating | Self::Deleting)
            | (Self::Creating | Self::Updating | Self::Deleting, Self::Done) => true,
            _ => false,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Discovering => "discovering",
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
            Self::Done => "done",
            Self::Failed { .. } => "failed",
        }
    }
}
