//! Pod-type update invariants.
//!
//! The remote API can only scale an index vertically within its instance
//! class, and it cannot shrink pods. Both rules are checked before any update
//! is sent, so a rejected update never touches the remote index.

use crate::spec::PodType;
use index_provisioner_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Why an update was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRejection {
    /// A pod type string could not be parsed.
    UnparseablePodType {
        /// Which side failed (`current` or `desired`).
        side: &'static str,
        /// Raw input.
        input: String,
    },
    /// The instance class would change.
    InstanceClassChanged {
        /// Current instance class.
        current: String,
        /// Desired instance class.
        desired: String,
    },
    /// The pod size would shrink.
    SizeDowngrade {
        /// Current size magnitude.
        current: u32,
        /// Desired size magnitude.
        desired: u32,
    },
}

impl fmt::Display for UpdateRejection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnparseablePodType { side, input } => {
                write!(formatter, "{side} pod type `{input}` cannot be parsed")
            },
            Self::InstanceClassChanged { current, desired } => write!(
                formatter,
                "cannot change pod type. current pod type: {current}, new pod type: {desired}"
            ),
            Self::SizeDowngrade { current, desired } => write!(
                formatter,
                "cannot downgrade pod size. current pod size: x{current}, new pod size: x{desired}"
            ),
        }
    }
}

/// An update that violates the pod-type invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUpdate {
    /// Specific violation.
    pub reason: UpdateRejection,
}

impl InvalidUpdate {
    /// Stable code for rejected updates.
    pub fn error_code() -> ErrorCode {
        ErrorCode::new("reconcile", "invalid_update")
    }
}

impl fmt::Display for InvalidUpdate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "invalid update: {}", self.reason)
    }
}

impl std::error::Error for InvalidUpdate {}

impl From<InvalidUpdate> for ErrorEnvelope {
    fn from(error: InvalidUpdate) -> Self {
        let envelope = Self::expected(InvalidUpdate::error_code(), error.to_string());
        match error.reason {
            UpdateRejection::UnparseablePodType { side, input } => envelope
                .with_metadata("side", side)
                .with_metadata("podType", input),
            UpdateRejection::InstanceClassChanged { current, desired } => envelope
                .with_metadata("current", current)
                .with_metadata("desired", desired),
            UpdateRejection::SizeDowngrade { current, desired } => envelope
                .with_metadata("current", format!("x{current}"))
                .with_metadata("desired", format!("x{desired}")),
        }
    }
}

/// Validate a pod-type change expressed as strings.
pub fn validate_update(current_pod_type: &str, desired_pod_type: &str) -> Result<(), InvalidUpdate> {
    let current = parse_side("current", current_pod_type)?;
    let desired = parse_side("desired", desired_pod_type)?;
    validate_pod_type_change(&current, &desired)
}

/// Validate a pod-type change between parsed pod types.
pub fn validate_pod_type_change(current: &PodType, desired: &PodType) -> Result<(), InvalidUpdate> {
    if current.instance_class() != desired.instance_class() {
        return Err(InvalidUpdate {
            reason: UpdateRejection::InstanceClassChanged {
                current: current.instance_class().to_owned(),
                desired: desired.instance_class().to_owned(),
            },
        });
    }
    if desired.size_magnitude() < current.size_magnitude() {
        return Err(InvalidUpdate {
            reason: UpdateRejection::SizeDowngrade {
                current: current.size_magnitude(),
                desired: desired.size_magnitude(),
            },
        });
    }
    Ok(())
}

fn parse_side(side: &'static str, raw: &str) -> Result<PodType, InvalidUpdate> {
    PodType::parse(raw).map_err(|error| InvalidUpdate {
        reason: UpdateRejection::UnparseablePodType {
            side,
            input: error.input,
        },
    })
}
