//! Errors that end a reconciliation pass.

use index_provisioner_domain::{InvalidUpdate, SpecError};
use index_provisioner_shared::{ErrorCode, ErrorEnvelope, OperationFailed};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a pass failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The declaration cannot be acted on. Never retried.
    #[error("invalid index declaration: {0}")]
    InvalidSpec(#[from] SpecError),

    /// A requested update is not allowed. The remote side is left untouched.
    #[error("{0}")]
    InvalidUpdate(#[from] InvalidUpdate),

    /// A remote operation exhausted its retry budget.
    #[error("{0}")]
    OperationFailed(#[from] OperationFailed),

    /// The API key could not be read from the secret store.
    #[error("failed to resolve credential `{secret}`: {}", cause.message)]
    CredentialResolutionFailed {
        /// Secret reference that was looked up.
        secret: Box<str>,
        /// Failure reported by the secret store.
        cause: ErrorEnvelope,
    },

    /// Anything else (connector failures, broken invariants).
    #[error("{}", .0.message)]
    Unexpected(ErrorEnvelope),
}

impl ReconcileError {
    /// Failure category reported on the outcome.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidSpec(_) => FailureKind::InvalidSpec,
            Self::InvalidUpdate(_) => FailureKind::InvalidUpdate,
            Self::OperationFailed(_) => FailureKind::OperationFailed,
            Self::CredentialResolutionFailed { .. } => FailureKind::CredentialResolutionFailed,
            Self::Unexpected(_) => FailureKind::Unexpected,
        }
    }

    /// Stable code for credential failures.
    pub fn credential_error_code() -> ErrorCode {
        ErrorCode::new("reconcile", "credential_resolution_failed")
    }
}

impl From<ReconcileError> for ErrorEnvelope {
    fn from(error: ReconcileError) -> Self {
        let message = error.to_string();
        match error {
            ReconcileError::InvalidSpec(error) => error.into(),
            ReconcileError::InvalidUpdate(error) => error.into(),
            ReconcileError::OperationFailed(error) => error.into(),
            ReconcileError::CredentialResolutionFailed { secret, cause } => {
                Self::expected(ReconcileError::credential_error_code(), message)
                    .with_metadata("secretName", secret.as_ref())
                    .with_metadata("causeCode", cause.code.to_string())
            },
            ReconcileError::Unexpected(envelope) => envelope,
        }
    }
}

/// Failure category of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Declaration rejected.
    InvalidSpec,
    /// Update rejected.
    InvalidUpdate,
    /// Retry budget exhausted.
    OperationFailed,
    /// Credential lookup failed.
    CredentialResolutionFailed,
    /// Anything else.
    Unexpected,
}

impl FailureKind {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSpec => "invalid_spec",
            Self::InvalidUpdate => "invalid_update",
            Self::OperationFailed => "operation_failed",
            Self::CredentialResolutionFailed => "credential_resolution_failed",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_domain::validate_update;

    #[test]
    fn spec_errors_keep_their_code() {
        let error = ReconcileError::from(SpecError::MissingDimension {
            index: "stack-abc-docs".to_owned(),
        });
        assert_eq!(error.kind(), FailureKind::InvalidSpec);

        let envelope = ErrorEnvelope::from(error);
        assert_eq!(envelope.code, SpecError::error_code());
        assert_eq!(
            envelope.metadata.get("index").map(String::as_str),
            Some("stack-abc-docs")
        );
    }

    #[test]
    fn invalid_update_maps_to_its_kind() -> Result<(), Box<dyn std::error::Error>> {
        let Err(rejection) = validate_update("p1.x2", "s1.x2") else {
            return Err("instance change should be rejected".into());
        };
        let error = ReconcileError::from(rejection);
        assert_eq!(error.kind().as_str(), "invalid_update");
        assert_eq!(ErrorEnvelope::from(error).code, InvalidUpdate::error_code());
        Ok(())
    }

    #[test]
    fn credential_failure_names_the_secret_not_the_value() {
        let error = ReconcileError::CredentialResolutionFailed {
            secret: "pinecone-api-key".into(),
            cause: ErrorEnvelope::expected(ErrorCode::new("secrets", "not_found"), "missing"),
        };
        assert!(error.to_string().contains("pinecone-api-key"));

        let envelope = ErrorEnvelope::from(error);
        assert_eq!(envelope.code, ReconcileError::credential_error_code());
        assert_eq!(
            envelope.metadata.get("causeCode").map(String::as_str),
            Some("secrets:not_found")
        );
    }

    #[test]
    fn operation_failed_envelope_carries_attempts() {
        let error = ReconcileError::from(OperationFailed {
            operation_name: "create_index".into(),
            cause: ErrorEnvelope::expected(ErrorCode::unavailable(), "down"),
            attempts: 3,
        });
        assert_eq!(error.kind(), FailureKind::OperationFailed);
        let envelope = ErrorEnvelope::from(error);
        assert_eq!(envelope.metadata.get("attempts").map(String::as_str), Some("3"));
    }
}
