//! # index-provisioner-shared
//!
//! Shared result types, error handling, and retry primitives for the
//! index-provisioner workspace.
//!
//! - Result and error envelope types
//! - Fixed-delay retry executor
//! - Secret redaction and bounded numeric wrappers
//! - Request context (correlation ids)
//!
//! This crate has no workspace dependencies.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod context;
pub mod errors;
pub mod invariants;
pub mod redaction;
pub mod result;
pub mod retry;

pub use context::{CorrelationId, RequestContext};
pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, REDACTED_VALUE,
};
pub use invariants::{BoundedU32, BoundsError};
pub use redaction::{REDACTED, SecretString, is_secret_key, redact_if_secret};
pub use result::{Result, ResultExt};
pub use retry::{
    AttemptFailure, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, OperationFailed, RetryPolicy,
    retry_fixed, retry_fixed_with_observer,
};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
