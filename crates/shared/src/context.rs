//! Request-scoped context for a single reconciliation pass.
//!
//! The context carries a correlation id that flows into logs and error
//! metadata. There is no cancellation: once a pass starts, every remote
//! operation runs until it succeeds or exhausts its retry budget.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A correlation identifier used for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier from user input.
    ///
    /// The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// Create a new pass id, best-effort unique within this process.
    #[must_use]
    pub fn new_pass_id() -> Self {
        let n = PASS_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::from(format!("pass_{n}")))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

static PASS_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Request-scoped context passed across port boundaries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
}

impl RequestContext {
    /// Create a context for an explicit correlation id.
    #[must_use]
    pub const fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    /// Create a context with an auto-generated `pass_*` id.
    #[must_use]
    pub fn new_pass() -> Self {
        Self::new(CorrelationId::new_pass_id())
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_rejects_blank_input() {
        assert!(CorrelationId::parse("  ").is_err());
        assert_eq!(
            CorrelationId::parse(" stack-1 ").map(|id| id.to_string()),
            Ok("stack-1".to_owned())
        );
    }

    #[test]
    fn pass_ids_are_distinct() {
        let first = RequestContext::new_pass();
        let second = RequestContext::new_pass();
        assert_ne!(first.correlation_id(), second.correlation_id());
        assert!(first.correlation_id().as_str().starts_with("pass_"));
    }
}
