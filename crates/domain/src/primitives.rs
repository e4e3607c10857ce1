//! Domain primitives with validated constructors.

use index_provisioner_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `ScopeId` is empty after trimming.
    InvalidScopeId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `IndexName` is empty or contains forbidden characters.
    InvalidIndexName {
        /// Raw input that failed validation.
        input: String,
    },
    /// `SnapshotName` is empty or contains forbidden characters.
    InvalidSnapshotName {
        /// Raw input that failed validation.
        input: String,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidScopeId { .. } => ErrorCode::new("domain", "invalid_scope_id"),
            Self::InvalidIndexName { .. } => ErrorCode::new("domain", "invalid_index_name"),
            Self::InvalidSnapshotName { .. } => ErrorCode::new("domain", "invalid_snapshot_name"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidScopeId { .. } => formatter.write_str("ScopeId must be non-empty"),
            Self::InvalidIndexName { .. } => formatter
                .write_str("IndexName must be non-empty without whitespace or '/' characters"),
            Self::InvalidSnapshotName { .. } => formatter
                .write_str("SnapshotName must be non-empty without whitespace or '/' characters"),
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::InvalidScopeId { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
            PrimitiveError::InvalidIndexName { input }
            | PrimitiveError::InvalidSnapshotName { input } => {
                envelope.with_metadata("input", input)
            },
        }
    }
}

/// Caller-supplied token identifying the deployment that owns a set of indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeId(Box<str>);

impl ScopeId {
    /// Parse a `ScopeId` from user input.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidScopeId {
                input_length: raw.len(),
            });
        };

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScopeId {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ScopeId> for String {
    fn from(value: ScopeId) -> Self {
        value.0.into_string()
    }
}

impl AsRef<str> for ScopeId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Name of a remote index, as observed through the control API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(Box<str>);

impl IndexName {
    /// Parse an index name reported by (or sent to) the remote API.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        if !is_remote_name(raw) {
            return Err(PrimitiveError::InvalidIndexName {
                input: raw.to_owned(),
            });
        }
        Ok(Self(raw.into()))
    }

    /// Wrap a name produced by the naming resolver, which only emits `[a-z0-9-]`.
    pub(crate) fn from_resolved(name: String) -> Self {
        Self(name.into_boxed_str())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the underlying string.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl TryFrom<String> for IndexName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<IndexName> for String {
    fn from(value: IndexName) -> Self {
        value.0.into_string()
    }
}

impl AsRef<str> for IndexName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Name of a point-in-time snapshot ("collection") of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotName(Box<str>);

impl SnapshotName {
    /// Parse a snapshot name.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        if !is_remote_name(raw) {
            return Err(PrimitiveError::InvalidSnapshotName {
                input: raw.to_owned(),
            });
        }
        Ok(Self(raw.into()))
    }

    /// Snapshot name reserved for `index` before a destructive delete.
    #[must_use]
    pub fn for_index(index: &IndexName) -> Self {
        Self(format!("{index}_snapshot").into_boxed_str())
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SnapshotName {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SnapshotName> for String {
    fn from(value: SnapshotName) -> Self {
        value.0.into_string()
    }
}

impl AsRef<str> for SnapshotName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

// Names end up in URL paths, so whitespace and separators are rejected.
fn is_remote_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && !candidate
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '?' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scope_id_requires_non_empty_input() {
        let error = ScopeId::parse("   ").err();
        assert!(matches!(
            error,
            Some(PrimitiveError::InvalidScopeId { input_length: 3 })
        ));
    }

    #[test]
    fn scope_id_is_trimmed() -> Result<(), PrimitiveError> {
        let scope = ScopeId::parse("  pinecone-stack ")?;
        assert_eq!(scope.as_str(), "pinecone-stack");
        Ok(())
    }

    #[test]
    fn index_name_rejects_path_separators() {
        let error = IndexName::parse("a/b").err();
        assert!(matches!(error, Some(PrimitiveError::InvalidIndexName { .. })));
        assert!(IndexName::parse("").is_err());
        assert!(IndexName::parse("has space").is_err());
    }

    #[test]
    fn snapshot_name_appends_suffix() -> Result<(), PrimitiveError> {
        let index = IndexName::parse("stack-abc-docs")?;
        assert_eq!(SnapshotName::for_index(&index).as_str(), "stack-abc-docs_snapshot");
        Ok(())
    }

    #[test]
    fn primitive_error_converts_to_envelope() {
        let envelope = ErrorEnvelope::from(PrimitiveError::InvalidIndexName {
            input: "a b".to_owned(),
        });
        assert_eq!(envelope.code, ErrorCode::new("domain", "invalid_index_name"));
        assert_eq!(envelope.metadata.get("input").map(String::as_str), Some("a b"));
    }

    #[test]
    fn scope_id_deserializes_through_validation() {
        let parsed: Result<ScopeId, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
    }

    proptest! {
        #[test]
        fn index_name_accepts_resolver_alphabet(name in "[a-z0-9][a-z0-9-]{0,44}") {
            let parsed = IndexName::parse(&name);
            prop_assert!(parsed.is_ok());
        }
    }
}
