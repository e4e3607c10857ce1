//! Lifecycle events delivered by the provisioning caller.

use crate::primitives::ScopeId;
use crate::spec::DesiredIndexSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Create the declared indexes.
    Create,
    /// Converge existing indexes to the declaration.
    Update,
    /// Remove the indexes owned by the scope.
    Delete,
}

impl EventKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Payload shared by every lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "EventPayloadWire")]
pub struct EventPayload {
    /// Scope that owns the indexes.
    pub scope_id: ScopeId,
    /// Caller identity of the resource, used when a spec has no name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_id: Option<String>,
    /// Declared indexes.
    pub indexes: Vec<DesiredIndexSpec>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EventPayloadWire {
    #[serde(alias = "stackName")]
    scope_id: ScopeId,
    #[serde(default, alias = "logicalResourceId")]
    logical_id: Option<String>,
    #[serde(default)]
    indexes: Option<Vec<DesiredIndexSpec>>,
    #[serde(default)]
    index: Option<DesiredIndexSpec>,
}

impl TryFrom<EventPayloadWire> for EventPayload {
    type Error = &'static str;

    fn try_from(wire: EventPayloadWire) -> Result<Self, Self::Error> {
        let indexes = match (wire.indexes, wire.index) {
            (Some(_), Some(_)) => return Err("use either `index` or `indexes`, not both"),
            (Some(indexes), None) => indexes,
            (None, Some(index)) => vec![index],
            (None, None) => Vec::new(),
        };
        Ok(Self {
            scope_id: wire.scope_id,
            logical_id: wire.logical_id,
            indexes,
        })
    }
}

impl EventPayload {
    /// Identity used as the logical name for unnamed specs.
    #[must_use]
    pub fn event_identity(&self) -> &str {
        self.logical_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(crate::naming::DEFAULT_LOGICAL_NAME)
    }
}

/// Tagged lifecycle event consumed by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Create event.
    #[serde(alias = "CREATE", alias = "Create")]
    Create(EventPayload),
    /// Update event.
    #[serde(alias = "UPDATE", alias = "Update")]
    Update(EventPayload),
    /// Delete event.
    #[serde(alias = "DELETE", alias = "Delete")]
    Delete(EventPayload),
}

impl LifecycleEvent {
    /// Build an event for a single declared index.
    #[must_use]
    pub fn single(
        kind: EventKind,
        scope_id: ScopeId,
        logical_id: Option<String>,
        spec: DesiredIndexSpec,
    ) -> Self {
        Self::new(
            kind,
            EventPayload {
                scope_id,
                logical_id,
                indexes: vec![spec],
            },
        )
    }

    /// Build an event from a kind and payload.
    #[must_use]
    pub const fn new(kind: EventKind, payload: EventPayload) -> Self {
        match kind {
            EventKind::Create => Self::Create(payload),
            EventKind::Update => Self::Update(payload),
            EventKind::Delete => Self::Delete(payload),
        }
    }

    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Create(_) => EventKind::Create,
            Self::Update(_) => EventKind::Update,
            Self::Delete(_) => EventKind::Delete,
        }
    }

    /// Shared payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        match self {
            Self::Create(payload) | Self::Update(payload) | Self::Delete(payload) => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn event_parses_single_index_form() -> Result<(), Box<dyn Error>> {
        let event: LifecycleEvent = serde_json::from_value(serde_json::json!({
            "kind": "CREATE",
            "scopeId": "stack1",
            "logicalId": "PineconeIndex",
            "index": { "dimension": 384, "metric": "cosine" }
        }))?;

        assert_eq!(event.kind(), EventKind::Create);
        assert_eq!(event.payload().indexes.len(), 1);
        assert_eq!(event.payload().event_identity(), "PineconeIndex");
        Ok(())
    }

    #[test]
    fn event_parses_batch_form() -> Result<(), Box<dyn Error>> {
        let event: LifecycleEvent = serde_json::from_value(serde_json::json!({
            "kind": "update",
            "scopeId": "stack1",
            "indexes": [{ "name": "a" }, { "name": "b" }]
        }))?;

        assert_eq!(event.kind(), EventKind::Update);
        assert_eq!(event.payload().indexes.len(), 2);
        assert_eq!(event.payload().event_identity(), "index");
        Ok(())
    }

    #[test]
    fn event_rejects_both_index_forms() {
        let parsed: Result<LifecycleEvent, _> = serde_json::from_value(serde_json::json!({
            "kind": "delete",
            "scopeId": "stack1",
            "index": {},
            "indexes": []
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn event_rejects_blank_scope() {
        let parsed: Result<LifecycleEvent, _> = serde_json::from_value(serde_json::json!({
            "kind": "delete",
            "scopeId": " "
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn event_serializes_with_kind_tag() -> Result<(), Box<dyn Error>> {
        let event = LifecycleEvent::single(
            EventKind::Delete,
            ScopeId::parse("stack1")?,
            None,
            DesiredIndexSpec::default(),
        );
        let value = serde_json::to_value(&event)?;
        assert_eq!(value.get("kind"), Some(&serde_json::json!("delete")));
        assert_eq!(value.get("scopeId"), Some(&serde_json::json!("stack1")));
        Ok(())
    }
}
