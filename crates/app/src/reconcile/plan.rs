//! Resolving phase: names, duplicates, and the credential source.
//!
//! Everything here is pure. A declaration that fails these checks is
//! rejected before the secret store or the control API is touched.

use super::types::ReconcileSettings;
use index_provisioner_domain::{
    DesiredIndexSpec, EventKind, IndexName, LifecycleEvent, ManagedPrefix, SpecError,
    managed_prefix, resolve_with_prefix,
};
use std::collections::BTreeSet;

/// A declared index paired with its resolved remote name.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedIndex<'a> {
    pub(crate) name: IndexName,
    pub(crate) logical_name: &'a str,
    pub(crate) spec: &'a DesiredIndexSpec,
}

/// Output of the resolving phase.
#[derive(Debug, Clone)]
pub(crate) struct PassPlan<'a> {
    pub(crate) prefix: ManagedPrefix,
    pub(crate) indexes: Vec<ResolvedIndex<'a>>,
    pub(crate) secret_name: Box<str>,
    pub(crate) environment: Box<str>,
}

impl PassPlan<'_> {
    pub(crate) fn declared(&self, name: &IndexName) -> Option<&ResolvedIndex<'_>> {
        self.indexes.iter().find(|index| &index.name == name)
    }
}

pub(crate) fn plan_pass<'a>(
    event: &'a LifecycleEvent,
    settings: &ReconcileSettings,
) -> Result<PassPlan<'a>, SpecError> {
    let kind = event.kind();
    let payload = event.payload();
    if payload.indexes.is_empty() && kind != EventKind::Delete {
        return Err(SpecError::EmptyDeclaration {
            event: kind.as_str(),
        });
    }

    let prefix = managed_prefix(&payload.scope_id);
    let identity = payload.event_identity();
    let mut seen = BTreeSet::new();
    let mut indexes = Vec::with_capacity(payload.indexes.len());
    for spec in &payload.indexes {
        let logical_name = spec.logical_name(identity);
        let name = resolve_with_prefix(&prefix, logical_name, settings.max_index_name_length);
        if !seen.insert(name.clone()) {
            return Err(SpecError::DuplicateResolvedName {
                index: name.into_inner().into_string(),
            });
        }
        if kind == EventKind::Create {
            spec.dimension_for_create(name.as_str())?;
        }
        indexes.push(ResolvedIndex {
            name,
            logical_name,
            spec,
        });
    }

    let secret_name = agreed_source(
        "apiKeySecretName",
        payload
            .indexes
            .iter()
            .map(|spec| spec.api_key_secret_name.as_deref()),
        settings.api_key_secret_name.as_deref(),
    )?;
    let environment = agreed_source(
        "environment",
        payload.indexes.iter().map(|spec| spec.environment.as_deref()),
        settings.environment.as_deref(),
    )?;

    Ok(PassPlan {
        prefix,
        indexes,
        secret_name,
        environment,
    })
}

/// Every declared value must agree; the configured value fills in when none is declared.
fn agreed_source<'a>(
    field: &'static str,
    declared: impl Iterator<Item = Option<&'a str>>,
    fallback: Option<&str>,
) -> Result<Box<str>, SpecError> {
    let distinct: BTreeSet<&str> = declared
        .flatten()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    let mut values = distinct.into_iter();
    match (values.next(), values.next()) {
        (Some(_), Some(_)) => Err(SpecError::ConflictingCredentialSource { field }),
        (Some(value), None) => Ok(value.into()),
        (None, _) => fallback
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Box::from)
            .ok_or(SpecError::MissingCredentialSource { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_domain::{EventPayload, ScopeId};
    use std::error::Error;

    fn settings() -> ReconcileSettings {
        ReconcileSettings {
            api_key_secret_name: Some("pinecone-api-key".into()),
            environment: Some("us-east1-gcp".into()),
            ..ReconcileSettings::default()
        }
    }

    fn spec(name: &str) -> DesiredIndexSpec {
        DesiredIndexSpec {
            name: Some(name.to_owned()),
            dimension: Some(8),
            ..DesiredIndexSpec::default()
        }
    }

    fn event(kind: EventKind, specs: Vec<DesiredIndexSpec>) -> Result<LifecycleEvent, Box<dyn Error>> {
        Ok(LifecycleEvent::new(
            kind,
            EventPayload {
                scope_id: ScopeId::parse("stack1")?,
                logical_id: Some("SearchIndex".to_owned()),
                indexes: specs,
            },
        ))
    }

    #[test]
    fn resolves_names_under_the_scope_prefix() -> Result<(), Box<dyn Error>> {
        let event = event(EventKind::Create, vec![spec("docs"), spec("code")])?;
        let plan = plan_pass(&event, &settings())?;

        assert_eq!(plan.indexes.len(), 2);
        assert!(plan.indexes.iter().all(|index| plan.prefix.owns(&index.name)));
        assert!(plan.indexes.iter().any(|index| index.name.as_str().ends_with("-docs")));
        assert_eq!(plan.secret_name.as_ref(), "pinecone-api-key");
        assert_eq!(plan.environment.as_ref(), "us-east1-gcp");
        Ok(())
    }

    #[test]
    fn unnamed_spec_uses_the_event_identity() -> Result<(), Box<dyn Error>> {
        let event = event(
            EventKind::Update,
            vec![DesiredIndexSpec::default()],
        )?;
        let plan = plan_pass(&event, &settings())?;
        let [only] = plan.indexes.as_slice() else {
            return Err("expected one index".into());
        };
        assert_eq!(only.logical_name, "SearchIndex");
        assert!(only.name.as_str().ends_with("-searchindex"));
        Ok(())
    }

    #[test]
    fn colliding_names_are_rejected() -> Result<(), Box<dyn Error>> {
        let event = event(EventKind::Update, vec![spec("Docs"), spec("docs")])?;
        assert!(matches!(
            plan_pass(&event, &settings()),
            Err(SpecError::DuplicateResolvedName { .. })
        ));
        Ok(())
    }

    #[test]
    fn create_requires_every_dimension() -> Result<(), Box<dyn Error>> {
        let mut missing = spec("code");
        missing.dimension = None;
        let create = event(EventKind::Create, vec![spec("docs"), missing.clone()])?;
        assert!(matches!(
            plan_pass(&create, &settings()),
            Err(SpecError::MissingDimension { .. })
        ));

        let delete = event(EventKind::Delete, vec![missing])?;
        assert!(plan_pass(&delete, &settings()).is_ok());
        Ok(())
    }

    #[test]
    fn empty_declarations_are_only_allowed_for_delete() -> Result<(), Box<dyn Error>> {
        let create = event(EventKind::Create, Vec::new())?;
        assert_eq!(
            plan_pass(&create, &settings()).err(),
            Some(SpecError::EmptyDeclaration { event: "create" })
        );
        let delete = event(EventKind::Delete, Vec::new())?;
        assert!(plan_pass(&delete, &settings())?.indexes.is_empty());
        Ok(())
    }

    #[test]
    fn declared_credential_sources_must_agree() -> Result<(), Box<dyn Error>> {
        let mut first = spec("docs");
        first.api_key_secret_name = Some("key-a".to_owned());
        let mut second = spec("code");
        second.api_key_secret_name = Some("key-b".to_owned());

        let conflicting = event(EventKind::Create, vec![first.clone(), second])?;
        assert_eq!(
            plan_pass(&conflicting, &settings()).err(),
            Some(SpecError::ConflictingCredentialSource {
                field: "apiKeySecretName"
            })
        );

        let agreeing = event(EventKind::Create, vec![first, spec("code")])?;
        assert_eq!(plan_pass(&agreeing, &settings())?.secret_name.as_ref(), "key-a");
        Ok(())
    }

    #[test]
    fn missing_credential_source_is_reported_per_field() -> Result<(), Box<dyn Error>> {
        let event = event(EventKind::Create, vec![spec("docs")])?;
        let no_environment = ReconcileSettings {
            environment: Some("  ".into()),
            ..settings()
        };
        assert_eq!(
            plan_pass(&event, &no_environment).err(),
            Some(SpecError::MissingCredentialSource {
                field: "environment"
            })
        );
        Ok(())
    }
}
