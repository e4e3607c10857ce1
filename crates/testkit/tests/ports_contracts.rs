//! Contract-style tests for port traits using in-memory adapters.

use index_provisioner_domain::{DesiredIndexSpec, IndexName, PodSizeClass, SnapshotName};
use index_provisioner_ports::{
    CreateIndexRequest, IndexControlConnector, IndexControlPort, LoggerPort, SecretStorePort,
    UpdateIndexRequest, log_fields,
};
use index_provisioner_shared::{ErrorCode, RequestContext, Result, SecretString};
use index_provisioner_testkit::errors::transient_error;
use index_provisioner_testkit::in_memory::{
    ControlCall, ControlOperation, InMemoryConnector, InMemoryIndexControl, RecordingLogger,
    StaticSecretStore,
};
use std::sync::Arc;

fn name(raw: &str) -> Result<IndexName> {
    Ok(IndexName::parse(raw)?)
}

#[tokio::test]
async fn control_port_contract_smoke() -> Result<()> {
    let ctx = RequestContext::new_pass();
    let control = InMemoryIndexControl::new();
    let docs = name("scope-abc-docs")?;

    control
        .create_index(
            &ctx,
            CreateIndexRequest::from_spec(docs.clone(), 8, &DesiredIndexSpec::default()),
        )
        .await?;
    assert_eq!(control.list_indexes(&ctx).await?, vec![docs.clone()]);

    let description = control.describe_index(&ctx, docs.clone()).await?;
    assert_eq!(description.pod_type.as_ref(), "s1.x1");
    assert_eq!(description.vector_count, Some(0));

    let spec = DesiredIndexSpec::default();
    control
        .update_index(
            &ctx,
            UpdateIndexRequest {
                name: docs.clone(),
                replicas: spec.replicas.get(),
                pod_type: spec.with_pod_size(PodSizeClass::X2).pod_type(),
            },
        )
        .await?;
    assert_eq!(
        control.index(&docs).map(|index| index.pod_type),
        Some("s1.x2".into())
    );

    control
        .create_snapshot(&ctx, SnapshotName::for_index(&docs), docs.clone())
        .await?;
    control.delete_index(&ctx, docs.clone()).await?;
    assert!(control.index_names().is_empty());
    assert_eq!(control.snapshots().len(), 1);
    assert_eq!(control.mutations().len(), 4);
    Ok(())
}

#[tokio::test]
async fn describe_of_missing_index_is_not_found() -> Result<()> {
    let control = InMemoryIndexControl::new();
    let result = control
        .describe_index(&RequestContext::new_pass(), name("missing")?)
        .await;
    assert_eq!(
        result.err().map(|error| error.code),
        Some(ErrorCode::new("controller", "index_not_found"))
    );
    Ok(())
}

#[tokio::test]
async fn injected_failures_are_consumed_in_order() -> Result<()> {
    let ctx = RequestContext::new_pass();
    let control = InMemoryIndexControl::new();
    control.fail_next(ControlOperation::List, 2, transient_error());

    assert!(control.list_indexes(&ctx).await.is_err());
    assert!(control.list_indexes(&ctx).await.is_err());
    assert!(control.list_indexes(&ctx).await.is_ok());
    assert_eq!(control.calls_of(ControlOperation::List).len(), 3);
    assert!(control.calls().iter().all(|call| *call == ControlCall::List));
    Ok(())
}

#[tokio::test]
async fn connector_and_secret_store_record_usage() -> Result<()> {
    let ctx = RequestContext::new_pass();
    let connector = InMemoryConnector::new(Arc::new(InMemoryIndexControl::new()));
    let secrets = StaticSecretStore::with_secret("pc-key", "abc");

    let credential = secrets.resolve_credential(&ctx, "pc-key".into()).await?;
    let port = connector.connect(&ctx, credential, "us-east1-gcp")?;
    assert_eq!(port.provider().id.as_ref(), "in_memory");

    assert!(secrets.resolve_credential(&ctx, "other".into()).await.is_err());
    assert_eq!(secrets.lookups().len(), 2);

    let connects = connector.connects();
    assert_eq!(connects.len(), 1);
    assert_eq!(connects.first().map(|call| call.environment.as_ref()), Some("us-east1-gcp"));

    let failing = connector.clone().failing(transient_error());
    assert!(failing.connect(&ctx, SecretString::new("abc"), "env").is_err());
    Ok(())
}

#[test]
fn recording_logger_children_share_the_buffer() {
    let logger = RecordingLogger::default();
    let child = logger.child(log_fields([("scopeId", "stack1".into())]));
    child.info("reconcile.pass.started", "started", None);
    logger.warn("reconcile.delete.skipped", "skipped", None);

    assert_eq!(
        logger.event_names(),
        vec!["reconcile.pass.started".to_owned(), "reconcile.delete.skipped".to_owned()]
    );
    let first = logger.events().into_iter().next();
    assert!(
        first
            .and_then(|event| event.fields)
            .is_some_and(|fields| fields.contains_key("scopeId"))
    );
}
