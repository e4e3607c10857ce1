//! Create, update, and delete paths of a pass.

use super::error::ReconcileError;
use super::plan::{PassPlan, ResolvedIndex};
use super::remote::Remote;
use super::types::{IndexAction, IndexOutcome, ReconcileSettings};
use index_provisioner_domain::{
    DeletionDecision, ManagedIndexRecord, PodType, RemovalPolicy, may_delete, validate_update,
};
use index_provisioner_ports::{
    CreateIndexRequest, IndexName, LogFields, LogLevel, LoggerPort, SnapshotName,
    UpdateIndexRequest,
};
use index_provisioner_shared::{ErrorCode, ErrorEnvelope};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Collaborators shared by every path of one pass.
pub(crate) struct Pass<'a> {
    pub(crate) remote: Remote<'a>,
    pub(crate) settings: &'a ReconcileSettings,
    pub(crate) logger: Option<&'a dyn LoggerPort>,
}

impl Pass<'_> {
    fn info(&self, event: &str, message: &str, fields: Value) {
        if let Some(logger) = self.logger {
            logger.info(event, message, object_fields(fields));
        }
    }

    fn warn_with(&self, event: &str, message: &str, fields: Value, error: &ErrorEnvelope) {
        if let Some(logger) = self.logger {
            logger.log_error(LogLevel::Warn, event, message, object_fields(fields), error);
        }
    }
}

/// Names under the scope prefix that currently exist remotely.
pub(crate) async fn discover(
    pass: &Pass<'_>,
    plan: &PassPlan<'_>,
) -> Result<BTreeSet<IndexName>, ReconcileError> {
    let listed = pass.remote.list_indexes().await?;
    let total = listed.len();
    let managed: BTreeSet<IndexName> = listed
        .into_iter()
        .filter(|name| plan.prefix.owns(name))
        .collect();
    pass.info(
        "reconcile.discover.completed",
        "Remote indexes discovered",
        json!({ "listed": total, "managed": managed.len(), "prefix": plan.prefix.as_str() }),
    );
    Ok(managed)
}

/// Discovery for deletes; a failed listing leaves only the declared names.
pub(crate) async fn discover_for_delete(
    pass: &Pass<'_>,
    plan: &PassPlan<'_>,
) -> Option<BTreeSet<IndexName>> {
    match discover(pass, plan).await {
        Ok(managed) => Some(managed),
        Err(error) => {
            pass.warn_with(
                "reconcile.discover.failed",
                "Remote indexes could not be listed; only declared indexes are inspected",
                json!({ "prefix": plan.prefix.as_str() }),
                &ErrorEnvelope::from(error),
            );
            None
        },
    }
}

/// Create every declared index.
pub(crate) async fn create_all(
    pass: &Pass<'_>,
    plan: &PassPlan<'_>,
) -> Result<Vec<IndexOutcome>, ReconcileError> {
    let requests = plan
        .indexes
        .iter()
        .map(create_request)
        .collect::<Result<Vec<_>, _>>()?;

    let mut outcomes = Vec::with_capacity(requests.len());
    for (index, request) in plan.indexes.iter().zip(&requests) {
        create_one(pass, index, request).await?;
        outcomes.push(IndexOutcome::new(
            index.name.clone(),
            Some(index.logical_name),
            IndexAction::Created,
        ));
    }
    Ok(outcomes)
}

/// Converge the managed set to the declared set.
///
/// Every update is validated before the first mutating call, so a rejected
/// pod type change leaves the remote side untouched.
pub(crate) async fn update_all(
    pass: &Pass<'_>,
    plan: &PassPlan<'_>,
    managed: &BTreeSet<IndexName>,
) -> Result<Vec<IndexOutcome>, ReconcileError> {
    let mut creates = Vec::new();
    let mut updates = Vec::new();
    for index in &plan.indexes {
        if managed.contains(&index.name) {
            let current = pass.remote.describe_index(&index.name).await?;
            let desired = index.spec.pod_type();
            validate_update(&current.pod_type, &desired.to_string())?;
            let request = UpdateIndexRequest {
                name: index.name.clone(),
                replicas: index.spec.replicas.get(),
                pod_type: desired,
            };
            updates.push((index, request));
        } else {
            creates.push((index, create_request(index)?));
        }
    }
    let removed: Vec<&IndexName> = managed
        .iter()
        .filter(|name| plan.declared(name).is_none())
        .collect();

    let mut outcomes = Vec::with_capacity(creates.len() + updates.len() + removed.len());
    for (index, request) in &creates {
        create_one(pass, index, request).await?;
        outcomes.push(IndexOutcome::new(
            index.name.clone(),
            Some(index.logical_name),
            IndexAction::Created,
        ));
    }
    for (index, request) in &updates {
        pass.remote.update_index(request).await?;
        pass.info(
            "reconcile.update.completed",
            "Index updated",
            json!({
                "index": request.name.as_str(),
                "replicas": request.replicas,
                "podType": request.pod_type.to_string(),
            }),
        );
        outcomes.push(IndexOutcome::new(
            index.name.clone(),
            Some(index.logical_name),
            IndexAction::Updated,
        ));
    }
    for name in removed {
        let policy = pass.settings.default_removal_policy;
        outcomes.push(delete_one(pass, name, None, policy, true).await?);
    }
    Ok(outcomes)
}

/// Remove the managed indexes and every declared one.
///
/// `managed` is `None` when listing failed; every declared index is then
/// described on its own and undeclared ones are left alone.
pub(crate) async fn delete_all(
    pass: &Pass<'_>,
    plan: &PassPlan<'_>,
    managed: Option<&BTreeSet<IndexName>>,
) -> Result<Vec<IndexOutcome>, ReconcileError> {
    let default_policy = pass.settings.default_removal_policy;
    let extra = managed.map_or(0, BTreeSet::len);
    let mut outcomes = Vec::with_capacity(plan.indexes.len() + extra);
    for index in &plan.indexes {
        let policy = index.spec.removal_policy_or(default_policy);
        let present = managed.is_none_or(|managed| managed.contains(&index.name));
        let outcome =
            delete_one(pass, &index.name, Some(index.logical_name), policy, present).await?;
        outcomes.push(outcome);
    }
    let undeclared = managed
        .into_iter()
        .flatten()
        .filter(|name| plan.declared(name).is_none());
    for name in undeclared {
        outcomes.push(delete_one(pass, name, None, default_policy, true).await?);
    }
    Ok(outcomes)
}

fn create_request(index: &ResolvedIndex<'_>) -> Result<CreateIndexRequest, ReconcileError> {
    let dimension = index.spec.dimension_for_create(index.name.as_str())?;
    Ok(CreateIndexRequest::from_spec(index.name.clone(), dimension, index.spec))
}

async fn create_one(
    pass: &Pass<'_>,
    index: &ResolvedIndex<'_>,
    request: &CreateIndexRequest,
) -> Result<(), ReconcileError> {
    pass.remote.create_index(request).await?;
    pass.info(
        "reconcile.create.completed",
        "Index created",
        json!({
            "index": index.name.as_str(),
            "logicalName": index.logical_name,
            "dimension": request.dimension,
            "podType": request.pod_type.to_string(),
        }),
    );
    Ok(())
}

async fn delete_one(
    pass: &Pass<'_>,
    name: &IndexName,
    logical_name: Option<&str>,
    policy: RemovalPolicy,
    present: bool,
) -> Result<IndexOutcome, ReconcileError> {
    let record = if present {
        describe_record(pass, name).await
    } else {
        pass.info(
            "reconcile.delete.absent",
            "Declared index does not exist remotely",
            json!({ "index": name.as_str() }),
        );
        None
    };

    match may_delete(record.as_ref(), policy) {
        DeletionDecision::Skip { reason } => {
            pass.info(
                "reconcile.delete.skipped",
                "Index retained",
                json!({
                    "index": name.as_str(),
                    "removalPolicy": policy.as_str(),
                    "reason": reason.to_string(),
                }),
            );
            Ok(IndexOutcome::new(name.clone(), logical_name, IndexAction::Retained)
                .with_detail(reason.to_string()))
        },
        DeletionDecision::ProceedAfterSnapshot => {
            let snapshot = SnapshotName::for_index(name);
            pass.remote.create_snapshot(&snapshot, name).await?;
            pass.info(
                "reconcile.delete.snapshotted",
                "Snapshot created",
                json!({ "index": name.as_str(), "snapshot": snapshot.as_str() }),
            );
            delete_remote(pass, name, policy).await?;
            Ok(IndexOutcome::new(name.clone(), logical_name, IndexAction::Snapshotted)
                .with_detail(snapshot.as_str()))
        },
        DeletionDecision::Proceed => {
            delete_remote(pass, name, policy).await?;
            Ok(IndexOutcome::new(name.clone(), logical_name, IndexAction::Deleted))
        },
    }
}

async fn delete_remote(
    pass: &Pass<'_>,
    name: &IndexName,
    policy: RemovalPolicy,
) -> Result<(), ReconcileError> {
    pass.remote.delete_index(name).await?;
    pass.info(
        "reconcile.delete.completed",
        "Index deleted",
        json!({ "index": name.as_str(), "removalPolicy": policy.as_str() }),
    );
    Ok(())
}

/// Describe for the deletion guard; any failure yields no record.
async fn describe_record(pass: &Pass<'_>, name: &IndexName) -> Option<ManagedIndexRecord> {
    let description = match pass.remote.describe_index(name).await {
        Ok(description) => description,
        Err(error) => {
            pass.warn_with(
                "reconcile.delete.describe_failed",
                "Index could not be described; it will not be deleted",
                json!({ "index": name.as_str() }),
                &ErrorEnvelope::from(error),
            );
            return None;
        },
    };
    if description.vector_count.is_none() {
        pass.warn_with(
            "reconcile.delete.describe_failed",
            "Index reported no vector count; it will not be deleted",
            json!({ "index": name.as_str() }),
            &ErrorEnvelope::expected(
                ErrorCode::new("controller", "vector_count_unavailable"),
                "vector count is unknown",
            ),
        );
        return None;
    }
    match PodType::parse(&description.pod_type) {
        Ok(pod_type) => Some(ManagedIndexRecord::new(
            name.clone(),
            pod_type,
            description.vector_count,
        )),
        Err(error) => {
            pass.warn_with(
                "reconcile.delete.describe_failed",
                "Index reported an unreadable pod type; it will not be deleted",
                json!({ "index": name.as_str(), "podType": description.pod_type.as_ref() }),
                &ErrorEnvelope::expected(
                    ErrorCode::new("controller", "invalid_response"),
                    error.to_string(),
                ),
            );
            None
        },
    }
}

fn object_fields(fields: Value) -> Option<LogFields> {
    match fields {
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, value)| (key.into_boxed_str(), value))
                .collect(),
        ),
        _ => None,
    }
}
