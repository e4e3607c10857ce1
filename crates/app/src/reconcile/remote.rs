//! Control API calls wrapped in the fixed-delay retry executor.

use super::error::ReconcileError;
use index_provisioner_ports::{
    CreateIndexRequest, IndexControlPort, IndexDescription, IndexName, LogLevel, LoggerPort,
    SnapshotName, UpdateIndexRequest, log_fields,
};
use index_provisioner_shared::{
    AttemptFailure, RequestContext, Result, RetryPolicy, retry_fixed_with_observer,
};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Control API handle bound to one pass.
pub(crate) struct Remote<'a> {
    ctx: &'a RequestContext,
    control: Arc<dyn IndexControlPort>,
    policy: RetryPolicy,
    logger: Option<&'a dyn LoggerPort>,
}

impl<'a> Remote<'a> {
    pub(crate) fn new(
        ctx: &'a RequestContext,
        control: Arc<dyn IndexControlPort>,
        policy: RetryPolicy,
        logger: Option<&'a dyn LoggerPort>,
    ) -> Self {
        Self {
            ctx,
            control,
            policy,
            logger,
        }
    }

    pub(crate) async fn list_indexes(&self) -> Result<Vec<IndexName>, ReconcileError> {
        self.run("list_indexes", None, || self.control.list_indexes(self.ctx))
            .await
    }

    pub(crate) async fn describe_index(
        &self,
        name: &IndexName,
    ) -> Result<IndexDescription, ReconcileError> {
        self.run("describe_index", Some(name), || {
            self.control.describe_index(self.ctx, name.clone())
        })
        .await
    }

    pub(crate) async fn create_index(
        &self,
        request: &CreateIndexRequest,
    ) -> Result<(), ReconcileError> {
        self.run("create_index", Some(&request.name), || {
            self.control.create_index(self.ctx, request.clone())
        })
        .await
    }

    pub(crate) async fn update_index(
        &self,
        request: &UpdateIndexRequest,
    ) -> Result<(), ReconcileError> {
        self.run("update_index", Some(&request.name), || {
            self.control.update_index(self.ctx, request.clone())
        })
        .await
    }

    pub(crate) async fn delete_index(&self, name: &IndexName) -> Result<(), ReconcileError> {
        self.run("delete_index", Some(name), || {
            self.control.delete_index(self.ctx, name.clone())
        })
        .await
    }

    pub(crate) async fn create_snapshot(
        &self,
        snapshot: &SnapshotName,
        source: &IndexName,
    ) -> Result<(), ReconcileError> {
        self.run("create_snapshot", Some(source), || {
            self.control
                .create_snapshot(self.ctx, snapshot.clone(), source.clone())
        })
        .await
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &str,
        index: Option<&IndexName>,
        op: F,
    ) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_fixed_with_observer(self.policy, operation, op, |failure| {
            self.log_attempt(&failure, index);
        })
        .await
        .map_err(ReconcileError::from)
    }

    fn log_attempt(&self, failure: &AttemptFailure<'_>, index: Option<&IndexName>) {
        let Some(logger) = self.logger else {
            return;
        };
        let retry_in_ms = failure
            .retry_in
            .map_or(Value::Null, |delay| json!(duration_ms(delay)));
        let mut fields = log_fields([
            ("operation", json!(failure.operation)),
            ("attempt", json!(failure.attempt)),
            ("attempts", json!(failure.attempts)),
            ("retryInMs", retry_in_ms),
            ("provider", json!(self.control.provider().id.as_ref())),
        ]);
        if let Some(index) = index {
            fields.insert("index".into(), json!(index.as_str()));
        }
        let message = format!(
            "{} failed (attempt {} of {})",
            failure.operation, failure.attempt, failure.attempts
        );
        logger.log_error(
            LogLevel::Warn,
            "retry.attempt.failed",
            &message,
            Some(fields),
            failure.error,
        );
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
