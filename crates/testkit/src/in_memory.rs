//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the reconciler
//! - Deterministic contract tests for the ports layer
//! - Dry runs without a remote control API

use crate::errors::index_not_found_error;
use index_provisioner_ports::{
    BoxFuture, CreateIndexRequest, IndexControlConnector, IndexControlPort,
    IndexControlProviderInfo, IndexDescription, IndexName, LogEvent, LogFields, LogLevel,
    LoggerPort, SecretStorePort, SnapshotName, UpdateIndexRequest,
};
use index_provisioner_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event in memory; children share the buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Recorded event names, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.event.into_string())
            .collect()
    }

    /// Number of events named `event`.
    pub fn count(&self, event: &str) -> usize {
        self.events()
            .iter()
            .filter(|recorded| recorded.event.as_ref() == event)
            .count()
    }

    /// Recorded events at `level`.
    pub fn at_level(&self, level: LogLevel) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.unwrap_or_default());
            event.fields = Some(fields);
        }
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields: merged,
        })
    }
}

/// Control API operation, used for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlOperation {
    /// `create_index`.
    Create,
    /// `update_index`.
    Update,
    /// `delete_index`.
    Delete,
    /// `describe_index`.
    Describe,
    /// `list_indexes`.
    List,
    /// `create_snapshot`.
    Snapshot,
}

/// One recorded control API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCall {
    /// Create request.
    Create(CreateIndexRequest),
    /// Update request.
    Update(UpdateIndexRequest),
    /// Delete request.
    Delete(IndexName),
    /// Describe request.
    Describe(IndexName),
    /// List request.
    List,
    /// Snapshot request.
    Snapshot {
        /// Snapshot name.
        name: SnapshotName,
        /// Source index.
        source: IndexName,
    },
}

impl ControlCall {
    /// Operation of this call.
    pub const fn operation(&self) -> ControlOperation {
        match self {
            Self::Create(_) => ControlOperation::Create,
            Self::Update(_) => ControlOperation::Update,
            Self::Delete(_) => ControlOperation::Delete,
            Self::Describe(_) => ControlOperation::Describe,
            Self::List => ControlOperation::List,
            Self::Snapshot { .. } => ControlOperation::Snapshot,
        }
    }

    /// Returns true for calls that change remote state.
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Create(_) | Self::Update(_) | Self::Delete(_) | Self::Snapshot { .. }
        )
    }
}

/// Index stored by [`InMemoryIndexControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIndex {
    /// Pod type string as the remote API would report it.
    pub pod_type: Box<str>,
    /// Reported vector count.
    pub vector_count: Option<u64>,
}

#[derive(Debug, Clone)]
struct FailurePlan {
    remaining: Option<u32>,
    error: ErrorEnvelope,
}

#[derive(Debug, Default)]
struct ControlState {
    indexes: BTreeMap<IndexName, StoredIndex>,
    snapshots: Vec<(SnapshotName, IndexName)>,
    calls: Vec<ControlCall>,
    failures: HashMap<ControlOperation, FailurePlan>,
    undescribable: Vec<IndexName>,
}

/// In-memory control API that records calls and supports failure injection.
#[derive(Debug)]
pub struct InMemoryIndexControl {
    provider: IndexControlProviderInfo,
    state: Mutex<ControlState>,
}

impl Default for InMemoryIndexControl {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIndexControl {
    /// Empty control API.
    pub fn new() -> Self {
        Self {
            provider: IndexControlProviderInfo {
                id: "in_memory".into(),
                name: "In-memory control API".into(),
            },
            state: Mutex::new(ControlState::default()),
        }
    }

    /// Seed an existing index.
    #[must_use]
    pub fn with_index(self, name: &IndexName, pod_type: &str, vector_count: Option<u64>) -> Self {
        self.insert_index(name, pod_type, vector_count);
        self
    }

    /// Insert or replace an existing index.
    pub fn insert_index(&self, name: &IndexName, pod_type: &str, vector_count: Option<u64>) {
        self.lock().indexes.insert(
            name.clone(),
            StoredIndex {
                pod_type: pod_type.into(),
                vector_count,
            },
        );
    }

    /// Fail the next `times` calls of `operation` with `error`.
    pub fn fail_next(&self, operation: ControlOperation, times: u32, error: ErrorEnvelope) {
        self.lock().failures.insert(
            operation,
            FailurePlan {
                remaining: Some(times),
                error,
            },
        );
    }

    /// Fail every call of `operation` with `error`.
    pub fn fail_always(&self, operation: ControlOperation, error: ErrorEnvelope) {
        self.lock().failures.insert(
            operation,
            FailurePlan {
                remaining: None,
                error,
            },
        );
    }

    /// Make `describe_index` fail for one index while it still exists.
    pub fn make_undescribable(&self, name: &IndexName) {
        self.lock().undescribable.push(name.clone());
    }

    /// Recorded calls, in order.
    pub fn calls(&self) -> Vec<ControlCall> {
        self.lock().calls.clone()
    }

    /// Recorded calls for one operation.
    pub fn calls_of(&self, operation: ControlOperation) -> Vec<ControlCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation() == operation)
            .collect()
    }

    /// Recorded calls that change remote state.
    pub fn mutations(&self) -> Vec<ControlCall> {
        self.calls()
            .into_iter()
            .filter(ControlCall::is_mutation)
            .collect()
    }

    /// Names of existing indexes.
    pub fn index_names(&self) -> Vec<IndexName> {
        self.lock().indexes.keys().cloned().collect()
    }

    /// Stored state for one index.
    pub fn index(&self, name: &IndexName) -> Option<StoredIndex> {
        self.lock().indexes.get(name).cloned()
    }

    /// Snapshots taken, as `(snapshot, source)`.
    pub fn snapshots(&self) -> Vec<(SnapshotName, IndexName)> {
        self.lock().snapshots.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records `call` and applies any injected failure; the guard is kept for the caller.
    fn begin(&self, call: ControlCall) -> Result<MutexGuard<'_, ControlState>> {
        let operation = call.operation();
        let mut state = self.lock();
        state.calls.push(call);

        let Some(plan) = state.failures.get(&operation).cloned() else {
            return Ok(state);
        };
        match plan.remaining {
            None => Err(plan.error),
            Some(remaining) if remaining <= 1 => {
                state.failures.remove(&operation);
                if remaining == 0 {
                    Ok(state)
                } else {
                    Err(plan.error)
                }
            },
            Some(remaining) => {
                if let Some(stored) = state.failures.get_mut(&operation) {
                    stored.remaining = Some(remaining - 1);
                }
                Err(plan.error)
            },
        }
    }
}

impl IndexControlPort for InMemoryIndexControl {
    fn provider(&self) -> &IndexControlProviderInfo {
        &self.provider
    }

    fn create_index(
        &self,
        _ctx: &RequestContext,
        request: CreateIndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let result = self
            .begin(ControlCall::Create(request.clone()))
            .and_then(|mut state| {
                if state.indexes.contains_key(&request.name) {
                    return Err(ErrorEnvelope::expected(
                        ErrorCode::new("controller", "index_conflict"),
                        format!("index `{}` already exists", request.name),
                    ));
                }
                state.indexes.insert(
                    request.name.clone(),
                    StoredIndex {
                        pod_type: request.pod_type.to_string().into_boxed_str(),
                        vector_count: Some(0),
                    },
                );
                Ok(())
            });
        Box::pin(async move { result })
    }

    fn update_index(
        &self,
        _ctx: &RequestContext,
        request: UpdateIndexRequest,
    ) -> BoxFuture<'_, Result<()>> {
        let result = self
            .begin(ControlCall::Update(request.clone()))
            .and_then(|mut state| match state.indexes.get_mut(&request.name) {
                Some(index) => {
                    index.pod_type = request.pod_type.to_string().into_boxed_str();
                    Ok(())
                },
                None => Err(index_not_found_error(request.name.as_str())),
            });
        Box::pin(async move { result })
    }

    fn delete_index(&self, _ctx: &RequestContext, name: IndexName) -> BoxFuture<'_, Result<()>> {
        let result = self
            .begin(ControlCall::Delete(name.clone()))
            .and_then(|mut state| match state.indexes.remove(&name) {
                Some(_) => Ok(()),
                None => Err(index_not_found_error(name.as_str())),
            });
        Box::pin(async move { result })
    }

    fn describe_index(
        &self,
        _ctx: &RequestContext,
        name: IndexName,
    ) -> BoxFuture<'_, Result<IndexDescription>> {
        let result = self
            .begin(ControlCall::Describe(name.clone()))
            .and_then(|state| {
                if state.undescribable.contains(&name) {
                    return Err(ErrorEnvelope::expected(
                        ErrorCode::new("controller", "invalid_response"),
                        format!("index `{name}` could not be described"),
                    ));
                }
                state
                    .indexes
                    .get(&name)
                    .map(|index| IndexDescription {
                        name: name.clone(),
                        pod_type: index.pod_type.clone(),
                        vector_count: index.vector_count,
                    })
                    .ok_or_else(|| index_not_found_error(name.as_str()))
            });
        Box::pin(async move { result })
    }

    fn list_indexes(&self, _ctx: &RequestContext) -> BoxFuture<'_, Result<Vec<IndexName>>> {
        let result = self
            .begin(ControlCall::List)
            .map(|state| state.indexes.keys().cloned().collect::<Vec<_>>());
        Box::pin(async move { result })
    }

    fn create_snapshot(
        &self,
        _ctx: &RequestContext,
        name: SnapshotName,
        source: IndexName,
    ) -> BoxFuture<'_, Result<()>> {
        let call = ControlCall::Snapshot {
            name: name.clone(),
            source: source.clone(),
        };
        let result = self.begin(call).and_then(|mut state| {
            if !state.indexes.contains_key(&source) {
                return Err(index_not_found_error(source.as_str()));
            }
            state.snapshots.push((name, source));
            Ok(())
        });
        Box::pin(async move { result })
    }
}

/// One recorded `connect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    /// Credential value the connector received.
    pub credential: Box<str>,
    /// Environment the connector received.
    pub environment: Box<str>,
}

/// Connector that always hands out the same in-memory control API.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    control: Arc<InMemoryIndexControl>,
    connects: Arc<Mutex<Vec<ConnectCall>>>,
    failure: Option<ErrorEnvelope>,
}

impl InMemoryConnector {
    /// Connector around `control`.
    pub fn new(control: Arc<InMemoryIndexControl>) -> Self {
        Self {
            control,
            connects: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// Fail every `connect` with `error`.
    #[must_use]
    pub fn failing(mut self, error: ErrorEnvelope) -> Self {
        self.failure = Some(error);
        self
    }

    /// Shared control API.
    pub fn control(&self) -> Arc<InMemoryIndexControl> {
        Arc::clone(&self.control)
    }

    /// Recorded connect calls.
    pub fn connects(&self) -> Vec<ConnectCall> {
        self.connects
            .lock()
            .map(|connects| connects.clone())
            .unwrap_or_default()
    }
}

impl IndexControlConnector for InMemoryConnector {
    fn connect(
        &self,
        _ctx: &RequestContext,
        credential: SecretString,
        environment: &str,
    ) -> Result<Arc<dyn IndexControlPort>> {
        if let Ok(mut connects) = self.connects.lock() {
            connects.push(ConnectCall {
                credential: credential.into_inner(),
                environment: environment.into(),
            });
        }
        if let Some(error) = self.failure.clone() {
            return Err(error);
        }
        Ok(self.control.clone())
    }
}

/// Secret store backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: BTreeMap<Box<str>, SecretString>,
    lookups: Arc<Mutex<Vec<Box<str>>>>,
}

impl StaticSecretStore {
    /// Store holding one secret.
    pub fn with_secret(reference: &str, value: &str) -> Self {
        Self::default().and_secret(reference, value)
    }

    /// Add a secret.
    #[must_use]
    pub fn and_secret(mut self, reference: &str, value: &str) -> Self {
        self.secrets.insert(reference.into(), SecretString::new(value));
        self
    }

    /// References that were looked up, in order.
    pub fn lookups(&self) -> Vec<Box<str>> {
        self.lookups
            .lock()
            .map(|lookups| lookups.clone())
            .unwrap_or_default()
    }
}

impl SecretStorePort for StaticSecretStore {
    fn id(&self) -> &str {
        "static"
    }

    fn resolve_credential(
        &self,
        _ctx: &RequestContext,
        secret_reference: Box<str>,
    ) -> BoxFuture<'_, Result<SecretString>> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(secret_reference.clone());
        }
        let result = self.secrets.get(&secret_reference).cloned().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("secrets", "not_found"),
                format!("secret `{secret_reference}` is not set"),
            )
        });
        Box::pin(async move { result })
    }
}

/// Create a log event for tests.
pub fn log_event(level: LogLevel, event: &str, message: &str) -> LogEvent {
    LogEvent::new(level, event, message, None)
}
