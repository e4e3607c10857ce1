//! Converge remote indexes to the state declared by one lifecycle event.
//!
//! A pass walks `Idle → Resolving → Discovering → {Creating | Updating | Deleting}`
//! and ends in `Done` or `Failed`. Create events skip discovery. Every remote
//! call goes through the fixed-delay retry executor; the deletion guard and
//! the update validator decide what may change.

mod converge;
mod error;
mod plan;
mod remote;
mod types;

pub use error::{FailureKind, ReconcileError};
pub use types::{IndexAction, IndexOutcome, ReconcileDeps, ReconcileOutcome, ReconcileSettings};

use converge::{Pass, create_all, delete_all, discover, discover_for_delete, update_all};
use index_provisioner_domain::{LifecycleEvent, ReconcileState};
use index_provisioner_ports::{LogFields, LogLevel, LoggerPort, log_fields};
use index_provisioner_shared::{ErrorCode, ErrorEnvelope, RequestContext, SecretString};
use plan::{PassPlan, plan_pass};
use remote::Remote;
use serde_json::json;
use std::time::Instant;

/// Run one reconciliation pass for `event`.
///
/// The pass never retries as a whole and keeps no state afterwards. Events
/// for the same scope must be serialised by the caller: two concurrent
/// passes over one scope can observe each other's partial work.
#[tracing::instrument(
    name = "reconcile",
    skip_all,
    fields(event = %event.kind(), scope = %event.payload().scope_id)
)]
pub async fn reconcile(
    ctx: &RequestContext,
    deps: &ReconcileDeps,
    settings: &ReconcileSettings,
    event: &LifecycleEvent,
) -> ReconcileOutcome {
    let started_at = Instant::now();
    let logger = deps
        .logger
        .as_ref()
        .map(|logger| logger.child(pass_fields(ctx, event)));
    let logger = logger.as_deref();

    if let Some(logger) = logger {
        logger.info(
            "reconcile.pass.started",
            "Reconcile pass started",
            Some(log_fields([("indexes", json!(event.payload().indexes.len()))])),
        );
    }

    let mut trail = StateTrail::new(logger);
    let result = match run_pass(ctx, deps, settings, event, &mut trail, logger).await {
        Ok(indexes) => trail.advance(ReconcileState::Done).map(|()| indexes),
        Err(error) => Err(error),
    };

    match result {
        Ok(indexes) => {
            if let Some(logger) = logger {
                logger.info(
                    "reconcile.pass.completed",
                    "Reconcile pass completed",
                    Some(log_fields([
                        ("durationMs", json!(duration_ms(started_at))),
                        ("indexes", json!(indexes.len())),
                    ])),
                );
            }
            ReconcileOutcome::Done {
                event: event.kind(),
                indexes,
                states: trail.into_states(),
            }
        },
        Err(error) => {
            let kind = error.kind();
            let message = error.to_string();
            let envelope = ErrorEnvelope::from(error);
            trail.fail(&message);
            if let Some(logger) = logger {
                logger.log_error(
                    LogLevel::Error,
                    "reconcile.pass.failed",
                    "Reconcile pass failed",
                    Some(log_fields([
                        ("durationMs", json!(duration_ms(started_at))),
                        ("kind", json!(kind.as_str())),
                        ("state", json!(trail.last_working_label())),
                    ])),
                    &envelope,
                );
            }
            ReconcileOutcome::Failed {
                kind,
                message,
                error: envelope,
                states: trail.into_states(),
            }
        },
    }
}

async fn run_pass(
    ctx: &RequestContext,
    deps: &ReconcileDeps,
    settings: &ReconcileSettings,
    event: &LifecycleEvent,
    trail: &mut StateTrail<'_>,
    logger: Option<&dyn LoggerPort>,
) -> Result<Vec<IndexOutcome>, ReconcileError> {
    trail.advance(ReconcileState::Resolving)?;
    let plan = plan_pass(event, settings)?;
    let credential = resolve_credential(ctx, deps, &plan).await?;
    let control = deps
        .connector
        .connect(ctx, credential, &plan.environment)
        .map_err(ReconcileError::Unexpected)?;

    if let Some(logger) = logger {
        logger.info(
            "reconcile.resolve.completed",
            "Names and credential resolved",
            Some(log_fields([
                ("indexes", json!(plan.indexes.len())),
                ("environment", json!(plan.environment.as_ref())),
                ("secretStore", json!(deps.secrets.id())),
                ("provider", json!(control.provider().id.as_ref())),
            ])),
        );
    }

    let pass = Pass {
        remote: Remote::new(ctx, control, settings.retry, logger),
        settings,
        logger,
    };

    match event {
        LifecycleEvent::Create(_) => {
            trail.advance(ReconcileState::Creating)?;
            create_all(&pass, &plan).await
        },
        LifecycleEvent::Update(_) => {
            trail.advance(ReconcileState::Discovering)?;
            let managed = discover(&pass, &plan).await?;
            trail.advance(ReconcileState::Updating)?;
            update_all(&pass, &plan, &managed).await
        },
        LifecycleEvent::Delete(_) => {
            trail.advance(ReconcileState::Discovering)?;
            let managed = discover_for_delete(&pass, &plan).await;
            trail.advance(ReconcileState::Deleting)?;
            delete_all(&pass, &plan, managed.as_ref()).await
        },
    }
}

async fn resolve_credential(
    ctx: &RequestContext,
    deps: &ReconcileDeps,
    plan: &PassPlan<'_>,
) -> Result<SecretString, ReconcileError> {
    let secret = plan.secret_name.clone();
    let credential = deps
        .secrets
        .resolve_credential(ctx, secret.clone())
        .await
        .map_err(|cause| ReconcileError::CredentialResolutionFailed {
            secret: secret.clone(),
            cause,
        })?;
    if credential.is_blank() {
        return Err(ReconcileError::CredentialResolutionFailed {
            secret,
            cause: ErrorEnvelope::expected(
                ErrorCode::new("secrets", "empty"),
                "secret resolved to an empty value",
            ),
        });
    }
    Ok(credential)
}

/// States visited by a pass; every step is checked against the state machine.
struct StateTrail<'a> {
    current: ReconcileState,
    visited: Vec<ReconcileState>,
    logger: Option<&'a dyn LoggerPort>,
}

impl<'a> StateTrail<'a> {
    fn new(logger: Option<&'a dyn LoggerPort>) -> Self {
        Self {
            current: ReconcileState::Idle,
            visited: vec![ReconcileState::Idle],
            logger,
        }
    }

    fn advance(&mut self, next: ReconcileState) -> Result<(), ReconcileError> {
        if !self.current.can_transition_to(&next) {
            return Err(ReconcileError::Unexpected(
                ErrorEnvelope::invariant(
                    ErrorCode::new("reconcile", "illegal_transition"),
                    format!(
                        "illegal state transition {} -> {}",
                        self.current.label(),
                        next.label()
                    ),
                )
                .with_metadata("from", self.current.label())
                .with_metadata("to", next.label()),
            ));
        }
        if let Some(logger) = self.logger {
            logger.debug(
                "reconcile.state.entered",
                "Reconcile state entered",
                Some(log_fields([
                    ("from", json!(self.current.label())),
                    ("to", json!(next.label())),
                ])),
            );
        }
        self.visited.push(next.clone());
        self.current = next;
        Ok(())
    }

    fn fail(&mut self, reason: &str) {
        let failed = ReconcileState::Failed {
            reason: reason.into(),
        };
        if self.current.can_transition_to(&failed) {
            self.visited.push(failed.clone());
            self.current = failed;
        }
    }

    /// Label of the last non-terminal state.
    fn last_working_label(&self) -> &'static str {
        self.visited
            .iter()
            .rev()
            .find(|state| !state.is_terminal())
            .map_or("idle", ReconcileState::label)
    }

    fn into_states(self) -> Vec<ReconcileState> {
        self.visited
    }
}

fn pass_fields(ctx: &RequestContext, event: &LifecycleEvent) -> LogFields {
    log_fields([
        ("correlationId", json!(ctx.correlation_id().as_str())),
        ("event", json!(event.kind().as_str())),
        ("scopeId", json!(event.payload().scope_id.as_str())),
    ])
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_rejects_illegal_steps() {
        let mut trail = StateTrail::new(None);
        let skipped = trail.advance(ReconcileState::Deleting);
        assert!(matches!(skipped, Err(ReconcileError::Unexpected(_))));
        assert_eq!(trail.into_states(), vec![ReconcileState::Idle]);
    }

    #[test]
    fn trail_records_failure_once() -> Result<(), ReconcileError> {
        let mut trail = StateTrail::new(None);
        trail.advance(ReconcileState::Resolving)?;
        trail.fail("boom");
        trail.fail("again");
        assert_eq!(trail.last_working_label(), "resolving");

        let states = trail.into_states();
        assert_eq!(states.len(), 3);
        assert_eq!(
            states.last(),
            Some(&ReconcileState::Failed {
                reason: "boom".into()
            })
        );
        Ok(())
    }
}
