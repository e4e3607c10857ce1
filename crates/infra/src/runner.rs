//! Blocking entry points that run one reconciliation pass.

use crate::event_source::{EventSource, load_event};
use crate::wiring::{build_reconcile_deps, settings_from_config};
use crate::{InfraError, InfraResult};
use index_provisioner_app::{ReconcileDeps, ReconcileOutcome, ReconcileSettings, reconcile};
use index_provisioner_config::{ValidatedProvisionerConfig, load_provisioner_config_std_env};
use index_provisioner_domain::LifecycleEvent;
use index_provisioner_ports::LoggerPort;
use index_provisioner_shared::RequestContext;
use std::path::Path;
use std::sync::Arc;

/// Run one pass with explicit dependencies.
pub fn run_reconcile_with_deps(
    deps: &ReconcileDeps,
    settings: &ReconcileSettings,
    event: &LifecycleEvent,
) -> InfraResult<ReconcileOutcome> {
    let ctx = RequestContext::new_pass();
    tracing::debug!(
        correlation_id = %ctx.correlation_id(),
        event = %event.kind(),
        "starting reconcile pass"
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;
    Ok(runtime.block_on(reconcile(&ctx, deps, settings, event)))
}

/// Run one pass with the production adapters selected by `config`.
pub fn run_reconcile(
    config: &ValidatedProvisionerConfig,
    event: &LifecycleEvent,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<ReconcileOutcome> {
    let deps = build_reconcile_deps(config, logger);
    let settings = settings_from_config(config);
    run_reconcile_with_deps(&deps, &settings, event)
}

/// Load config from std env and `config_path`, read the event, and run one pass.
///
/// Config and event errors are returned as `Err`; a pass that fails is still
/// `Ok(ReconcileOutcome::Failed { .. })`.
pub fn run_reconcile_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    event: &EventSource,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<ReconcileOutcome> {
    let config = load_provisioner_config_std_env(config_path, overrides_json)?;
    let event = load_event(event)?;
    run_reconcile(&config, &event, logger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_app::IndexAction;
    use index_provisioner_domain::{ReconcileState, ScopeId, resolve};
    use index_provisioner_shared::{RetryPolicy, SecretString};
    use index_provisioner_testkit::fixtures::event_fixture;
    use index_provisioner_testkit::in_memory::{
        InMemoryConnector, InMemoryIndexControl, RecordingLogger, StaticSecretStore,
    };
    use std::error::Error;
    use std::time::Duration;

    fn settings() -> Result<ReconcileSettings, Box<dyn Error>> {
        Ok(ReconcileSettings {
            retry: RetryPolicy::new(2, Duration::ZERO)?,
            api_key_secret_name: Some("pinecone-api-key".into()),
            environment: Some("us-east1-gcp".into()),
            ..ReconcileSettings::default()
        })
    }

    #[test]
    fn runs_a_pass_on_a_fresh_runtime() -> Result<(), Box<dyn Error>> {
        let control = Arc::new(InMemoryIndexControl::new());
        let connector = Arc::new(InMemoryConnector::new(Arc::clone(&control)));
        let logger = RecordingLogger::default();
        let deps = ReconcileDeps {
            connector: connector.clone(),
            secrets: Arc::new(StaticSecretStore::with_secret("pinecone-api-key", "pk-test")),
            logger: Some(Arc::new(logger.clone())),
        };

        let event = event_fixture("create.json")?;
        let outcome = run_reconcile_with_deps(&deps, &settings()?, &event)?;

        assert!(outcome.is_done());
        assert_eq!(outcome.states().last(), Some(&ReconcileState::Done));
        let expected = resolve(&ScopeId::parse("PineconeStack-Prod")?, "docs", 45);
        assert_eq!(control.index_names(), vec![expected]);
        assert_eq!(
            outcome
                .indexes()
                .iter()
                .map(|index| index.action)
                .collect::<Vec<_>>(),
            vec![IndexAction::Created]
        );
        assert_eq!(connector.connects().len(), 1);
        assert_eq!(logger.count("reconcile.pass.completed"), 1);
        Ok(())
    }

    #[test]
    fn missing_event_file_is_an_error_not_a_failed_pass() {
        let result = run_reconcile_from_path(
            None,
            None,
            &EventSource::Path("/nonexistent/event.json".into()),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn secrets_are_not_logged() -> Result<(), Box<dyn Error>> {
        let control = Arc::new(InMemoryIndexControl::new());
        let logger = RecordingLogger::default();
        let deps = ReconcileDeps {
            connector: Arc::new(InMemoryConnector::new(control)),
            secrets: Arc::new(StaticSecretStore::with_secret("pinecone-api-key", "pk-live-123")),
            logger: Some(Arc::new(logger.clone())),
        };
        let event = event_fixture("create.json")?;
        run_reconcile_with_deps(&deps, &settings()?, &event)?;

        let secret = SecretString::from("pk-live-123".to_owned());
        let rendered = format!("{:?}", logger.events());
        assert!(!rendered.contains(secret.expose()));
        Ok(())
    }
}
