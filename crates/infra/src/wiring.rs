//! Builds reconcile settings and adapters from validated config.

use index_provisioner_adapters::{EnvSecretStore, FileSecretStore, PineconeConnector};
use index_provisioner_app::{ReconcileDeps, ReconcileSettings};
use index_provisioner_config::{SecretsProvider, ValidatedProvisionerConfig};
use index_provisioner_ports::{IndexControlConnector, LoggerPort, SecretStorePort};
use std::sync::Arc;

/// Settings for one pass, taken from the validated config.
#[must_use]
pub fn settings_from_config(config: &ValidatedProvisionerConfig) -> ReconcileSettings {
    ReconcileSettings {
        retry: config.retry_policy(),
        max_index_name_length: config.max_index_name_length(),
        default_removal_policy: config.default_removal_policy,
        api_key_secret_name: config.api_key_secret_name.clone(),
        environment: config.environment.clone(),
    }
}

/// Controller connector for the configured base URL and timeout.
#[must_use]
pub fn build_connector(config: &ValidatedProvisionerConfig) -> Arc<dyn IndexControlConnector> {
    let connector = PineconeConnector::new(config.controller.timeout_ms);
    match config.controller.base_url.as_deref() {
        Some(base_url) => Arc::new(connector.with_base_url(base_url)),
        None => Arc::new(connector),
    }
}

/// Secret store selected by `secrets.provider`.
#[must_use]
pub fn build_secret_store(config: &ValidatedProvisionerConfig) -> Arc<dyn SecretStorePort> {
    match (config.secrets.provider, config.secrets.directory.as_deref()) {
        (SecretsProvider::File, Some(directory)) => Arc::new(FileSecretStore::new(directory)),
        // Validation guarantees a directory for the file provider.
        (SecretsProvider::File, None) | (SecretsProvider::Env, _) => {
            Arc::new(EnvSecretStore::from_std_env())
        },
    }
}

/// Production dependencies for [`index_provisioner_app::reconcile`].
#[must_use]
pub fn build_reconcile_deps(
    config: &ValidatedProvisionerConfig,
    logger: Option<Arc<dyn LoggerPort>>,
) -> ReconcileDeps {
    ReconcileDeps {
        connector: build_connector(config),
        secrets: build_secret_store(config),
        logger,
    }
}
