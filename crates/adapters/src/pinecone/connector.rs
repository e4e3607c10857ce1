//! Connector that binds controller clients to a credential and environment.

use crate::pinecone::client::{PineconeControlClient, PineconeControlConfig};
use index_provisioner_ports::{IndexControlConnector, IndexControlPort};
use index_provisioner_shared::{RequestContext, Result, SecretString};
use std::sync::Arc;

/// Default controller request timeout.
pub const DEFAULT_CONTROLLER_TIMEOUT_MS: u64 = 30_000;

/// Builds [`PineconeControlClient`]s on demand.
#[derive(Debug, Clone)]
pub struct PineconeConnector {
    base_url: Option<Box<str>>,
    timeout_ms: u64,
}

impl PineconeConnector {
    /// Connector that derives the controller URL from the environment.
    #[must_use]
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            base_url: None,
            timeout_ms,
        }
    }

    /// Send every request to `base_url` instead of the derived controller URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<Box<str>>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl Default for PineconeConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROLLER_TIMEOUT_MS)
    }
}

impl IndexControlConnector for PineconeConnector {
    fn connect(
        &self,
        ctx: &RequestContext,
        credential: SecretString,
        environment: &str,
    ) -> Result<Arc<dyn IndexControlPort>> {
        let client = PineconeControlClient::new(PineconeControlConfig {
            api_key: credential,
            environment: environment.into(),
            base_url: self.base_url.clone(),
            timeout_ms: self.timeout_ms,
        })?;
        tracing::debug!(
            correlation_id = %ctx.correlation_id(),
            base_url = client.base_url(),
            "connected control client"
        );
        Ok(Arc::new(client))
    }
}
