//! Secret store boundary contract.

use crate::BoxFuture;
use index_provisioner_shared::{RequestContext, Result, SecretString};

/// Resolves credential references into credential values.
pub trait SecretStorePort: Send + Sync {
    /// Stable store identifier for logs (e.g. `env`, `file`).
    fn id(&self) -> &str;

    /// Resolve `secret_reference` into a credential.
    fn resolve_credential(
        &self,
        ctx: &RequestContext,
        secret_reference: Box<str>,
    ) -> BoxFuture<'_, Result<SecretString>>;
}
