//! Secret store adapters (environment variables and mounted files).

use index_provisioner_ports::{BoxFuture, SecretStorePort};
use index_provisioner_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, SecretString,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix of the env var holding a named secret.
pub const SECRET_ENV_PREFIX: &str = "INDEX_PROVISIONER_SECRET_";

/// Env var name for a secret reference (`my-key` → `INDEX_PROVISIONER_SECRET_MY_KEY`).
#[must_use]
pub fn secret_env_var(secret_reference: &str) -> String {
    let mut name = String::with_capacity(SECRET_ENV_PREFIX.len() + secret_reference.len());
    name.push_str(SECRET_ENV_PREFIX);
    name.extend(secret_reference.trim().chars().map(|ch| {
        if ch.is_ascii_alphanumeric() {
            ch.to_ascii_uppercase()
        } else {
            '_'
        }
    }));
    name
}

#[derive(Debug, Clone)]
enum EnvSource {
    Process,
    Map(BTreeMap<String, String>),
}

/// Resolves secrets from `INDEX_PROVISIONER_SECRET_*` variables.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    source: EnvSource,
}

impl EnvSecretStore {
    /// Store backed by the process environment.
    #[must_use]
    pub const fn from_std_env() -> Self {
        Self {
            source: EnvSource::Process,
        }
    }

    /// Store backed by an explicit variable map.
    #[must_use]
    pub const fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self {
            source: EnvSource::Map(vars),
        }
    }

    fn lookup(&self, var: &str) -> Option<String> {
        match &self.source {
            EnvSource::Process => std::env::var(var).ok(),
            EnvSource::Map(vars) => vars.get(var).cloned(),
        }
    }
}

impl SecretStorePort for EnvSecretStore {
    fn id(&self) -> &str {
        "env"
    }

    fn resolve_credential(
        &self,
        _ctx: &RequestContext,
        secret_reference: Box<str>,
    ) -> BoxFuture<'_, Result<SecretString>> {
        Box::pin(async move {
            let reference = checked_reference(&secret_reference)?;
            let var = secret_env_var(reference);
            let Some(value) = self.lookup(&var) else {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::new("secrets", "not_found"),
                    format!("secret `{reference}` is not set"),
                )
                .with_metadata("store", "env")
                .with_metadata("variable", var));
            };
            non_blank(value, reference, "env")
        })
    }
}

/// Resolves secrets from files named after the reference under one directory.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    directory: PathBuf,
}

impl FileSecretStore {
    /// Store rooted at `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl SecretStorePort for FileSecretStore {
    fn id(&self) -> &str {
        "file"
    }

    fn resolve_credential(
        &self,
        _ctx: &RequestContext,
        secret_reference: Box<str>,
    ) -> BoxFuture<'_, Result<SecretString>> {
        Box::pin(async move {
            let reference = checked_reference(&secret_reference)?;
            if reference.contains(['/', '\\']) || reference.starts_with('.') {
                return Err(invalid_reference(reference));
            }

            let path = self.directory.join(reference);
            let contents = tokio::fs::read_to_string(&path).await.map_err(|error| {
                let (code, class) = match error.kind() {
                    std::io::ErrorKind::NotFound => {
                        (ErrorCode::new("secrets", "not_found"), ErrorClass::NonRetriable)
                    },
                    std::io::ErrorKind::PermissionDenied => {
                        (ErrorCode::permission_denied(), ErrorClass::NonRetriable)
                    },
                    _ => (ErrorCode::io(), ErrorClass::Retriable),
                };
                ErrorEnvelope::unexpected(
                    code,
                    format!("failed to read secret `{reference}`: {error}"),
                    class,
                )
                .with_metadata("store", "file")
                .with_metadata("path", path.to_string_lossy().to_string())
            })?;
            non_blank(contents, reference, "file")
        })
    }
}

fn checked_reference(raw: &str) -> Result<&str> {
    let reference = raw.trim();
    if reference.is_empty() {
        return Err(invalid_reference(reference));
    }
    Ok(reference)
}

fn invalid_reference(reference: &str) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("secrets", "invalid_reference"),
        "secret reference must be a non-empty plain name",
    )
    .with_metadata("reference", reference.to_owned())
}

fn non_blank(value: String, reference: &str, store: &'static str) -> Result<SecretString> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::new("secrets", "empty"),
            format!("secret `{reference}` is empty"),
        )
        .with_metadata("store", store));
    }
    Ok(SecretString::new(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new_pass()
    }

    #[test]
    fn env_var_name_is_normalised() {
        assert_eq!(secret_env_var("pinecone-api.key"), "INDEX_PROVISIONER_SECRET_PINECONE_API_KEY");
        assert_eq!(secret_env_var(" k1 "), "INDEX_PROVISIONER_SECRET_K1");
    }

    #[tokio::test]
    async fn env_store_resolves_and_trims() -> Result<()> {
        let store = EnvSecretStore::from_map(BTreeMap::from([(
            "INDEX_PROVISIONER_SECRET_PC_KEY".to_owned(),
            " abc123\n".to_owned(),
        )]));
        let secret = store.resolve_credential(&ctx(), "pc-key".into()).await?;
        assert_eq!(secret.expose(), "abc123");
        Ok(())
    }

    #[tokio::test]
    async fn env_store_reports_missing_and_blank() {
        let store = EnvSecretStore::from_map(BTreeMap::from([(
            "INDEX_PROVISIONER_SECRET_BLANK".to_owned(),
            "   ".to_owned(),
        )]));

        let missing = store.resolve_credential(&ctx(), "absent".into()).await;
        assert_eq!(
            missing.err().map(|error| error.code),
            Some(ErrorCode::new("secrets", "not_found"))
        );

        let blank = store.resolve_credential(&ctx(), "blank".into()).await;
        assert_eq!(
            blank.err().map(|error| error.code),
            Some(ErrorCode::new("secrets", "empty"))
        );
    }

    #[tokio::test]
    async fn file_store_reads_trimmed_contents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = std::env::temp_dir().join(format!("index-provisioner-secrets-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("pc-key"), "from-file\n")?;

        let store = FileSecretStore::new(&dir);
        let secret = store.resolve_credential(&ctx(), "pc-key".into()).await?;
        assert_eq!(secret.expose(), "from-file");

        let missing = store.resolve_credential(&ctx(), "nope".into()).await;
        assert_eq!(
            missing.err().map(|error| error.code),
            Some(ErrorCode::new("secrets", "not_found"))
        );

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn file_store_rejects_path_traversal() {
        let store = FileSecretStore::new("/run/secrets");
        for reference in ["../etc/passwd", "a/b", ".hidden", "  "] {
            let result = store.resolve_credential(&ctx(), reference.into()).await;
            assert_eq!(
                result.err().map(|error| error.code),
                Some(ErrorCode::new("secrets", "invalid_reference")),
                "{reference}"
            );
        }
    }
}
