//! Controller and data-plane base URL normalization.

use index_provisioner_shared::{ErrorCode, ErrorEnvelope, Result};
use url::Url;

/// Controller URL for an environment when no override is configured.
pub fn controller_base_url(environment: &str, base_url_override: Option<&str>) -> Result<Box<str>> {
    if let Some(base) = base_url_override.map(str::trim).filter(|base| !base.is_empty()) {
        return normalize_url(base);
    }

    let environment = environment.trim();
    if environment.is_empty()
        || !environment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "environment must be non-empty and contain only letters, digits, and '-'",
        )
        .with_metadata("environment", environment.to_owned()));
    }
    Ok(format!("https://controller.{environment}.pinecone.io").into_boxed_str())
}

/// Base URL for an index host reported by `describe`.
///
/// The controller reports bare hosts; those are reached over https.
pub fn index_host_base_url(host: &str) -> Result<Box<str>> {
    let trimmed = host.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return normalize_url(trimmed);
    }
    normalize_url(&format!("https://{trimmed}"))
}

fn normalize_url(raw: &str) -> Result<Box<str>> {
    let parsed = Url::parse(raw).map_err(|error| {
        ErrorEnvelope::expected(ErrorCode::invalid_input(), format!("invalid URL: {error}"))
            .with_metadata("url", raw.to_owned())
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "URL must use http or https",
        )
        .with_metadata("url", raw.to_owned()));
    }

    let mut normalized = raw.to_owned();
    let trimmed_len = normalized.trim_end_matches('/').len();
    normalized.truncate(trimmed_len);
    Ok(normalized.into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_maps_to_controller_host() -> Result<()> {
        assert_eq!(
            controller_base_url("us-east1-gcp", None)?.as_ref(),
            "https://controller.us-east1-gcp.pinecone.io"
        );
        Ok(())
    }

    #[test]
    fn override_wins_and_drops_trailing_slash() -> Result<()> {
        assert_eq!(
            controller_base_url("ignored", Some("http://127.0.0.1:8080/"))?.as_ref(),
            "http://127.0.0.1:8080"
        );
        Ok(())
    }

    #[test]
    fn bad_environment_is_rejected() {
        assert!(controller_base_url("", None).is_err());
        assert!(controller_base_url("evil.com/x", None).is_err());
    }

    #[test]
    fn bare_hosts_get_https() -> Result<()> {
        assert_eq!(
            index_host_base_url("docs-abc.svc.us-east1-gcp.pinecone.io")?.as_ref(),
            "https://docs-abc.svc.us-east1-gcp.pinecone.io"
        );
        assert_eq!(
            index_host_base_url("http://127.0.0.1:9000")?.as_ref(),
            "http://127.0.0.1:9000"
        );
        Ok(())
    }

    #[test]
    fn non_http_override_is_rejected() {
        assert!(controller_base_url("x", Some("ftp://example.com")).is_err());
    }
}
