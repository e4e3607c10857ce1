//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{
    ProvisionerConfig, ProvisionerEnv, SecretsProvider, ValidatedProvisionerConfig,
    apply_env_overrides,
};
use index_provisioner_domain::RemovalPolicy;
use index_provisioner_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the provisioner config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`ProvisionerEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`ProvisionerConfig::default()`)
pub fn load_provisioner_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &ProvisionerEnv,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => ProvisionerConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the provisioner config from an optional file path (`.json` or `.toml`).
pub fn load_provisioner_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &ProvisionerEnv,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => ProvisionerConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    apply_env_overrides(config, env)
}

/// Load the provisioner config from std env and an optional file path.
pub fn load_provisioner_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let env = ProvisionerEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_provisioner_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &ProvisionerConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &ProvisionerConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<ProvisionerConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<ProvisionerConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ProvisionerConfigOverrides {
    version: Option<u32>,
    api_key_secret_name: Option<Box<str>>,
    environment: Option<Box<str>>,
    num_attempts_to_run_operation: Option<u32>,
    retry_delay_seconds: Option<u64>,
    default_removal_policy: Option<RemovalPolicy>,
    max_index_name_length: Option<u32>,
    controller: ControllerConfigOverrides,
    secrets: SecretsConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ControllerConfigOverrides {
    base_url: Option<Box<str>>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct SecretsConfigOverrides {
    provider: Option<SecretsProvider>,
    directory: Option<Box<str>>,
}

fn apply_overrides(config: &mut ProvisionerConfig, overrides: ProvisionerConfigOverrides) {
    set(&mut config.version, overrides.version);
    set_some(&mut config.api_key_secret_name, overrides.api_key_secret_name);
    set_some(&mut config.environment, overrides.environment);
    set(
        &mut config.num_attempts_to_run_operation,
        overrides.num_attempts_to_run_operation,
    );
    set(&mut config.retry_delay_seconds, overrides.retry_delay_seconds);
    set(
        &mut config.default_removal_policy,
        overrides.default_removal_policy,
    );
    set(
        &mut config.max_index_name_length,
        overrides.max_index_name_length,
    );
    set_some(&mut config.controller.base_url, overrides.controller.base_url);
    set(&mut config.controller.timeout_ms, overrides.controller.timeout_ms);
    set(&mut config.secrets.provider, overrides.secrets.provider);
    set_some(&mut config.secrets.directory, overrides.secrets.directory);
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_some<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_precedence_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{
          "version": 1,
          "numAttemptsToRunOperation": 4
        }"#;

        let overrides_json = r#"{
          "numAttemptsToRunOperation": 6
        }"#;

        let env = ProvisionerEnv {
            num_attempts: Some(8),
            ..ProvisionerEnv::default()
        };

        let config =
            load_provisioner_config_from_sources(Some(config_json), Some(overrides_json), &env)?;
        assert_eq!(config.num_attempts_to_run_operation, 8);

        let config = load_provisioner_config_from_sources(
            Some(config_json),
            Some(overrides_json),
            &ProvisionerEnv::default(),
        )?;
        assert_eq!(config.num_attempts_to_run_operation, 6);
        Ok(())
    }

    #[test]
    fn serialization_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let env = ProvisionerEnv::default();
        let config = load_provisioner_config_from_sources(None, None, &env)?;
        let first = to_pretty_json(&config)?;
        let second = to_pretty_json(&config)?;
        assert_eq!(first, second);
        assert!(to_pretty_toml(&config)?.contains("defaultRemovalPolicy = \"retain\""));
        Ok(())
    }

    #[test]
    fn invalid_config_value_overridden_by_valid_env_succeeds()
    -> Result<(), Box<dyn std::error::Error>> {
        let config_json = r#"{ "controller": { "timeoutMs": 500 } }"#;
        let env = ProvisionerEnv {
            controller_timeout_ms: Some(30_000),
            ..ProvisionerEnv::default()
        };

        let config = load_provisioner_config_from_sources(Some(config_json), None, &env)?;
        assert_eq!(config.controller.timeout_ms, 30_000);
        Ok(())
    }

    #[test]
    fn malformed_overrides_report_their_source() -> Result<(), Box<dyn std::error::Error>> {
        let result = load_provisioner_config_from_sources(
            None,
            Some(r#"{ "retryDelaySeconds": }"#),
            &ProvisionerEnv::default(),
        );

        let error = result
            .err()
            .ok_or_else(|| std::io::Error::other("expected overrides error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_json"));
        assert_eq!(
            error.metadata.get("source").map(String::as_str),
            Some("overrides")
        );
        Ok(())
    }

    #[test]
    fn env_validation_fails_with_out_of_range_value() -> Result<(), Box<dyn std::error::Error>> {
        let env = ProvisionerEnv {
            retry_delay_seconds: Some(3_600),
            ..ProvisionerEnv::default()
        };

        let error = load_provisioner_config_from_sources(None, None, &env)
            .err()
            .ok_or_else(|| std::io::Error::other("expected env validation error"))?;
        assert_eq!(error.code, ErrorCode::new("config", "invalid_limit"));
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = detect_config_format(Path::new("provisioner.yaml"));
        assert_eq!(
            result.err().map(|error| error.code),
            Some(ErrorCode::new("config", "unsupported_format"))
        );
    }
}
