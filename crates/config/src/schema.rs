//! Provisioner configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Optional strings are trimmed; blank values collapse to `None`.

use index_provisioner_domain::{MAX_INDEX_NAME_LENGTH, RemovalPolicy};
use index_provisioner_shared::{
    BoundedU32, DEFAULT_RETRY_ATTEMPTS, ErrorCode, ErrorEnvelope, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Minimum retry attempts per remote operation.
pub const NUM_ATTEMPTS_MIN: u32 = 1;
/// Maximum retry attempts per remote operation.
pub const NUM_ATTEMPTS_MAX: u32 = 20;
/// Maximum fixed delay between attempts, in seconds.
pub const RETRY_DELAY_MAX_SECONDS: u64 = 300;
/// Smallest accepted index name budget; shorter budgets would cut into the scope hash.
pub const INDEX_NAME_LENGTH_MIN: u32 = 28;
/// Largest accepted index name budget.
pub const INDEX_NAME_LENGTH_MAX: u32 = 64;
/// Minimum controller request timeout.
pub const CONTROLLER_TIMEOUT_MIN_MS: u64 = 1_000;
/// Maximum controller request timeout.
pub const CONTROLLER_TIMEOUT_MAX_MS: u64 = 600_000;

const DEFAULT_RETRY_DELAY_SECONDS: u64 = 5;
const DEFAULT_CONTROLLER_TIMEOUT_MS: u64 = 30_000;

/// Retry attempts after validation.
pub type NumAttempts = BoundedU32<NUM_ATTEMPTS_MIN, NUM_ATTEMPTS_MAX>;
/// Index name budget after validation.
pub type IndexNameLength = BoundedU32<INDEX_NAME_LENGTH_MIN, INDEX_NAME_LENGTH_MAX>;

fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if (parsed.password().is_some() || !parsed.username().is_empty())
                && (parsed.set_username("").is_err() || parsed.set_password(None).is_err())
            {
                return "[invalid url: credentials]".to_owned();
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

/// Top-level provisioner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ProvisionerConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Name of the secret holding the remote API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_secret_name: Option<Box<str>>,
    /// Remote environment identifier (e.g. `us-east1-gcp`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Box<str>>,
    /// Attempts per remote operation, including the first.
    pub num_attempts_to_run_operation: u32,
    /// Fixed delay between attempts.
    pub retry_delay_seconds: u64,
    /// Removal policy for indexes whose declaration does not set one.
    pub default_removal_policy: RemovalPolicy,
    /// Upper bound on resolved index name length.
    pub max_index_name_length: u32,
    /// Remote control API settings.
    pub controller: ControllerConfig,
    /// Credential lookup settings.
    pub secrets: SecretsConfig,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            api_key_secret_name: None,
            environment: None,
            num_attempts_to_run_operation: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
            default_removal_policy: RemovalPolicy::default(),
            max_index_name_length: u32::try_from(MAX_INDEX_NAME_LENGTH).unwrap_or(45),
            controller: ControllerConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl ProvisionerConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(
        mut self,
    ) -> Result<ValidatedProvisionerConfig, ConfigSchemaError> {
        self.validate_version()?;
        normalize_optional_trimmed(&mut self.api_key_secret_name);
        normalize_optional_trimmed(&mut self.environment);

        let num_attempts = NumAttempts::try_new(self.num_attempts_to_run_operation).map_err(
            |error| ConfigSchemaError::LimitOutOfRange {
                section: "root",
                field: "numAttemptsToRunOperation",
                value: u64::from(error.value),
                min: u64::from(error.min),
                max: u64::from(error.max),
            },
        )?;
        if self.retry_delay_seconds > RETRY_DELAY_MAX_SECONDS {
            return Err(ConfigSchemaError::LimitOutOfRange {
                section: "root",
                field: "retryDelaySeconds",
                value: self.retry_delay_seconds,
                min: 0,
                max: RETRY_DELAY_MAX_SECONDS,
            });
        }
        let max_index_name_length = IndexNameLength::try_new(self.max_index_name_length)
            .map_err(|error| ConfigSchemaError::LimitOutOfRange {
                section: "root",
                field: "maxIndexNameLength",
                value: u64::from(error.value),
                min: u64::from(error.min),
                max: u64::from(error.max),
            })?;

        self.controller.normalize();
        self.controller.validate()?;
        self.secrets.normalize();
        self.secrets.validate()?;

        Ok(ValidatedProvisionerConfig {
            raw: self,
            num_attempts,
            max_index_name_length,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying bounded numeric values.
#[derive(Debug, Clone)]
pub struct ValidatedProvisionerConfig {
    raw: ProvisionerConfig,
    num_attempts: NumAttempts,
    max_index_name_length: IndexNameLength,
}

impl ValidatedProvisionerConfig {
    /// Fixed-delay retry policy applied to every remote operation.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_bounded(
            self.num_attempts,
            Duration::from_secs(self.raw.retry_delay_seconds),
        )
    }

    /// Resolved index name budget.
    #[must_use]
    pub fn max_index_name_length(&self) -> usize {
        usize::try_from(self.max_index_name_length.get()).unwrap_or(MAX_INDEX_NAME_LENGTH)
    }

    /// Controller request timeout.
    #[must_use]
    pub const fn controller_timeout(&self) -> Duration {
        Duration::from_millis(self.raw.controller.timeout_ms)
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &ProvisionerConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> ProvisionerConfig {
        self.raw
    }
}

impl AsRef<ProvisionerConfig> for ValidatedProvisionerConfig {
    fn as_ref(&self) -> &ProvisionerConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedProvisionerConfig {
    type Target = ProvisionerConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Remote control API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ControllerConfig {
    /// Base URL override; derived from the environment when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Box<str>>,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_CONTROLLER_TIMEOUT_MS,
        }
    }
}

impl ControllerConfig {
    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.base_url);
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if let Some(url) = self.base_url.as_deref() {
            validate_http_url("controller", "baseUrl", url)?;
        }
        if !(CONTROLLER_TIMEOUT_MIN_MS..=CONTROLLER_TIMEOUT_MAX_MS).contains(&self.timeout_ms) {
            return Err(ConfigSchemaError::TimeoutOutOfRange {
                section: "controller",
                field: "timeoutMs",
                value_ms: self.timeout_ms,
                min_ms: CONTROLLER_TIMEOUT_MIN_MS,
                max_ms: CONTROLLER_TIMEOUT_MAX_MS,
            });
        }
        Ok(())
    }
}

/// Where credential secrets are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretsProvider {
    /// Process environment (`INDEX_PROVISIONER_SECRET_<NAME>`).
    #[default]
    Env,
    /// One file per secret inside `secrets.directory`.
    File,
}

impl SecretsProvider {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::File => "file",
        }
    }
}

impl std::str::FromStr for SecretsProvider {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "file" => Ok(Self::File),
            other => Err(format!("unknown secrets provider `{other}`")),
        }
    }
}

/// Secret store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SecretsConfig {
    /// Secret store backend.
    pub provider: SecretsProvider,
    /// Directory for the `file` provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<Box<str>>,
}

impl SecretsConfig {
    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.directory);
    }

    fn validate(&self) -> Result<(), ConfigSchemaError> {
        if self.provider == SecretsProvider::File && self.directory.is_none() {
            return Err(ConfigSchemaError::MissingField {
                section: "secrets",
                field: "directory",
            });
        }
        Ok(())
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `controller`).
        section: &'static str,
        /// Field name in the config file (e.g. `timeoutMs`).
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (`root` for top-level keys).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Schema section (e.g. `controller`).
        section: &'static str,
        /// Field name in the config file (e.g. `baseUrl`).
        field: &'static str,
        /// Invalid URL value, credentials stripped.
        url: String,
    },
    /// A field required by another setting is missing.
    MissingField {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "invalid_timeout"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::MissingField { .. } => ErrorCode::new("config", "missing_field"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::InvalidUrl { section, field, .. } => {
                write!(formatter, "invalid URL for {section}.{field}")
            },
            Self::MissingField { section, field } => {
                write!(formatter, "{section}.{field} is required")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => envelope
                .with_metadata("found", found.to_string())
                .with_metadata("supported", supported.to_string()),
            ConfigSchemaError::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value_ms", value_ms.to_string())
                .with_metadata("min_ms", min_ms.to_string())
                .with_metadata("max_ms", max_ms.to_string()),
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                url,
            } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field)
                .with_metadata("url", url),
            ConfigSchemaError::MissingField { section, field } => envelope
                .with_metadata("section", section)
                .with_metadata("field", field),
        }
    }
}

/// Parse and validate a provisioner config from JSON.
pub fn parse_provisioner_config_json(
    input: &str,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let config: ProvisionerConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;
    config.validate_and_normalize().map_err(Into::into)
}

/// Parse and validate a provisioner config from TOML.
pub fn parse_provisioner_config_toml(
    input: &str,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let config: ProvisionerConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;
    config.validate_and_normalize().map_err(Into::into)
}

fn normalize_optional_trimmed(value: &mut Option<Box<str>>) {
    if let Some(raw) = value.as_deref() {
        let trimmed = raw.trim();
        *value = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned().into_boxed_str())
        };
    }
}

fn validate_http_url(
    section: &'static str,
    field: &'static str,
    raw: &str,
) -> Result<(), ConfigSchemaError> {
    let invalid = || ConfigSchemaError::InvalidUrl {
        section,
        field,
        url: sanitize_url_for_error(raw),
    };
    let parsed = Url::parse(raw).map_err(|_| invalid())?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(invalid()),
    }
}
