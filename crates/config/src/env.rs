//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict: a variable that is present but blank or malformed
//! fails the load instead of silently falling back to the file value.

use crate::schema::{ProvisionerConfig, SecretsProvider, ValidatedProvisionerConfig};
use index_provisioner_domain::RemovalPolicy;
use index_provisioner_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Env var: name of the secret holding the API key.
pub const ENV_API_KEY_SECRET_NAME: &str = "INDEX_PROVISIONER_API_KEY_SECRET_NAME";
/// Env var: remote environment identifier.
pub const ENV_ENVIRONMENT: &str = "INDEX_PROVISIONER_ENVIRONMENT";
/// Env var: attempts per remote operation.
pub const ENV_NUM_ATTEMPTS: &str = "INDEX_PROVISIONER_NUM_ATTEMPTS";
/// Env var: fixed delay between attempts, in seconds.
pub const ENV_RETRY_DELAY_SECONDS: &str = "INDEX_PROVISIONER_RETRY_DELAY_SECONDS";
/// Env var: default removal policy.
pub const ENV_DEFAULT_REMOVAL_POLICY: &str = "INDEX_PROVISIONER_DEFAULT_REMOVAL_POLICY";
/// Env var: resolved index name budget.
pub const ENV_MAX_INDEX_NAME_LENGTH: &str = "INDEX_PROVISIONER_MAX_INDEX_NAME_LENGTH";
/// Env var: controller base URL override.
pub const ENV_CONTROLLER_BASE_URL: &str = "INDEX_PROVISIONER_CONTROLLER_BASE_URL";
/// Env var: controller request timeout in milliseconds.
pub const ENV_CONTROLLER_TIMEOUT_MS: &str = "INDEX_PROVISIONER_CONTROLLER_TIMEOUT_MS";
/// Env var: secret store backend (`env` or `file`).
pub const ENV_SECRETS_PROVIDER: &str = "INDEX_PROVISIONER_SECRETS_PROVIDER";
/// Env var: directory for the file secret store.
pub const ENV_SECRETS_DIR: &str = "INDEX_PROVISIONER_SECRETS_DIR";

const ALL_ENV_VARS: [&str; 10] = [
    ENV_API_KEY_SECRET_NAME,
    ENV_ENVIRONMENT,
    ENV_NUM_ATTEMPTS,
    ENV_RETRY_DELAY_SECONDS,
    ENV_DEFAULT_REMOVAL_POLICY,
    ENV_MAX_INDEX_NAME_LENGTH,
    ENV_CONTROLLER_BASE_URL,
    ENV_CONTROLLER_TIMEOUT_MS,
    ENV_SECRETS_PROVIDER,
    ENV_SECRETS_DIR,
];

/// Parsed env overrides; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionerEnv {
    /// Override for `apiKeySecretName`.
    pub api_key_secret_name: Option<Box<str>>,
    /// Override for `environment`.
    pub environment: Option<Box<str>>,
    /// Override for `numAttemptsToRunOperation`.
    pub num_attempts: Option<u32>,
    /// Override for `retryDelaySeconds`.
    pub retry_delay_seconds: Option<u64>,
    /// Override for `defaultRemovalPolicy`.
    pub default_removal_policy: Option<RemovalPolicy>,
    /// Override for `maxIndexNameLength`.
    pub max_index_name_length: Option<u32>,
    /// Override for `controller.baseUrl`.
    pub controller_base_url: Option<Box<str>>,
    /// Override for `controller.timeoutMs`.
    pub controller_timeout_ms: Option<u64>,
    /// Override for `secrets.provider`.
    pub secrets_provider: Option<SecretsProvider>,
    /// Override for `secrets.directory`.
    pub secrets_dir: Option<Box<str>>,
}

impl ProvisionerEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            api_key_secret_name: parse_optional_trimmed_string(map, ENV_API_KEY_SECRET_NAME)?,
            environment: parse_optional_trimmed_string(map, ENV_ENVIRONMENT)?,
            num_attempts: parse_optional_u32(map, ENV_NUM_ATTEMPTS)?,
            retry_delay_seconds: parse_optional_u64(map, ENV_RETRY_DELAY_SECONDS)?,
            default_removal_policy: parse_optional_removal_policy(
                map,
                ENV_DEFAULT_REMOVAL_POLICY,
            )?,
            max_index_name_length: parse_optional_u32(map, ENV_MAX_INDEX_NAME_LENGTH)?,
            controller_base_url: parse_optional_url_string(map, ENV_CONTROLLER_BASE_URL)?,
            controller_timeout_ms: parse_optional_u64(map, ENV_CONTROLLER_TIMEOUT_MS)?,
            secrets_provider: parse_optional_secrets_provider(map, ENV_SECRETS_PROVIDER)?,
            secrets_dir: parse_optional_trimmed_string(map, ENV_SECRETS_DIR)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: ProvisionerConfig,
    env: &ProvisionerEnv,
) -> Result<ValidatedProvisionerConfig, ErrorEnvelope> {
    let mut config = base;

    set_box_str(&mut config.api_key_secret_name, env.api_key_secret_name.as_deref());
    set_box_str(&mut config.environment, env.environment.as_deref());
    if let Some(value) = env.num_attempts {
        config.num_attempts_to_run_operation = value;
    }
    if let Some(value) = env.retry_delay_seconds {
        config.retry_delay_seconds = value;
    }
    if let Some(value) = env.default_removal_policy {
        config.default_removal_policy = value;
    }
    if let Some(value) = env.max_index_name_length {
        config.max_index_name_length = value;
    }
    set_box_str(
        &mut config.controller.base_url,
        env.controller_base_url.as_deref(),
    );
    if let Some(value) = env.controller_timeout_ms {
        config.controller.timeout_ms = value;
    }
    if let Some(value) = env.secrets_provider {
        config.secrets.provider = value;
    }
    set_box_str(&mut config.secrets.directory, env.secrets_dir.as_deref());

    config.validate_and_normalize().map_err(Into::into)
}

fn set_box_str(field: &mut Option<Box<str>>, value: Option<&str>) {
    if let Some(value) = value {
        *field = Some(value.to_owned().into_boxed_str());
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_value(var, &value)),
        }
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: trimmed.into_string(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: trimmed.into_string(),
        })
}

fn parse_optional_removal_policy(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<RemovalPolicy>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<RemovalPolicy>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: trimmed.into_string(),
        })
}

fn parse_optional_secrets_provider(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretsProvider>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<SecretsProvider>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: trimmed.into_string(),
        })
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    let invalid = || EnvParseError::InvalidUrl {
        var,
        value: trimmed.to_string(),
    };
    let parsed = Url::parse(&trimmed).map_err(|_| invalid())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid());
    }

    Ok(Some(parsed.to_string().into_boxed_str()))
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}
