//! # index-provisioner-config
//!
//! Configuration schema, validation, and layered loading for the provisioner.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, ControllerConfig, IndexNameLength, NumAttempts,
    ProvisionerConfig, SecretsConfig, SecretsProvider, ValidatedProvisionerConfig,
    parse_provisioner_config_json, parse_provisioner_config_toml,
};

pub use env::{
    ENV_API_KEY_SECRET_NAME, ENV_CONTROLLER_BASE_URL, ENV_CONTROLLER_TIMEOUT_MS,
    ENV_DEFAULT_REMOVAL_POLICY, ENV_ENVIRONMENT, ENV_MAX_INDEX_NAME_LENGTH, ENV_NUM_ATTEMPTS,
    ENV_RETRY_DELAY_SECONDS, ENV_SECRETS_DIR, ENV_SECRETS_PROVIDER, EnvParseError,
    ProvisionerEnv, apply_env_overrides,
};
pub use load::{
    load_provisioner_config_from_path, load_provisioner_config_from_sources,
    load_provisioner_config_std_env, to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
