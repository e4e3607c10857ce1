//! Config loading helpers for CLI surfaces.

use crate::InfraResult;
use index_provisioner_config::{
    ProvisionerEnv, ValidatedProvisionerConfig, load_provisioner_config_from_path, to_pretty_json,
};
use index_provisioner_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the config against an explicit env map.
pub fn load_effective_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<ValidatedProvisionerConfig> {
    let env = ProvisionerEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_provisioner_config_from_path(config_path, overrides_json, &env)
}

/// Load and validate the effective config, returning deterministic pretty JSON.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> InfraResult<String> {
    let config = load_effective_config(env, config_path, overrides_json)?;
    to_pretty_json(&config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_config::ENV_ENVIRONMENT;
    use index_provisioner_testkit::fixtures::fixture_path;
    use serde_json::Value;

    #[test]
    fn env_wins_over_file() -> InfraResult<()> {
        let env = BTreeMap::from([(ENV_ENVIRONMENT.to_owned(), "eu-west1-gcp".to_owned())]);
        let path = fixture_path("config/provisioner-config.valid.json");
        let config = load_effective_config(&env, Some(&path), None)?;
        assert_eq!(config.environment.as_deref(), Some("eu-west1-gcp"));
        Ok(())
    }

    #[test]
    fn effective_json_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let env = BTreeMap::new();
        let first = load_effective_config_json(&env, None, Some(r#"{"retryDelaySeconds":1}"#))?;
        let second = load_effective_config_json(&env, None, Some(r#"{"retryDelaySeconds":1}"#))?;
        assert_eq!(first, second);

        let parsed: Value = serde_json::from_str(&first)?;
        assert_eq!(parsed["retryDelaySeconds"], 1);
        Ok(())
    }

    #[test]
    fn invalid_fixture_is_rejected() {
        let env = BTreeMap::new();
        let path = fixture_path("config/provisioner-config.invalid-version.json");
        assert!(load_effective_config(&env, Some(&path), None).is_err());
    }
}
