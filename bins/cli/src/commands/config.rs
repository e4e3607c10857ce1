//! Config check and show handlers.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, pretty_json};
use crate::{CliOutput, GlobalConfigArgs, format_error_output, log_info, ndjson_summary};
use index_provisioner_infra::{is_secret_key, load_effective_config_json};
use index_provisioner_shared::REDACTED_VALUE;
use serde_json::Value;
use std::collections::BTreeMap;

/// Validate config loading, merging, and normalization.
pub fn run_config_check(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    args: GlobalConfigArgs<'_>,
) -> Result<CliOutput, CliError> {
    if let Err(error) = load_effective_config_json(env, args.path, args.overrides_json) {
        return Ok(format_error_output(mode, &error, ExitCode::InvalidInput));
    }

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        ndjson_summary("ok", "config", None)?
    } else if mode.is_json() {
        pretty_json(&serde_json::json!({
            "status": "ok",
            "configPath": args.path.map(|value| value.to_string_lossy().to_string()),
        }))?
    } else {
        args.path.map_or_else(
            || "status: ok\nconfig: ok\n".to_string(),
            |path| format!("status: ok\nconfig: ok\npath: {}\n", path.to_string_lossy()),
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Show the effective config after env and overrides are applied.
pub fn run_config_show(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    args: GlobalConfigArgs<'_>,
) -> Result<CliOutput, CliError> {
    let config_json = match load_effective_config_json(env, args.path, args.overrides_json) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };
    let mut config_value: Value = serde_json::from_str(config_json.trim())?;
    redact_secret_fields(&mut config_value);

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "effectiveConfig": config_value })),
        )?
    } else if mode.is_json() {
        pretty_json(&serde_json::json!({
            "status": "ok",
            "configPath": args.path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config_value,
        }))?
    } else {
        let mut out = String::from("status: ok\nconfig:\n");
        out.push_str(&serde_json::to_string_pretty(&config_value)?);
        out.push('\n');
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn redact_secret_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_secret_key(key) && !entry.is_object() {
                    *entry = Value::String(REDACTED_VALUE.to_owned());
                } else {
                    redact_secret_fields(entry);
                }
            }
        },
        Value::Array(items) => items.iter_mut().for_each(redact_secret_fields),
        _ => {},
    }
}
