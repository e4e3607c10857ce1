//! Resolve-name command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{OutputMode, pretty_json};
use crate::{CliOutput, format_error_output, ndjson_summary};
use index_provisioner_domain::{
    DEFAULT_LOGICAL_NAME, IndexName, ManagedPrefix, ScopeId, managed_prefix, resolve_with_prefix,
};
use index_provisioner_shared::ErrorEnvelope;

/// Print the remote name a logical index resolves to within a scope.
pub fn run_resolve_name(
    mode: OutputMode,
    scope: &str,
    logical_name: Option<&str>,
    max_length: usize,
) -> Result<CliOutput, CliError> {
    let scope = match ScopeId::parse(scope) {
        Ok(scope) => scope,
        Err(error) => {
            let error = ErrorEnvelope::from(error);
            return Ok(format_error_output(mode, &error, ExitCode::InvalidInput));
        },
    };
    let logical_name = logical_name.unwrap_or(DEFAULT_LOGICAL_NAME);
    let prefix = managed_prefix(&scope);
    let name = resolve_with_prefix(&prefix, logical_name, max_length);

    let stdout = if mode.is_ndjson() {
        ndjson_summary(
            "ok",
            "resolve_name",
            Some(payload(&scope, logical_name, &prefix, &name)),
        )?
    } else if mode.is_json() {
        let mut payload = payload(&scope, logical_name, &prefix, &name);
        if let serde_json::Value::Object(map) = &mut payload {
            map.insert("status".to_owned(), serde_json::Value::from("ok"));
        }
        pretty_json(&payload)?
    } else {
        format!("name: {name}\nprefix: {}\n", prefix.as_str())
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn payload(
    scope: &ScopeId,
    logical_name: &str,
    prefix: &ManagedPrefix,
    name: &IndexName,
) -> serde_json::Value {
    serde_json::json!({
        "scopeId": scope.as_str(),
        "logicalName": logical_name,
        "prefix": prefix.as_str(),
        "name": name.as_str(),
        "length": name.as_str().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    const TEXT: OutputMode = OutputMode {
        format: OutputFormat::Text,
        no_progress: true,
    };

    #[test]
    fn text_output_is_owned_by_the_scope_prefix() -> Result<(), Box<dyn std::error::Error>> {
        let output = run_resolve_name(TEXT, "PineconeStack-Prod", Some("docs"), 45)?;
        let prefix = managed_prefix(&ScopeId::parse("PineconeStack-Prod")?);

        assert_eq!(output.exit_code, ExitCode::Ok);
        assert!(output.stdout.starts_with(&format!("name: {}", prefix.as_str())));
        Ok(())
    }

    #[test]
    fn respects_the_length_budget() -> Result<(), Box<dyn std::error::Error>> {
        let json = OutputMode {
            format: OutputFormat::Json,
            no_progress: true,
        };
        let output = run_resolve_name(json, "PineconeStack-Prod", Some(&"x".repeat(200)), 20)?;
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;

        assert_eq!(value["status"], "ok");
        assert!(value["length"].as_u64().is_some_and(|length| length <= 20));
        Ok(())
    }

    #[test]
    fn blank_scope_is_invalid_input() -> Result<(), CliError> {
        let output = run_resolve_name(TEXT, "   ", None, 45)?;
        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        assert!(output.stdout.starts_with("status: error\n"));
        Ok(())
    }
}
