//! Output format helpers for CLI commands.

use clap::{Args, ValueEnum};
use index_provisioner_infra::is_secret_key;
use index_provisioner_shared::{ErrorEnvelope, ErrorKind, REDACTED_VALUE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
    /// Line-delimited JSON (NDJSON) output.
    Ndjson,
}

/// Format of the structured log lines written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Global CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
    /// Config file path (JSON/TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// JSON overrides (partial config), applied over the config file.
    #[arg(long, global = true)]
    pub overrides_json: Option<String>,
    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    /// Suppress `info:` progress lines.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
    pub no_progress: bool,
}

impl OutputMode {
    /// Build output mode from CLI flags.
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        Self {
            format: args.output,
            no_progress: args.no_progress,
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Returns true when NDJSON output is requested.
    #[must_use]
    pub const fn is_ndjson(self) -> bool {
        matches!(self.format, OutputFormat::Ndjson)
    }
}

/// Error shape printed by every command; metadata with secret-looking keys is redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    pub code: String,
    pub message: String,
    pub kind: &'static str,
    pub retriable: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl ErrorView {
    #[must_use]
    pub fn from_envelope(error: &ErrorEnvelope) -> Self {
        let meta = error
            .metadata
            .iter()
            .map(|(key, value)| {
                let value = if is_secret_key(key) {
                    REDACTED_VALUE.to_owned()
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect();
        Self {
            code: error.code.to_string(),
            message: error.message.clone(),
            kind: match error.kind {
                ErrorKind::Expected => "EXPECTED",
                ErrorKind::Invariant => "INVARIANT",
                ErrorKind::Unexpected => "UNEXPECTED",
            },
            retriable: error.is_retriable(),
            meta,
        }
    }

    /// `key: value` lines, without a trailing status line.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("code: ");
        out.push_str(&self.code);
        out.push('\n');
        out.push_str("message: ");
        out.push_str(&self.message);
        out.push('\n');
        out.push_str("kind: ");
        out.push_str(self.kind);
        out.push('\n');

        if !self.meta.is_empty() {
            out.push_str("meta:\n");
            for (key, value) in &self.meta {
                out.push_str("  ");
                out.push_str(key);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}

/// Single NDJSON line with a trailing newline.
pub fn ndjson_line(payload: &serde_json::Value) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string(payload)?;
    out.push('\n');
    Ok(out)
}

/// Pretty JSON document with a trailing newline.
pub fn pretty_json(payload: &serde_json::Value) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(payload)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_shared::ErrorCode;

    #[test]
    fn error_view_redacts_secret_metadata() {
        let error = ErrorEnvelope::expected(ErrorCode::new("secrets", "not_found"), "missing")
            .with_metadata("apiKey", "pk-live")
            .with_metadata("apiKeySecretName", "pinecone-api-key");
        let view = ErrorView::from_envelope(&error);

        assert_eq!(view.code, "secrets:not_found");
        assert_eq!(view.meta.get("apiKey").map(String::as_str), Some(REDACTED_VALUE));
        assert_eq!(
            view.meta.get("apiKeySecretName").map(String::as_str),
            Some("pinecone-api-key")
        );
        assert!(!view.to_text().contains("pk-live"));
    }
}
