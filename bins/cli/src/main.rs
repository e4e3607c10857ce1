//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{run_config_check, run_config_show, run_reconcile_command, run_resolve_name};
use error::{CliError, ExitCode};
use format::{ErrorView, LogFormat, OutputArgs, OutputMode, ndjson_line, pretty_json};
use index_provisioner_domain::MAX_INDEX_NAME_LENGTH;
use index_provisioner_infra::InfraError;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Env var holding the `tracing` filter directive.
const LOG_FILTER_ENV: &str = "INDEX_PROVISIONER_LOG";

/// Prefix of every env var the config loader reads.
const CONFIG_ENV_PREFIX: &str = "INDEX_PROVISIONER_";

#[derive(Debug, Parser)]
#[command(
    name = "index-provisioner",
    version,
    about = "Reconcile scope-owned Pinecone indexes with lifecycle events",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass for a lifecycle event.
    Reconcile {
        /// Event document (JSON or YAML); `-` reads stdin.
        #[arg(long, value_name = "PATH")]
        event: PathBuf,
    },
    /// Print the remote name a logical index resolves to.
    ResolveName {
        /// Scope id that owns the index.
        #[arg(long)]
        scope: String,
        /// Logical index name.
        #[arg(long)]
        name: Option<String>,
        /// Upper bound on the resolved name length.
        #[arg(long, default_value_t = MAX_INDEX_NAME_LENGTH)]
        max_length: usize,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, merging, and normalization.
    Check,
    /// Show the effective config after applying overrides (secrets redacted).
    Show,
}

/// Config sources shared by every command.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GlobalConfigArgs<'a> {
    pub(crate) path: Option<&'a Path>,
    pub(crate) overrides_json: Option<&'a str>,
}

impl<'a> GlobalConfigArgs<'a> {
    fn from_args(args: &'a OutputArgs) -> Self {
        Self {
            path: args.config.as_deref(),
            overrides_json: args.overrides_json.as_deref(),
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    if let Err(error) = init_tracing(cli.output.log_format) {
        return exit_with_error(&error);
    }

    match run(&cli, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing(format: LogFormat) -> Result<(), CliError> {
    let filter = std::env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    let installed = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(|error| CliError::Logging(error.to_string()))
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let config_args = GlobalConfigArgs::from_args(&cli.output);
    match &cli.command {
        Commands::Reconcile { event } => {
            run_reconcile_command(mode, config_args, event, cli.output.log_format)
        },
        Commands::ResolveName {
            scope,
            name,
            max_length,
        } => run_resolve_name(mode, scope, name.as_deref(), *max_length),
        Commands::Config { command } => {
            let env = collect_scoped_env(CONFIG_ENV_PREFIX);
            match command {
                ConfigCommands::Check => run_config_check(mode, &env, config_args),
                ConfigCommands::Show => run_config_show(mode, &env, config_args),
            }
        },
    }
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &InfraError,
    exit_code: ExitCode,
) -> CliOutput {
    let view = ErrorView::from_envelope(error);

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    // This is a CLI boundary, so JSON serialization errors are internal.
    let stdout = if mode.is_ndjson() {
        ndjson_line(&serde_json::json!({
            "type": "error",
            "status": "error",
            "error": view,
        }))
        .unwrap_or_else(|_| {
            "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}\n".to_string()
        })
    } else if mode.is_json() {
        pretty_json(&serde_json::json!({
            "status": "error",
            "error": view,
        }))
        .unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\",\"kind\":\"INVARIANT\"}}\n".to_string()
        })
    } else {
        let mut out = String::from("status: error\n");
        out.push_str(&view.to_text());
        out
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

pub(crate) fn ndjson_summary(
    status: &str,
    kind: &str,
    extra: Option<serde_json::Value>,
) -> Result<String, serde_json::Error> {
    let mut payload = serde_json::Map::new();
    payload.insert("type".to_owned(), serde_json::Value::from("summary"));
    payload.insert("status".to_owned(), serde_json::Value::from(status));
    payload.insert("kind".to_owned(), serde_json::Value::from(kind));
    if let Some(serde_json::Value::Object(map)) = extra {
        payload.extend(map);
    }
    ndjson_line(&serde_json::Value::Object(payload))
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}
