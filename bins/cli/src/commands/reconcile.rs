//! Reconcile command handler.

use crate::error::{CliError, ExitCode};
use crate::format::{ErrorView, LogFormat, OutputMode, ndjson_line, pretty_json};
use crate::{CliOutput, GlobalConfigArgs, format_error_output, log_info};
use index_provisioner_adapters::{JsonLogger, StderrLogSink, TracingLogger};
use index_provisioner_app::{IndexOutcome, ReconcileOutcome};
use index_provisioner_domain::ReconcileState;
use index_provisioner_infra::{EventSource, run_reconcile_from_path};
use index_provisioner_ports::LoggerPort;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

/// Run one reconciliation pass for the event at `event_path` (`-` for stdin).
pub fn run_reconcile_command(
    mode: OutputMode,
    args: GlobalConfigArgs<'_>,
    event_path: &Path,
    log_format: LogFormat,
) -> Result<CliOutput, CliError> {
    let source = EventSource::from_arg(event_path);
    let logger = engine_logger(log_format);
    let outcome =
        match run_reconcile_from_path(args.path, args.overrides_json, &source, Some(logger)) {
            Ok(outcome) => outcome,
            Err(error) => {
                let exit_code = ExitCode::for_envelope(&error);
                return Ok(format_error_output(mode, &error, exit_code));
            },
        };

    let mut stderr = String::new();
    let exit_code = if outcome.is_done() {
        log_info(&mut stderr, "reconcile completed", mode.no_progress);
        ExitCode::Ok
    } else {
        log_info(&mut stderr, "reconcile failed", mode.no_progress);
        ExitCode::Failed
    };

    let stdout = if mode.is_ndjson() {
        format_outcome_ndjson(&outcome)?
    } else if mode.is_json() {
        pretty_json(&outcome_json(&outcome))?
    } else {
        format_outcome_text(&outcome)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code,
    })
}

/// Engine events go through `tracing` for text logs and straight to stderr
/// as JSON lines otherwise.
fn engine_logger(format: LogFormat) -> Arc<dyn LoggerPort> {
    match format {
        LogFormat::Text => Arc::new(TracingLogger::new()),
        LogFormat::Json => Arc::new(JsonLogger::new(Arc::new(StderrLogSink))),
    }
}

fn state_labels(states: &[ReconcileState]) -> Vec<&'static str> {
    states.iter().map(ReconcileState::label).collect()
}

fn outcome_json(outcome: &ReconcileOutcome) -> Value {
    match outcome {
        ReconcileOutcome::Done {
            event,
            indexes,
            states,
        } => json!({
            "status": "done",
            "event": event.as_str(),
            "indexes": indexes,
            "states": state_labels(states),
        }),
        ReconcileOutcome::Failed {
            kind,
            error,
            states,
            ..
        } => json!({
            "status": "failed",
            "failure": kind.as_str(),
            "error": ErrorView::from_envelope(error),
            "states": state_labels(states),
        }),
    }
}

fn format_outcome_ndjson(outcome: &ReconcileOutcome) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for index in outcome.indexes() {
        let mut line = serde_json::to_value(index)?;
        if let Value::Object(map) = &mut line {
            map.insert("type".to_owned(), Value::String("index".to_owned()));
        }
        out.push_str(&ndjson_line(&line)?);
    }

    let mut summary = outcome_json(outcome);
    if let Value::Object(map) = &mut summary {
        map.remove("indexes");
        map.insert("type".to_owned(), Value::String("summary".to_owned()));
        map.insert("kind".to_owned(), Value::String("reconcile".to_owned()));
    }
    out.push_str(&ndjson_line(&summary)?);
    Ok(out)
}

fn format_outcome_text(outcome: &ReconcileOutcome) -> String {
    let states = state_labels(outcome.states()).join(" -> ");
    match outcome {
        ReconcileOutcome::Done { event, indexes, .. } => {
            let mut out = format!("status: done\nevent: {event}\nstates: {states}\n");
            if !indexes.is_empty() {
                out.push_str("indexes:\n");
                for index in indexes {
                    out.push_str(&format_index_line(index));
                }
            }
            out
        },
        ReconcileOutcome::Failed { kind, error, .. } => {
            let mut out = format!("status: failed\nfailure: {kind}\nstates: {states}\n");
            out.push_str(&ErrorView::from_envelope(error).to_text());
            out
        },
    }
}

fn format_index_line(index: &IndexOutcome) -> String {
    index.detail.as_deref().map_or_else(
        || format!("  {}: {}\n", index.name, index.action.as_str()),
        |detail| format!("  {}: {} ({detail})\n", index.name, index.action.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_app::{FailureKind, IndexAction};
    use index_provisioner_domain::{EventKind, IndexName};
    use index_provisioner_shared::{ErrorCode, ErrorEnvelope};

    fn done() -> Result<ReconcileOutcome, Box<dyn std::error::Error>> {
        let index: IndexOutcome = serde_json::from_value(json!({
            "name": "stack-prod-docs",
            "logicalName": "docs",
            "action": "retained",
            "detail": "vector count unknown",
        }))?;
        Ok(ReconcileOutcome::Done {
            event: EventKind::Delete,
            indexes: vec![index],
            states: vec![
                ReconcileState::Idle,
                ReconcileState::Resolving,
                ReconcileState::Discovering,
                ReconcileState::Deleting,
                ReconcileState::Done,
            ],
        })
    }

    #[test]
    fn text_lists_states_and_indexes() -> Result<(), Box<dyn std::error::Error>> {
        let text = format_outcome_text(&done()?);
        assert!(text.starts_with("status: done\nevent: delete\n"));
        assert!(text.contains("states: idle -> resolving -> discovering -> deleting -> done"));
        assert!(text.contains("  stack-prod-docs: retained (vector count unknown)\n"));
        Ok(())
    }

    #[test]
    fn ndjson_emits_one_line_per_index_then_summary() -> Result<(), Box<dyn std::error::Error>> {
        let out = format_outcome_ndjson(&done()?)?;
        let lines: Vec<Value> = out
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;

        let [index, summary] = lines.as_slice() else {
            return Err(format!("expected two lines, got {}", lines.len()).into());
        };
        assert_eq!(index["type"], "index");
        assert_eq!(index["action"], "retained");
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["status"], "done");
        assert!(summary.get("indexes").is_none());
        Ok(())
    }

    #[test]
    fn failed_outcome_reports_kind_and_code() {
        let outcome = ReconcileOutcome::Failed {
            kind: FailureKind::OperationFailed,
            message: "create_index failed after 3 attempts".to_owned(),
            error: ErrorEnvelope::expected(
                ErrorCode::new("retry", "operation_failed"),
                "create_index failed after 3 attempts",
            )
            .with_metadata("attempts", "3"),
            states: vec![
                ReconcileState::Idle,
                ReconcileState::Resolving,
                ReconcileState::Creating,
                ReconcileState::Failed {
                    reason: "boom".into(),
                },
            ],
        };

        let json = outcome_json(&outcome);
        assert_eq!(json["failure"], "operation_failed");
        assert_eq!(json["error"]["code"], "retry:operation_failed");
        assert_eq!(json["error"]["meta"]["attempts"], "3");
        assert_eq!(json["states"][3], "failed");

        let text = format_outcome_text(&outcome);
        assert!(text.contains("failure: operation_failed\n"));
        assert!(text.contains("code: retry:operation_failed\n"));
    }

    #[test]
    fn index_line_without_detail() -> Result<(), Box<dyn std::error::Error>> {
        let index = IndexOutcome {
            name: IndexName::parse("stack-prod-docs")?,
            logical_name: Some("docs".into()),
            action: IndexAction::Created,
            detail: None,
        };
        assert_eq!(format_index_line(&index), "  stack-prod-docs: created\n");
        Ok(())
    }
}
