//! Structured JSON logger adapter.

use crate::log_sink::LogSink;
use index_provisioner_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use index_provisioner_shared::{REDACTED, is_secret_key};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SERIALIZE_FAILED_LINE: &str = "{\"timestampMs\":0,\"level\":\"error\",\"event\":\"logger.serialize_failed\",\"message\":\"log serialization failed\"}\n";

/// JSON logger emitting one line per event.
///
/// Field values and error payloads are redacted recursively: any key that
/// looks like a credential is replaced with `[REDACTED]` before writing.
#[derive(Clone)]
pub struct JsonLogger {
    sink: Arc<dyn LogSink>,
    base_fields: LogFields,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Create a JSON logger backed by the provided sink.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            base_fields: LogFields::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Set base fields applied to every event.
    #[must_use]
    pub fn with_base_fields(mut self, fields: LogFields) -> Self {
        self.base_fields = fields;
        self
    }

    /// Set the minimum log level.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn render(&self, event: LogEvent) -> Option<String> {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());

        let mut payload = Map::new();
        payload.insert("timestampMs".to_owned(), Value::from(now_epoch_ms()));
        payload.insert("level".to_owned(), Value::from(event.level.as_str()));
        payload.insert("event".to_owned(), Value::from(event.event.as_ref()));
        payload.insert("message".to_owned(), Value::from(event.message.as_ref()));
        if !fields.is_empty() {
            let mut object: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect();
            redact_object(&mut object);
            payload.insert("fields".to_owned(), Value::Object(object));
        }
        if let Some(mut error) = event.error {
            redact_value(&mut error);
            payload.insert("error".to_owned(), error);
        }

        let mut line = serde_json::to_string(&Value::Object(payload)).ok()?;
        line.push('\n');
        Some(line)
    }
}

impl LoggerPort for JsonLogger {
    fn log(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        match self.render(event) {
            Some(line) => self.sink.write_line(&line),
            None => self.sink.write_line(SERIALIZE_FAILED_LINE),
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            sink: Arc::clone(&self.sink),
            base_fields: merged,
            min_level: self.min_level,
        })
    }
}

fn redact_object(map: &mut Map<String, Value>) {
    for (key, nested) in map.iter_mut() {
        if is_secret_key(key) {
            *nested = Value::String(REDACTED.to_owned());
        } else {
            redact_value(nested);
        }
    }
}

pub(crate) fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => redact_object(map),
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {},
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::MemoryLogSink;
    use index_provisioner_ports::log_fields;
    use index_provisioner_shared::{ErrorCode, ErrorEnvelope};
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn only_line(sink: &MemoryLogSink) -> Result<Value, Box<dyn std::error::Error>> {
        let lines = sink.take();
        let [line] = lines.as_slice() else {
            return Err(format!("expected one line, got {}", lines.len()).into());
        };
        Ok(serde_json::from_str(line.trim())?)
    }

    #[test]
    fn json_logger_redacts_sensitive_fields() -> TestResult {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Debug);

        logger.log(LogEvent {
            event: "reconcile.resolve.completed".into(),
            level: LogLevel::Info,
            message: "resolved".into(),
            fields: Some(log_fields([
                ("apiKey", json!("pc-secret")),
                ("index", json!("stack-abc-docs")),
            ])),
            error: Some(json!({
                "token": "should-hide",
                "nested": { "password": "nope", "attempts": 3 }
            })),
        });

        let payload = only_line(&sink)?;
        assert_eq!(payload.pointer("/fields/apiKey"), Some(&json!(REDACTED)));
        assert_eq!(payload.pointer("/fields/index"), Some(&json!("stack-abc-docs")));
        assert_eq!(payload.pointer("/error/token"), Some(&json!(REDACTED)));
        assert_eq!(payload.pointer("/error/nested/password"), Some(&json!(REDACTED)));
        assert_eq!(payload.pointer("/error/nested/attempts"), Some(&json!(3)));
        assert_eq!(payload.get("level"), Some(&json!("info")));
        Ok(())
    }

    #[test]
    fn child_logger_merges_fields() -> TestResult {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone())
            .with_base_fields(log_fields([("scopeId", json!("stack1"))]));

        let child = logger.child(log_fields([("correlationId", json!("pass_7"))]));
        child.info("reconcile.pass.started", "pass started", None);

        let payload = only_line(&sink)?;
        assert_eq!(payload.pointer("/fields/scopeId"), Some(&json!("stack1")));
        assert_eq!(payload.pointer("/fields/correlationId"), Some(&json!("pass_7")));
        Ok(())
    }

    #[test]
    fn events_below_min_level_are_dropped() {
        let sink = Arc::new(MemoryLogSink::default());
        let logger = JsonLogger::new(sink.clone()).with_min_level(LogLevel::Warn);

        logger.info("reconcile.create.completed", "created", None);
        logger.log_error(
            LogLevel::Error,
            "reconcile.pass.failed",
            "failed",
            None,
            &ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad spec"),
        );

        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        assert!(lines.iter().all(|line| line.contains("reconcile.pass.failed")));
    }
}
