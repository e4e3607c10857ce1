//! Logger adapter that forwards structured events to `tracing`.
//!
//! Used by the CLI, which installs a `tracing-subscriber` formatter; the
//! subscriber decides output format and filtering.

use crate::logger::redact_value;
use index_provisioner_ports::{LogEvent, LogFields, LogLevel, LoggerPort};
use serde_json::Value;

/// Logger that emits each event through the `tracing` macros.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    base_fields: LogFields,
}

impl TracingLogger {
    /// Logger without base fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let mut fields = self.base_fields.clone();
        fields.extend(event.fields.unwrap_or_default());
        let mut fields = Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key.into_string(), value))
                .collect(),
        );
        redact_value(&mut fields);

        let mut error = event.error.unwrap_or(Value::Null);
        redact_value(&mut error);

        let name = event.event.as_ref();
        let message = event.message.as_ref();
        match event.level {
            LogLevel::Debug => {
                tracing::debug!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Info => {
                tracing::info!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Warn => {
                tracing::warn!(event = name, fields = %fields, error = %error, "{message}");
            },
            LogLevel::Error => {
                tracing::error!(event = name, fields = %fields, error = %error, "{message}");
            },
        }
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut merged = self.base_fields.clone();
        merged.extend(fields);
        Box::new(Self {
            base_fields: merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_ports::log_fields;

    #[test]
    fn child_accumulates_base_fields() {
        let logger = TracingLogger::new();
        let child = logger.child(log_fields([("scopeId", "stack1".into())]));
        // No subscriber is installed; logging must still be a no-op rather than fail.
        child.info("reconcile.pass.started", "pass started", None);
        child.warn("reconcile.delete.skipped", "skipped", Some(log_fields([("apiKey", "x".into())])));
    }
}
