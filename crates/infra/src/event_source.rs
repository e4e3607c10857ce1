//! Lifecycle event loading (file or stdin, JSON or YAML).

use crate::InfraResult;
use index_provisioner_domain::LifecycleEvent;
use index_provisioner_shared::{ErrorCode, ErrorEnvelope, ResultExt};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where an event document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// Read from standard input.
    Stdin,
    /// Read from a file; the extension picks the format, otherwise it is sniffed.
    Path(PathBuf),
}

impl EventSource {
    /// `-` selects stdin.
    #[must_use]
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Self::Stdin
        } else {
            Self::Path(arg.to_path_buf())
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Stdin => "-".to_owned(),
            Self::Path(path) => path.to_string_lossy().into_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventFormat {
    Json,
    Yaml,
}

/// Read and parse one lifecycle event.
pub fn load_event(source: &EventSource) -> InfraResult<LifecycleEvent> {
    let (text, format) = match source {
        EventSource::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|error| read_error(source, &error))?;
            let format = sniff_format(&text);
            (text, format)
        },
        EventSource::Path(path) => {
            let text =
                std::fs::read_to_string(path).map_err(|error| read_error(source, &error))?;
            let format = format_for_path(path).unwrap_or_else(|| sniff_format(&text));
            (text, format)
        },
    };
    parse_event(&text, format).with_metadata("source", source.label())
}

/// Parse an event document; JSON when it starts with `{`, YAML otherwise.
pub fn parse_event_text(text: &str) -> InfraResult<LifecycleEvent> {
    parse_event(text, sniff_format(text))
}

fn parse_event(text: &str, format: EventFormat) -> InfraResult<LifecycleEvent> {
    let parsed = match format {
        EventFormat::Json => serde_json::from_str(text).map_err(|error| error.to_string()),
        EventFormat::Yaml => serde_yaml_ng::from_str(text).map_err(|error| error.to_string()),
    };
    parsed.map_err(|message| {
        ErrorEnvelope::expected(
            ErrorCode::new("event", "invalid_event"),
            format!("invalid lifecycle event: {message}"),
        )
        .with_metadata(
            "format",
            match format {
                EventFormat::Json => "json",
                EventFormat::Yaml => "yaml",
            },
        )
    })
}

fn format_for_path(path: &Path) -> Option<EventFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "json" => Some(EventFormat::Json),
        "yaml" | "yml" => Some(EventFormat::Yaml),
        _ => None,
    }
}

fn sniff_format(text: &str) -> EventFormat {
    if text.trim_start().starts_with('{') {
        EventFormat::Json
    } else {
        EventFormat::Yaml
    }
}

fn read_error(source: &EventSource, error: &std::io::Error) -> ErrorEnvelope {
    let code = match error.kind() {
        std::io::ErrorKind::NotFound => ErrorCode::new("event", "event_file_not_found"),
        _ => ErrorCode::new("event", "event_read_failed"),
    };
    ErrorEnvelope::expected(code, format!("failed to read event: {error}"))
        .with_metadata("source", source.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_domain::EventKind;
    use index_provisioner_testkit::fixtures::fixture_path;

    fn scratch_dir(name: &str) -> std::io::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!(
            "index-provisioner-event-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    #[test]
    fn loads_json_and_yaml_fixtures() -> InfraResult<()> {
        let create = load_event(&EventSource::Path(fixture_path("events/create.json")))?;
        assert_eq!(create.kind(), EventKind::Create);

        let delete = load_event(&EventSource::Path(fixture_path("events/delete.yaml")))?;
        assert_eq!(delete.kind(), EventKind::Delete);
        assert_eq!(delete.payload().scope_id.as_str(), "PineconeStack-Prod");
        Ok(())
    }

    #[test]
    fn extensionless_file_is_sniffed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("sniffed")?;
        let json_path = dir.join("create-event");
        let yaml_path = dir.join("delete-event");
        std::fs::write(
            &json_path,
            r#"{"kind":"create","scopeId":"Stack-A","index":{"name":"a","dimension":8}}"#,
        )?;
        std::fs::write(&yaml_path, "kind: delete\nscopeId: Stack-A\nindexes: []\n")?;

        let create = load_event(&EventSource::Path(json_path));
        let delete = load_event(&EventSource::Path(yaml_path));
        std::fs::remove_dir_all(&dir)?;

        assert_eq!(create?.kind(), EventKind::Create);
        assert_eq!(delete?.kind(), EventKind::Delete);
        Ok(())
    }

    #[test]
    fn invalid_file_error_names_its_source() -> Result<(), Box<dyn std::error::Error>> {
        let dir = scratch_dir("invalid")?;
        let path = dir.join("event.yaml");
        std::fs::write(&path, "kind: rename\nscopeId: Stack-A\n")?;

        let error = load_event(&EventSource::Path(path.clone())).err();
        std::fs::remove_dir_all(&dir)?;

        let error = error.ok_or("expected an invalid event")?;
        assert_eq!(error.code, ErrorCode::new("event", "invalid_event"));
        assert_eq!(error.metadata.get("format").map(String::as_str), Some("yaml"));
        assert_eq!(
            error.metadata.get("source").cloned(),
            Some(path.to_string_lossy().into_owned())
        );
        Ok(())
    }

    #[test]
    fn dash_selects_stdin() {
        assert_eq!(EventSource::from_arg(Path::new("-")), EventSource::Stdin);
        assert_eq!(
            EventSource::from_arg(Path::new("event.json")),
            EventSource::Path(PathBuf::from("event.json"))
        );
    }

    #[test]
    fn sniffs_json_and_yaml_text() -> InfraResult<()> {
        let json = parse_event_text(
            r#"{"kind":"update","scopeId":"Stack-A","indexes":[{"name":"a","dimension":8}]}"#,
        )?;
        assert_eq!(json.kind(), EventKind::Update);

        let yaml = parse_event_text("kind: delete\nscopeId: Stack-A\nindexes: []\n")?;
        assert_eq!(yaml.kind(), EventKind::Delete);
        Ok(())
    }

    #[test]
    fn missing_file_has_stable_code() {
        let source = EventSource::Path(PathBuf::from("/nonexistent/event.json"));
        let error = load_event(&source).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("event", "event_file_not_found"))
        );
    }

    #[test]
    fn malformed_event_is_rejected() {
        let error = parse_event_text(r#"{"kind":"rename","scopeId":"Stack-A"}"#).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("event", "invalid_event"))
        );
    }
}
