//! Fixture loading for lifecycle events and config files.
//!
//! Fixtures live under `crates/testkit/fixtures/`. Event fixtures are JSON or
//! YAML, chosen by extension.

use index_provisioner_domain::LifecycleEvent;
use std::path::{Path, PathBuf};
use std::{fmt, fs};

/// Errors raised while loading fixtures.
#[derive(Debug)]
pub enum FixtureError {
    /// Fixture file does not exist.
    MissingFixture {
        /// Path that could not be found.
        path: PathBuf,
    },
    /// Fixture file could not be read.
    FixtureRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Fixture file could not be parsed.
    FixtureParse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

impl fmt::Display for FixtureError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFixture { path } => {
                write!(formatter, "missing fixture: {}", path.display())
            },
            Self::FixtureRead { path, source } => {
                write!(formatter, "failed to read fixture {}: {source}", path.display())
            },
            Self::FixtureParse { path, message } => {
                write!(formatter, "failed to parse fixture {}: {message}", path.display())
            },
        }
    }
}

impl std::error::Error for FixtureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FixtureRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Root directory of the testkit fixtures.
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Absolute path of a fixture, relative to [`fixture_root`].
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixture_root().join(relative_path)
}

/// Read a fixture as text.
pub fn read_fixture(relative_path: &str) -> Result<String, FixtureError> {
    let path = fixture_path(relative_path);
    match fs::read_to_string(&path) {
        Ok(contents) => Ok(contents),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(FixtureError::MissingFixture { path })
        },
        Err(error) => Err(FixtureError::FixtureRead {
            path,
            source: error,
        }),
    }
}

/// Load a lifecycle event fixture from `fixtures/events/<name>`.
pub fn event_fixture(name: &str) -> Result<LifecycleEvent, FixtureError> {
    let relative = format!("events/{name}");
    let contents = read_fixture(&relative)?;
    let path = fixture_path(&relative);
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let parsed = if is_yaml {
        serde_yaml_ng::from_str(&contents).map_err(|error| error.to_string())
    } else {
        serde_json::from_str(&contents).map_err(|error| error.to_string())
    };
    parsed.map_err(|message| FixtureError::FixtureParse { path, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_domain::EventKind;

    #[test]
    fn event_fixtures_parse() -> Result<(), FixtureError> {
        let create = event_fixture("create.json")?;
        assert_eq!(create.kind(), EventKind::Create);
        assert_eq!(create.payload().indexes.len(), 1);

        let update = event_fixture("update.json")?;
        assert_eq!(update.kind(), EventKind::Update);
        assert_eq!(update.payload().indexes.len(), 2);

        let delete = event_fixture("delete.yaml")?;
        assert_eq!(delete.kind(), EventKind::Delete);
        Ok(())
    }

    #[test]
    fn missing_fixture_is_reported() {
        assert!(matches!(
            event_fixture("nope.json"),
            Err(FixtureError::MissingFixture { .. })
        ));
    }
}
