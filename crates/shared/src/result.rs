//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers for enriching envelope errors at call sites.
pub trait ResultExt<T> {
    /// Attach a metadata entry to the error, if any.
    fn with_metadata(self, key: &str, value: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_metadata(self, key: &str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }
}
