//! # index-provisioner-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Config loading helpers used by CLI surfaces.
pub mod config_check;
/// Environment validation helpers used by CLI surfaces.
pub mod env_check;
/// Lifecycle event loading.
pub mod event_source;
/// Blocking reconcile entry points.
pub mod runner;
/// Adapter and settings selection from config.
pub mod wiring;

pub use config_check::{load_effective_config, load_effective_config_json};
pub use env_check::{InfraError, InfraResult, validate_env_parsing};
pub use event_source::{EventSource, load_event, parse_event_text};
pub use runner::{run_reconcile, run_reconcile_from_path, run_reconcile_with_deps};
pub use wiring::{build_connector, build_reconcile_deps, build_secret_store, settings_from_config};

// Re-export redaction utilities for CLI boundary sanitization
pub use index_provisioner_shared::{is_secret_key, redact_if_secret};

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
