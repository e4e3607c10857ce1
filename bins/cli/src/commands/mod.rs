//! CLI command handlers.

pub mod config;
pub mod reconcile;
pub mod resolve_name;

pub use config::{run_config_check, run_config_show};
pub use reconcile::run_reconcile_command;
pub use resolve_name::run_resolve_name;
