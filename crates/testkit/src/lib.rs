//! # index-provisioner-testkit
//!
//! Test helpers, fixtures, and in-memory adapters.
//! This crate depends on `ports`, `shared`, and `domain`.

pub mod errors;
pub mod fixtures;
pub mod in_memory;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
