//! # index-provisioner-app
//!
//! The lifecycle reconciliation use case.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod reconcile;

pub use reconcile::{
    FailureKind, IndexAction, IndexOutcome, ReconcileDeps, ReconcileError, ReconcileOutcome,
    ReconcileSettings, reconcile,
};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_provisioner_domain::domain_crate_version;
    use index_provisioner_ports::ports_crate_version;
    use index_provisioner_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        let ports_version = ports_crate_version();
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!ports_version.is_empty());
        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
