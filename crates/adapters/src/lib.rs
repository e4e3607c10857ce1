//! # index-provisioner-adapters
//!
//! Adapter implementations for ports: the Pinecone control API, secret
//! stores, and structured loggers. This crate depends on `ports`, `shared`,
//! and `domain`.

pub mod log_sink;
pub mod logger;
#[cfg(feature = "pinecone")]
pub mod pinecone;
pub mod secrets;
pub mod tracing_logger;

pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
#[cfg(feature = "pinecone")]
pub use pinecone::{PineconeConnector, PineconeControlClient, PineconeControlConfig};
pub use secrets::{EnvSecretStore, FileSecretStore, SECRET_ENV_PREFIX, secret_env_var};
pub use tracing_logger::TracingLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
