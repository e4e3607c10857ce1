//! Pinecone control-plane adapter.
//!
//! Talks to the legacy controller API (`/databases`, `/collections`) and
//! reads vector counts from the index host's `describe_index_stats`.

pub mod base_url;
pub mod client;
pub mod connector;
pub mod error;

pub use client::{PineconeControlClient, PineconeControlConfig};
pub use connector::{DEFAULT_CONTROLLER_TIMEOUT_MS, PineconeConnector};
