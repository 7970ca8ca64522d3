//! ragline: chat backend with batched vector-index ingestion and a
//! streaming inference relay
//!
//! The crate wires three external services together: an embedding service,
//! a vector similarity index and a completion service. Ingestion loads
//! datasets or uploaded files into the index in bounded batches with
//! gap-free ids; the relay streams completions back to the caller chunk by
//! chunk while a session registry tracks conversations and evicts idle ones.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod jobs;
pub mod providers;
pub mod relay;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestMode, IngestPipeline, IngestSummary};
pub use relay::{EndReason, InferenceClient, RelayEvent};
